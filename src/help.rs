//! Command-line help and the input keyword reference.
//!
//! Every input file key is listed once in [`KEYWORDS`], grouped by
//! [`KeywordCategory`]. The help printers read from that table, so the
//! reference cannot drift from the parser.

use crate::settings::SETTINGS_FILE_NAME;

/// Keyword groups, printed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Where the three vectors come from
    Input,
    /// Solver and energy reference
    Model,
    /// Polar sampling grid
    Grid,
    /// Which result files are written
    Output,
    /// Static surface figure
    Plot,
    /// Rotating GIF animation
    Animation,
}

impl KeywordCategory {
    /// All categories in print order
    pub const ALL: [KeywordCategory; 6] = [
        KeywordCategory::Input,
        KeywordCategory::Model,
        KeywordCategory::Grid,
        KeywordCategory::Output,
        KeywordCategory::Plot,
        KeywordCategory::Animation,
    ];

    /// Section title used in the keyword reference
    pub fn title(&self) -> &'static str {
        match self {
            KeywordCategory::Input => "INPUT VECTORS",
            KeywordCategory::Model => "MODEL",
            KeywordCategory::Grid => "POLAR GRID",
            KeywordCategory::Output => "OUTPUT FILES",
            KeywordCategory::Plot => "FIGURE",
            KeywordCategory::Animation => "ANIMATION",
        }
    }
}

/// One input file key.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Key as written in the input file
    pub name: &'static str,
    /// Group the key is listed under
    pub category: KeywordCategory,
    /// One-line description
    pub description: &'static str,
    /// Built-in default, if the key has one
    pub default_value: Option<&'static str>,
    /// Example line
    pub example: Option<&'static str>,
    /// Needed for every run (unless an alternative source is given)
    pub required: bool,
}

/// Complete keyword table.
pub const KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "gradient_a",
        category: KeywordCategory::Input,
        description: "Energy gradient of state A (Hartree/Bohr), one header line then x y z per atom",
        default_value: None,
        example: Some("gradient_a = ci1_gradientA.out"),
        required: true,
    },
    Keyword {
        name: "gradient_b",
        category: KeywordCategory::Input,
        description: "Energy gradient of state B, same layout as gradient_a",
        default_value: None,
        example: Some("gradient_b = ci1_gradientB.out"),
        required: true,
    },
    Keyword {
        name: "nac",
        category: KeywordCategory::Input,
        description: "Nonadiabatic coupling vector between A and B, same layout",
        default_value: None,
        example: Some("nac = ci1_NAC.out"),
        required: true,
    },
    Keyword {
        name: "xyz",
        category: KeywordCategory::Input,
        description: "XYZ geometry supplying atom labels for the exported basis vectors",
        default_value: None,
        example: Some("xyz = ci1.xyz"),
        required: false,
    },
    Keyword {
        name: "qm_output",
        category: KeywordCategory::Input,
        description: "QM output file to extract all three vectors from (replaces the vector files)",
        default_value: None,
        example: Some("qm_output = ci1.log"),
        required: false,
    },
    Keyword {
        name: "state_a",
        category: KeywordCategory::Input,
        description: "First state number in qm_output (1-based)",
        default_value: None,
        example: Some("state_a = 1"),
        required: false,
    },
    Keyword {
        name: "state_b",
        category: KeywordCategory::Input,
        description: "Second state number in qm_output (1-based)",
        default_value: None,
        example: Some("state_b = 2"),
        required: false,
    },
    Keyword {
        name: "e_x",
        category: KeywordCategory::Model,
        description: "Energy of the intersection point in Hartree",
        default_value: Some("0.0"),
        example: Some("e_x = -154.123456"),
        required: false,
    },
    Keyword {
        name: "scale_coupling",
        category: KeywordCategory::Model,
        description: "Rescale the coupling vector to the length of the gradient difference",
        default_value: Some("false"),
        example: Some("scale_coupling = true"),
        required: false,
    },
    Keyword {
        name: "energy_unit",
        category: KeywordCategory::Model,
        description: "Unit of the plotted energies: hartree or ev",
        default_value: Some("hartree"),
        example: Some("energy_unit = ev"),
        required: false,
    },
    Keyword {
        name: "r_max",
        category: KeywordCategory::Grid,
        description: "Largest radius sampled in the branching plane",
        default_value: Some("1.0"),
        example: Some("r_max = 0.5"),
        required: false,
    },
    Keyword {
        name: "n_radial",
        category: KeywordCategory::Grid,
        description: "Number of radii (at least 2)",
        default_value: Some("50"),
        example: Some("n_radial = 80"),
        required: false,
    },
    Keyword {
        name: "n_angular",
        category: KeywordCategory::Grid,
        description: "Number of angles over [0, 2pi) (at least 3)",
        default_value: Some("100"),
        example: Some("n_angular = 180"),
        required: false,
    },
    Keyword {
        name: "save_parameters",
        category: KeywordCategory::Output,
        description: "Write <base>_ci_parameters.txt and .json",
        default_value: Some("true"),
        example: None,
        required: false,
    },
    Keyword {
        name: "write_vectors",
        category: KeywordCategory::Output,
        description: "Write the basis vectors to <base>_x_vectors.out and <base>_y_vectors.out",
        default_value: Some("true"),
        example: None,
        required: false,
    },
    Keyword {
        name: "save_image",
        category: KeywordCategory::Output,
        description: "Render the surfaces to <base>_surface.png",
        default_value: Some("true"),
        example: Some("save_image = false"),
        required: false,
    },
    Keyword {
        name: "animate",
        category: KeywordCategory::Output,
        description: "Render a rotating view to <base>_rotation.gif",
        default_value: Some("false"),
        example: Some("animate = true"),
        required: false,
    },
    Keyword {
        name: "fig_width",
        category: KeywordCategory::Plot,
        description: "Figure width in inches",
        default_value: Some("10"),
        example: None,
        required: false,
    },
    Keyword {
        name: "fig_height",
        category: KeywordCategory::Plot,
        description: "Figure height in inches",
        default_value: Some("8"),
        example: None,
        required: false,
    },
    Keyword {
        name: "dpi",
        category: KeywordCategory::Plot,
        description: "Resolution of the static figure",
        default_value: Some("300"),
        example: Some("dpi = 150"),
        required: false,
    },
    Keyword {
        name: "elevation",
        category: KeywordCategory::Plot,
        description: "Camera elevation in degrees",
        default_value: Some("28"),
        example: None,
        required: false,
    },
    Keyword {
        name: "azimuth",
        category: KeywordCategory::Plot,
        description: "Camera azimuth in degrees",
        default_value: Some("-133"),
        example: None,
        required: false,
    },
    Keyword {
        name: "title",
        category: KeywordCategory::Plot,
        description: "Figure caption; the input basename when omitted",
        default_value: None,
        example: Some("title = S1/S0 intersection"),
        required: false,
    },
    Keyword {
        name: "anim_dpi",
        category: KeywordCategory::Animation,
        description: "Resolution of the animation frames",
        default_value: Some("200"),
        example: None,
        required: false,
    },
    Keyword {
        name: "anim_fps",
        category: KeywordCategory::Animation,
        description: "Frames per second",
        default_value: Some("20"),
        example: None,
        required: false,
    },
    Keyword {
        name: "rotation_step",
        category: KeywordCategory::Animation,
        description: "Azimuth increment per frame in degrees, in (0, 360]",
        default_value: Some("2"),
        example: Some("rotation_step = 5"),
        required: false,
    },
];

/// Looks up a keyword by name, case-insensitively.
pub fn find_keyword(name: &str) -> Option<&'static Keyword> {
    KEYWORDS.iter().find(|k| k.name.eq_ignore_ascii_case(name))
}

/// Print global help
pub fn print_global_help() {
    println!("ConeZen - Conical intersection topography from gradients and couplings");
    println!();
    println!("USAGE:");
    println!("    conezen [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    <input_file>");
    println!("                        Analyse one intersection described by the input file");
    println!();
    println!("    batch <input_file>...");
    println!("                        Analyse several input files in parallel");
    println!();
    println!("    extract <qm_output> <state_a> <state_b> [prefix]");
    println!("                        Extract gradient and coupling files from a QM output");
    println!();
    println!("    template [output_file]");
    println!("                        Create a commented input template");
    println!();
    println!("    template {}", SETTINGS_FILE_NAME);
    println!("                        Create a program settings template");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help [topic]   Show help. Topics: keywords, examples");
    println!();
    println!("SETTINGS FILE:");
    println!("    Plot, animation and logging defaults are read from '{}'.", SETTINGS_FILE_NAME);
    println!("    Locations, highest priority first:");
    println!("      - ./{}", SETTINGS_FILE_NAME);
    println!("      - ~/.config/conezen/{}", SETTINGS_FILE_NAME);
    println!("      - /etc/conezen/{}", SETTINGS_FILE_NAME);
    println!("    Keys set in the input file override the settings file.");
    println!();
    println!("EXAMPLES:");
    println!("    Create template:     conezen template ci1.inp");
    println!("    Run analysis:        conezen ci1.inp");
    println!("    Many systems:        conezen batch ci*.inp");
    println!("    From QM output:      conezen extract job.log 1 2 ci1");
    println!("    View keywords:       conezen --help keywords");
    println!();
}

/// Print help for one command; returns false for an unknown command
pub fn print_command_help(command: &str) -> bool {
    match command {
        "batch" => print_batch_help(),
        "extract" => print_extract_help(),
        "template" => print_template_help(),
        _ => return false,
    }
    true
}

fn print_batch_help() {
    println!("Batch Command");
    println!("═════════════");
    println!();
    println!("USAGE:");
    println!("    conezen batch <input_file>...");
    println!();
    println!("DESCRIPTION:");
    println!("    Runs every input file on its own worker thread. A failing input");
    println!("    is reported and does not stop the others. A summary table of the");
    println!("    topological descriptors is printed at the end.");
    println!();
    println!("    The exit code is 1 if any input failed.");
    println!();
}

fn print_extract_help() {
    println!("Extract Command");
    println!("═══════════════");
    println!();
    println!("USAGE:");
    println!("    conezen extract <qm_output> <state_a> <state_b> [prefix]");
    println!();
    println!("DESCRIPTION:");
    println!("    Reads the last gradient block of each state and the last coupling");
    println!("    block between them. A coupling printed for <state_b> and <state_a>");
    println!("    is negated so it always points from A to B.");
    println!();
    println!("ARGUMENTS:");
    println!("    <qm_output>          QM program output file");
    println!("    <state_a> <state_b>  Distinct 1-based state numbers");
    println!("    [prefix]             Output prefix, default: qm_output file stem");
    println!();
    println!("OUTPUT:");
    println!("    <prefix>_gradientA.out, <prefix>_gradientB.out, <prefix>_NAC.out");
    println!();
}

fn print_template_help() {
    println!("Template Command");
    println!("════════════════");
    println!();
    println!("USAGE:");
    println!("    conezen template [output_file]");
    println!("    conezen template {}", SETTINGS_FILE_NAME);
    println!();
    println!("DESCRIPTION:");
    println!("    Writes an input file listing every key with its default.");
    println!("    The vector file names follow the output file stem, matching");
    println!("    the files written by 'conezen extract ... <stem>'.");
    println!("    Default output: conezen.inp");
    println!();
    println!("    With '{}' a program settings template is written instead.", SETTINGS_FILE_NAME);
    println!();
}

/// Print keyword reference
pub fn print_keyword_help() {
    println!("KEYWORD REFERENCE");
    println!("{}", "═".repeat(76));
    println!();

    for category in KeywordCategory::ALL {
        println!("{}", category.title());
        println!("{}", "─".repeat(76));
        println!();
        for keyword in KEYWORDS.iter().filter(|k| k.category == category) {
            print_keyword(keyword);
            println!();
        }
    }
    println!("Keys are case-insensitive. Relative paths are resolved against the");
    println!("directory of the input file. Either gradient_a, gradient_b and nac, or");
    println!("qm_output with state_a and state_b, must be given.");
    println!();
}

/// Print examples
pub fn print_examples() {
    println!("EXAMPLES");
    println!("{}", "═".repeat(76));
    println!();
    println!("1. Vectors from separate files");
    println!("{}", "─".repeat(76));
    println!("    gradient_a = s1_grad.out");
    println!("    gradient_b = s0_grad.out");
    println!("    nac = s1s0_nac.out");
    println!("    xyz = ci.xyz");
    println!("    e_x = -154.05");
    println!();
    println!("2. Vectors from a QM output, energies in eV, animated");
    println!("{}", "─".repeat(76));
    println!("    qm_output = ci_opt.log");
    println!("    state_a = 1");
    println!("    state_b = 2");
    println!("    energy_unit = ev");
    println!("    animate = true");
    println!("    rotation_step = 5");
    println!();
    println!("3. Parameters only, no figure");
    println!("{}", "─".repeat(76));
    println!("    gradient_a = a.out");
    println!("    gradient_b = b.out");
    println!("    nac = h.out");
    println!("    save_image = false");
    println!("    write_vectors = false");
    println!();
}

fn print_keyword(keyword: &Keyword) {
    let required_str = if keyword.required { " [REQUIRED]" } else { "" };

    println!("{}{}", keyword.name, required_str);
    println!("    {}", keyword.description);

    if let Some(default) = keyword.default_value {
        println!("    Default: {}", default);
    }

    if let Some(example) = keyword.example {
        println!("    Example: {}", example);
    }
}
