//! ConeZen command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Analyse one intersection
//! conezen ci1.inp
//!
//! # Analyse several intersections in parallel
//! conezen batch ci1.inp ci2.inp ci3.inp
//!
//! # Split a QM output into the three vector files
//! conezen extract job.log 1 2 ci1
//!
//! # Create an input template or a settings template
//! conezen template ci1.inp
//! conezen template conezen_config.cfg
//! ```
//!
//! Built-in help: `conezen --help [keywords|examples]` and
//! `conezen <command> --help`.

use conezen::config::Config;
use conezen::naming::FileNaming;
use conezen::qm_output::{self, StatePair};
use conezen::settings::{SettingsManager, SETTINGS_FILE_NAME};
use conezen::workflow::{self, AnalysisReport};
use conezen::{batch, help, template_generator};
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

/// Copies log output to stdout and the debug log file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    check_help_flags(&args);

    let settings = SettingsManager::load();
    let log_name = debug_log_name(&args);
    init_logging(&settings, log_name.as_deref());
    for error in settings.load_errors() {
        log::warn!("Failed to load settings from {}", error);
    }
    log::info!("Settings loaded from: {}", settings.config_source());

    let defaults = Config::from_settings(settings.settings());
    let print_level = settings.general().print_level;

    let result = match args[1].as_str() {
        "batch" => run_batch(&args[2..], &defaults),
        "extract" => run_extract(&args),
        "template" => run_template(&args),
        command if command.starts_with('-') => {
            eprintln!("Error: Unknown option: {}", command);
            print_usage(&args[0]);
            process::exit(1);
        }
        input => run_analysis(Path::new(input), &defaults, print_level),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Name of the debug log for commands that analyse input files.
fn debug_log_name(args: &[String]) -> Option<String> {
    match args[1].as_str() {
        "batch" => Some("conezen_debug_batch.log".to_string()),
        "extract" | "template" => None,
        input if !input.starts_with('-') => Some(FileNaming::new(Path::new(input)).debug_log()),
        _ => None,
    }
}

fn init_logging(settings: &SettingsManager, log_name: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(settings.logging().level_filter())
        .parse_default_env()
        .format_timestamp_millis();

    let file = log_name
        .filter(|_| settings.logging().file_logging)
        .and_then(|name| match File::create(name) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: cannot create debug log {}: {}", name, e);
                None
            }
        });

    match file {
        Some(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
        }
        None => {
            builder.target(env_logger::Target::Stdout);
        }
    }
    builder.init();
}

fn check_help_flags(args: &[String]) {
    let is_help = |s: &str| s == "--help" || s == "-h";

    if is_help(&args[1]) {
        match args.get(2).map(String::as_str) {
            None => help::print_global_help(),
            Some("keywords") => help::print_keyword_help(),
            Some("examples") => help::print_examples(),
            Some(topic) => {
                eprintln!("Unknown help topic: {}", topic);
                eprintln!("Available topics: keywords, examples");
                process::exit(1);
            }
        }
        process::exit(0);
    }

    if args.len() >= 3 && is_help(&args[2]) {
        if !help::print_command_help(&args[1]) {
            help::print_global_help();
        }
        process::exit(0);
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} <input_file>                              Run an analysis", program);
    eprintln!("  {} batch <input_file>...                     Run several analyses", program);
    eprintln!("  {} extract <qm_output> <a> <b> [prefix]      Extract vector files", program);
    eprintln!("  {} template [output_file]                    Create input template", program);
    eprintln!("  {} template {}               Create settings template", program, SETTINGS_FILE_NAME);
    eprintln!("  {} --help [keywords|examples]                Show help", program);
}

fn print_report(report: &AnalysisReport) {
    let d = &report.analysis.descriptors;
    println!();
    println!("Topological descriptors for {}", report.system);
    println!("----------------------------------------------");
    println!("  pitch       del_gh  {:>14.6}", d.pitch);
    println!("  asymmetry   Del_gh  {:>14.6}", d.asymmetry);
    println!("  tilt        sigma   {:>14.6}", d.tilt);
    println!("  heading     theta_s {:>14.3} deg", d.tilt_heading_degrees());
    println!("  peakedness  P       {:>14.6}", d.peakedness());
    println!("  bifurcation B       {:>14.6}", d.bifurcation());
    println!("  character           {}, {}", d.character(), d.path_character());
    if !report.written.is_empty() {
        println!();
        println!("Files written:");
        for path in &report.written {
            println!("  {}", path.display());
        }
    }
}

fn run_analysis(
    input_path: &Path,
    defaults: &Config,
    print_level: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input_path.exists() {
        return Err(format!("Input file not found: {}", input_path.display()).into());
    }
    let report = workflow::run_input_file(input_path, defaults, print_level)?;
    print_report(&report);
    Ok(())
}

fn run_batch(inputs: &[String], defaults: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if inputs.is_empty() {
        return Err("batch needs at least one input file".into());
    }
    let inputs: Vec<PathBuf> = inputs.iter().map(PathBuf::from).collect();
    let outcomes = batch::run_batch(&inputs, defaults);
    print!("{}", batch::summary_table(&outcomes));

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        return Err(format!("{} of {} inputs failed", failed, outcomes.len()).into());
    }
    Ok(())
}

fn run_extract(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() < 5 {
        return Err(format!(
            "Missing arguments\nUsage: {} extract <qm_output> <state_a> <state_b> [prefix]",
            args[0]
        )
        .into());
    }
    let source = Path::new(&args[2]);
    let state_a: usize = args[3]
        .parse()
        .map_err(|_| format!("Invalid state number: {}", args[3]))?;
    let state_b: usize = args[4]
        .parse()
        .map_err(|_| format!("Invalid state number: {}", args[4]))?;
    let pair = StatePair::new(state_a, state_b)?;

    let prefix = match args.get(5) {
        Some(p) => p.clone(),
        None => template_generator::prefix_for_output(source),
    };

    let extracted = qm_output::extract_from_file(source, pair)?;
    let written = extracted.write_vector_files(Path::new("."), &prefix, pair)?;

    println!(
        "Extracted states {} and {} ({} atoms) from {}",
        state_a,
        state_b,
        extracted.num_atoms(),
        source.display()
    );
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn run_template(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(template_generator::get_default_output_path);

    if output_path.as_os_str() == SETTINGS_FILE_NAME {
        if output_path.exists() {
            return Err(format!(
                "{} already exists. Please remove it first or choose a different location.",
                SETTINGS_FILE_NAME
            )
            .into());
        }
        SettingsManager::create_template(&output_path)?;
        println!("Settings template created: {}", output_path.display());
        return Ok(());
    }

    if output_path.exists() {
        return Err(format!("{} already exists", output_path.display()).into());
    }
    let prefix = template_generator::prefix_for_output(&output_path);
    template_generator::write_template_to_file(
        &template_generator::generate_template(&prefix),
        &output_path,
    )?;
    println!("Template input file created: {}", output_path.display());
    println!("Next steps:");
    println!("  1. Point gradient_a, gradient_b and nac at your vector files");
    println!("  2. Set e_x and the grid as needed");
    println!("  3. Run: {} {}", args[0], output_path.display());
    Ok(())
}
