//! Commented input file templates for new analyses.

use crate::config::Config;
use std::fs;
use std::path::{Path, PathBuf};

/// Default template file name
pub const DEFAULT_TEMPLATE_NAME: &str = "conezen.inp";

/// Generates an input template whose vector files follow `prefix`.
///
/// The file names match those written by `conezen extract <qm_output> <a> <b> <prefix>`.
pub fn generate_template(prefix: &str) -> String {
    let d = Config::default();
    format!(
        r#"# ConeZen input file
# key = value, keys are case-insensitive. '#' at the start of a line or after
# a space starts a comment; quote values that contain " #".
# Relative paths are resolved against the directory of this file.

# ---- Input vectors (Hartree/Bohr, one header line + one row per atom) ----
gradient_a = {prefix}_gradientA.out
gradient_b = {prefix}_gradientB.out
nac        = {prefix}_NAC.out
# xyz = geometry.xyz          # atom labels for the exported basis vectors

# Instead of three vector files, extract them from one QM output file:
# qm_output = calculation.log
# state_a = 1
# state_b = 2

# ---- Model ----
e_x = {e_x}                   # energy of the intersection point in Hartree
scale_coupling = {scale}      # rescale the coupling vector to |g| first
energy_unit = hartree         # hartree or ev

# ---- Polar grid ----
r_max = {r_max}
n_radial = {n_radial}
n_angular = {n_angular}

# ---- Outputs ----
save_parameters = {save_parameters}
write_vectors = {write_vectors}
save_image = {save_image}
animate = {animate}

# ---- Figure (uncomment to override conezen_config.cfg) ----
# fig_width = {fig_width}
# fig_height = {fig_height}
# dpi = {dpi}
# elevation = {elevation}
# azimuth = {azimuth}
# title = My intersection

# ---- Animation ----
# anim_dpi = {anim_dpi}
# anim_fps = {anim_fps}
# rotation_step = {rotation_step}
"#,
        prefix = prefix,
        e_x = d.e_x,
        scale = d.solver.scale_coupling,
        r_max = d.grid.r_max,
        n_radial = d.grid.n_radial,
        n_angular = d.grid.n_angular,
        save_parameters = d.output.save_parameters,
        write_vectors = d.output.write_vectors,
        save_image = d.output.save_image,
        animate = d.output.animate,
        fig_width = d.plot.fig_width,
        fig_height = d.plot.fig_height,
        dpi = d.plot.dpi,
        elevation = d.plot.elevation,
        azimuth = d.plot.azimuth,
        anim_dpi = d.animation.dpi,
        anim_fps = d.animation.fps,
        rotation_step = d.animation.rotation_step,
    )
}

/// Write template to file
pub fn write_template_to_file<P: AsRef<Path>>(
    template: &str,
    output_path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(output_path, template)?;
    Ok(())
}

/// Vector-file prefix used in the template written to `output_path`
pub fn prefix_for_output<P: AsRef<Path>>(output_path: P) -> String {
    output_path
        .as_ref()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("conezen")
        .to_string()
}

/// Output path when none is given on the command line
pub fn get_default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn test_template_parses_cleanly() {
        let input = parse_str(&generate_template("ci1"), &Config::default()).unwrap();
        assert!(input.unknown_keys.is_empty());
        assert_eq!(input.config.gradient_a, Some(PathBuf::from("ci1_gradientA.out")));
        assert_eq!(input.config.nac, Some(PathBuf::from("ci1_NAC.out")));
        assert_eq!(input.config.grid, Config::default().grid);
        assert_eq!(input.config.output, Config::default().output);
    }

    #[test]
    fn test_prefix_for_output() {
        assert_eq!(prefix_for_output("jobs/s1s0.inp"), "s1s0");
        assert_eq!(get_default_output_path(), PathBuf::from("conezen.inp"));
    }
}
