//! Input file parsing for branching-plane analyses.
//!
//! An input file is a list of `key = value` lines. Keys are case-insensitive
//! and blank lines are ignored. `#` starts a comment at the beginning of a
//! line or after whitespace; elsewhere, or inside double quotes, it is part of
//! the value (`title = "CI #1"`, `nac = run#2.out`):
//!
//! ```text
//! # vectors from three separate files
//! gradient_a = gradientA.out
//! gradient_b = gradientB.out
//! nac        = NAC.out
//! xyz        = geometry.xyz
//!
//! e_x         = -154.123456
//! energy_unit = ev
//! animate     = true
//! ```
//!
//! Alternatively the vectors can be extracted from one QM output file:
//!
//! ```text
//! qm_output = casscf.log
//! state_a   = 1
//! state_b   = 2
//! ```
//!
//! Relative paths are resolved against the directory of the input file.
//! Unknown keys are reported and ignored; a value that cannot be interpreted
//! is an error.

use crate::config::Config;
use crate::surface::EnergyUnit;
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Error type for parsing operations.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error when reading files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Parse error with descriptive message
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Type alias for parse operation results
type Result<T> = std::result::Result<T, ParseError>;

/// Parsed input file.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Configuration with input keys applied on top of the defaults
    pub config: Config,
    /// Keys that were not recognised, in order of appearance
    pub unknown_keys: Vec<String>,
}

/// Parses an input file on top of `defaults`.
///
/// Relative paths in the file are resolved against its directory.
///
/// # Examples
///
/// ```no_run
/// use conezen::config::Config;
/// use conezen::parser::parse_input;
/// use std::path::Path;
///
/// let input = parse_input(Path::new("ci.inp"), &Config::default())?;
/// println!("reference energy: {}", input.config.e_x);
/// # Ok::<(), conezen::parser::ParseError>(())
/// ```
pub fn parse_input(path: &Path, defaults: &Config) -> Result<InputData> {
    let content = fs::read_to_string(path)?;
    let mut input = parse_str(&content, defaults)
        .map_err(|e| ParseError::Parse(format!("{}: {}", path.display(), strip_prefix(&e))))?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    input.config.resolve_paths(base_dir);

    for key in &input.unknown_keys {
        warn!("{}: ignoring unknown key '{}'", path.display(), key);
    }
    Ok(input)
}

fn strip_prefix(e: &ParseError) -> String {
    match e {
        ParseError::Parse(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Parses input text on top of `defaults` without resolving paths.
pub fn parse_str(content: &str, defaults: &Config) -> Result<InputData> {
    let mut config = defaults.clone();
    let mut unknown_keys = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let trimmed = strip_comment(raw).trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(ParseError::Parse(format!(
                "line {}: expected 'key = value', found '{}'",
                idx + 1,
                trimmed
            )));
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        let known = parse_parameter(&key, value, &mut config)
            .map_err(|msg| ParseError::Parse(format!("line {}: {}", idx + 1, msg)))?;
        if !known {
            unknown_keys.push(key);
        }
    }

    Ok(InputData {
        config,
        unknown_keys,
    })
}

/// Cuts `line` at the first `#` that opens a comment.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut prev = None;
    for (pos, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes && prev.map_or(true, char::is_whitespace) => return &line[..pos],
            _ => {}
        }
        prev = Some(c);
    }
    line
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid value '{}' for '{}'", value, key))
}

fn parse_bool(key: &str, value: &str) -> std::result::Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!(
            "invalid value '{}' for '{}' (expected true or false)",
            value, key
        )),
    }
}

fn parse_path(key: &str, value: &str) -> std::result::Result<PathBuf, String> {
    let value = unquote(value);
    if value.is_empty() {
        return Err(format!("'{}' needs a file name", key));
    }
    Ok(PathBuf::from(value))
}

/// Applies one key; returns `Ok(false)` for an unknown key.
fn parse_parameter(key: &str, value: &str, config: &mut Config) -> std::result::Result<bool, String> {
    match key {
        "gradient_a" => config.gradient_a = Some(parse_path(key, value)?),
        "gradient_b" => config.gradient_b = Some(parse_path(key, value)?),
        "nac" => config.nac = Some(parse_path(key, value)?),
        "xyz" => config.xyz = Some(parse_path(key, value)?),
        "qm_output" => config.qm_output = Some(parse_path(key, value)?),
        "state_a" => config.state_a = Some(parse_value(key, value)?),
        "state_b" => config.state_b = Some(parse_value(key, value)?),
        "e_x" => config.e_x = parse_value(key, value)?,
        "r_max" => config.grid.r_max = parse_value(key, value)?,
        "n_radial" => config.grid.n_radial = parse_value(key, value)?,
        "n_angular" => config.grid.n_angular = parse_value(key, value)?,
        "energy_unit" => config.energy_unit = EnergyUnit::from_str(value)?,
        "scale_coupling" => config.solver.scale_coupling = parse_bool(key, value)?,
        "save_parameters" => config.output.save_parameters = parse_bool(key, value)?,
        "write_vectors" => config.output.write_vectors = parse_bool(key, value)?,
        "save_image" => config.output.save_image = parse_bool(key, value)?,
        "animate" => config.output.animate = parse_bool(key, value)?,
        "fig_width" => config.plot.fig_width = parse_value(key, value)?,
        "fig_height" => config.plot.fig_height = parse_value(key, value)?,
        "dpi" => config.plot.dpi = parse_value(key, value)?,
        "elevation" => config.plot.elevation = parse_value(key, value)?,
        "azimuth" => config.plot.azimuth = parse_value(key, value)?,
        "title" => {
            let title = unquote(value);
            config.plot.title = if title.is_empty() {
                None
            } else {
                Some(title.to_string())
            }
        }
        "anim_dpi" => config.animation.dpi = parse_value(key, value)?,
        "anim_fps" => config.animation.fps = parse_value(key, value)?,
        "rotation_step" => config.animation.rotation_step = parse_value(key, value)?,
        _ => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorSource;

    #[test]
    fn test_keys_are_case_insensitive_and_comments_ignored() {
        let text = "# header\nGradient_A = a.out  # inline\ngradient_b=b.out\nNAC = h.out\n\nE_X = -1.25\n";
        let input = parse_str(text, &Config::default()).unwrap();
        assert_eq!(input.config.gradient_a, Some(PathBuf::from("a.out")));
        assert_eq!(input.config.e_x, -1.25);
        assert!(matches!(
            input.config.vector_source(),
            Some(VectorSource::Files { .. })
        ));
        assert!(input.unknown_keys.is_empty());
    }

    #[test]
    fn test_hash_inside_values_is_kept() {
        let text = "title = \"CI #1\"   # quoted\n\
                    gradient_a = run#1.out\n\
                    nac = \"dir with space/h #2.out\"\n\
                    e_x = 1.5 # note\n";
        let input = parse_str(text, &Config::default()).unwrap();
        assert_eq!(input.config.plot.title.as_deref(), Some("CI #1"));
        assert_eq!(input.config.gradient_a, Some(PathBuf::from("run#1.out")));
        assert_eq!(input.config.nac, Some(PathBuf::from("dir with space/h #2.out")));
        assert_eq!(input.config.e_x, 1.5);
        assert!(input.unknown_keys.is_empty());
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("# whole line"), "");
        assert_eq!(strip_comment("title = CI #1"), "title = CI ");
        assert_eq!(strip_comment("title = CI#1"), "title = CI#1");
        assert_eq!(strip_comment("title = \"a # b\" # c"), "title = \"a # b\" ");
    }

    #[test]
    fn test_unknown_keys_collected() {
        let input = parse_str("colour = blue\nn_radial = 20\n", &Config::default()).unwrap();
        assert_eq!(input.unknown_keys, vec!["colour".to_string()]);
        assert_eq!(input.config.grid.n_radial, 20);
    }

    #[test]
    fn test_malformed_value_reports_line() {
        let err = parse_str("e_x = 0.0\nn_angular = many\n", &Config::default()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_line_without_equals_is_error() {
        assert!(parse_str("gradient_a a.out\n", &Config::default()).is_err());
    }

    #[test]
    fn test_defaults_are_overridden_only_when_given() {
        let mut defaults = Config::default();
        defaults.plot.dpi = 72;
        defaults.animation.fps = 10;
        let input = parse_str("anim_fps = 25\nenergy_unit = eV\nanimate = yes\n", &defaults).unwrap();
        assert_eq!(input.config.plot.dpi, 72);
        assert_eq!(input.config.animation.fps, 25);
        assert_eq!(input.config.energy_unit, EnergyUnit::ElectronVolt);
        assert!(input.config.output.animate);
    }

    #[test]
    fn test_qm_output_keys() {
        let input = parse_str("qm_output = run.log\nstate_a = 2\nstate_b = 3\n", &Config::default()).unwrap();
        assert_eq!(
            input.config.vector_source(),
            Some(VectorSource::QmOutput {
                path: Path::new("run.log"),
                state_a: 2,
                state_b: 3
            })
        );
    }
}
