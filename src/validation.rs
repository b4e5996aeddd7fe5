//! Pre-flight validation of an analysis configuration.
//!
//! Checks run before any file is read so that mistakes in the input file are
//! reported with a concrete suggestion instead of a failure halfway through:
//!
//! - the vector source is complete (three files, or QM output plus states)
//! - referenced files exist
//! - grid, figure and animation settings are in range

use crate::config::{Config, VectorSource};
use std::path::Path;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with user guidance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Neither vector files nor a QM output file are configured
    MissingInput,
    /// A referenced file does not exist
    MissingFile,
    /// A parameter is outside its admissible range
    InvalidConfiguration,
}

impl ValidationError {
    fn new(category: ErrorCategory, message: String, suggestion: &str) -> Self {
        Self {
            category,
            message,
            suggestion: Some(suggestion.to_string()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Validates a configuration before the analysis starts.
///
/// # Examples
///
/// ```
/// use conezen::config::Config;
/// use conezen::validation::{validate_config, ErrorCategory};
///
/// let err = validate_config(&Config::default()).unwrap_err();
/// assert_eq!(err.category, ErrorCategory::MissingInput);
/// ```
pub fn validate_config(config: &Config) -> ValidationResult<()> {
    validate_vector_source(config)?;
    validate_parameters(config)?;
    Ok(())
}

fn require_file(key: &str, path: &Path) -> ValidationResult<()> {
    if path.is_file() {
        return Ok(());
    }
    Err(ValidationError::new(
        ErrorCategory::MissingFile,
        format!("File for '{}' not found: {}", key, path.display()),
        "Relative paths are resolved against the directory of the input file",
    ))
}

fn validate_vector_source(config: &Config) -> ValidationResult<()> {
    match config.vector_source() {
        Some(VectorSource::Files {
            gradient_a,
            gradient_b,
            nac,
        }) => {
            require_file("gradient_a", gradient_a)?;
            require_file("gradient_b", gradient_b)?;
            require_file("nac", nac)?;
        }
        Some(VectorSource::QmOutput {
            path,
            state_a,
            state_b,
        }) => {
            require_file("qm_output", path)?;
            if state_a == 0 || state_b == 0 || state_a == state_b {
                return Err(ValidationError::new(
                    ErrorCategory::InvalidConfiguration,
                    format!(
                        "Invalid state pair ({}, {}) for QM output extraction",
                        state_a, state_b
                    ),
                    "States are 1-based and state_a must differ from state_b",
                ));
            }
        }
        None if config.qm_output.is_some() => {
            return Err(ValidationError::new(
                ErrorCategory::MissingInput,
                "'qm_output' is set but 'state_a' and 'state_b' are not both given".to_string(),
                "Add 'state_a = <n>' and 'state_b = <m>' to the input file",
            ));
        }
        None => {
            return Err(ValidationError::new(
                ErrorCategory::MissingInput,
                "No input vectors configured".to_string(),
                "Give 'gradient_a', 'gradient_b' and 'nac', or 'qm_output' with 'state_a' and 'state_b'",
            ));
        }
    }

    if let Some(xyz) = &config.xyz {
        require_file("xyz", xyz)?;
    }
    Ok(())
}

fn invalid(message: String, suggestion: &str) -> ValidationError {
    ValidationError::new(ErrorCategory::InvalidConfiguration, message, suggestion)
}

fn validate_parameters(config: &Config) -> ValidationResult<()> {
    if !config.e_x.is_finite() {
        return Err(invalid(
            format!("e_x must be a finite energy, got {}", config.e_x),
            "Give the energy of the intersection point in Hartree",
        ));
    }

    config.grid.validate().map_err(|e| {
        invalid(
            e.to_string(),
            "Use r_max > 0, n_radial >= 2 and n_angular >= 3",
        )
    })?;

    let plot = &config.plot;
    if !(plot.fig_width > 0.0 && plot.fig_height > 0.0)
        || !plot.fig_width.is_finite()
        || !plot.fig_height.is_finite()
    {
        return Err(invalid(
            format!(
                "Figure size must be positive, got {} x {} inches",
                plot.fig_width, plot.fig_height
            ),
            "The default figure is 10 x 8 inches",
        ));
    }
    if plot.dpi == 0 || config.animation.dpi == 0 {
        return Err(invalid(
            "dpi and anim_dpi must be positive".to_string(),
            "The defaults are dpi = 300 and anim_dpi = 200",
        ));
    }
    if !plot.elevation.is_finite() || !plot.azimuth.is_finite() {
        return Err(invalid(
            "elevation and azimuth must be finite angles in degrees".to_string(),
            "The defaults are elevation = 28 and azimuth = -133",
        ));
    }

    let anim = &config.animation;
    if anim.fps == 0 {
        return Err(invalid(
            "anim_fps must be positive".to_string(),
            "The default is 20 frames per second",
        ));
    }
    if !(anim.rotation_step > 0.0 && anim.rotation_step <= 360.0) {
        return Err(invalid(
            format!("rotation_step must lie in (0, 360], got {}", anim.rotation_step),
            "The default is 2 degrees per frame",
        ));
    }
    Ok(())
}

/// Prints a short summary of what the analysis will do.
///
/// Nothing is printed at `print_level` 0.
pub fn provide_user_guidance(config: &Config, print_level: u32) {
    if print_level == 0 {
        return;
    }
    println!("\n****Analysis Setup****");
    match config.vector_source() {
        Some(VectorSource::Files { .. }) => println!("Vectors: three vector files"),
        Some(VectorSource::QmOutput {
            path,
            state_a,
            state_b,
        }) => println!(
            "Vectors: states {} and {} extracted from {}",
            state_a,
            state_b,
            path.display()
        ),
        None => println!("Vectors: not configured"),
    }
    println!(
        "Grid: r_max = {}, {} radial x {} angular samples",
        config.grid.r_max, config.grid.n_radial, config.grid.n_angular
    );
    println!("Energy unit: {}", config.energy_unit);
    if config.solver.scale_coupling {
        println!("Coupling vector rescaled to |g| before orthogonalization");
    }
    if print_level >= 2 {
        let out = &config.output;
        println!(
            "Outputs: parameters={} vectors={} image={} animation={}",
            out.save_parameters, out.write_vectors, out.save_image, out.animate
        );
    }
    println!("****End Analysis Setup****\n");
}

/// Reports a file written by the analysis when `print_level` is 2.
pub fn log_file_operation(operation: &str, path: &Path, print_level: u32) {
    if print_level >= 2 {
        println!("File Operation: {} - {}", operation, path.display());
    }
}
