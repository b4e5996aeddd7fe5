//! End-to-end analysis of one conical intersection.
//!
//! The workflow ties the collaborators together:
//!
//! 1. Parse and validate the input file ([`parser`](crate::parser), [`validation`](crate::validation))
//! 2. Load the three vectors from files or a QM output file
//! 3. Solve the branching plane and evaluate the surfaces
//! 4. Write the parameter report, basis vectors, figure and animation
//!
//! Each step is a plain function so library users can stop after any of them.

use crate::branching_plane::{solve_triplet, BranchingPlane, TopologicalDescriptors};
use crate::config::{Config, VectorSource};
use crate::io::{self, FileError, ParameterReport};
use crate::naming::FileNaming;
use crate::parser::{self, ParseError};
use crate::qm_output::{self, QmOutputError, StatePair};
use crate::render::{self, RenderError};
use crate::surface::{evaluate, SurfaceGrid};
use crate::validation::{self, ValidationError};
use crate::vectors::{ModelError, VectorTriplet};
use log::{info, warn};
use nalgebra::DVector;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Any failure of a complete analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Analytical model failure
    #[error(transparent)]
    Model(#[from] ModelError),
    /// Vector, label or report file failure
    #[error(transparent)]
    File(#[from] FileError),
    /// QM output extraction failure
    #[error(transparent)]
    QmOutput(#[from] QmOutputError),
    /// Input file failure
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Invalid configuration
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Figure or animation failure
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Input vectors plus the atom labels found alongside them.
#[derive(Debug, Clone)]
pub struct LoadedVectors {
    /// Validated gradients and coupling vector
    pub triplet: VectorTriplet,
    /// Labels from the XYZ file or QM output, if any
    pub labels: Option<Vec<String>>,
}

/// Solved model for one set of vectors.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Branching-plane basis
    pub plane: BranchingPlane,
    /// Topological descriptors (atomic units)
    pub descriptors: TopologicalDescriptors,
    /// Sampled surfaces in the configured energy unit
    pub surface: SurfaceGrid,
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Input basename
    pub system: String,
    /// Solved model
    pub analysis: Analysis,
    /// Files written, in order
    pub written: Vec<PathBuf>,
}

/// Loads the three vectors named by `config`.
pub fn load_vectors(config: &Config) -> Result<LoadedVectors, AnalysisError> {
    let source = config.vector_source().ok_or_else(|| {
        ValidationError {
            category: validation::ErrorCategory::MissingInput,
            message: "No input vectors configured".to_string(),
            suggestion: None,
        }
    })?;

    let (triplet, mut labels) = match source {
        VectorSource::Files {
            gradient_a,
            gradient_b,
            nac,
        } => {
            let a = io::load_vector_file(gradient_a)?;
            let b = io::load_vector_file(gradient_b)?;
            let h = io::load_vector_file(nac)?;
            let triplet = VectorTriplet::from_vectors(a.to_dvector(), b.to_dvector(), h.to_dvector())?;
            (triplet, None)
        }
        VectorSource::QmOutput {
            path,
            state_a,
            state_b,
        } => {
            let pair = StatePair::new(state_a, state_b)?;
            let extracted = qm_output::extract_from_file(path, pair)?;
            (extracted.to_triplet()?, extracted.labels)
        }
    };

    if let Some(xyz) = &config.xyz {
        labels = Some(io::read_atom_labels(xyz)?);
    }
    if let Some(l) = &labels {
        if l.len() != triplet.num_atoms() {
            return Err(FileError::FileFormat(format!(
                "{} atom labels for {} atoms in the input vectors",
                l.len(),
                triplet.num_atoms()
            ))
            .into());
        }
    }

    info!("Loaded vectors for {} atoms", triplet.num_atoms());
    Ok(LoadedVectors { triplet, labels })
}

/// Solves the branching plane and samples the surfaces.
pub fn analyze(triplet: &VectorTriplet, config: &Config) -> Result<Analysis, AnalysisError> {
    let (plane, descriptors) = solve_triplet(triplet, &config.solver)?;
    info!(
        "pitch = {:.6}, asymmetry = {:.6}, tilt = {:.6}, theta_s = {:.3} deg",
        descriptors.pitch,
        descriptors.asymmetry,
        descriptors.tilt,
        descriptors.tilt_heading_degrees()
    );

    let surface = evaluate(&descriptors, config.e_x, &config.grid)?.to_unit(config.energy_unit);
    if surface.clamped_radicand {
        warn!("Surface radicand was clamped; asymmetry sits on its upper bound");
    }
    Ok(Analysis {
        plane,
        descriptors,
        surface,
    })
}

fn default_labels(n: usize) -> Vec<String> {
    vec!["X".to_string(); n]
}

/// Writes every output enabled in `config` and returns the paths written.
pub fn write_outputs(
    analysis: &Analysis,
    labels: Option<&[String]>,
    config: &Config,
    naming: &FileNaming,
    print_level: u32,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let mut written = Vec::new();
    let mut record = |op: &str, path: PathBuf| {
        validation::log_file_operation(op, &path, print_level);
        written.push(path);
    };

    if config.output.save_parameters {
        let report = ParameterReport::new(naming.basename(), &analysis.plane, &analysis.descriptors);
        report.save_text(&naming.parameters_txt())?;
        report.save_json(&naming.parameters_json())?;
        record("parameters", naming.parameters_txt());
        record("parameters", naming.parameters_json());
    }

    if config.output.write_vectors {
        let fallback;
        let labels = match labels {
            Some(l) => l,
            None => {
                warn!("No atom labels available; writing 'X' for every atom");
                fallback = default_labels(analysis.plane.num_atoms());
                &fallback
            }
        };
        io::write_basis_vectors(&analysis.plane, labels, &naming.x_vectors(), &naming.y_vectors())?;
        record("basis vectors", naming.x_vectors());
        record("basis vectors", naming.y_vectors());
    }

    if config.output.save_image {
        render::render_surface_png(&analysis.surface, &config.plot, &naming.surface_png())?;
        record("surface plot", naming.surface_png());
    }

    if config.output.animate {
        render::render_rotation_gif(
            &analysis.surface,
            &config.plot,
            &config.animation,
            &naming.rotation_gif(),
        )?;
        record("animation", naming.rotation_gif());
    }

    Ok(written)
}

/// Runs a validated configuration and writes its outputs.
pub fn run_config(
    config: &Config,
    naming: &FileNaming,
    print_level: u32,
) -> Result<AnalysisReport, AnalysisError> {
    validation::validate_config(config)?;
    let loaded = load_vectors(config)?;
    let analysis = analyze(&loaded.triplet, config)?;
    let written = write_outputs(&analysis, loaded.labels.as_deref(), config, naming, print_level)?;
    Ok(AnalysisReport {
        system: naming.basename().to_string(),
        analysis,
        written,
    })
}

/// Parses `input_path` on top of `defaults` and runs the analysis.
pub fn run_input_file(
    input_path: &Path,
    defaults: &Config,
    print_level: u32,
) -> Result<AnalysisReport, AnalysisError> {
    info!("Analysing {}", input_path.display());
    let input = parser::parse_input(input_path, defaults)?;
    validation::provide_user_guidance(&input.config, print_level);
    let naming = FileNaming::new(input_path);
    run_config(&input.config, &naming, print_level)
}

/// Convenience for library users holding raw slices.
pub fn analyze_slices(
    grad_a: &[f64],
    grad_b: &[f64],
    h_ab: &[f64],
    config: &Config,
) -> Result<Analysis, AnalysisError> {
    let triplet = VectorTriplet::from_vectors(
        DVector::from_column_slice(grad_a),
        DVector::from_column_slice(grad_b),
        DVector::from_column_slice(h_ab),
    )?;
    analyze(&triplet, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::EnergyUnit;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_analyze_converts_units() {
        let config = Config {
            energy_unit: EnergyUnit::ElectronVolt,
            ..Config::default()
        };
        let analysis =
            analyze_slices(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &config).unwrap();
        assert_eq!(analysis.surface.unit, EnergyUnit::ElectronVolt);
        let (_, hi) = analysis.surface.energy_range();
        assert!((hi - crate::surface::HARTREE_TO_EV).abs() < 1e-9);
        assert!((analysis.descriptors.pitch - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_vectors_propagate_model_error() {
        let result = analyze_slices(&[0.1, 0.0, 0.0], &[0.1, 0.0, 0.0], &[0.0; 3], &Config::default());
        assert!(matches!(
            result,
            Err(AnalysisError::Model(ModelError::DegenerateInput(_)))
        ));
    }

    #[test]
    fn test_label_count_mismatch() {
        let dir = TempDir::new().unwrap();
        let write = |name: &str, body: &str| {
            let p = dir.path().join(name);
            fs::write(&p, body).unwrap();
            p
        };
        let config = Config {
            gradient_a: Some(write("a.out", "g\n1.0 0.0 0.0\n")),
            gradient_b: Some(write("b.out", "g\n-1.0 0.0 0.0\n")),
            nac: Some(write("h.out", "h\n0.0 1.0 0.0\n")),
            xyz: Some(write("m.xyz", "2\n\nC 0 0 0\nH 1 0 0\n")),
            ..Config::default()
        };
        let result = load_vectors(&config);
        assert!(matches!(
            result,
            Err(AnalysisError::File(FileError::FileFormat(_)))
        ));
    }
}
