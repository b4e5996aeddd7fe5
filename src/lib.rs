#![warn(missing_docs)]

//! ConeZen - conical intersection topography from gradients and couplings
//!
//! ConeZen characterises the local shape of a conical intersection (CI)
//! between two electronic states. From the energy gradients of both states
//! and their nonadiabatic coupling vector it builds the branching plane and
//! the first-order double-cone model of the two surfaces around the CI.
//!
//! # Model
//!
//! Within the branching plane, at polar coordinates (r, θ):
//!
//! ```text
//! E±(r, θ) = E_X + δ_gh · r · ( σ · cos(θ - θ_s) ± sqrt(1 + Δ_gh · cos 2θ) )
//! ```
//!
//! with pitch δ_gh, asymmetry Δ_gh, tilt σ and tilt heading θ_s. The derived
//! peakedness P and bifurcation parameter B classify the CI as peaked or
//! sloped and as bifurcating or single-path.
//!
//! # Quick Start
//!
//! ```
//! use conezen::branching_plane::solve;
//! use conezen::surface::{evaluate, PolarGrid};
//!
//! let grad_a = [1.0, 0.0, 0.0];
//! let grad_b = [-1.0, 0.0, 0.0];
//! let h_ab = [0.0, 1.0, 0.0];
//!
//! let (plane, d) = solve(&grad_a, &grad_b, &h_ab).unwrap();
//! assert!((d.pitch - 1.0).abs() < 1e-12);
//! assert!(d.asymmetry.abs() < 1e-12);
//! assert!(plane.orthonormality_error() < 1e-12);
//!
//! let surface = evaluate(&d, 0.0, &PolarGrid::default()).unwrap();
//! assert_eq!(surface.shape(), (100, 50));
//! ```
//!
//! # Command line
//!
//! The `conezen` binary runs complete analyses from `key = value` input
//! files (see [`parser`]) and writes the parameter report, the basis vectors,
//! a surface figure and optionally a rotating animation:
//!
//! ```bash
//! conezen template ci1.inp
//! conezen ci1.inp
//! conezen batch ci1.inp ci2.inp
//! conezen extract job.log 1 2 ci1
//! ```
//!
//! # Units
//!
//! Gradients and couplings are read in Hartree/Bohr and descriptors are
//! reported in atomic units. Surfaces can be converted to eV for plotting
//! with [`surface::EnergyUnit`].

/// Parallel analysis of several input files
pub mod batch;
pub mod branching_plane;
/// Run configuration assembled from settings and the input file
pub mod config;
pub mod help;
/// Vector, label and report files
pub mod io;
pub mod naming;
pub mod parser;
/// Extraction of gradients and couplings from QM output files
pub mod qm_output;
pub mod render;
/// Program settings from `conezen_config.cfg`
pub mod settings;
pub mod surface;
pub mod template_generator;
pub mod validation;
pub mod vectors;
pub mod workflow;

pub use branching_plane::{solve, BranchingPlane, TopologicalDescriptors};
pub use config::Config;
pub use surface::{evaluate, PolarGrid, SurfaceGrid};
pub use vectors::{ModelError, VectorTriplet};
