//! Analytic two-surface energy model sampled on a polar grid.
//!
//! The first-order double-cone model around the intersection point reads, in
//! polar coordinates (r, θ) of the branching plane,
//!
//! ```text
//! E_±(r, θ) = E_X + δ_gh · r · ( σ cos(θ - θ_s) ± sqrt(1 + Δ_gh cos 2θ) )
//! ```
//!
//! [`evaluate`] samples both sheets on a fresh [`SurfaceGrid`]. Rows of every
//! matrix correspond to angular samples, columns to radial samples.

use crate::branching_plane::TopologicalDescriptors;
use crate::vectors::ModelError;
use log::{debug, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Hartree to electron-volt conversion factor
pub const HARTREE_TO_EV: f64 = 27.2114;

/// Tolerance used to clamp descriptors sitting on their bounds.
const BOUND_TOLERANCE: f64 = 1e-12;

/// Energy unit of the surface values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EnergyUnit {
    /// Atomic units (input gradients in Hartree/Bohr)
    #[default]
    Hartree,
    /// Electron volts
    ElectronVolt,
}

impl EnergyUnit {
    /// Short label used in axis titles and reports
    pub fn label(&self) -> &'static str {
        match self {
            EnergyUnit::Hartree => "Eh",
            EnergyUnit::ElectronVolt => "eV",
        }
    }

    /// Multiplicative factor converting Hartree into this unit
    pub fn factor(&self) -> f64 {
        match self {
            EnergyUnit::Hartree => 1.0,
            EnergyUnit::ElectronVolt => HARTREE_TO_EV,
        }
    }
}

impl fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for EnergyUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hartree" | "eh" | "au" | "a.u." => Ok(EnergyUnit::Hartree),
            "ev" | "electronvolt" | "electron_volt" => Ok(EnergyUnit::ElectronVolt),
            other => Err(format!(
                "unknown energy unit '{}' (expected 'hartree' or 'ev')",
                other
            )),
        }
    }
}

/// Polar sampling of the branching plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarGrid {
    /// Outer radius in branching-plane units
    pub r_max: f64,
    /// Number of radial samples including r = 0 and r = r_max
    pub n_radial: usize,
    /// Number of angular samples over [0, 2π)
    pub n_angular: usize,
}

impl Default for PolarGrid {
    fn default() -> Self {
        Self {
            r_max: 1.0,
            n_radial: 50,
            n_angular: 100,
        }
    }
}

impl PolarGrid {
    /// Checks r_max > 0 (finite), n_radial ≥ 2 and n_angular ≥ 3.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.r_max.is_finite() || self.r_max <= 0.0 {
            return Err(ModelError::InvalidGridParameters(format!(
                "r_max must be positive and finite, got {}",
                self.r_max
            )));
        }
        if self.n_radial < 2 {
            return Err(ModelError::InvalidGridParameters(format!(
                "n_radial must be at least 2, got {}",
                self.n_radial
            )));
        }
        if self.n_angular < 3 {
            return Err(ModelError::InvalidGridParameters(format!(
                "n_angular must be at least 3, got {}",
                self.n_angular
            )));
        }
        Ok(())
    }

    /// Radial samples `r_i = r_max · i / (n_radial - 1)`
    pub fn radii(&self) -> Vec<f64> {
        let last = (self.n_radial - 1) as f64;
        (0..self.n_radial)
            .map(|i| self.r_max * i as f64 / last)
            .collect()
    }

    /// Angular samples `θ_j = 2π · j / n_angular`
    pub fn angles(&self) -> Vec<f64> {
        (0..self.n_angular)
            .map(|j| 2.0 * PI * j as f64 / self.n_angular as f64)
            .collect()
    }
}

/// Both energy sheets sampled on a polar mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceGrid {
    /// Radial sample values (columns)
    pub radii: Vec<f64>,
    /// Angular sample values in radians (rows)
    pub angles: Vec<f64>,
    /// Cartesian x = r cos θ
    pub x: DMatrix<f64>,
    /// Cartesian y = r sin θ
    pub y: DMatrix<f64>,
    /// Upper sheet energies
    pub upper: DMatrix<f64>,
    /// Lower sheet energies
    pub lower: DMatrix<f64>,
    /// Unit of `upper` and `lower`
    pub unit: EnergyUnit,
    /// True when a slightly negative radicand was clamped to zero
    pub clamped_radicand: bool,
}

impl SurfaceGrid {
    /// `(n_angular, n_radial)`
    pub fn shape(&self) -> (usize, usize) {
        self.upper.shape()
    }

    /// Minimum of the lower sheet and maximum of the upper sheet
    pub fn energy_range(&self) -> (f64, f64) {
        (self.lower.min(), self.upper.max())
    }

    /// Energy gap `E_upper - E_lower` at every sample
    pub fn gap(&self) -> DMatrix<f64> {
        &self.upper - &self.lower
    }

    /// Re-expresses the energies in `unit`. The reference energy is scaled too.
    pub fn to_unit(&self, unit: EnergyUnit) -> SurfaceGrid {
        let ratio = unit.factor() / self.unit.factor();
        SurfaceGrid {
            upper: &self.upper * ratio,
            lower: &self.lower * ratio,
            unit,
            ..self.clone()
        }
    }
}

/// Checks descriptor ranges and returns a copy clamped onto the bounds.
pub fn validate_descriptors(
    d: &TopologicalDescriptors,
) -> Result<TopologicalDescriptors, ModelError> {
    if !d.pitch.is_finite() || d.pitch < -BOUND_TOLERANCE {
        return Err(ModelError::InvalidDescriptor(format!(
            "pitch must be finite and non-negative, got {}",
            d.pitch
        )));
    }
    if !d.tilt.is_finite() || d.tilt < -BOUND_TOLERANCE {
        return Err(ModelError::InvalidDescriptor(format!(
            "tilt must be finite and non-negative, got {}",
            d.tilt
        )));
    }
    if !d.tilt_heading.is_finite() {
        return Err(ModelError::InvalidDescriptor(format!(
            "tilt heading must be finite, got {}",
            d.tilt_heading
        )));
    }
    if !d.asymmetry.is_finite()
        || d.asymmetry < -BOUND_TOLERANCE
        || d.asymmetry > 1.0 + BOUND_TOLERANCE
    {
        return Err(ModelError::InvalidDescriptor(format!(
            "asymmetry must lie in [0, 1], got {}",
            d.asymmetry
        )));
    }

    Ok(TopologicalDescriptors {
        pitch: d.pitch.max(0.0),
        asymmetry: d.asymmetry.clamp(0.0, 1.0),
        tilt: d.tilt.max(0.0),
        tilt_heading: d.tilt_heading,
    })
}

/// Samples both energy sheets over `grid` around reference energy `e_x`.
///
/// Energies are in the unit of the inputs (Hartree for gradients in
/// Hartree/Bohr); use [`SurfaceGrid::to_unit`] to convert.
///
/// # Errors
///
/// - [`ModelError::InvalidGridParameters`] for an invalid [`PolarGrid`]
/// - [`ModelError::InvalidDescriptor`] for out-of-range descriptors
/// - [`ModelError::NonFiniteInput`] for a non-finite `e_x`
///
/// # Examples
///
/// ```
/// use conezen::branching_plane::TopologicalDescriptors;
/// use conezen::surface::{evaluate, PolarGrid};
///
/// let d = TopologicalDescriptors { pitch: 1.0, asymmetry: 0.0, tilt: 0.0, tilt_heading: 0.0 };
/// let grid = PolarGrid { r_max: 1.0, n_radial: 2, n_angular: 4 };
/// let surface = evaluate(&d, 0.0, &grid).unwrap();
/// assert!((surface.upper[(0, 1)] - 1.0).abs() < 1e-12);
/// assert!((surface.lower[(0, 1)] + 1.0).abs() < 1e-12);
/// ```
pub fn evaluate(
    descriptors: &TopologicalDescriptors,
    e_x: f64,
    grid: &PolarGrid,
) -> Result<SurfaceGrid, ModelError> {
    grid.validate()?;
    if !e_x.is_finite() {
        return Err(ModelError::NonFiniteInput(format!(
            "reference energy is {}",
            e_x
        )));
    }
    let d = validate_descriptors(descriptors)?;

    let radii = grid.radii();
    let angles = grid.angles();
    let (rows, cols) = (angles.len(), radii.len());

    let mut clamped = false;
    // Per-angle terms are shared across the whole radial column
    let mut tilt_term = Vec::with_capacity(rows);
    let mut cone_term = Vec::with_capacity(rows);
    for &theta in &angles {
        let radicand = 1.0 + d.asymmetry * (2.0 * theta).cos();
        if radicand < 0.0 {
            clamped = true;
        }
        tilt_term.push(d.tilt * (theta - d.tilt_heading).cos());
        cone_term.push(radicand.max(0.0).sqrt());
    }
    if clamped {
        warn!("Negative radicand in surface model clamped to zero (asymmetry = {:.12})", d.asymmetry);
    }

    let x = DMatrix::from_fn(rows, cols, |j, i| radii[i] * angles[j].cos());
    let y = DMatrix::from_fn(rows, cols, |j, i| radii[i] * angles[j].sin());
    let upper = DMatrix::from_fn(rows, cols, |j, i| {
        e_x + d.pitch * radii[i] * (tilt_term[j] + cone_term[j])
    });
    let lower = DMatrix::from_fn(rows, cols, |j, i| {
        e_x + d.pitch * radii[i] * (tilt_term[j] - cone_term[j])
    });

    debug!(
        "Evaluated surfaces on {}x{} polar grid (r_max = {})",
        rows, cols, grid.r_max
    );

    Ok(SurfaceGrid {
        radii,
        angles,
        x,
        y,
        upper,
        lower,
        unit: EnergyUnit::Hartree,
        clamped_radicand: clamped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(pitch: f64, asymmetry: f64, tilt: f64, tilt_heading: f64) -> TopologicalDescriptors {
        TopologicalDescriptors {
            pitch,
            asymmetry,
            tilt,
            tilt_heading,
        }
    }

    #[test]
    fn test_circular_untilted_cone_gap() {
        let d = descriptors(0.7, 0.0, 0.0, 0.0);
        let surface = evaluate(&d, -1.5, &PolarGrid::default()).unwrap();
        let gap = surface.gap();
        for j in 0..surface.angles.len() {
            for (i, r) in surface.radii.iter().enumerate() {
                assert!((gap[(j, i)] - 2.0 * 0.7 * r).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_apex_is_degenerate_for_every_angle() {
        let d = descriptors(0.3, 0.8, 1.4, 2.0);
        let surface = evaluate(&d, 0.25, &PolarGrid::default()).unwrap();
        for j in 0..surface.angles.len() {
            assert_eq!(surface.upper[(j, 0)], 0.25);
            assert_eq!(surface.lower[(j, 0)], 0.25);
        }
    }

    #[test]
    fn test_reference_cone_values() {
        let d = descriptors(1.0, 0.0, 0.0, 0.0);
        let grid = PolarGrid {
            r_max: 1.0,
            n_radial: 11,
            n_angular: 8,
        };
        let surface = evaluate(&d, 0.0, &grid).unwrap();
        assert_eq!(surface.shape(), (8, 11));
        assert!((surface.upper[(0, 10)] - 1.0).abs() < 1e-12);
        assert!((surface.lower[(0, 10)] + 1.0).abs() < 1e-12);
        assert!((surface.x[(0, 10)] - 1.0).abs() < 1e-12);
        assert!(surface.y[(0, 10)].abs() < 1e-12);
        assert!(!surface.clamped_radicand);
    }

    #[test]
    fn test_grid_samples() {
        let grid = PolarGrid {
            r_max: 2.0,
            n_radial: 5,
            n_angular: 4,
        };
        assert_eq!(grid.radii(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        let angles = grid.angles();
        assert_eq!(angles.len(), 4);
        assert!((angles[1] - PI / 2.0).abs() < 1e-15);
        assert!(angles[3] < 2.0 * PI);
    }

    #[test]
    fn test_invalid_grid_parameters() {
        let d = descriptors(1.0, 0.0, 0.0, 0.0);
        for grid in [
            PolarGrid { r_max: 0.0, ..PolarGrid::default() },
            PolarGrid { r_max: f64::INFINITY, ..PolarGrid::default() },
            PolarGrid { n_radial: 1, ..PolarGrid::default() },
            PolarGrid { n_angular: 2, ..PolarGrid::default() },
        ] {
            assert!(matches!(
                evaluate(&d, 0.0, &grid),
                Err(ModelError::InvalidGridParameters(_))
            ));
        }
    }

    #[test]
    fn test_invalid_descriptors() {
        let grid = PolarGrid::default();
        for d in [
            descriptors(1.0, 1.5, 0.0, 0.0),
            descriptors(1.0, -0.1, 0.0, 0.0),
            descriptors(-1.0, 0.5, 0.0, 0.0),
            descriptors(f64::NAN, 0.5, 0.0, 0.0),
            descriptors(1.0, 0.5, -0.2, 0.0),
            descriptors(1.0, 0.5, 0.2, f64::INFINITY),
        ] {
            assert!(matches!(
                evaluate(&d, 0.0, &grid),
                Err(ModelError::InvalidDescriptor(_))
            ));
        }
    }

    #[test]
    fn test_asymmetry_on_bound_is_clamped() {
        let d = descriptors(1.0, 1.0 + 1e-13, 0.0, 0.0);
        let surface = evaluate(&d, 0.0, &PolarGrid::default()).unwrap();
        assert!(surface.upper.iter().all(|e| e.is_finite()));
        assert!(surface.lower.iter().all(|e| *e <= 1e-12));
    }

    #[test]
    fn test_unit_conversion() {
        let d = descriptors(1.0, 0.0, 0.0, 0.0);
        let grid = PolarGrid {
            r_max: 1.0,
            n_radial: 2,
            n_angular: 3,
        };
        let surface = evaluate(&d, 0.0, &grid).unwrap();
        let ev = surface.to_unit(EnergyUnit::ElectronVolt);
        assert_eq!(ev.unit, EnergyUnit::ElectronVolt);
        assert!((ev.upper[(0, 1)] - HARTREE_TO_EV).abs() < 1e-9);
        let (lo, hi) = ev.energy_range();
        assert!((hi - HARTREE_TO_EV).abs() < 1e-9);
        assert!((lo + HARTREE_TO_EV).abs() < 1e-9);
        assert_eq!(ev.x, surface.x);
    }

    #[test]
    fn test_energy_unit_parsing() {
        assert_eq!("eV".parse::<EnergyUnit>().unwrap(), EnergyUnit::ElectronVolt);
        assert_eq!("Hartree".parse::<EnergyUnit>().unwrap(), EnergyUnit::Hartree);
        assert!("kcal".parse::<EnergyUnit>().is_err());
        assert_eq!(EnergyUnit::ElectronVolt.to_string(), "eV");
    }

    #[test]
    fn test_non_finite_reference_energy() {
        let d = descriptors(1.0, 0.0, 0.0, 0.0);
        assert!(matches!(
            evaluate(&d, f64::NAN, &PolarGrid::default()),
            Err(ModelError::NonFiniteInput(_))
        ));
    }
}
