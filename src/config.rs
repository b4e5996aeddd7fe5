//! Configuration structures for a branching-plane analysis.
//!
//! This module defines the explicit options structure that drives one run:
//!
//! - [`Config`]: complete configuration of one analysis
//! - [`VectorSource`]: where the gradient and coupling vectors come from
//! - [`OutputOptions`]: which result files are written
//! - [`PlotOptions`] / [`AnimationOptions`]: figure and animation settings
//!
//! A `Config` is normally produced by [`parser::parse_input`](crate::parser::parse_input)
//! on top of defaults taken from the program settings, but it can also be
//! built programmatically.

use crate::branching_plane::SolverOptions;
use crate::settings::Settings;
use crate::surface::{EnergyUnit, PolarGrid};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the three input vectors are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorSource<'a> {
    /// Three vector files
    Files {
        /// Gradient of state A
        gradient_a: &'a Path,
        /// Gradient of state B
        gradient_b: &'a Path,
        /// Coupling vector
        nac: &'a Path,
    },
    /// One combined QM output file and the 1-based state indices
    QmOutput {
        /// Output file
        path: &'a Path,
        /// State A
        state_a: usize,
        /// State B
        state_b: usize,
    },
}

/// Result files written by an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Write `<base>_ci_parameters.txt` and `.json` (default: true)
    pub save_parameters: bool,
    /// Write `<base>_x_vectors.out` and `<base>_y_vectors.out` (default: true)
    pub write_vectors: bool,
    /// Render `<base>_surface.png` (default: true)
    pub save_image: bool,
    /// Render `<base>_rotation.gif` (default: false)
    pub animate: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            save_parameters: true,
            write_vectors: true,
            save_image: true,
            animate: false,
        }
    }
}

/// Static figure settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    /// Figure width in inches (default: 10)
    pub fig_width: f64,
    /// Figure height in inches (default: 8)
    pub fig_height: f64,
    /// Resolution in dots per inch (default: 300)
    pub dpi: u32,
    /// Camera elevation in degrees (default: 28)
    pub elevation: f64,
    /// Camera azimuth in degrees (default: -133)
    pub azimuth: f64,
    /// Optional figure caption
    pub title: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            fig_width: 10.0,
            fig_height: 8.0,
            dpi: 300,
            elevation: 28.0,
            azimuth: -133.0,
            title: None,
        }
    }
}

impl PlotOptions {
    /// Pixel size `(width, height)` at `dpi`
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        let px = |inches: f64| (inches * dpi as f64).round().max(1.0) as u32;
        (px(self.fig_width), px(self.fig_height))
    }
}

/// Rotating-animation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationOptions {
    /// Resolution of the animation frames (default: 200)
    pub dpi: u32,
    /// Frames per second (default: 20)
    pub fps: u32,
    /// Azimuth increment per frame in degrees (default: 2)
    pub rotation_step: f64,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            dpi: 200,
            fps: 20,
            rotation_step: 2.0,
        }
    }
}

impl AnimationOptions {
    /// Azimuth of every frame over one full turn
    pub fn frame_azimuths(&self) -> Vec<f64> {
        let frames = (360.0 / self.rotation_step).ceil() as usize;
        (0..frames).map(|k| k as f64 * self.rotation_step).collect()
    }

    /// Delay between frames in milliseconds
    pub fn frame_delay_ms(&self) -> u32 {
        (1000.0 / self.fps.max(1) as f64).round() as u32
    }
}

/// Complete configuration of one branching-plane analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Vector file with the gradient of state A
    pub gradient_a: Option<PathBuf>,
    /// Vector file with the gradient of state B
    pub gradient_b: Option<PathBuf>,
    /// Vector file with the coupling vector
    pub nac: Option<PathBuf>,
    /// XYZ file providing atom labels for the exported basis vectors
    pub xyz: Option<PathBuf>,
    /// Combined QM output file (replaces the three vector files)
    pub qm_output: Option<PathBuf>,
    /// 1-based index of state A in `qm_output`
    pub state_a: Option<usize>,
    /// 1-based index of state B in `qm_output`
    pub state_b: Option<usize>,
    /// Energy of the intersection point in Hartree (default: 0)
    pub e_x: f64,
    /// Polar sampling of the surfaces
    pub grid: PolarGrid,
    /// Unit of reported and plotted energies
    pub energy_unit: EnergyUnit,
    /// Branching-plane solver options
    pub solver: SolverOptions,
    /// Result files to write
    pub output: OutputOptions,
    /// Static figure settings
    pub plot: PlotOptions,
    /// Animation settings
    pub animation: AnimationOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gradient_a: None,
            gradient_b: None,
            nac: None,
            xyz: None,
            qm_output: None,
            state_a: None,
            state_b: None,
            e_x: 0.0,
            grid: PolarGrid::default(),
            energy_unit: EnergyUnit::Hartree,
            solver: SolverOptions::default(),
            output: OutputOptions::default(),
            plot: PlotOptions::default(),
            animation: AnimationOptions::default(),
        }
    }
}

impl Config {
    /// Defaults with figure, animation and unit settings taken from `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = Config::default();
        config.energy_unit = settings.general.energy_unit;
        config.plot.dpi = settings.plot.dpi;
        config.plot.fig_width = settings.plot.fig_width;
        config.plot.fig_height = settings.plot.fig_height;
        config.plot.elevation = settings.plot.elevation;
        config.plot.azimuth = settings.plot.azimuth;
        config.animation.dpi = settings.animation.dpi;
        config.animation.fps = settings.animation.fps;
        config.animation.rotation_step = settings.animation.rotation_step;
        config
    }

    /// Resolves the vector source, preferring `qm_output` when set.
    ///
    /// Returns `None` when neither a complete file triple nor a QM output
    /// file with both state indices is configured.
    pub fn vector_source(&self) -> Option<VectorSource<'_>> {
        if let Some(path) = &self.qm_output {
            return Some(VectorSource::QmOutput {
                path,
                state_a: self.state_a?,
                state_b: self.state_b?,
            });
        }
        match (&self.gradient_a, &self.gradient_b, &self.nac) {
            (Some(a), Some(b), Some(h)) => Some(VectorSource::Files {
                gradient_a: a,
                gradient_b: b,
                nac: h,
            }),
            _ => None,
        }
    }

    /// Resolves every relative path against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for path in [
            &mut self.gradient_a,
            &mut self.gradient_b,
            &mut self.nac,
            &mut self.xyz,
            &mut self.qm_output,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }
}
