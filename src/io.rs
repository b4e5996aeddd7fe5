//! File I/O for gradient/coupling vector files, XYZ labels and reports.
//!
//! Vector files are plain text: one header line followed by one row per atom
//! with three Cartesian components. Trailing columns are ignored, so files
//! with atom labels or comments after the numbers load unchanged.
//!
//! ```text
//! gradient of state 2
//!  0.0123  -0.0045   0.0000
//!  ...
//! ```

use crate::branching_plane::{BranchingPlane, TopologicalDescriptors};
use crate::vectors::atom_rows;
use log::{debug, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for file operations in this module.
#[derive(Error, Debug)]
pub enum FileError {
    /// Underlying I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Content does not follow the expected layout
    #[error("File format error: {0}")]
    FileFormat(String),
    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, FileError>;

/// Contents of a loaded vector file.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFile {
    /// Flat `[x1, y1, z1, x2, ...]` values
    pub values: Vec<f64>,
    /// Number of data rows read
    pub rows: usize,
    /// Number of non-header lines that were not data rows
    pub skipped: usize,
}

impl VectorFile {
    /// Values as an nalgebra vector
    pub fn to_dvector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.values)
    }
}

/// Parses a float, accepting Fortran `D`/`d` exponents (`1.0D-03`).
pub fn parse_float(token: &str) -> Option<f64> {
    if let Ok(v) = token.parse::<f64>() {
        return Some(v);
    }
    if token.contains(['D', 'd']) {
        return token.replace(['D', 'd'], "E").parse::<f64>().ok();
    }
    None
}

/// Parses vector-file text; see [`load_vector_file`].
pub fn parse_vector_text(content: &str) -> Result<VectorFile> {
    let mut values = Vec::new();
    let mut rows = 0;
    let mut skipped = 0;

    for (line_no, line) in content.lines().enumerate().skip(1) {
        let tokens: Vec<&str> = line.split_whitespace().take(3).collect();
        let parsed: Option<Vec<f64>> = if tokens.len() == 3 {
            tokens.iter().map(|t| parse_float(t)).collect()
        } else {
            None
        };
        match parsed {
            Some(row) => {
                values.extend(row);
                rows += 1;
            }
            None => {
                if !line.trim().is_empty() {
                    debug!("Skipping non-numeric line {}: '{}'", line_no + 1, line.trim());
                }
                skipped += 1;
            }
        }
    }

    if rows == 0 {
        return Err(FileError::FileFormat(
            "no rows with three numeric components found".to_string(),
        ));
    }

    Ok(VectorFile {
        values,
        rows,
        skipped,
    })
}

/// Loads a vector file: one header line, then rows of three floats.
///
/// A line counts as a data row when its first three whitespace-separated
/// tokens all parse as floats. Other lines are counted in
/// [`VectorFile::skipped`] and reported with `warn!`.
///
/// # Errors
///
/// Returns [`FileError::FileFormat`] when no data row is found and
/// [`FileError::Io`] when the file cannot be read.
pub fn load_vector_file(path: &Path) -> Result<VectorFile> {
    let content = fs::read_to_string(path)?;
    let file = parse_vector_text(&content)
        .map_err(|e| match e {
            FileError::FileFormat(msg) => FileError::FileFormat(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
    if file.skipped > 0 {
        warn!(
            "{}: skipped {} malformed line(s) while reading {} rows",
            path.display(),
            file.skipped,
            file.rows
        );
    }
    debug!("Loaded {} rows from {}", file.rows, path.display());
    Ok(file)
}

/// Reads atom symbols from an XYZ file.
///
/// The count and comment lines are skipped; every remaining line with at
/// least four tokens contributes its first token.
pub fn read_atom_labels(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    let labels: Vec<String> = content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 4 {
                Some(parts[0].to_string())
            } else {
                None
            }
        })
        .collect();
    if labels.is_empty() {
        return Err(FileError::FileFormat(format!(
            "{}: no atom lines found",
            path.display()
        )));
    }
    Ok(labels)
}

/// Formats rows as `header` followed by `label x y z` lines with 10 decimals.
pub fn format_labeled_vectors(header: &str, labels: &[String], rows: &[[f64; 3]]) -> Result<String> {
    if labels.len() != rows.len() {
        return Err(FileError::FileFormat(format!(
            "{} atom labels for {} vector rows",
            labels.len(),
            rows.len()
        )));
    }
    let mut content = format!("{}\n", header);
    for (label, r) in labels.iter().zip(rows) {
        content.push_str(&format!(
            "{:<3} {:>16.10} {:>16.10} {:>16.10}\n",
            label, r[0], r[1], r[2]
        ));
    }
    Ok(content)
}

/// Writes the labelled rows of a basis vector (`atoms x vectors` style).
pub fn write_labeled_vectors(
    path: &Path,
    header: &str,
    labels: &[String],
    v: &DVector<f64>,
) -> Result<()> {
    let content = format_labeled_vectors(header, labels, &atom_rows(v))?;
    fs::write(path, content)?;
    Ok(())
}

/// Writes both basis vectors to `x_path` and `y_path`.
pub fn write_basis_vectors(
    plane: &BranchingPlane,
    labels: &[String],
    x_path: &Path,
    y_path: &Path,
) -> Result<()> {
    write_labeled_vectors(x_path, "atoms x vectors", labels, &plane.x_hat)?;
    write_labeled_vectors(y_path, "atoms y vectors", labels, &plane.y_hat)?;
    Ok(())
}

/// Writes unlabelled rows in the format read by [`load_vector_file`].
pub fn write_vector_file(path: &Path, header: &str, rows: &[[f64; 3]]) -> Result<()> {
    let mut content = format!("{}\n", header);
    for r in rows {
        content.push_str(&format!("{:>18.10} {:>18.10} {:>18.10}\n", r[0], r[1], r[2]));
    }
    fs::write(path, content)?;
    Ok(())
}

/// Key quantities of one analysis, written as text or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterReport {
    /// Label of the analysed system (input basename)
    pub system: String,
    /// Descriptors in atomic units, heading in radians
    pub descriptors: TopologicalDescriptors,
    /// Tilt heading in degrees
    pub tilt_heading_degrees: f64,
    /// State-mixing angle β in radians
    pub mixing_angle: f64,
    /// Peakedness P, `None` when infinite
    pub peakedness: Option<f64>,
    /// Bifurcation parameter B, `None` when infinite
    pub bifurcation: Option<f64>,
    /// `peaked` or `sloped`
    pub character: String,
    /// `bifurcating` or `single path`
    pub path_character: String,
    /// Number of atoms
    pub num_atoms: usize,
}

impl ParameterReport {
    /// Collects the report from a solved branching plane.
    pub fn new(system: &str, plane: &BranchingPlane, d: &TopologicalDescriptors) -> Self {
        let finite = |v: f64| if v.is_finite() { Some(v) } else { None };
        Self {
            system: system.to_string(),
            descriptors: *d,
            tilt_heading_degrees: d.tilt_heading_degrees(),
            mixing_angle: plane.mixing_angle,
            peakedness: finite(d.peakedness()),
            bifurcation: finite(d.bifurcation()),
            character: d.character().to_string(),
            path_character: d.path_character().to_string(),
            num_atoms: plane.num_atoms(),
        }
    }

    /// Human-readable report text.
    pub fn to_text(&self) -> String {
        let fmt_opt = |v: Option<f64>| match v {
            Some(x) => format!("{:.6}", x),
            None => "inf".to_string(),
        };
        let d = &self.descriptors;
        let mut out = String::new();
        out.push_str("Branching Plane Key Quantities\n");
        out.push_str(&"=".repeat(40));
        out.push('\n');
        out.push_str(&format!("system: {}\n", self.system));
        out.push_str(&format!("atoms: {}\n", self.num_atoms));
        out.push_str(&format!("theta_s (deg): {:.6}\n", self.tilt_heading_degrees));
        out.push_str(&format!("pitch del_gh: {:.6}\n", d.pitch));
        out.push_str(&format!("asymmetry Delta_gh: {:.6}\n", d.asymmetry));
        out.push_str(&format!("tilt sigma: {:.6}\n", d.tilt));
        out.push_str(&format!("mixing angle beta (rad): {:.6}\n", self.mixing_angle));
        out.push_str(&format!(
            "peakedness P: {} ({})\n",
            fmt_opt(self.peakedness),
            self.character
        ));
        out.push_str(&format!(
            "bifurcation B: {} ({})\n",
            fmt_opt(self.bifurcation),
            self.path_character
        ));
        out
    }

    /// Writes [`to_text`](Self::to_text) to `path`.
    pub fn save_text(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Writes the report as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a report written by [`save_json`](Self::save_json).
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
