//! Extraction of gradient and coupling blocks from a combined QM output file.
//!
//! Only a narrow, fixed-header convention is understood. A block starts at a
//! header line and continues with one row per atom:
//!
//! ```text
//! Cartesian gradient of state 2 (Hartree/Bohr)
//!   1  C   0.0123456   -0.0045678    0.0000000
//!   2  H  -0.0011111    0.0022222    0.0033333
//!
//! Nonadiabatic coupling between states 2 and 3
//!   1  C   0.1000000    0.0000000    0.0000000
//!   2  H   0.0000000    0.2000000    0.0000000
//! ```
//!
//! - Gradient headers contain `gradient` followed by `state <n>` or `root <n>`
//! - Coupling headers contain `coupling` or `NAC` followed by
//!   `states <i> and <j>` or `roots <i> and <j>`
//! - A row is a line whose last three tokens are floats, optionally preceded
//!   by an atom label and/or an index
//!
//! When a header appears more than once (e.g. several optimization cycles),
//! the last block wins. A coupling block recorded for (j, i) is negated to
//! give h_ij.

use crate::io::{parse_float, write_vector_file, FileError};
use crate::vectors::{ModelError, VectorTriplet};
use lazy_static::lazy_static;
use log::{debug, info};
use nalgebra::DVector;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for QM output extraction.
#[derive(Error, Debug)]
pub enum QmOutputError {
    /// File system or I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A requested gradient or coupling block is absent
    #[error("Missing block: {0}")]
    MissingBlock(String),
    /// A header or row could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),
    /// Blocks disagree in atom count or labels
    #[error("Inconsistent blocks: {0}")]
    Inconsistent(String),
}

impl From<FileError> for QmOutputError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::Io(io) => QmOutputError::Io(io),
            other => QmOutputError::Parse(other.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, QmOutputError>;

lazy_static! {
    static ref GRADIENT_HEADER_RE: Regex =
        Regex::new(r"(?i)gradient.*?\b(?:state|root)\s*#?\s*(\d+)").unwrap();
    static ref COUPLING_HEADER_RE: Regex = Regex::new(
        r"(?i)(?:coupling|\bnac\b|nacme).*?\b(?:states|roots)\s*(\d+)\s*(?:and|&|/|,|-)\s*(\d+)"
    )
    .unwrap();
}

/// 1-based indices of the two states of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatePair {
    /// State A
    pub a: usize,
    /// State B
    pub b: usize,
}

impl StatePair {
    /// Validates that both indices are ≥ 1 and distinct.
    pub fn new(a: usize, b: usize) -> Result<Self> {
        if a == 0 || b == 0 {
            return Err(QmOutputError::Parse(
                "state indices are 1-based and must be positive".to_string(),
            ));
        }
        if a == b {
            return Err(QmOutputError::Parse(format!(
                "states A and B must differ (both are {})",
                a
            )));
        }
        Ok(Self { a, b })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Gradient(usize),
    Coupling(usize, usize),
}

#[derive(Debug, Clone)]
struct Block {
    kind: BlockKind,
    header_line: usize,
    labels: Vec<Option<String>>,
    rows: Vec<[f64; 3]>,
}

fn header_kind(line: &str) -> Option<BlockKind> {
    // Coupling first: "NAC gradient between states 1 and 2" is a coupling header
    if let Some(caps) = COUPLING_HEADER_RE.captures(line) {
        let i = caps[1].parse().ok()?;
        let j = caps[2].parse().ok()?;
        return Some(BlockKind::Coupling(i, j));
    }
    if let Some(caps) = GRADIENT_HEADER_RE.captures(line) {
        return Some(BlockKind::Gradient(caps[1].parse().ok()?));
    }
    None
}

/// Parses `[label] [index] x y z`; returns the optional label and the row.
fn parse_row(line: &str) -> Option<(Option<String>, [f64; 3])> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 || tokens.len() > 5 {
        return None;
    }
    let n = tokens.len();
    let x = parse_float(tokens[n - 3])?;
    let y = parse_float(tokens[n - 2])?;
    let z = parse_float(tokens[n - 1])?;

    let mut label = None;
    for t in &tokens[..n - 3] {
        if t.parse::<usize>().is_ok() {
            continue;
        }
        if label.is_some() || parse_float(t).is_some() {
            return None;
        }
        label = Some(t.to_string());
    }
    Some((label, [x, y, z]))
}

fn scan_blocks(content: &str) -> Vec<Block> {
    let lines: Vec<&str> = content.lines().collect();
    let mut blocks = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let Some(kind) = header_kind(lines[idx]) else {
            idx += 1;
            continue;
        };
        let header_line = idx + 1;
        let mut labels = Vec::new();
        let mut rows = Vec::new();
        idx += 1;
        while idx < lines.len() {
            let line = lines[idx];
            if let Some((label, row)) = parse_row(line) {
                labels.push(label);
                rows.push(row);
                idx += 1;
            } else if !rows.is_empty() || header_kind(line).is_some() {
                break;
            } else {
                // separators and column titles between header and rows
                idx += 1;
            }
        }
        debug!(
            "Found {:?} block at line {} with {} rows",
            kind,
            header_line,
            rows.len()
        );
        blocks.push(Block {
            kind,
            header_line,
            labels,
            rows,
        });
    }
    blocks
}

fn last_gradient_block(blocks: &[Block], state: usize) -> Result<&Block> {
    let block = blocks
        .iter()
        .rev()
        .find(|b| b.kind == BlockKind::Gradient(state))
        .ok_or_else(|| QmOutputError::MissingBlock(format!("no gradient block for state {}", state)))?;
    if block.rows.is_empty() {
        return Err(QmOutputError::MissingBlock(format!(
            "gradient block for state {} (line {}) has no rows",
            state, block.header_line
        )));
    }
    Ok(block)
}

/// Gradients and coupling vector for one state pair, one row per atom.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedVectors {
    /// Atom labels when every row of the state-A gradient block carried one
    pub labels: Option<Vec<String>>,
    /// Gradient of state A
    pub grad_a: Vec<[f64; 3]>,
    /// Gradient of state B
    pub grad_b: Vec<[f64; 3]>,
    /// Coupling vector h_AB, sign-corrected for the requested order
    pub coupling: Vec<[f64; 3]>,
}

fn flatten(rows: &[[f64; 3]]) -> Vec<f64> {
    rows.iter().flat_map(|r| r.iter().copied()).collect()
}

impl ExtractedVectors {
    /// Number of atoms
    pub fn num_atoms(&self) -> usize {
        self.grad_a.len()
    }

    /// Builds a validated [`VectorTriplet`].
    pub fn to_triplet(&self) -> std::result::Result<VectorTriplet, ModelError> {
        VectorTriplet::from_vectors(
            DVector::from_vec(flatten(&self.grad_a)),
            DVector::from_vec(flatten(&self.grad_b)),
            DVector::from_vec(flatten(&self.coupling)),
        )
    }

    /// Writes `<prefix>_gradientA.out`, `<prefix>_gradientB.out` and
    /// `<prefix>_NAC.out` into `dir` and returns their paths.
    pub fn write_vector_files(&self, dir: &Path, prefix: &str, pair: StatePair) -> Result<[PathBuf; 3]> {
        let paths = [
            dir.join(format!("{}_gradientA.out", prefix)),
            dir.join(format!("{}_gradientB.out", prefix)),
            dir.join(format!("{}_NAC.out", prefix)),
        ];
        write_vector_file(&paths[0], &format!("gradient of state {}", pair.a), &self.grad_a)?;
        write_vector_file(&paths[1], &format!("gradient of state {}", pair.b), &self.grad_b)?;
        write_vector_file(
            &paths[2],
            &format!("coupling between states {} and {}", pair.a, pair.b),
            &self.coupling,
        )?;
        for p in &paths {
            info!("Wrote {}", p.display());
        }
        Ok(paths)
    }
}

/// Extracts the vectors for `pair` from QM output text.
///
/// # Errors
///
/// - [`QmOutputError::MissingBlock`] when a gradient or coupling block is absent
///   or has no rows
/// - [`QmOutputError::Inconsistent`] when block sizes differ
///
/// # Examples
///
/// ```
/// use conezen::qm_output::{extract_state_pair, StatePair};
///
/// let text = "gradient of state 1\n0.1 0.0 0.0\n\
///             gradient of state 2\n-0.1 0.0 0.0\n\
///             coupling between states 2 and 1\n0.0 0.5 0.0\n";
/// let v = extract_state_pair(text, StatePair::new(1, 2).unwrap()).unwrap();
/// assert_eq!(v.coupling, vec![[0.0, -0.5, 0.0]]);
/// ```
pub fn extract_state_pair(content: &str, pair: StatePair) -> Result<ExtractedVectors> {
    let blocks = scan_blocks(content);

    let block_a = last_gradient_block(&blocks, pair.a)?;
    let block_b = last_gradient_block(&blocks, pair.b)?;

    let coupling_block = blocks
        .iter()
        .rev()
        .find(|b| {
            b.kind == BlockKind::Coupling(pair.a, pair.b)
                || b.kind == BlockKind::Coupling(pair.b, pair.a)
        })
        .ok_or_else(|| {
            QmOutputError::MissingBlock(format!(
                "no coupling block for states {} and {}",
                pair.a, pair.b
            ))
        })?;
    if coupling_block.rows.is_empty() {
        return Err(QmOutputError::MissingBlock(format!(
            "coupling block (line {}) has no rows",
            coupling_block.header_line
        )));
    }

    let n = block_a.rows.len();
    for (name, block) in [("gradient B", block_b), ("coupling", coupling_block)] {
        if block.rows.len() != n {
            return Err(QmOutputError::Inconsistent(format!(
                "gradient A has {} atoms but {} (line {}) has {}",
                n,
                name,
                block.header_line,
                block.rows.len()
            )));
        }
    }

    let reversed = coupling_block.kind == BlockKind::Coupling(pair.b, pair.a);
    let coupling = if reversed {
        debug!("Coupling block recorded as ({}, {}); negating", pair.b, pair.a);
        coupling_block
            .rows
            .iter()
            .map(|r| [-r[0], -r[1], -r[2]])
            .collect()
    } else {
        coupling_block.rows.clone()
    };

    let labels: Option<Vec<String>> = block_a.labels.iter().cloned().collect();

    Ok(ExtractedVectors {
        labels,
        grad_a: block_a.rows.clone(),
        grad_b: block_b.rows.clone(),
        coupling,
    })
}

/// Reads `path` and calls [`extract_state_pair`].
pub fn extract_from_file(path: &Path, pair: StatePair) -> Result<ExtractedVectors> {
    let content = fs::read_to_string(path)?;
    let vectors = extract_state_pair(&content, pair)?;
    info!(
        "Extracted gradients of states {} and {} and their coupling ({} atoms) from {}",
        pair.a,
        pair.b,
        vectors.num_atoms(),
        path.display()
    );
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
 Run summary
 Cartesian gradient of state 1 (Hartree/Bohr)
 ----------------------------------------------
   1  C   0.0100000   -0.0200000    0.0000000
   2  H  -0.0010000    0.0020000    0.0030000

 Cartesian gradient of state 2 (Hartree/Bohr)
 ----------------------------------------------
   1  C  -0.0300000    0.0100000    0.0000000
   2  H   0.0040000   -0.0050000    0.0060000

 Nonadiabatic coupling between states 1 and 2
   1  C   0.1000000    0.0000000    0.0000000
   2  H   0.0000000    0.2000000    0.0000000
";

    #[test]
    fn test_extracts_blocks_with_labels() {
        let v = extract_state_pair(SAMPLE, StatePair::new(1, 2).unwrap()).unwrap();
        assert_eq!(v.num_atoms(), 2);
        assert_eq!(v.labels, Some(vec!["C".to_string(), "H".to_string()]));
        assert_eq!(v.grad_a[0], [0.01, -0.02, 0.0]);
        assert_eq!(v.grad_b[1], [0.004, -0.005, 0.006]);
        assert_eq!(v.coupling[1], [0.0, 0.2, 0.0]);
        assert_eq!(v.to_triplet().unwrap().len(), 6);
    }

    #[test]
    fn test_reversed_coupling_is_negated() {
        let v = extract_state_pair(SAMPLE, StatePair::new(2, 1).unwrap()).unwrap();
        assert_eq!(v.coupling[0], [-0.1, -0.0, -0.0]);
        assert_eq!(v.grad_a[0], [-0.03, 0.01, 0.0]);
    }

    #[test]
    fn test_last_block_wins() {
        let text = format!("{}\n gradient of state 1\n 9.0 9.0 9.0\n 8.0 8.0 8.0\n", SAMPLE);
        let v = extract_state_pair(&text, StatePair::new(1, 2).unwrap()).unwrap();
        assert_eq!(v.grad_a[0], [9.0, 9.0, 9.0]);
        assert_eq!(v.labels, None);
    }

    #[test]
    fn test_missing_state() {
        let result = extract_state_pair(SAMPLE, StatePair::new(1, 3).unwrap());
        assert!(matches!(result, Err(QmOutputError::MissingBlock(_))));
    }

    #[test]
    fn test_atom_count_mismatch() {
        let text = "gradient of state 1\n1.0 0.0 0.0\n2.0 0.0 0.0\n\
                    gradient of state 2\n1.0 0.0 0.0\n\
                    NAC states 1 and 2\n0.0 1.0 0.0\n0.0 1.0 0.0\n";
        let result = extract_state_pair(text, StatePair::new(1, 2).unwrap());
        assert!(matches!(result, Err(QmOutputError::Inconsistent(_))));
    }

    #[test]
    fn test_header_recognition() {
        assert_eq!(header_kind("GRADIENT FOR ROOT 3"), Some(BlockKind::Gradient(3)));
        assert_eq!(
            header_kind("NAC gradient between roots 1 & 2"),
            Some(BlockKind::Coupling(1, 2))
        );
        assert_eq!(header_kind("Total energy of state 1"), None);
    }

    #[test]
    fn test_row_parsing() {
        assert_eq!(parse_row("0.1 0.2 0.3"), Some((None, [0.1, 0.2, 0.3])));
        assert_eq!(
            parse_row("  3 O 1.0D-01 0.0 0.0"),
            Some((Some("O".to_string()), [0.1, 0.0, 0.0]))
        );
        assert_eq!(parse_row("C H 0.1 0.2 0.3"), None);
        assert_eq!(parse_row("0.1 0.2"), None);
    }

    #[test]
    fn test_state_pair_validation() {
        assert!(StatePair::new(0, 1).is_err());
        assert!(StatePair::new(2, 2).is_err());
        assert!(StatePair::new(1, 2).is_ok());
    }
}
