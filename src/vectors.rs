//! Flat Cartesian vector data for the two crossing electronic states.
//!
//! This module provides the input data type for the branching-plane analysis:
//!
//! - [`VectorTriplet`]: gradients of states A and B plus the coupling vector
//! - [`ModelError`]: error type shared by the analytical model
//!
//! All vectors use the flat layout `[x1, y1, z1, x2, y2, z2, ...]`, so a
//! molecule with N atoms is represented by vectors of length 3N. Gradients are
//! expected in Hartree/Bohr.

use nalgebra::DVector;
use thiserror::Error;

/// Error type for the analytical branching-plane model.
///
/// Every failure of [`solve`](crate::branching_plane::solve) or
/// [`evaluate`](crate::surface::evaluate) is reported through this enum. The
/// model performs no I/O, so none of these errors is transient.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Vector lengths differ or are not a positive multiple of 3
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// A basis vector, the pitch or the whole input has near-zero norm
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),
    /// Grid radius or resolution is non-positive or too coarse
    #[error("Invalid grid parameters: {0}")]
    InvalidGridParameters(String),
    /// Descriptor values outside their admissible range
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),
    /// NaN or infinite input component
    #[error("Non-finite input: {0}")]
    NonFiniteInput(String),
}

/// Gradients of the two crossing states and their coupling vector.
///
/// The triplet is validated on construction: all three vectors must have the
/// same length, that length must be a positive multiple of 3, and every
/// component must be finite. Once built, a `VectorTriplet` is never mutated.
///
/// # Examples
///
/// ```
/// use conezen::vectors::VectorTriplet;
///
/// let triplet = VectorTriplet::new(
///     &[1.0, 0.0, 0.0],
///     &[-1.0, 0.0, 0.0],
///     &[0.0, 1.0, 0.0],
/// ).unwrap();
///
/// assert_eq!(triplet.num_atoms(), 1);
/// assert_eq!(triplet.gradient_difference()[0], 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VectorTriplet {
    grad_a: DVector<f64>,
    grad_b: DVector<f64>,
    coupling: DVector<f64>,
}

impl VectorTriplet {
    /// Builds a triplet from three flat slices.
    ///
    /// # Errors
    ///
    /// - [`ModelError::DimensionMismatch`] if the lengths differ, are zero, or
    ///   are not a multiple of 3
    /// - [`ModelError::NonFiniteInput`] if any component is NaN or infinite
    pub fn new(grad_a: &[f64], grad_b: &[f64], coupling: &[f64]) -> Result<Self, ModelError> {
        Self::from_vectors(
            DVector::from_column_slice(grad_a),
            DVector::from_column_slice(grad_b),
            DVector::from_column_slice(coupling),
        )
    }

    /// Builds a triplet from owned vectors, applying the same checks as [`VectorTriplet::new`].
    pub fn from_vectors(
        grad_a: DVector<f64>,
        grad_b: DVector<f64>,
        coupling: DVector<f64>,
    ) -> Result<Self, ModelError> {
        let (la, lb, lh) = (grad_a.len(), grad_b.len(), coupling.len());
        if la != lb || la != lh {
            return Err(ModelError::DimensionMismatch(format!(
                "gradient A has {} components, gradient B has {}, coupling vector has {}",
                la, lb, lh
            )));
        }
        if la == 0 {
            return Err(ModelError::DimensionMismatch(
                "input vectors are empty".to_string(),
            ));
        }
        if la % 3 != 0 {
            return Err(ModelError::DimensionMismatch(format!(
                "vector length {} is not a multiple of 3",
                la
            )));
        }

        for (name, v) in [("gradient A", &grad_a), ("gradient B", &grad_b), ("coupling vector", &coupling)] {
            if let Some(pos) = v.iter().position(|c| !c.is_finite()) {
                return Err(ModelError::NonFiniteInput(format!(
                    "{} component {} is {}",
                    name, pos, v[pos]
                )));
            }
        }

        Ok(Self {
            grad_a,
            grad_b,
            coupling,
        })
    }

    /// Number of atoms (vector length / 3)
    pub fn num_atoms(&self) -> usize {
        self.grad_a.len() / 3
    }

    /// Length of each flat vector
    pub fn len(&self) -> usize {
        self.grad_a.len()
    }

    /// Always false for a validated triplet; provided for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.grad_a.is_empty()
    }

    /// Gradient of state A
    pub fn grad_a(&self) -> &DVector<f64> {
        &self.grad_a
    }

    /// Gradient of state B
    pub fn grad_b(&self) -> &DVector<f64> {
        &self.grad_b
    }

    /// Nonadiabatic coupling vector h_AB
    pub fn coupling(&self) -> &DVector<f64> {
        &self.coupling
    }

    /// Half the gradient difference: `g = (grad_A - grad_B) / 2`
    pub fn gradient_difference(&self) -> DVector<f64> {
        (&self.grad_a - &self.grad_b) * 0.5
    }

    /// Average gradient of the two states: `s = (grad_A + grad_B) / 2`
    pub fn average_gradient(&self) -> DVector<f64> {
        (&self.grad_a + &self.grad_b) * 0.5
    }

    /// Largest Euclidean norm among the three input vectors.
    ///
    /// Used as the reference scale for near-zero comparisons.
    pub fn largest_norm(&self) -> f64 {
        self.grad_a
            .norm()
            .max(self.grad_b.norm())
            .max(self.coupling.norm())
    }

    /// Returns the triplet with the two states exchanged.
    ///
    /// The coupling vector is kept as given.
    pub fn swapped_states(&self) -> Self {
        Self {
            grad_a: self.grad_b.clone(),
            grad_b: self.grad_a.clone(),
            coupling: self.coupling.clone(),
        }
    }
}

/// Reshapes a flat 3N vector into N rows of `[x, y, z]`.
///
/// Trailing components that do not fill a full row are dropped.
pub fn atom_rows(v: &DVector<f64>) -> Vec<[f64; 3]> {
    v.as_slice()
        .chunks_exact(3)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}
