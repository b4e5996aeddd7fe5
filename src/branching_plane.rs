//! Branching-plane solver for a two-state conical intersection.
//!
//! Given the gradients of the two crossing states and their nonadiabatic
//! coupling vector, this module derives an orthonormal basis (x̂, ŷ) of the
//! branching plane and four topological descriptors of the first-order
//! double-cone model (Fdez. Galván et al., JCTC 2016, 12, 3636):
//!
//! ```text
//! g  = (∇E_A - ∇E_B) / 2          gradient difference
//! s  = (∇E_A + ∇E_B) / 2          average gradient
//! β  = ¼ · atan2(2 g·h, |g|² - |h|²)
//! g' =  cos2β · g + sin2β · h      rotating the states by β rotates (g, h) by 2β
//! h' = -sin2β · g + cos2β · h      g'·h' = 0
//!
//! δ_gh = (|g'| + |h'|) / 2         pitch
//! Δ_gh = (|g'| - |h'|) / (|g'| + |h'|)   asymmetry
//! σ    = |(s·x̂, s·ŷ)| / δ_gh       tilt
//! θ_s  = atan2(s·ŷ, s·x̂)          tilt heading
//! ```
//!
//! x̂ is always the larger rotated vector, so Δ_gh ∈ [0, 1]. The in-plane
//! basis is given the same handedness as the projections of (s, h); the vector
//! flipped to achieve this is always the one derived from h'. Exchanging the
//! two states therefore negates both basis vectors and shifts θ_s by π.
//!
//! # Examples
//!
//! ```
//! use conezen::branching_plane::solve;
//!
//! let (plane, d) = solve(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
//! assert_eq!(plane.x_hat.as_slice(), &[1.0, 0.0, 0.0]);
//! assert!((d.pitch - 1.0).abs() < 1e-12);
//! assert!(d.asymmetry.abs() < 1e-12);
//! assert!(d.tilt.abs() < 1e-12);
//! ```

use crate::vectors::{atom_rows, ModelError, VectorTriplet};
use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative tolerance for near-zero comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Options for [`solve_with`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Rescale the coupling vector to |g| before orthogonalization
    pub scale_coupling: bool,
    /// Near-zero threshold relative to the largest input norm
    pub tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            scale_coupling: false,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Orthonormal basis of the branching plane.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchingPlane {
    /// Unit vector along the larger rotated vector
    pub x_hat: DVector<f64>,
    /// Unit vector orthogonal to `x_hat` within the plane
    pub y_hat: DVector<f64>,
    /// State-mixing angle β in radians
    pub mixing_angle: f64,
}

impl BranchingPlane {
    /// Number of atoms spanned by the basis vectors
    pub fn num_atoms(&self) -> usize {
        self.x_hat.len() / 3
    }

    /// x̂ reshaped as one `[x, y, z]` row per atom
    pub fn x_rows(&self) -> Vec<[f64; 3]> {
        atom_rows(&self.x_hat)
    }

    /// ŷ reshaped as one `[x, y, z]` row per atom
    pub fn y_rows(&self) -> Vec<[f64; 3]> {
        atom_rows(&self.y_hat)
    }

    /// In-plane components `(v·x̂, v·ŷ)` of a full-dimensional vector
    pub fn project(&self, v: &DVector<f64>) -> (f64, f64) {
        (v.dot(&self.x_hat), v.dot(&self.y_hat))
    }

    /// Largest deviation from orthonormality among |x̂|-1, |ŷ|-1 and x̂·ŷ
    pub fn orthonormality_error(&self) -> f64 {
        (self.x_hat.norm() - 1.0)
            .abs()
            .max((self.y_hat.norm() - 1.0).abs())
            .max(self.x_hat.dot(&self.y_hat).abs())
    }
}

/// Scalar descriptors of the local double-cone topology.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologicalDescriptors {
    /// δ_gh, average slope magnitude
    pub pitch: f64,
    /// Δ_gh in [0, 1], ellipticity of the cone cross-section
    pub asymmetry: f64,
    /// σ, magnitude of the average-surface gradient relative to pitch
    pub tilt: f64,
    /// θ_s in radians, heading of steepest average ascent in the plane
    pub tilt_heading: f64,
}

/// Peaked or sloped character of the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CiCharacter {
    /// Both surfaces slope away from the apex (P < 1)
    Peaked,
    /// The lower surface keeps descending through the apex (P ≥ 1)
    Sloped,
}

/// Number of relaxation paths on the lower surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathCharacter {
    /// Two downhill paths (B < 1)
    Bifurcating,
    /// One downhill path (B ≥ 1)
    SinglePath,
}

impl fmt::Display for CiCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CiCharacter::Peaked => write!(f, "peaked"),
            CiCharacter::Sloped => write!(f, "sloped"),
        }
    }
}

impl fmt::Display for PathCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCharacter::Bifurcating => write!(f, "bifurcating"),
            PathCharacter::SinglePath => write!(f, "single path"),
        }
    }
}

impl TopologicalDescriptors {
    /// Tilt heading θ_s in degrees
    pub fn tilt_heading_degrees(&self) -> f64 {
        self.tilt_heading.to_degrees()
    }

    /// Peakedness parameter `P = σ²/(1-Δ²) · (1 - Δ cos 2θ_s)`.
    ///
    /// Infinite for a maximally elliptical cone (Δ = 1).
    pub fn peakedness(&self) -> f64 {
        let denom = 1.0 - self.asymmetry * self.asymmetry;
        if denom <= f64::EPSILON {
            return f64::INFINITY;
        }
        self.tilt * self.tilt / denom * (1.0 - self.asymmetry * (2.0 * self.tilt_heading).cos())
    }

    /// Bifurcation parameter
    /// `B = (σ²/4Δ²)^⅓ · [((1+Δ)cos²θ_s)^⅓ + ((1-Δ)sin²θ_s)^⅓]`.
    ///
    /// Infinite for a circular cone (Δ = 0).
    pub fn bifurcation(&self) -> f64 {
        if self.asymmetry <= f64::EPSILON {
            return f64::INFINITY;
        }
        let (sin, cos) = self.tilt_heading.sin_cos();
        let prefactor = (self.tilt * self.tilt / (4.0 * self.asymmetry * self.asymmetry)).cbrt();
        prefactor
            * (((1.0 + self.asymmetry) * cos * cos).cbrt()
                + ((1.0 - self.asymmetry) * sin * sin).cbrt())
    }

    /// Peaked/sloped classification from [`peakedness`](Self::peakedness)
    pub fn character(&self) -> CiCharacter {
        if self.peakedness() < 1.0 {
            CiCharacter::Peaked
        } else {
            CiCharacter::Sloped
        }
    }

    /// Bifurcating/single-path classification from [`bifurcation`](Self::bifurcation)
    pub fn path_character(&self) -> PathCharacter {
        if self.bifurcation() < 1.0 {
            PathCharacter::Bifurcating
        } else {
            PathCharacter::SinglePath
        }
    }
}

/// Solves the branching plane with default [`SolverOptions`].
///
/// # Arguments
///
/// * `grad_a` - Flat gradient of state A (length 3N)
/// * `grad_b` - Flat gradient of state B (length 3N)
/// * `h_ab` - Flat nonadiabatic coupling vector (length 3N)
///
/// # Errors
///
/// - [`ModelError::DimensionMismatch`] for unequal or invalid lengths
/// - [`ModelError::DegenerateInput`] when the basis cannot be normalized
/// - [`ModelError::NonFiniteInput`] for NaN or infinite components
///
/// # Exchange of states
///
/// Swapping `grad_a` and `grad_b` normally negates both basis vectors and
/// shifts θ_s by π. The handedness rule that guarantees this needs a
/// non-degenerate in-plane pair (s, h): when either projection vanishes or
/// the two are parallel, the basis keeps the orientation of the rotated
/// vectors and the shift is not π in general. For example
/// `a = [2, 1, 0]`, `b = [0, 1, 0]`, `h = [1, 1, 0]` has s ∥ h. Pitch,
/// asymmetry and tilt are unaffected.
pub fn solve(
    grad_a: &[f64],
    grad_b: &[f64],
    h_ab: &[f64],
) -> Result<(BranchingPlane, TopologicalDescriptors), ModelError> {
    solve_with(grad_a, grad_b, h_ab, &SolverOptions::default())
}

/// Solves the branching plane with explicit options.
pub fn solve_with(
    grad_a: &[f64],
    grad_b: &[f64],
    h_ab: &[f64],
    options: &SolverOptions,
) -> Result<(BranchingPlane, TopologicalDescriptors), ModelError> {
    let triplet = VectorTriplet::new(grad_a, grad_b, h_ab)?;
    solve_triplet(&triplet, options)
}

/// Solves the branching plane for an already validated [`VectorTriplet`].
///
/// Same orientation caveat as [`solve`] when s and h project onto parallel
/// (or vanishing) in-plane vectors.
pub fn solve_triplet(
    triplet: &VectorTriplet,
    options: &SolverOptions,
) -> Result<(BranchingPlane, TopologicalDescriptors), ModelError> {
    let scale = triplet.largest_norm();
    if scale == 0.0 {
        return Err(ModelError::DegenerateInput(
            "all input vectors are zero".to_string(),
        ));
    }
    let tol = options.tolerance * scale;

    let g = triplet.gradient_difference();
    let s = triplet.average_gradient();
    let mut h = triplet.coupling().clone();

    if options.scale_coupling {
        let h_norm = h.norm();
        if h_norm <= tol {
            return Err(ModelError::DegenerateInput(
                "coupling vector has near-zero norm and cannot be rescaled".to_string(),
            ));
        }
        h *= g.norm() / h_norm;
    }

    let beta = mixing_angle(&g, &h, tol * tol);
    let (sin2b, cos2b) = (2.0 * beta).sin_cos();
    let g_rot = &g * cos2b + &h * sin2b;
    let h_rot = &h * cos2b - &g * sin2b;

    let (g_norm, h_norm) = (g_rot.norm(), h_rot.norm());
    debug!(
        "mixing angle {:.6} rad, |g'| = {:.6e}, |h'| = {:.6e}",
        beta, g_norm, h_norm
    );
    if g_norm <= tol {
        return Err(ModelError::DegenerateInput(format!(
            "rotated gradient-difference vector has near-zero norm ({:.3e})",
            g_norm
        )));
    }
    if h_norm <= tol {
        return Err(ModelError::DegenerateInput(format!(
            "rotated coupling vector has near-zero norm ({:.3e}); g and h are linearly dependent or zero",
            h_norm
        )));
    }

    let mut x_hat = g_rot / g_norm;
    let mut y_hat = h_rot / h_norm;
    let (mut major, mut minor) = (g_norm, h_norm);
    let mut coupling_on_y = true;
    if minor > major {
        std::mem::swap(&mut x_hat, &mut y_hat);
        std::mem::swap(&mut major, &mut minor);
        coupling_on_y = false;
    }

    let pitch = 0.5 * (major + minor);
    if pitch <= tol {
        return Err(ModelError::DegenerateInput(format!(
            "pitch is near zero ({:.3e})",
            pitch
        )));
    }
    let asymmetry = ((major - minor) / (major + minor)).clamp(0.0, 1.0);

    orient_basis(
        &mut x_hat,
        &mut y_hat,
        &s,
        &h,
        coupling_on_y,
        tol,
        options.tolerance,
    );

    let (s_x, s_y) = (s.dot(&x_hat), s.dot(&y_hat));
    let s_plane = s_x.hypot(s_y);
    let tilt = s_plane / pitch;
    let tilt_heading = if s_plane <= tol { 0.0 } else { s_y.atan2(s_x) };

    let plane = BranchingPlane {
        x_hat,
        y_hat,
        mixing_angle: beta,
    };
    let descriptors = TopologicalDescriptors {
        pitch,
        asymmetry,
        tilt,
        tilt_heading,
    };
    Ok((plane, descriptors))
}

/// β = ¼·atan2(2 g·h, |g|²-|h|²), or 0 when both arguments vanish.
fn mixing_angle(g: &DVector<f64>, h: &DVector<f64>, tol_sq: f64) -> f64 {
    let gh = g.dot(h);
    let diff = g.norm_squared() - h.norm_squared();
    if diff.abs() <= tol_sq && gh.abs() <= tol_sq {
        0.0
    } else {
        0.25 * (2.0 * gh).atan2(diff)
    }
}

/// Gives (x̂, ŷ) the handedness of the in-plane pair (s, h).
///
/// Left unchanged when either projection vanishes or the two are parallel.
fn orient_basis(
    x_hat: &mut DVector<f64>,
    y_hat: &mut DVector<f64>,
    s: &DVector<f64>,
    h: &DVector<f64>,
    coupling_on_y: bool,
    tol: f64,
    rel_tol: f64,
) {
    let (s_x, s_y) = (s.dot(x_hat), s.dot(y_hat));
    let (h_x, h_y) = (h.dot(x_hat), h.dot(y_hat));
    let s_len = s_x.hypot(s_y);
    let h_len = h_x.hypot(h_y);
    if s_len <= tol || h_len <= tol {
        return;
    }

    let handedness = s_x * h_y - s_y * h_x;
    if handedness.abs() <= rel_tol * s_len * h_len || handedness > 0.0 {
        return;
    }
    if coupling_on_y {
        *y_hat *= -1.0;
    } else {
        *x_hat *= -1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-8;

    fn sample_vectors() -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            vec![0.02, -0.01, 0.005, -0.015, 0.03, 0.01],
            vec![-0.01, 0.02, -0.004, 0.012, -0.01, 0.02],
            vec![0.004, 0.011, -0.003, 0.007, 0.002, -0.009],
        )
    }

    #[test]
    fn test_reference_double_cone() {
        let (plane, d) = solve(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(plane.x_hat.as_slice(), &[1.0, 0.0, 0.0]);
        assert_eq!(plane.y_hat.as_slice(), &[0.0, 1.0, 0.0]);
        assert_eq!(plane.mixing_angle, 0.0);
        assert!((d.pitch - 1.0).abs() < TOL);
        assert!(d.asymmetry.abs() < TOL);
        assert!(d.tilt.abs() < TOL);
        assert_eq!(d.tilt_heading, 0.0);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let (a, b, h) = sample_vectors();
        let (plane, _) = solve(&a, &b, &h).unwrap();
        assert!((plane.x_hat.norm() - 1.0).abs() < TOL);
        assert!((plane.y_hat.norm() - 1.0).abs() < TOL);
        assert!(plane.x_hat.dot(&plane.y_hat).abs() < TOL);
        assert!(plane.orthonormality_error() < TOL);
        assert_eq!(plane.num_atoms(), 2);
    }

    #[test]
    fn test_non_orthogonal_pair_closed_form() {
        // g = [1,0,0], h = [1,1,0]: |g'| = golden ratio, |h'| = 1/golden ratio
        let (plane, d) = solve(&[2.0, 0.0, 0.0], &[0.0, 0.0, 0.0], &[1.0, 1.0, 0.0]).unwrap();
        let sqrt5 = 5.0_f64.sqrt();
        assert!((d.pitch - sqrt5 / 2.0).abs() < TOL);
        assert!((d.asymmetry - 1.0 / sqrt5).abs() < TOL);
        assert!((d.tilt - 2.0 / sqrt5).abs() < TOL);
        assert!(plane.orthonormality_error() < TOL);
    }

    #[test]
    fn test_tilted_cone_in_plane() {
        let (plane, d) = solve(&[1.2, 0.2, 0.0], &[-0.8, 0.2, 0.0], &[0.0, 0.5, 0.0]).unwrap();
        assert!((plane.x_hat[0] - 1.0).abs() < TOL);
        assert!((plane.y_hat[1] - 1.0).abs() < TOL);
        assert!((d.pitch - 0.75).abs() < TOL);
        assert!((d.asymmetry - 1.0 / 3.0).abs() < TOL);
        assert!((d.tilt - 0.08_f64.sqrt() / 0.75).abs() < TOL);
        assert!((d.tilt_heading - PI / 4.0).abs() < TOL);
    }

    #[test]
    fn test_swapping_states_shifts_heading_by_pi() {
        let (a, b, h) = sample_vectors();
        let (plane_ab, d_ab) = solve(&a, &b, &h).unwrap();
        let (plane_ba, d_ba) = solve(&b, &a, &h).unwrap();

        assert!((d_ab.pitch - d_ba.pitch).abs() < TOL);
        assert!((d_ab.asymmetry - d_ba.asymmetry).abs() < TOL);
        assert!((d_ab.tilt - d_ba.tilt).abs() < TOL);

        let shift = (d_ba.tilt_heading - d_ab.tilt_heading).rem_euclid(2.0 * PI);
        assert!((shift - PI).abs() < 1e-8, "shift was {}", shift);

        assert!((&plane_ab.x_hat + &plane_ba.x_hat).norm() < TOL);
        assert!((&plane_ab.y_hat + &plane_ba.y_hat).norm() < TOL);
    }

    #[test]
    fn test_small_coupling_next_to_large_average_gradient() {
        // |g|, |h| ~ 1e-5 while |s| ~ 1: still well above the degeneracy cutoff
        let (plane, d) = solve(
            &[1.0 + 1e-5, 0.0, 0.0],
            &[1.0 - 1e-5, 0.0, 0.0],
            &[1e-5, 1e-5, 0.0],
        )
        .unwrap();
        assert!(plane.x_hat.dot(&plane.y_hat).abs() < TOL);
        assert!(plane.orthonormality_error() < TOL);
        assert!(plane.mixing_angle.abs() > 0.1);

        let sqrt5 = 5.0_f64.sqrt();
        assert!((d.pitch / 1e-5 - sqrt5 / 2.0).abs() < 1e-6);
        assert!((d.asymmetry - 1.0 / sqrt5).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_average_gradient_and_coupling_under_exchange() {
        // g = [1,0,0], s = h = [1,1,0]: orientation is left to the rotation
        let (a, b, h) = ([2.0, 1.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]);
        let (plane_ab, d_ab) = solve(&a, &b, &h).unwrap();
        let (plane_ba, d_ba) = solve(&b, &a, &h).unwrap();

        assert!(plane_ab.orthonormality_error() < TOL);
        assert!(plane_ba.orthonormality_error() < TOL);
        assert!((d_ab.pitch - d_ba.pitch).abs() < TOL);
        assert!((d_ab.asymmetry - d_ba.asymmetry).abs() < TOL);
        assert!((d_ab.tilt - d_ba.tilt).abs() < TOL);
    }

    #[test]
    fn test_asymmetry_bounds_for_dominant_coupling() {
        // |h| >> |g|: x̂ must still be the larger rotated vector
        let (plane, d) = solve(&[0.1, 0.0, 0.0], &[-0.1, 0.0, 0.0], &[0.0, 2.0, 0.0]).unwrap();
        assert!(d.pitch >= 0.0);
        assert!((0.0..=1.0).contains(&d.asymmetry));
        assert!((d.asymmetry - 1.9 / 2.1).abs() < TOL);
        assert!(plane.x_hat[1].abs() > 0.999);
    }

    #[test]
    fn test_identical_gradients_and_zero_coupling_is_degenerate() {
        let g = [0.3, -0.2, 0.1];
        let result = solve(&g, &g, &[0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(ModelError::DegenerateInput(_))));
    }

    #[test]
    fn test_all_zero_input_is_degenerate() {
        let result = solve(&[0.0; 3], &[0.0; 3], &[0.0; 3]);
        assert!(matches!(result, Err(ModelError::DegenerateInput(_))));
    }

    #[test]
    fn test_parallel_g_and_h_is_degenerate() {
        let result = solve(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0], &[2.0, 0.0, 0.0]);
        assert!(matches!(result, Err(ModelError::DegenerateInput(_))));
    }

    #[test]
    fn test_length_mismatch() {
        let result = solve(&[0.0; 9], &[0.0; 6], &[0.0; 9]);
        assert!(matches!(result, Err(ModelError::DimensionMismatch(_))));
    }

    #[test]
    fn test_scale_coupling_equalizes_norms() {
        let options = SolverOptions {
            scale_coupling: true,
            ..SolverOptions::default()
        };
        let (_, d) =
            solve_with(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0], &[0.0, 5.0, 0.0], &options).unwrap();
        assert!((d.pitch - 1.0).abs() < TOL);
        assert!(d.asymmetry.abs() < TOL);
    }

    #[test]
    fn test_scale_coupling_rejects_zero_coupling() {
        let options = SolverOptions {
            scale_coupling: true,
            ..SolverOptions::default()
        };
        let result = solve_with(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0], &[0.0; 3], &options);
        assert!(matches!(result, Err(ModelError::DegenerateInput(_))));
    }

    #[test]
    fn test_peakedness_and_bifurcation() {
        let untilted = TopologicalDescriptors {
            pitch: 1.0,
            asymmetry: 0.5,
            tilt: 0.0,
            tilt_heading: 0.0,
        };
        assert_eq!(untilted.peakedness(), 0.0);
        assert_eq!(untilted.character(), CiCharacter::Peaked);
        assert_eq!(untilted.path_character(), PathCharacter::Bifurcating);

        let steep = TopologicalDescriptors {
            pitch: 1.0,
            asymmetry: 0.0,
            tilt: 2.0,
            tilt_heading: 0.3,
        };
        assert!((steep.peakedness() - 4.0).abs() < TOL);
        assert_eq!(steep.character(), CiCharacter::Sloped);
        assert!(steep.bifurcation().is_infinite());
        assert_eq!(steep.path_character(), PathCharacter::SinglePath);
    }

    #[test]
    fn test_x_rows_layout() {
        let (plane, _) = solve(&[1.0, 0.0, 0.0], &[-1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).unwrap();
        assert_eq!(plane.x_rows(), vec![[1.0, 0.0, 0.0]]);
        assert_eq!(plane.y_rows(), vec![[0.0, 1.0, 0.0]]);
        assert_eq!(plane.project(&DVector::from_vec(vec![2.0, 3.0, 4.0])), (2.0, 3.0));
    }
}
