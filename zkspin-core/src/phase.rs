//! Angle between two 2D vectors.

use crate::error::SpinError;

/// How far a normalised dot product may stray outside `[-1, 1]` before it is
/// treated as degenerate rather than rounding noise.
const COSINE_TOLERANCE: f64 = 1e-12;

/// Unsigned angle between `a` and `b` in radians, in `[0, π]`.
pub fn phase(a: [f64; 2], b: [f64; 2]) -> Result<f64, SpinError> {
    let norm_a = a[0].hypot(a[1]);
    let norm_b = b[0].hypot(b[1]);

    if !norm_a.is_finite() || !norm_b.is_finite() {
        return Err(SpinError::DegenerateVector(format!(
            "non-finite vector: {:?}, {:?}",
            a, b
        )));
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SpinError::DegenerateVector(format!(
            "zero-length vector: {:?}, {:?}",
            a, b
        )));
    }

    // Normalise first so the dot product neither overflows nor underflows.
    let ua = [a[0] / norm_a, a[1] / norm_a];
    let ub = [b[0] / norm_b, b[1] / norm_b];
    let cosine = ua[0] * ub[0] + ua[1] * ub[1];
    if !cosine.is_finite() || cosine.abs() > 1.0 + COSINE_TOLERANCE {
        return Err(SpinError::DegenerateVector(format!(
            "cosine {} out of range for {:?}, {:?}",
            cosine, a, b
        )));
    }

    Ok(cosine.clamp(-1.0, 1.0).acos())
}
