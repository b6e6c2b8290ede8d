//! Vector arithmetic shared by build, load and search.

/// Allowed deviation from unit length for vectors of a normalized store.
pub const UNIT_NORM_TOLERANCE: f32 = 1e-3;

#[inline]
fn max_abs(v: &[f32]) -> f32 {
    v.iter().fold(0.0f32, |m, x| m.max(x.abs()))
}

/// Euclidean norm, scaled by the largest component so tiny and huge
/// vectors neither underflow nor overflow while squaring.
pub fn l2_norm(v: &[f32]) -> f32 {
    let scale = max_abs(v);
    if scale == 0.0 || !scale.is_finite() {
        return scale;
    }
    let sum: f32 = v.iter().map(|x| (x / scale) * (x / scale)).sum();
    scale * sum.sqrt()
}

/// Scale `v` to unit length. Returns `false` and leaves `v` untouched when
/// it is all zeros or has a non-finite component.
pub fn normalize_in_place(v: &mut [f32]) -> bool {
    let scale = max_abs(v);
    if scale == 0.0 || !scale.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x /= scale;
    }
    // components are now in [-1, 1] with at least one at magnitude 1
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

#[must_use]
pub fn is_unit(v: &[f32]) -> bool {
    (l2_norm(v) - 1.0).abs() <= UNIT_NORM_TOLERANCE
}

#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Cosine similarity from precomputed norms; `0.0` when either is zero.
#[inline]
pub fn cosine(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| (x / norm_a) * (y / norm_b)).sum();
    dot.clamp(-1.0, 1.0)
}
