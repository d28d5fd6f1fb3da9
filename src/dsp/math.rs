//! Small numeric helpers shared by the effect stages.

/// Polynomial approximation of `2^x`.
///
/// The integer part is applied exactly; the fractional part uses a cubic
/// fit that is exact at both ends of `[0, 1)` and within 0.02% in between.
#[inline]
pub fn exp2_approx(x: f32) -> f32 {
    let whole = x.floor();
    let frac = x - whole;
    let poly = 1.0 + frac * (0.696_065_6 + frac * (0.224_494_3 + frac * 0.079_440_2));
    poly * 2.0_f32.powi(whole as i32)
}

/// Convert a semitone offset into a playback-rate ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    exp2_approx(semitones / 12.0)
}

/// Rational soft saturation: near-linear around 0, reaches ±1 at ±3 and
/// holds there.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    if x < -3.0 {
        -1.0
    } else if x > 3.0 {
        1.0
    } else {
        x * (27.0 + x * x) / (27.0 + 9.0 * x * x)
    }
}

/// Replace NaN and infinities with silence.
#[inline]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Cubic smoothstep of a value in [0, 1].
#[inline]
pub fn smoothstep(x: f32) -> f32 {
    x * x * (3.0 - 2.0 * x)
}
