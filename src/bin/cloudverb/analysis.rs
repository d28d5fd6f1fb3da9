//! Offline measurements of rendered audio.
//!
//! FFT-based dominant frequency and a windowed peak envelope.

use rustfft::{num_complex::Complex, FftPlanner};

/// Hann window of `len` points.
fn hann(len: usize) -> impl Iterator<Item = f32> {
    let denom = len.saturating_sub(1).max(1) as f32;
    (0..len).map(move |i| 0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos()))
}

/// Frequency (Hz) of the strongest spectral peak, DC excluded.
///
/// The peak bin is refined by fitting a parabola through its neighbours'
/// log magnitudes.
pub fn dominant_frequency(samples: &[f32], sample_rate: f32) -> Option<f32> {
    let len = samples.len();
    if len < 4 {
        return None;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(len);

    let mut scratch: Vec<Complex<f32>> = samples
        .iter()
        .zip(hann(len))
        .map(|(&s, w)| Complex::new(s * w, 0.0))
        .collect();
    fft.process(&mut scratch);

    let half = len / 2;
    let magnitude = |i: usize| scratch[i].norm().max(1e-12);
    let peak = (1..half).max_by(|&a, &b| magnitude(a).total_cmp(&magnitude(b)))?;

    let offset = if peak + 1 < half {
        let (a, b, c) = (
            magnitude(peak - 1).ln(),
            magnitude(peak).ln(),
            magnitude(peak + 1).ln(),
        );
        let denom = a - 2.0 * b + c;
        if denom.abs() > f32::EPSILON {
            0.5 * (a - c) / denom
        } else {
            0.0
        }
    } else {
        0.0
    };

    Some((peak as f32 + offset) * sample_rate / len as f32)
}

/// Peak absolute value of each consecutive `window`-sample slice.
pub fn peak_envelope(samples: &[f32], window: usize) -> Vec<f32> {
    samples
        .chunks(window.max(1))
        .map(|chunk| chunk.iter().fold(0.0f32, |peak, s| peak.max(s.abs())))
        .collect()
}

/// Peak level in dBFS, floored at -120.
pub fn to_db(level: f32) -> f32 {
    20.0 * level.max(1e-6).log10()
}
