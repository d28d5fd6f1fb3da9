//! cloudverb - offline render of the effect chain
//!
//! Run with: cargo run -- [id=value ...]
//!
//! Renders a unit impulse and a 440 Hz tone through the chain at INIT
//! settings, with optional raw parameter overrides (`TIME=120`, `13=96`),
//! and prints the impulse envelope and the tone's dominant output frequency.

mod analysis;

use cloudverb::{EngineConfig, Frame, ParamId, Pipeline, SAMPLE_RATE};
use color_eyre::eyre::{eyre, WrapErr};

const IMPULSE_SECONDS: f32 = 3.0;
const TONE_SECONDS: f32 = 2.0;
const TONE_HZ: f32 = 440.0;
/// 100 ms envelope windows.
const ENVELOPE_WINDOW: usize = 4_800;
/// Analyse the last 16384 samples of the tone, after everything has settled.
const ANALYSIS_LEN: usize = 16_384;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let overrides = std::env::args()
        .skip(1)
        .map(|arg| parse_override(&arg))
        .collect::<color_eyre::Result<Vec<_>>>()?;

    // === IMPULSE ===
    let mut pipeline = build_pipeline(&overrides)?;
    let mut frames = vec![Frame::SILENCE; (IMPULSE_SECONDS * SAMPLE_RATE) as usize];
    frames[0] = Frame::mono(1.0);
    pipeline.process_frames(&mut frames);

    let left: Vec<f32> = frames.iter().map(|f| f.l).collect();
    println!("impulse response (left, peak per 100 ms)");
    for (i, peak) in analysis::peak_envelope(&left, ENVELOPE_WINDOW)
        .into_iter()
        .enumerate()
    {
        let db = analysis::to_db(peak);
        let bar = "#".repeat(((db + 120.0) / 3.0).max(0.0) as usize);
        println!("  {:>5} ms {:>8.1} dB {}", i * 100, db, bar);
    }

    // === TONE ===
    let mut pipeline = build_pipeline(&overrides)?;
    let mut frames: Vec<Frame> = (0..(TONE_SECONDS * SAMPLE_RATE) as usize)
        .map(|i| Frame::mono(0.5 * (std::f32::consts::TAU * TONE_HZ * i as f32 / SAMPLE_RATE).sin()))
        .collect();
    pipeline.process_frames(&mut frames);

    let tail: Vec<f32> = frames[frames.len() - ANALYSIS_LEN..]
        .iter()
        .map(|f| f.l)
        .collect();
    match analysis::dominant_frequency(&tail, SAMPLE_RATE) {
        Some(freq) => println!(
            "tone: {:.1} Hz in, {:.1} Hz dominant out (ratio {:.3})",
            TONE_HZ,
            freq,
            freq / TONE_HZ
        ),
        None => println!("tone: no output to analyse"),
    }

    Ok(())
}

fn build_pipeline(overrides: &[(u8, i32)]) -> color_eyre::Result<Pipeline> {
    let mut pipeline = Pipeline::new(EngineConfig::default());
    for &(id, value) in overrides {
        pipeline.set_parameter(id, value);
    }
    pipeline
        .init()
        .wrap_err("failed to initialise the effect chain")?;
    Ok(pipeline)
}

/// Parse `id=value`, where `id` is a slot number or a display name.
fn parse_override(arg: &str) -> color_eyre::Result<(u8, i32)> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| eyre!("expected id=value, got {:?}", arg))?;
    let value: i32 = value
        .trim()
        .parse()
        .wrap_err_with(|| format!("bad value in {:?}", arg))?;

    let key = key.trim();
    let id = match key.parse::<u8>() {
        Ok(id) => ParamId::from_index(id),
        Err(_) => ParamId::all().find(|p| {
            let name = p.descriptor().name;
            !name.is_empty() && name.replace([' ', '/'], "").eq_ignore_ascii_case(&key.replace(['_', '-'], ""))
        }),
    }
    .ok_or_else(|| eyre!("unknown parameter {:?}", key))?;

    Ok((id as u8, value))
}
