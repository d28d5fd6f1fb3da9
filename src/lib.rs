//! Block-based stereo effect chain: plate reverb, texture diffuser, grain
//! cloud and pitch shifter, driven by smoothed parameters and two LFOs.
//!
//! All memory is allocated by [`Pipeline::init`]; processing never allocates,
//! blocks or fails.

pub mod dsp;
pub mod error;
pub mod fx; // Effect stages
pub mod message;
pub mod modulation;
pub mod params;
pub mod pipeline;
pub mod preset;

pub use error::{ArenaError, EngineError};
pub use fx::Frame;
pub use message::{ControlMessage, MessageReceiver};
pub use modulation::LfoDestination;
pub use params::{ParamId, PARAM_COUNT};
pub use pipeline::{EngineConfig, Pipeline};
pub use preset::Preset;

/// The only supported processing rate. Every delay length is tuned for it.
pub const SAMPLE_RATE_HZ: u32 = 48_000;
pub const SAMPLE_RATE: f32 = SAMPLE_RATE_HZ as f32;

/// Largest sub-block processed at once; control updates run once per sub-block.
pub const MAX_BLOCK_SIZE: usize = 64;

/// Output is hard-clamped to ±this.
pub const OUTPUT_LIMIT: f32 = 1.0;

pub const SMOOTHING_COEFFICIENT: f32 = 0.05;

/// Stages whose amount is at or below this are skipped.
pub const ACTIVE_THRESHOLD: f32 = 0.001;
