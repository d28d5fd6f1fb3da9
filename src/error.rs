use thiserror::Error;

/// Delay memory could not be partitioned as requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("delay line of {requested} samples does not fit: {remaining} of {capacity} left")]
    CapacityExceeded {
        requested: usize,
        remaining: usize,
        capacity: usize,
    },
    #[error("delay lines must be at least one sample long")]
    EmptyLine,
}

/// Initialisation failures. Block processing itself never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unsupported sample rate {0} Hz (expected {expected} Hz)", expected = crate::SAMPLE_RATE_HZ)]
    UnsupportedSampleRate(u32),
    #[error(transparent)]
    Arena(#[from] ArenaError),
}
