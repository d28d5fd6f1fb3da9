//! Storage formats for delay memory.

/*
Quantized Delay Memory
======================

Feedback networks (reverbs, diffusers, pitch shifters) need a lot of delay
memory but not a lot of resolution. A reverb tail sits 40-60 dB below the
dry signal most of the time, so storing every delayed sample as a 32-bit
float wastes half (or more) of the memory budget.

Each delay arena picks one storage format:

  format     stored as   bytes   full scale     noise floor (approx)
  ---------  ----------  -----   ------------   --------------------
  Fixed12    i16         2       ±8.0           -72 dB re 1.0
  Fixed16    i16         2       ±1.0           -96 dB re 1.0
  Float      f32         4       unbounded      none

Fixed12 trades resolution for headroom: a feedback loop can briefly exceed
1.0 without hard clipping. Fixed16 is the right choice for feed-forward
networks whose signal never leaves [-1, 1].

Values outside the representable range saturate on write. They never wrap.
*/

/// Conversion between `f32` samples and the type actually stored in memory.
pub trait SampleFormat {
    /// Element type of the backing store.
    type Stored: Copy + Default + Send;

    fn compress(value: f32) -> Self::Stored;

    fn decompress(stored: Self::Stored) -> f32;
}

/// 12-bit fraction in a 16-bit word: ±8.0 full scale.
#[derive(Debug, Clone, Copy)]
pub struct Fixed12;

/// 16-bit fraction: ±1.0 full scale.
#[derive(Debug, Clone, Copy)]
pub struct Fixed16;

/// Full-precision float storage (no quantization).
#[derive(Debug, Clone, Copy)]
pub struct Float;

#[inline]
fn saturate_i16(value: f32) -> i16 {
    // NaN maps to 0 through the `as` cast, infinities saturate
    value.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

impl SampleFormat for Fixed12 {
    type Stored = i16;

    #[inline]
    fn compress(value: f32) -> i16 {
        saturate_i16(value * 4096.0)
    }

    #[inline]
    fn decompress(stored: i16) -> f32 {
        stored as f32 / 4096.0
    }
}

impl SampleFormat for Fixed16 {
    type Stored = i16;

    #[inline]
    fn compress(value: f32) -> i16 {
        saturate_i16(value * 32768.0)
    }

    #[inline]
    fn decompress(stored: i16) -> f32 {
        stored as f32 / 32768.0
    }
}

impl SampleFormat for Float {
    type Stored = f32;

    #[inline]
    fn compress(value: f32) -> f32 {
        value
    }

    #[inline]
    fn decompress(stored: f32) -> f32 {
        stored
    }
}
