//! Fixed-size delay memory shared by the delay lines of one effect.

use std::marker::PhantomData;

use crate::{dsp::quantize::SampleFormat, error::ArenaError};

/*
Delay Arena
===========

Reverbs and diffusers are built from many delay lines of fixed, carefully
chosen lengths. Instead of giving every line its own allocation, one effect
owns a single backing store and carves it into lines once, up front:

    storage: [ ap1 | ap2 | ap3 | ap4 | dap1a | ... | del2 | (unused) ]
              ^base=0 ^base=170 ...

Reservation is a bump allocator: each line starts where the previous one
ended, nothing is ever freed or reused, and nothing can fragment. After
construction the layout is frozen; processing only moves cursors.

Vocabulary
----------

  line      A `DelayLine` handle: base offset, length, and its own write
            cursor. The handle is owned by the effect, the samples are owned
            by the arena.

  delay     How far back to read, in samples. `read(line, 1)` returns the
            most recently written sample, `read(line, len)` the oldest one
            (the slot the next write will overwrite).

  tail      The oldest sample of a line, `read(line, len)`. Allpass stages
            read the tail and then overwrite it.

Every arena is generic over a `SampleFormat`, so the quantization trade-off
is chosen per effect: the reverb keeps 12-bit memory for headroom, the
feed-forward stages use 16-bit.
*/

/// Returns true when lines of the given lengths fit into `capacity` samples.
///
/// `const` so effects can assert their layout at compile time.
pub const fn layout_fits(lengths: &[usize], capacity: usize) -> bool {
    let mut total = 0;
    let mut i = 0;
    while i < lengths.len() {
        if lengths[i] == 0 {
            return false;
        }
        total += lengths[i];
        i += 1;
    }
    total <= capacity
}

/// A reserved region of a `DelayArena` with its own ring cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayLine {
    base: usize,
    len: usize,
    cursor: usize,
}

impl DelayLine {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// Storage index of the sample written `delay` writes ago.
    #[inline]
    fn index(&self, delay: usize) -> usize {
        let delay = delay.min(self.len);
        self.base + (self.cursor + self.len - delay) % self.len
    }
}

/// One contiguous block of quantized samples partitioned into delay lines.
pub struct DelayArena<F: SampleFormat> {
    storage: Vec<F::Stored>,
    reserved: usize,
    _format: PhantomData<F>,
}

impl<F: SampleFormat> DelayArena<F> {
    /// Allocate a zeroed arena of `capacity` samples.
    ///
    /// This is the only allocation an arena ever makes.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![F::Stored::default(); capacity],
            reserved: 0,
            _format: PhantomData,
        }
    }

    /// Allocate an arena and reserve all lines in one step.
    pub fn with_layout<const N: usize>(
        capacity: usize,
        lengths: [usize; N],
    ) -> Result<(Self, [DelayLine; N]), ArenaError> {
        let mut arena = Self::new(capacity);
        let mut lines = [DelayLine {
            base: 0,
            len: 0,
            cursor: 0,
        }; N];
        for (line, &len) in lines.iter_mut().zip(lengths.iter()) {
            *line = arena.reserve(len)?;
        }
        Ok((arena, lines))
    }

    /// Carve the next `len` samples off the arena.
    pub fn reserve(&mut self, len: usize) -> Result<DelayLine, ArenaError> {
        if len == 0 {
            return Err(ArenaError::EmptyLine);
        }
        let remaining = self.remaining();
        if len > remaining {
            return Err(ArenaError::CapacityExceeded {
                requested: len,
                remaining,
                capacity: self.capacity(),
            });
        }

        let line = DelayLine {
            base: self.reserved,
            len,
            cursor: 0,
        };
        self.reserved += len;
        Ok(line)
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn reserved(&self) -> usize {
        self.reserved
    }

    pub fn remaining(&self) -> usize {
        self.capacity() - self.reserved
    }

    /// Zero all samples. Line layout is kept.
    pub fn clear(&mut self) {
        self.storage.fill(F::Stored::default());
    }

    /// Push a sample into the line and advance its cursor.
    #[inline]
    pub fn write(&mut self, line: &mut DelayLine, value: f32) {
        self.storage[line.base + line.cursor] = F::compress(value);
        line.cursor += 1;
        if line.cursor == line.len {
            line.cursor = 0;
        }
    }

    /// Overwrite the sample written `delay` writes ago without moving the cursor.
    #[inline]
    pub fn write_at(&mut self, line: &DelayLine, delay: usize, value: f32) {
        self.storage[line.index(delay)] = F::compress(value);
    }

    /// Read the sample written `delay` writes ago (clamped to `1..=len`).
    #[inline]
    pub fn read(&self, line: &DelayLine, delay: usize) -> f32 {
        F::decompress(self.storage[line.index(delay.max(1))])
    }

    /// Oldest sample of the line.
    #[inline]
    pub fn tail(&self, line: &DelayLine) -> f32 {
        self.read(line, line.len)
    }

    /// Fractional-delay read, linear interpolation between neighbours.
    #[inline]
    pub fn read_interpolated(&self, line: &DelayLine, delay: f32) -> f32 {
        let max_delay = line.len.saturating_sub(1) as f32;
        let delay = delay.max(1.0).min(max_delay);
        let delay_int = delay as usize;
        let frac = delay - delay_int as f32;

        let a = self.read(line, delay_int);
        let b = self.read(line, delay_int + 1);
        a + (b - a) * frac
    }

    /// Allpass stage on a line: read the tail, write `input + g·tail`,
    /// return `tail − g·written`.
    #[inline]
    pub fn allpass(&mut self, line: &mut DelayLine, input: f32, g: f32) -> f32 {
        let delayed = self.tail(line);
        let node = input + g * delayed;
        self.write(line, node);
        delayed - g * node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::quantize::{Fixed16, Float};

    #[test]
    fn test_reserve_is_contiguous() {
        let mut arena = DelayArena::<Float>::new(100);
        let a = arena.reserve(30).unwrap();
        let b = arena.reserve(50).unwrap();
        assert_eq!(a.base(), 0);
        assert_eq!(b.base(), 30);
        assert_eq!(arena.remaining(), 20);
    }

    #[test]
    fn test_reserve_over_capacity_fails() {
        let mut arena = DelayArena::<Float>::new(64);
        arena.reserve(60).unwrap();
        let err = arena.reserve(5).unwrap_err();
        assert_eq!(
            err,
            ArenaError::CapacityExceeded {
                requested: 5,
                remaining: 4,
                capacity: 64
            }
        );
    }

    #[test]
    fn test_zero_length_line_rejected() {
        let mut arena = DelayArena::<Float>::new(8);
        assert_eq!(arena.reserve(0), Err(ArenaError::EmptyLine));
    }

    #[test]
    fn test_layout_fits() {
        assert!(layout_fits(&[10, 20, 30], 60));
        assert!(!layout_fits(&[10, 20, 31], 60));
        assert!(!layout_fits(&[10, 0], 60));
    }

    #[test]
    fn test_read_delay_and_wrap() {
        let (mut arena, [mut line]) = DelayArena::<Float>::with_layout(8, [4]).unwrap();
        for i in 1..=6 {
            arena.write(&mut line, i as f32);
        }
        // Last four writes: 3, 4, 5, 6
        assert_eq!(arena.read(&line, 1), 6.0);
        assert_eq!(arena.read(&line, 3), 4.0);
        assert_eq!(arena.tail(&line), 3.0);
    }

    #[test]
    fn test_lines_do_not_overlap() {
        let (mut arena, [mut a, mut b]) = DelayArena::<Float>::with_layout(16, [5, 7]).unwrap();
        for _ in 0..20 {
            arena.write(&mut a, 1.0);
        }
        for d in 1..=7 {
            assert_eq!(arena.read(&b, d), 0.0, "line b touched at delay {}", d);
        }
        arena.write(&mut b, -1.0);
        assert_eq!(arena.read(&a, 5), 1.0);
    }

    #[test]
    fn test_interpolated_read() {
        let (mut arena, [mut line]) = DelayArena::<Float>::with_layout(16, [16]).unwrap();
        for v in [0.0, 1.0, 2.0, 3.0] {
            arena.write(&mut line, v);
        }
        // delay 1 -> 3.0, delay 2 -> 2.0
        let out = arena.read_interpolated(&line, 1.5);
        assert!((out - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_write_at_lands_behind_cursor() {
        let (mut arena, [mut line]) = DelayArena::<Float>::with_layout(10, [10]).unwrap();
        arena.write_at(&line, 3, 0.75);
        // Two more writes push it to delay 5
        arena.write(&mut line, 0.0);
        arena.write(&mut line, 0.0);
        assert_eq!(arena.read(&line, 5), 0.75);
    }

    #[test]
    fn test_allpass_impulse() {
        let g = 0.5;
        let (mut arena, [mut line]) = DelayArena::<Float>::with_layout(4, [4]).unwrap();

        // Direct path: -g * x
        let first = arena.allpass(&mut line, 1.0, g);
        assert!((first + g).abs() < 1e-6);

        // The written node reappears after `len` samples
        let mut out = 0.0;
        for _ in 0..4 {
            out = arena.allpass(&mut line, 0.0, g);
        }
        assert!((out - (1.0 - g * g)).abs() < 1e-6);
    }

    #[test]
    fn test_quantized_arena_stays_close() {
        let (mut arena, [mut line]) = DelayArena::<Fixed16>::with_layout(32, [32]).unwrap();
        arena.write(&mut line, 0.123);
        assert!((arena.read(&line, 1) - 0.123).abs() < 1e-4);
    }

    #[test]
    fn test_clear_zeroes_storage() {
        let (mut arena, [mut line]) = DelayArena::<Float>::with_layout(4, [4]).unwrap();
        arena.write(&mut line, 1.0);
        arena.clear();
        assert_eq!(arena.read(&line, 1), 0.0);
    }
}
