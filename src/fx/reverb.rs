use std::f32::consts::TAU;

use crate::{
    dsp::{
        arena::{layout_fits, DelayArena, DelayLine},
        lfo::bipolar_to_unipolar,
        quantize::Fixed12,
    },
    error::ArenaError,
    fx::{Frame, Stage},
    SAMPLE_RATE,
};

/*
Diffusion Reverb
================

The Griesinger topology described by Dattorro: four allpass diffusers on the
input, then a figure-eight loop of two branches.

    L+R ─ gain ─[AP1]─[AP2]─[AP3]─[AP4]─┬───────────────┐
                                        │               │
            ┌───────────────────────────┘               │
            ▼                                           ▼
    (+)◄─ del2 (mod) × time               (+)◄─ del1 × time
     │                                     │
    [LP]─[DAP1a]─[DAP1b]─► del1   ...     [LP]─[DAP2a]─[DAP2b]─► del2
     │                                     │
     └──► left wet                         └──► right wet

Each branch writes its long delay; the other branch reads it. That cross
coupling is the feedback loop, and `time` is its gain. Keep it below 1.0
or the tail never decays.

Modulation
----------

Two very slow cosine oscillators (0.5 Hz and 0.3 Hz), refreshed every 32
samples:

  - LFO 1 moves an interpolated read inside AP1 and writes the result back
    into the same line. The first diffuser smears instead of ringing.
  - LFO 2 moves the read tap of the long delay `del2` by ±150 samples,
    which gives the tail its slow chorus shimmer.

Memory
------

Ten lines, 24 566 samples total, in a 32 768-sample 12-bit arena (64 KB).
The 12-bit format gives the loop headroom above 1.0 at the cost of a
-72 dB noise floor, which sits well under the tail.

Line lengths are the usual 32 kHz values scaled by 1.5 for 48 kHz.
*/

const ARENA_SIZE: usize = 32_768;
const LINE_LENGTHS: [usize; 10] = [170, 243, 362, 599, 2480, 3057, 5117, 2870, 2495, 7173];

const _: () = assert!(
    layout_fits(&LINE_LENGTHS, ARENA_SIZE),
    "reverb delay lines exceed arena"
);

/// The longest delay line, in samples.
pub const LONGEST_DELAY: usize = 7173;

const LFO_UPDATE_INTERVAL: u32 = 32;
const SMEAR_LFO_HZ: f32 = 0.5;
const SHIMMER_LFO_HZ: f32 = 0.3;

const MAX_TIME: f32 = 0.99;
const MAX_DIFFUSION: f32 = 0.95;

/// Unipolar cosine refreshed at a fixed sub-rate.
struct SlowCosine {
    phase: f32,
    increment: f32,
}

impl SlowCosine {
    fn new(frequency_hz: f32) -> Self {
        Self {
            phase: 0.0,
            increment: frequency_hz * LFO_UPDATE_INTERVAL as f32 / SAMPLE_RATE,
        }
    }

    fn next(&mut self) -> f32 {
        let value = bipolar_to_unipolar((self.phase * TAU).cos());
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}

struct Lines {
    ap: [DelayLine; 4],
    dap1a: DelayLine,
    dap1b: DelayLine,
    del1: DelayLine,
    dap2a: DelayLine,
    dap2b: DelayLine,
    del2: DelayLine,
}

pub struct DiffusionReverb {
    arena: DelayArena<Fixed12>,
    lines: Lines,

    smear_lfo: SlowCosine,
    shimmer_lfo: SlowCosine,
    lfo_values: [f32; 2],
    lfo_countdown: u32,

    amount: f32,
    input_gain: f32,
    time: f32,
    diffusion: f32,
    lp: f32,

    lp_decay_1: f32,
    lp_decay_2: f32,
    recoveries: u32,
}

impl DiffusionReverb {
    pub fn new() -> Result<Self, ArenaError> {
        let (arena, [ap1, ap2, ap3, ap4, dap1a, dap1b, del1, dap2a, dap2b, del2]) =
            DelayArena::with_layout(ARENA_SIZE, LINE_LENGTHS)?;

        Ok(Self {
            arena,
            lines: Lines {
                ap: [ap1, ap2, ap3, ap4],
                dap1a,
                dap1b,
                del1,
                dap2a,
                dap2b,
                del2,
            },
            smear_lfo: SlowCosine::new(SMEAR_LFO_HZ),
            shimmer_lfo: SlowCosine::new(SHIMMER_LFO_HZ),
            lfo_values: [0.0; 2],
            lfo_countdown: 0,
            amount: 0.5,
            input_gain: 0.2,
            time: 0.5,
            diffusion: 0.625,
            lp: 0.7,
            lp_decay_1: 0.0,
            lp_decay_2: 0.0,
            recoveries: 0,
        })
    }

    /// Dry/wet (0.0 = dry, 1.0 = wet).
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    pub fn set_input_gain(&mut self, gain: f32) {
        self.input_gain = gain.clamp(0.0, 1.0);
    }

    /// Loop gain. Clamped to 0.99 so the tail always decays.
    pub fn set_time(&mut self, time: f32) {
        self.time = time.clamp(0.0, MAX_TIME);
    }

    /// Allpass coefficient of every diffuser in the network.
    pub fn set_diffusion(&mut self, diffusion: f32) {
        self.diffusion = diffusion.clamp(0.0, MAX_DIFFUSION);
    }

    /// Damping lowpass coefficient (1.0 = no damping).
    pub fn set_lp(&mut self, lp: f32) {
        self.lp = lp.clamp(0.0, 1.0);
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// How many times non-finite damping state has been reset.
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    #[inline]
    fn tick_lfos(&mut self) {
        if self.lfo_countdown == 0 {
            self.lfo_values = [self.smear_lfo.next(), self.shimmer_lfo.next()];
            self.lfo_countdown = LFO_UPDATE_INTERVAL;
        }
        self.lfo_countdown -= 1;
    }
}

impl Stage for DiffusionReverb {
    fn render_block(&mut self, frames: &mut [Frame]) {
        let kap = self.diffusion;
        let klp = self.lp;
        let krt = self.time;
        let amount = self.amount;
        let gain = self.input_gain;

        let mut lp_1 = self.lp_decay_1;
        let mut lp_2 = self.lp_decay_2;

        for frame in frames.iter_mut() {
            self.tick_lfos();
            let [smear, shimmer] = self.lfo_values;
            let arena = &mut self.arena;
            let lines = &mut self.lines;

            // Smear AP1: move a modulated read back into the line
            let smeared = arena.read_interpolated(&lines.ap[0], 15.0 + 90.0 * smear);
            arena.write_at(&lines.ap[0], 150, smeared);

            let mut apout = (frame.l + frame.r) * gain;
            for ap in lines.ap.iter_mut() {
                apout = arena.allpass(ap, apout, kap);
            }

            // Left branch, fed by the modulated right delay
            let mut acc = apout + arena.read_interpolated(&lines.del2, 7020.0 + 150.0 * shimmer) * krt;
            lp_1 += klp * (acc - lp_1);
            acc = arena.allpass(&mut lines.dap1a, lp_1, -kap);
            acc = arena.allpass(&mut lines.dap1b, acc, kap);
            arena.write(&mut lines.del1, acc);
            let wet = acc * 2.0;
            frame.l += (wet - frame.l) * amount;

            // Right branch, fed by the left delay
            let mut acc = apout + arena.tail(&lines.del1) * krt;
            lp_2 += klp * (acc - lp_2);
            acc = arena.allpass(&mut lines.dap2a, lp_2, kap);
            acc = arena.allpass(&mut lines.dap2b, acc, -kap);
            arena.write(&mut lines.del2, acc);
            let wet = acc * 2.0;
            frame.r += (wet - frame.r) * amount;
        }

        // Never carry NaN/inf into the next block's feedback
        if !lp_1.is_finite() || !lp_2.is_finite() {
            lp_1 = 0.0;
            lp_2 = 0.0;
            self.recoveries = self.recoveries.wrapping_add(1);
        }
        self.lp_decay_1 = lp_1;
        self.lp_decay_2 = lp_2;
    }

    fn clear(&mut self) {
        self.arena.clear();
        self.lp_decay_1 = 0.0;
        self.lp_decay_2 = 0.0;
    }

    fn amount(&self) -> f32 {
        self.amount
    }

    // The reverb is the core of the chain and always runs
    fn is_active(&self) -> bool {
        true
    }
}
