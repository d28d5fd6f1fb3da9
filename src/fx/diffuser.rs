use crate::{
    dsp::{
        arena::{layout_fits, DelayArena, DelayLine},
        quantize::Fixed16,
    },
    error::ArenaError,
    fx::{Frame, Stage},
};

/*
Texture Diffuser
================

Four allpasses in series per channel, after the reverb:

    L ─[189]─[270]─[404]─[666]─► wet L
    R ─[227]─[308]─[368]─[608]─► wet R

Left and right use different, mutually prime-ish lengths so the two
channels decorrelate instead of combing against each other.

There is no feedback around the cascade, so the only stability condition
is |coefficient| < 1, which a fixed 0.625 satisfies. The stage smears
transients into a grainy wash; `amount` crossfades it with the input.
*/

const ARENA_SIZE: usize = 4096;
const LEFT_LENGTHS: [usize; 4] = [189, 270, 404, 666];
const RIGHT_LENGTHS: [usize; 4] = [227, 308, 368, 608];
const ALLPASS_COEFFICIENT: f32 = 0.625;

const _: () = assert!(
    layout_fits(
        &[
            LEFT_LENGTHS[0],
            LEFT_LENGTHS[1],
            LEFT_LENGTHS[2],
            LEFT_LENGTHS[3],
            RIGHT_LENGTHS[0],
            RIGHT_LENGTHS[1],
            RIGHT_LENGTHS[2],
            RIGHT_LENGTHS[3],
        ],
        ARENA_SIZE
    ),
    "diffuser delay lines exceed arena"
);

pub struct TextureDiffuser {
    arena: DelayArena<Fixed16>,
    left: [DelayLine; 4],
    right: [DelayLine; 4],
    amount: f32,
}

impl TextureDiffuser {
    pub fn new() -> Result<Self, ArenaError> {
        let mut arena = DelayArena::new(ARENA_SIZE);
        let left = reserve_cascade(&mut arena, LEFT_LENGTHS)?;
        let right = reserve_cascade(&mut arena, RIGHT_LENGTHS)?;
        Ok(Self {
            arena,
            left,
            right,
            amount: 0.0,
        })
    }

    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }
}

fn reserve_cascade(
    arena: &mut DelayArena<Fixed16>,
    lengths: [usize; 4],
) -> Result<[DelayLine; 4], ArenaError> {
    Ok([
        arena.reserve(lengths[0])?,
        arena.reserve(lengths[1])?,
        arena.reserve(lengths[2])?,
        arena.reserve(lengths[3])?,
    ])
}

#[inline]
fn cascade(arena: &mut DelayArena<Fixed16>, lines: &mut [DelayLine; 4], input: f32) -> f32 {
    lines
        .iter_mut()
        .fold(input, |acc, line| arena.allpass(line, acc, ALLPASS_COEFFICIENT))
}

impl Stage for TextureDiffuser {
    fn render_block(&mut self, frames: &mut [Frame]) {
        let amount = self.amount;
        for frame in frames.iter_mut() {
            let wet_l = cascade(&mut self.arena, &mut self.left, frame.l);
            let wet_r = cascade(&mut self.arena, &mut self.right, frame.r);
            frame.l += amount * (wet_l - frame.l);
            frame.r += amount * (wet_r - frame.r);
        }
    }

    fn clear(&mut self) {
        self.arena.clear();
    }

    fn amount(&self) -> f32 {
        self.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_amount_is_transparent() {
        let mut diffuser = TextureDiffuser::new().unwrap();
        assert!(!diffuser.is_active());

        let mut frames: Vec<Frame> = (0..64).map(|i| Frame::new(i as f32 / 64.0, -0.5)).collect();
        let original = frames.clone();
        diffuser.render_block(&mut frames);
        assert_eq!(frames, original);
    }

    #[test]
    fn test_impulse_is_smeared() {
        let mut diffuser = TextureDiffuser::new().unwrap();
        diffuser.set_amount(1.0);

        let mut frames = vec![Frame::SILENCE; 4096];
        frames[0] = Frame::mono(1.0);
        diffuser.render_block(&mut frames);

        let nonzero = frames.iter().filter(|f| f.l.abs() > 1e-4).count();
        assert!(nonzero > 50, "impulse only spread over {} samples", nonzero);
    }

    #[test]
    fn test_channels_decorrelate() {
        let mut diffuser = TextureDiffuser::new().unwrap();
        diffuser.set_amount(1.0);

        let mut frames = vec![Frame::SILENCE; 2048];
        frames[0] = Frame::mono(1.0);
        diffuser.render_block(&mut frames);

        let differing = frames.iter().filter(|f| (f.l - f.r).abs() > 1e-4).count();
        assert!(differing > 100, "left and right nearly identical");
    }

    #[test]
    fn test_energy_is_preserved() {
        // An allpass cascade neither adds nor removes energy
        let mut diffuser = TextureDiffuser::new().unwrap();
        diffuser.set_amount(1.0);

        let mut frames = vec![Frame::SILENCE; 48_000];
        frames[0] = Frame::mono(0.5);
        for chunk in frames.chunks_mut(64) {
            diffuser.render_block(chunk);
        }
        let energy: f32 = frames.iter().map(|f| f.l * f.l).sum();
        assert!((energy - 0.25).abs() < 0.01, "energy {}", energy);
    }

    #[test]
    fn test_clear_removes_history() {
        let mut diffuser = TextureDiffuser::new().unwrap();
        diffuser.set_amount(1.0);
        let mut frames = vec![Frame::mono(0.8); 256];
        diffuser.render_block(&mut frames);

        diffuser.clear();
        let mut frames = vec![Frame::SILENCE; 2048];
        diffuser.render_block(&mut frames);
        assert!(frames.iter().all(|f| *f == Frame::SILENCE));
    }
}
