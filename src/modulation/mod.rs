//! Two LFOs, each routed to exactly one destination.

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::lfo::{Lfo, LfoWaveform},
    params::ParamId,
};

/*
Modulation Hub
==============

Each LFO has ONE destination at a time: off, one of the modulatable
parameters, or the other LFO's speed. Modulation runs once per block:

    1. Evaluate LFO 1, apply its offset.
    2. Evaluate LFO 2, apply its offset.

The order matters for cross-modulation. When LFO 1 targets LFO 2's speed,
LFO 2 is re-tuned BEFORE it is evaluated in the same block. When LFO 2
targets LFO 1's speed, LFO 1 has already run, so the new speed is heard
one block later.

Applying an offset
------------------

An LFO never moves a parameter's stored value. For a parameter
destination:

    nominal raw value ──► + lfo × half range ──► clamp to slot range
                      ──► slot mapping ──► smoother target (or stage)

so a full-depth LFO sweeps the whole range from a centred nominal value,
and the host still reads back what it set. Speed destinations work on the
0..127 raw speed of the other LFO the same way.

When a destination changes, the old destination is put back to its
nominal value on the next block, so no stale offset is left behind.
*/

pub const LFO_COUNT: usize = 2;

const SPEED_MAX: f32 = 127.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoDestination {
    #[default]
    Off,
    DryWet,
    Time,
    Diffusion,
    LpDamp,
    InputGain,
    Texture,
    GrainAmount,
    GrainSize,
    GrainDensity,
    GrainPitch,
    GrainPosition,
    ShiftAmount,
    ShiftPitch,
    ShiftSize,
    OtherLfoSpeed,
}

impl LfoDestination {
    pub const COUNT: usize = 16;

    /// Destination for a raw parameter value (wraps).
    pub fn from_index(index: i32) -> Self {
        use LfoDestination::*;
        match index.rem_euclid(Self::COUNT as i32) {
            1 => DryWet,
            2 => Time,
            3 => Diffusion,
            4 => LpDamp,
            5 => InputGain,
            6 => Texture,
            7 => GrainAmount,
            8 => GrainSize,
            9 => GrainDensity,
            10 => GrainPitch,
            11 => GrainPosition,
            12 => ShiftAmount,
            13 => ShiftPitch,
            14 => ShiftSize,
            15 => OtherLfoSpeed,
            _ => Off,
        }
    }

    /// The parameter slot this destination modulates, if any.
    pub fn param(self) -> Option<ParamId> {
        use LfoDestination::*;
        match self {
            Off | OtherLfoSpeed => None,
            DryWet => Some(ParamId::DryWet),
            Time => Some(ParamId::Time),
            Diffusion => Some(ParamId::Diffusion),
            LpDamp => Some(ParamId::LpDamp),
            InputGain => Some(ParamId::InputGain),
            Texture => Some(ParamId::Texture),
            GrainAmount => Some(ParamId::GrainAmount),
            GrainSize => Some(ParamId::GrainSize),
            GrainDensity => Some(ParamId::GrainDensity),
            GrainPitch => Some(ParamId::GrainPitch),
            GrainPosition => Some(ParamId::GrainPosition),
            ShiftAmount => Some(ParamId::ShiftAmount),
            ShiftPitch => Some(ParamId::ShiftPitch),
            ShiftSize => Some(ParamId::ShiftSize),
        }
    }

    /// Display label as seen from LFO number `lfo` (0-based).
    pub fn label(self, lfo: usize) -> &'static str {
        match self {
            LfoDestination::Off => "OFF",
            LfoDestination::OtherLfoSpeed => {
                if lfo == 0 {
                    "LFO2 SPD"
                } else {
                    "LFO1 SPD"
                }
            }
            other => other.param().map_or("OFF", |p| p.descriptor().name),
        }
    }
}

/// Where modulated parameter values land.
pub trait ModulationSink {
    /// Un-modulated raw value of a slot.
    fn nominal(&self, param: ParamId) -> f32;

    /// Apply a (possibly fractional) raw value to the slot's consumer.
    fn apply(&mut self, param: ParamId, raw: f32);
}

struct Route {
    lfo: Lfo,
    destination: LfoDestination,
    /// Un-modulated 0..127 speed.
    speed: f32,
    /// Destination to put back to nominal on the next block.
    stale: Option<LfoDestination>,
    last_output: f32,
}

pub struct ModulationHub {
    routes: [Route; LFO_COUNT],
}

impl ModulationHub {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let route = |n: u64| {
            let mut lfo = Lfo::new(sample_rate, seed.wrapping_add(n));
            lfo.set_speed(64.0 / SPEED_MAX);
            Route {
                lfo,
                destination: LfoDestination::Off,
                speed: 64.0,
                stale: None,
                last_output: 0.0,
            }
        };
        Self {
            routes: [route(1), route(2)],
        }
    }

    /// Restart both LFO cycles.
    pub fn reset(&mut self) {
        for route in self.routes.iter_mut() {
            route.lfo.reset();
            route.last_output = 0.0;
        }
    }

    pub fn set_destination(&mut self, lfo: usize, destination: LfoDestination) {
        let Some(route) = self.routes.get_mut(lfo) else {
            return;
        };
        if route.destination == destination {
            return;
        }
        debug!(
            "LFO{} destination {} -> {}",
            lfo + 1,
            route.destination.label(lfo),
            destination.label(lfo)
        );
        // Keep the oldest pending restore; it is the one still modulated
        if route.stale.is_none() {
            route.stale = Some(route.destination);
        }
        route.destination = destination;
    }

    /// Nominal speed from the raw 0..127 slot value.
    pub fn set_speed(&mut self, lfo: usize, raw: f32) {
        if let Some(route) = self.routes.get_mut(lfo) {
            route.speed = raw.clamp(0.0, SPEED_MAX);
            route.lfo.set_speed(route.speed / SPEED_MAX);
        }
    }

    pub fn set_depth(&mut self, lfo: usize, depth: f32) {
        if let Some(route) = self.routes.get_mut(lfo) {
            route.lfo.set_depth(depth);
        }
    }

    pub fn set_waveform(&mut self, lfo: usize, waveform: LfoWaveform) {
        if let Some(route) = self.routes.get_mut(lfo) {
            route.lfo.set_waveform(waveform);
        }
    }

    pub fn destination(&self, lfo: usize) -> LfoDestination {
        self.routes
            .get(lfo)
            .map_or(LfoDestination::Off, |r| r.destination)
    }

    pub fn lfo(&self, lfo: usize) -> Option<&Lfo> {
        self.routes.get(lfo).map(|r| &r.lfo)
    }

    /// Output of each LFO in the most recent block.
    pub fn last_output(&self, lfo: usize) -> f32 {
        self.routes.get(lfo).map_or(0.0, |r| r.last_output)
    }

    /// Advance both LFOs by one block of `frames` and apply their offsets.
    pub fn process(&mut self, frames: usize, sink: &mut impl ModulationSink) {
        for index in 0..LFO_COUNT {
            self.restore_stale(index, sink);
        }
        for index in 0..LFO_COUNT {
            self.run(index, frames, sink);
        }
    }

    fn restore_stale(&mut self, index: usize, sink: &mut impl ModulationSink) {
        let other = 1 - index;
        match self.routes[index].stale.take() {
            Some(LfoDestination::OtherLfoSpeed) => {
                let speed = self.routes[other].speed;
                self.routes[other].lfo.set_speed(speed / SPEED_MAX);
            }
            Some(stale) => {
                if let Some(param) = stale.param() {
                    // Another LFO may still own it; the run below re-applies
                    sink.apply(param, sink.nominal(param));
                }
            }
            None => {}
        }
    }

    fn run(&mut self, index: usize, frames: usize, sink: &mut impl ModulationSink) {
        let output = self.routes[index].lfo.process(frames);
        self.routes[index].last_output = output;

        match self.routes[index].destination {
            LfoDestination::Off => {}
            LfoDestination::OtherLfoSpeed => {
                let other = &mut self.routes[1 - index];
                let speed = (other.speed + output * SPEED_MAX * 0.5).clamp(0.0, SPEED_MAX);
                other.lfo.set_speed(speed / SPEED_MAX);
            }
            destination => {
                if let Some(param) = destination.param() {
                    let d = param.descriptor();
                    let raw = (sink.nominal(param) + output * param.half_range())
                        .clamp(d.min as f32, d.max as f32);
                    sink.apply(param, raw);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::lfo::{MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};
    use std::collections::HashMap;

    const SR: f32 = 48_000.0;

    #[derive(Default)]
    struct RecordingSink {
        nominal: HashMap<ParamId, f32>,
        applied: Vec<(ParamId, f32)>,
    }

    impl ModulationSink for RecordingSink {
        fn nominal(&self, param: ParamId) -> f32 {
            self.nominal
                .get(&param)
                .copied()
                .unwrap_or(param.descriptor().default as f32)
        }

        fn apply(&mut self, param: ParamId, raw: f32) {
            self.applied.push((param, raw));
        }
    }

    #[test]
    fn test_destination_from_index() {
        assert_eq!(LfoDestination::from_index(0), LfoDestination::Off);
        assert_eq!(LfoDestination::from_index(11), LfoDestination::GrainPosition);
        assert_eq!(LfoDestination::from_index(12), LfoDestination::ShiftAmount);
        assert_eq!(LfoDestination::from_index(15), LfoDestination::OtherLfoSpeed);
        assert_eq!(LfoDestination::from_index(16), LfoDestination::Off);
        assert_eq!(LfoDestination::GrainPosition.param(), Some(ParamId::GrainPosition));
        assert_eq!(LfoDestination::OtherLfoSpeed.param(), None);
    }

    #[test]
    fn test_off_applies_nothing() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_depth(0, 1.0);
        let mut sink = RecordingSink::default();
        hub.process(64, &mut sink);
        assert!(sink.applied.is_empty());
    }

    #[test]
    fn test_offset_is_clamped_to_slot_range() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_destination(0, LfoDestination::Time);
        hub.set_depth(0, 1.0);
        hub.set_waveform(0, LfoWaveform::Ramp);

        let mut sink = RecordingSink::default();
        sink.nominal.insert(ParamId::Time, 120.0);
        for _ in 0..2000 {
            hub.process(64, &mut sink);
        }
        assert!(!sink.applied.is_empty());
        for &(param, raw) in &sink.applied {
            assert_eq!(param, ParamId::Time);
            assert!((0.0..=127.0).contains(&raw), "raw {} out of range", raw);
        }
        // Ramp starts at +1: clamped at the top
        assert_eq!(sink.applied[0].1, 127.0);
    }

    #[test]
    fn test_full_depth_swings_half_range() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_destination(1, LfoDestination::DryWet);
        hub.set_depth(1, 1.0);
        hub.set_waveform(1, LfoWaveform::Ramp);

        let mut sink = RecordingSink::default();
        hub.process(64, &mut sink);
        // Nominal 100 + 1.0 * 200/2
        assert_eq!(sink.applied, vec![(ParamId::DryWet, 200.0)]);
    }

    #[test]
    fn test_changed_destination_is_restored() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_destination(0, LfoDestination::Texture);
        hub.set_depth(0, 1.0);
        let mut sink = RecordingSink::default();
        hub.process(64, &mut sink);

        hub.set_destination(0, LfoDestination::Off);
        sink.applied.clear();
        hub.process(64, &mut sink);
        assert_eq!(sink.applied, vec![(ParamId::Texture, 0.0)]);

        sink.applied.clear();
        hub.process(64, &mut sink);
        assert!(sink.applied.is_empty());
    }

    #[test]
    fn test_cross_modulation_stays_in_speed_range() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_destination(0, LfoDestination::OtherLfoSpeed);
        hub.set_depth(0, 1.0);
        hub.set_speed(0, 0.0);
        hub.set_speed(1, 127.0);

        let mut sink = RecordingSink::default();
        let mut min_seen = f32::MAX;
        let mut max_seen = f32::MIN;
        // LFO 1 at its slowest: 20 s cycle, 15000 blocks
        for _ in 0..16_000 {
            hub.process(64, &mut sink);
            let f = hub.lfo(1).map(Lfo::frequency).unwrap_or_default();
            min_seen = min_seen.min(f);
            max_seen = max_seen.max(f);
        }
        assert!(min_seen >= MIN_FREQUENCY_HZ && max_seen <= MAX_FREQUENCY_HZ);
        assert!(max_seen - min_seen > 1.0, "LFO2 speed never moved");
        assert!(sink.applied.is_empty());
    }

    #[test]
    fn test_cross_modulation_reaches_lfo2_same_block() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_destination(0, LfoDestination::OtherLfoSpeed);
        hub.set_waveform(0, LfoWaveform::Ramp);
        hub.set_depth(0, 1.0);
        hub.set_speed(1, 0.0);

        let mut sink = RecordingSink::default();
        hub.process(64, &mut sink);
        // Ramp at +1 pushes LFO2 from 0 up by half the speed range
        let expected = crate::dsp::lfo::speed_to_frequency(0.5);
        let actual = hub.lfo(1).map(Lfo::frequency).unwrap_or_default();
        assert!((actual - expected).abs() < 1e-4, "{} vs {}", actual, expected);
    }

    #[test]
    fn test_cross_modulation_reaches_lfo1_next_block() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_destination(1, LfoDestination::OtherLfoSpeed);
        hub.set_waveform(1, LfoWaveform::Ramp);
        hub.set_depth(1, 1.0);
        hub.set_speed(0, 0.0);

        let slow = crate::dsp::lfo::speed_to_frequency(0.0);
        let fast = crate::dsp::lfo::speed_to_frequency(0.5);
        let mut sink = RecordingSink::default();

        // LFO 1 already ran this block at its old speed
        hub.process(64, &mut sink);
        let lfo1 = hub.lfo(0).map(|l| (l.phase(), l.frequency())).unwrap_or_default();
        assert!((lfo1.0 - slow * 64.0 / SR).abs() < 1e-7, "phase {}", lfo1.0);
        assert!((lfo1.1 - fast).abs() < 1e-4, "frequency {}", lfo1.1);

        // The next block advances at the new speed
        hub.process(64, &mut sink);
        let phase = hub.lfo(0).map(Lfo::phase).unwrap_or_default();
        let expected = (slow + fast) * 64.0 / SR;
        assert!((phase - expected).abs() < 1e-6, "{} vs {}", phase, expected);
    }

    #[test]
    fn test_leaving_speed_destination_restores_speed() {
        let mut hub = ModulationHub::new(SR, 0);
        hub.set_speed(1, 10.0);
        hub.set_destination(0, LfoDestination::OtherLfoSpeed);
        hub.set_waveform(0, LfoWaveform::Ramp);
        hub.set_depth(0, 1.0);
        let mut sink = RecordingSink::default();
        hub.process(64, &mut sink);

        hub.set_destination(0, LfoDestination::Off);
        hub.process(64, &mut sink);
        let expected = crate::dsp::lfo::speed_to_frequency(10.0 / 127.0);
        let actual = hub.lfo(1).map(Lfo::frequency).unwrap_or_default();
        assert!((actual - expected).abs() < 1e-5);
    }

    #[test]
    fn test_labels() {
        assert_eq!(LfoDestination::Off.label(0), "OFF");
        assert_eq!(LfoDestination::GrainPitch.label(1), "GRN PTCH");
        assert_eq!(LfoDestination::ShiftSize.label(0), "SFT SZ");
        assert_eq!(LfoDestination::OtherLfoSpeed.label(1), "LFO1 SPD");
    }
}
