//! The fixed parameter table: ids, ranges, defaults and value mappings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{dsp::lfo::LfoWaveform, modulation::LfoDestination};

/*
Parameters
==========

The host addresses 24 integer slots. Every raw value is clamped to its
slot's range on entry; there is no rejection path.

Raw values are what the host sees and what presets store. The stages work
on mapped values, derived per slot:

    DRY/WET   0..200   →  0.0..1.0
    TIME      0..127   →  v/128, capped at 0.99 (loop gain stays < 1)
    DIFFUSN   0..127   →  0.0..0.75 allpass coefficient
    LP DAMP   0..127   →  0.3..0.95 damping coefficient
    IN GAIN   0..127   →  0.0..0.5
    pitches   0..127   →  ±24 semitones around 64
    the rest  0..127   →  0.0..1.0

Most mapped values feed a smoother; GRAIN POS and FREEZE go to the grain
stage directly, and the LFO slots configure the modulation hub.
*/

pub const PARAM_COUNT: usize = 24;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamId {
    DryWet = 0,
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
    Freeze,
    ShiftAmount,
    ShiftPitch,
    ShiftSize,
    Reserved,
    Lfo1Destination,
    Lfo1Speed,
    Lfo1Depth,
    Lfo1Waveform,
    Lfo2Destination,
    Lfo2Speed,
    Lfo2Depth,
    Lfo2Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

const fn desc(name: &'static str, min: i32, max: i32, default: i32) -> ParamDescriptor {
    ParamDescriptor {
        name,
        min,
        max,
        default,
    }
}

pub const DESCRIPTORS: [ParamDescriptor; PARAM_COUNT] = [
    desc("DRY/WET", 0, 200, 100),
    desc("TIME", 0, 127, 70),
    desc("DIFFUSN", 0, 127, 70),
    desc("LP DAMP", 0, 127, 100),
    desc("IN GAIN", 0, 127, 50),
    desc("TEXTURE", 0, 127, 0),
    desc("GRN AMT", 0, 127, 0),
    desc("GRN SZ", 0, 127, 64),
    desc("GRN DNS", 0, 127, 64),
    desc("GRN PTCH", 0, 127, 64),
    desc("GRN POS", 0, 127, 64),
    desc("FREEZE", 0, 1, 0),
    desc("SFT AMT", 0, 127, 0),
    desc("SFT PTCH", 0, 127, 64),
    desc("SFT SZ", 0, 127, 64),
    desc("", 0, 0, 0),
    desc("L1 DEST", 0, 15, 0),
    desc("L1 SPD", 0, 127, 64),
    desc("L1 DPTH", 0, 127, 0),
    desc("L1 WAVE", 0, 2, 0),
    desc("L2 DEST", 0, 15, 0),
    desc("L2 SPD", 0, 127, 64),
    desc("L2 DPTH", 0, 127, 0),
    desc("L2 WAVE", 0, 2, 0),
];

pub const DEFAULT_VALUES: [i32; PARAM_COUNT] = {
    let mut values = [0; PARAM_COUNT];
    let mut i = 0;
    while i < PARAM_COUNT {
        values[i] = DESCRIPTORS[i].default;
        i += 1;
    }
    values
};

const ALL: [ParamId; PARAM_COUNT] = [
    ParamId::DryWet,
    ParamId::Time,
    ParamId::Diffusion,
    ParamId::LpDamp,
    ParamId::InputGain,
    ParamId::Texture,
    ParamId::GrainAmount,
    ParamId::GrainSize,
    ParamId::GrainDensity,
    ParamId::GrainPitch,
    ParamId::GrainPosition,
    ParamId::Freeze,
    ParamId::ShiftAmount,
    ParamId::ShiftPitch,
    ParamId::ShiftSize,
    ParamId::Reserved,
    ParamId::Lfo1Destination,
    ParamId::Lfo1Speed,
    ParamId::Lfo1Depth,
    ParamId::Lfo1Waveform,
    ParamId::Lfo2Destination,
    ParamId::Lfo2Speed,
    ParamId::Lfo2Depth,
    ParamId::Lfo2Waveform,
];

/// Which LFO setting an LFO slot controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoControl {
    Destination,
    Speed,
    Depth,
    Waveform,
}

const PITCH_CENTER: f32 = 64.0;
const SEMITONES_PER_STEP: f32 = 24.0 / 64.0;

impl ParamId {
    pub fn all() -> impl Iterator<Item = ParamId> {
        ALL.into_iter()
    }

    pub fn from_index(index: u8) -> Option<Self> {
        ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn descriptor(self) -> &'static ParamDescriptor {
        &DESCRIPTORS[self.index()]
    }

    pub fn clamp(self, raw: i32) -> i32 {
        let d = self.descriptor();
        raw.clamp(d.min, d.max)
    }

    /// Half the slot's range: how far a full-depth LFO swings it.
    pub fn half_range(self) -> f32 {
        let d = self.descriptor();
        (d.max - d.min) as f32 * 0.5
    }

    /// Whether the mapped value glides through the smoother bank.
    pub fn is_smoothed(self) -> bool {
        matches!(
            self,
            ParamId::DryWet
                | ParamId::Time
                | ParamId::Diffusion
                | ParamId::LpDamp
                | ParamId::InputGain
                | ParamId::Texture
                | ParamId::GrainAmount
                | ParamId::GrainSize
                | ParamId::GrainDensity
                | ParamId::GrainPitch
                | ParamId::ShiftAmount
                | ParamId::ShiftPitch
                | ParamId::ShiftSize
        )
    }

    /// Map a (possibly fractional, modulated) raw value to the value the
    /// stage consumes.
    pub fn map(self, raw: f32) -> f32 {
        match self {
            ParamId::DryWet => raw / 200.0,
            ParamId::Time => (raw / 128.0).min(0.99),
            ParamId::Diffusion => raw / 127.0 * 0.75,
            ParamId::LpDamp => 0.3 + raw / 127.0 * 0.65,
            ParamId::InputGain => raw / 127.0 * 0.5,
            ParamId::GrainPitch | ParamId::ShiftPitch => (raw - PITCH_CENTER) * SEMITONES_PER_STEP,
            ParamId::Freeze => {
                if raw != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ParamId::Texture
            | ParamId::GrainAmount
            | ParamId::GrainSize
            | ParamId::GrainDensity
            | ParamId::GrainPosition
            | ParamId::ShiftAmount
            | ParamId::ShiftSize
            | ParamId::Lfo1Depth
            | ParamId::Lfo2Depth
            | ParamId::Lfo1Speed
            | ParamId::Lfo2Speed => raw / 127.0,
            ParamId::Reserved
            | ParamId::Lfo1Destination
            | ParamId::Lfo1Waveform
            | ParamId::Lfo2Destination
            | ParamId::Lfo2Waveform => raw,
        }
    }

    /// LFO index and setting for the LFO slots.
    pub fn lfo_control(self) -> Option<(usize, LfoControl)> {
        match self {
            ParamId::Lfo1Destination => Some((0, LfoControl::Destination)),
            ParamId::Lfo1Speed => Some((0, LfoControl::Speed)),
            ParamId::Lfo1Depth => Some((0, LfoControl::Depth)),
            ParamId::Lfo1Waveform => Some((0, LfoControl::Waveform)),
            ParamId::Lfo2Destination => Some((1, LfoControl::Destination)),
            ParamId::Lfo2Speed => Some((1, LfoControl::Speed)),
            ParamId::Lfo2Depth => Some((1, LfoControl::Depth)),
            ParamId::Lfo2Waveform => Some((1, LfoControl::Waveform)),
            _ => None,
        }
    }

    /// Short display label for enum-valued slots.
    pub fn value_label(self, raw: i32) -> Option<&'static str> {
        match self.lfo_control() {
            Some((lfo, LfoControl::Destination)) => {
                Some(LfoDestination::from_index(self.clamp(raw)).label(lfo))
            }
            Some((_, LfoControl::Waveform)) => Some(LfoWaveform::from_index(self.clamp(raw)).label()),
            _ => None,
        }
    }
}
