//! Presets are plain data: one raw value per parameter slot.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::params::{ParamId, DEFAULT_VALUES, PARAM_COUNT};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub values: [i32; PARAM_COUNT],
}

impl Preset {
    pub fn new(name: impl Into<String>, values: [i32; PARAM_COUNT]) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Every parameter at its default ("INIT").
    pub fn init() -> Self {
        Self::new("INIT", DEFAULT_VALUES)
    }

    /// Builder-style override of one slot. The value is clamped when the
    /// preset is loaded, not here.
    pub fn with(mut self, id: ParamId, value: i32) -> Self {
        self.values[id.index()] = value;
        self
    }

    pub fn value(&self, id: ParamId) -> i32 {
        self.values[id.index()]
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::init()
    }
}
