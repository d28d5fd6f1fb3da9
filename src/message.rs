#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::params::PARAM_COUNT;

/// Control change sent from a host/UI thread to the audio thread.
///
/// `Copy` so nothing is allocated or freed on the audio side.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    SetParameter { id: u8, value: i32 },
    /// Raw values for every parameter slot, applied in id order.
    LoadPreset([i32; PARAM_COUNT]),
    Reset,
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

/// Plain queue for tests and offline rendering.
impl MessageReceiver for std::collections::VecDeque<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        self.pop_front()
    }
}
