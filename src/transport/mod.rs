//! Sound transport: where channel messages are sent and live input comes from.

mod midi;

pub use midi::{MidiIn, MidiOut, PortInfo, list_ports};

use crate::error::Result;

/// Destination of raw MIDI messages.
pub trait Transport {
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        (**self).send(message)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        (**self).send(message)
    }
}

/// Source of live MIDI messages.
///
/// The callback receives a timestamp in microseconds and the raw message, on
/// whatever thread the transport delivers from. Input stops when the returned
/// connection is dropped.
pub trait InputTransport {
    type Connection;

    fn register_callback<F>(self, callback: F) -> Result<Self::Connection>
    where
        F: FnMut(u64, &[u8]) + Send + 'static;
}
