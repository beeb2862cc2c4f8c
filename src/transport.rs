//! Transport boundary to the MIDI subsystem
//!
//! The core only needs a handful of capabilities from the OS MIDI layer:
//! enumerate devices, open one input and one output, poll/read packed events
//! and write SysEx. `MidiBackend` and `Transport` capture exactly that so the
//! connector and reader loop can be driven by midir in production and by a
//! scripted backend in tests.

pub mod midir_backend;

#[cfg(test)]
pub mod mock;

use crate::error::DeviceError;
use crate::frame::RawEvent;

pub use midir_backend::{discovery, MidirBackend, MidirTransport};

/// Identifier of a device inside one enumeration of the backend
pub type DeviceId = usize;

/// A device as advertised by the MIDI subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    /// Device can be opened for reading
    pub input: bool,
    /// Device can be opened for writing
    pub output: bool,
}

impl DeviceInfo {
    pub fn input(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            input: true,
            output: false,
        }
    }

    pub fn output(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            input: false,
            output: true,
        }
    }
}

/// An open, bidirectional connection to the device
pub trait Transport: Send {
    /// Non-blocking check for pending input
    fn poll(&mut self) -> bool;

    /// Take the next pending event, `None` when the queue is dry
    fn read_one(&mut self) -> Option<RawEvent>;

    /// Write a complete SysEx message (including `F0`/`F7`)
    fn send_sysex(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;
}

/// Device enumeration and transport construction
pub trait MidiBackend {
    type Transport: Transport;

    /// Bring the MIDI subsystem up; called before every discovery attempt
    fn initialize(&mut self) -> Result<(), DeviceError>;

    /// Devices seen by the last `initialize`, in enumeration order
    fn devices(&self) -> Vec<DeviceInfo>;

    /// Tear the subsystem down after a failed discovery attempt
    fn terminate(&mut self);

    /// Open `input` and `output` with an event queue of `buffer_size`
    fn open(
        &mut self,
        input: DeviceId,
        output: DeviceId,
        buffer_size: usize,
    ) -> Result<Self::Transport, DeviceError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll(&mut self) -> bool {
        (**self).poll()
    }

    fn read_one(&mut self) -> Option<RawEvent> {
        (**self).read_one()
    }

    fn send_sysex(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        (**self).send_sysex(bytes)
    }
}
