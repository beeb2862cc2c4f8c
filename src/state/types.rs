//! Device state type definitions

use std::fmt;

use crate::protocol::SLOT_COUNT;

/// Longest name kept for a performance or slot, in bytes
pub const MAX_NAME_LEN: usize = 32;

/// Shown until the device answers a name query
pub const PLACEHOLDER_NAME: &str = "load";

/// Connection to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Waiting for the device to show up
    #[default]
    Disconnected,
    /// Transport failure; terminal until the process restarts
    Error,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Error => write!(f, "error"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Performance or slot name, at most `MAX_NAME_LEN` bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceName(String);

impl DeviceName {
    /// Build a name, truncating to `MAX_NAME_LEN` on a char boundary
    pub fn new(text: &str) -> Self {
        let mut end = text.len().min(MAX_NAME_LEN);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Self(text[..end].to_string())
    }

    pub fn placeholder() -> Self {
        Self(PLACEHOLDER_NAME.to_string())
    }

    /// Decode the name field of a status reply.
    ///
    /// Stops at the first NUL; non-UTF-8 bytes are replaced.
    pub fn from_wire(bytes: &[u8]) -> Self {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let bytes = &bytes[..end.min(MAX_NAME_LEN)];
        Self::new(&String::from_utf8_lossy(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == PLACEHOLDER_NAME
    }
}

impl Default for DeviceName {
    fn default() -> Self {
        Self::placeholder()
    }
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of the device status
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    pub connection: ConnectionState,
    /// Set only while `connection` is `Error`
    pub error_message: Option<String>,
    /// Performance index reported by the device, `None` before the first change
    pub current_performance: Option<u8>,
    /// Always a valid index into `slot_names`
    pub current_slot: usize,
    pub performance_name: DeviceName,
    pub slot_names: [DeviceName; SLOT_COUNT],
}

impl DeviceStatus {
    /// Name of the active slot
    pub fn current_slot_name(&self) -> &DeviceName {
        &self.slot_names[self.current_slot]
    }
}
