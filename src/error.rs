//! Error types for the device core
//!
//! The `Display` text of each variant is what ends up in
//! `DeviceStatus::error_message` when the store transitions to `Error`.

use std::fmt;
use thiserror::Error;

/// Transport direction, used to label open failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Failures raised by the MIDI subsystem and the transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The MIDI subsystem could not be initialized
    #[error("MIDI subsystem init failed: {0}")]
    SubsystemInit(String),

    /// No input/output pair matched the device prefix (absorbed by the retry loop)
    #[error("no device matching '{prefix}' found")]
    DeviceNotFound { prefix: String },

    /// Opening one direction of the transport failed
    #[error("failed to open {direction} port: {cause}")]
    TransportOpen { direction: Direction, cause: String },

    /// Writing to the device failed
    #[error("failed to write to device: {0}")]
    TransportWrite(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DeviceError::TransportOpen {
            direction: Direction::Output,
            cause: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "failed to open output port: busy");

        let err = DeviceError::DeviceNotFound {
            prefix: "Profiler".to_string(),
        };
        assert_eq!(err.to_string(), "no device matching 'Profiler' found");
    }
}
