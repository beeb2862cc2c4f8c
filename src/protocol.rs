//! Kemper Profiler status protocol
//!
//! Decodes the two message families the device emits while a performance is
//! played (Control-Change for performance/slot switches, SysEx for names) and
//! describes the name queries sent back to it.

use tracing::trace;

use crate::frame::RawFrame;
use crate::midi::{SYSEX_END, SYSEX_START};
use crate::state::DeviceName;

/// Number of performance slots the monitor tracks (the device has five)
pub const SLOT_COUNT: usize = 3;

/// Advertised device name prefix, matched against port names
pub const DEVICE_NAME_PREFIX: &str = "Profiler";

/// Leading bytes of every status reply carrying a name
pub const STATUS_SIGNATURE: [u8; 12] = [
    SYSEX_START, 0x00, 0x20, 0x33, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x01, 0x00,
];

/// Leading bytes of a name query
pub const QUERY_HEADER: [u8; 12] = [
    SYSEX_START, 0x00, 0x20, 0x33, 0x02, 0x7F, 0x47, 0x00, 0x00, 0x00, 0x01, 0x00,
];

/// Full length of a name query
pub const QUERY_LEN: usize = 14;

/// Frames shorter than this are never status replies
pub const MIN_STATUS_LEN: usize = 11;

/// Signature plus slot indicator
pub const NAME_HEADER_LEN: usize = 13;

/// Header plus the trailing byte reserved before the terminator
pub const NAME_OVERHEAD: usize = 14;

/// Controller reporting a performance change (value = performance index)
pub const CTRL_PERFORMANCE_CHANGE: u8 = 47;

/// Controllers reporting slot selection, first..=last map to slots 0..SLOT_COUNT
pub const CTRL_SLOT_FIRST: u8 = 50;
pub const CTRL_SLOT_LAST: u8 = 52;

/// Value sent with a slot controller when the slot becomes active
pub const SLOT_SELECTED_VALUE: u8 = 1;

/// Which name a status reply or query refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameTarget {
    Performance,
    /// Zero-based slot index
    Slot(usize),
}

impl NameTarget {
    /// Slot indicator byte on the wire (0 = performance, 1.. = slot)
    pub const fn indicator(self) -> u8 {
        match self {
            NameTarget::Performance => 0,
            NameTarget::Slot(index) => index as u8 + 1,
        }
    }

    /// Map a wire indicator back, rejecting slots we don't track
    pub fn from_indicator(indicator: u8) -> Option<Self> {
        match indicator as usize {
            0 => Some(NameTarget::Performance),
            n if n <= SLOT_COUNT => Some(NameTarget::Slot(n - 1)),
            _ => None,
        }
    }
}

/// Semantic event decoded from one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A different performance was loaded; implies slot 0 is active
    PerformanceChanged(u8),
    /// Zero-based slot index, always below `SLOT_COUNT`
    SlotSelected(usize),
    NameReceived { target: NameTarget, name: DeviceName },
}

/// Decode a frame into an event.
///
/// `current_performance` is the index held by the store; a performance change
/// to the same index is suppressed.
pub fn decode(frame: &RawFrame, current_performance: Option<u8>) -> Option<DeviceEvent> {
    match frame {
        RawFrame::ControlChange { controller, value } => {
            decode_control_change(*controller, *value, current_performance)
        }
        RawFrame::SysEx { bytes, terminated } => {
            if !terminated {
                return None;
            }
            decode_sysex(bytes)
        }
    }
}

fn decode_control_change(
    controller: u8,
    value: u8,
    current_performance: Option<u8>,
) -> Option<DeviceEvent> {
    match controller {
        CTRL_PERFORMANCE_CHANGE => {
            if current_performance == Some(value) {
                trace!("Performance {} already active", value);
                return None;
            }
            Some(DeviceEvent::PerformanceChanged(value))
        }
        CTRL_SLOT_FIRST..=CTRL_SLOT_LAST if value == SLOT_SELECTED_VALUE => Some(
            DeviceEvent::SlotSelected((controller - CTRL_SLOT_FIRST) as usize),
        ),
        _ => None,
    }
}

fn decode_sysex(bytes: &[u8]) -> Option<DeviceEvent> {
    // Needs signature, indicator and the trailing byte before the name fits
    if bytes.len() < NAME_OVERHEAD {
        return None;
    }
    if bytes.get(..STATUS_SIGNATURE.len())? != STATUS_SIGNATURE {
        return None;
    }

    let target = NameTarget::from_indicator(bytes[STATUS_SIGNATURE.len()])?;
    let name_len = bytes.len() - NAME_OVERHEAD;
    let name = DeviceName::from_wire(&bytes[NAME_HEADER_LEN..NAME_HEADER_LEN + name_len]);

    Some(DeviceEvent::NameReceived { target, name })
}

/// A name query and the reply it provokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub target: NameTarget,
    pub bytes: [u8; QUERY_LEN],
}

impl Query {
    pub const fn new(target: NameTarget) -> Self {
        let mut bytes = [0u8; QUERY_LEN];
        let mut i = 0;
        while i < QUERY_HEADER.len() {
            bytes[i] = QUERY_HEADER[i];
            i += 1;
        }
        bytes[QUERY_LEN - 2] = target.indicator();
        bytes[QUERY_LEN - 1] = SYSEX_END;
        Self { target, bytes }
    }
}

/// Queries sent after connecting and after every performance change, in order
pub const NAME_QUERIES: [Query; SLOT_COUNT + 1] = [
    Query::new(NameTarget::Performance),
    Query::new(NameTarget::Slot(0)),
    Query::new(NameTarget::Slot(1)),
    Query::new(NameTarget::Slot(2)),
];
