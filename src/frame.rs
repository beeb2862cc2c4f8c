//! Frame reassembly
//!
//! The transport hands out packed 4-byte events. A Control-Change fits in one
//! event, a SysEx message is spread over as many events as it needs. The
//! reassembler turns that stream back into whole frames.

use tracing::{debug, trace};

use crate::midi::{format_hex, unpack, BYTES_PER_EVENT, CONTROL_CHANGE, SYSEX_END, SYSEX_START};
use crate::transport::Transport;

/// Maximum SysEx frame size kept by the reassembler
pub const SYSEX_BUFFER_SIZE: usize = 48;

/// One packed transport event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Up to four message bytes, first byte in the low octet
    pub message: u32,
    /// Backend timestamp (microseconds for midir)
    pub timestamp: u64,
}

impl RawEvent {
    pub fn new(message: u32, timestamp: u64) -> Self {
        Self { message, timestamp }
    }

    pub fn status(&self) -> u8 {
        (self.message & 0xFF) as u8
    }

    pub fn data1(&self) -> u8 {
        ((self.message >> 8) & 0xFF) as u8
    }

    pub fn data2(&self) -> u8 {
        ((self.message >> 16) & 0xFF) as u8
    }

    pub fn bytes(&self) -> [u8; BYTES_PER_EVENT] {
        unpack(self.message)
    }
}

/// A reassembled message, consumed right away by the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    ControlChange { controller: u8, value: u8 },
    SysEx { bytes: Vec<u8>, terminated: bool },
}

/// Rebuilds frames from the packed event stream.
///
/// Nothing is carried over between calls: a SysEx that is still open when the
/// transport runs dry is dropped.
#[derive(Debug)]
pub struct FrameReassembler {
    buffer: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(SYSEX_BUFFER_SIZE),
        }
    }

    /// Read the next event and return the frame it starts, if any
    pub fn next_frame<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<RawFrame> {
        let event = transport.read_one()?;

        match event.status() {
            SYSEX_START => self.collect_sysex(event, transport),
            CONTROL_CHANGE => Some(RawFrame::ControlChange {
                controller: event.data1(),
                value: event.data2(),
            }),
            status => {
                trace!("Ignoring event with status {:02X}", status);
                None
            }
        }
    }

    fn collect_sysex<T: Transport + ?Sized>(
        &mut self,
        first: RawEvent,
        transport: &mut T,
    ) -> Option<RawFrame> {
        self.buffer.clear();
        let mut overflowed = false;
        let mut event = first;

        loop {
            for byte in event.bytes() {
                if self.buffer.len() < SYSEX_BUFFER_SIZE {
                    self.buffer.push(byte);
                } else {
                    overflowed = true;
                }

                if byte == SYSEX_END {
                    if overflowed {
                        debug!(
                            "Dropping SysEx longer than {} bytes",
                            SYSEX_BUFFER_SIZE
                        );
                        return None;
                    }
                    trace!("SysEx frame: {}", format_hex(&self.buffer));
                    return Some(RawFrame::SysEx {
                        bytes: self.buffer.clone(),
                        terminated: true,
                    });
                }
            }

            event = match transport.read_one() {
                Some(next) => next,
                None => break,
            };
        }

        trace!(
            "Discarding unterminated SysEx ({} bytes): {}",
            self.buffer.len(),
            format_hex(&self.buffer)
        );
        None
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}
