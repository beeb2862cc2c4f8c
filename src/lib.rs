//! Profiler Monitor - live performance/slot monitor for Kemper Profiler
//!
//! Connects to the amplifier over MIDI, follows performance and slot changes
//! and keeps the displayed names current by querying the device over SysEx.

pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod display;
pub mod error;
pub mod frame;
pub mod midi;
pub mod monitor;
pub mod protocol;
pub mod state;
pub mod transport;
