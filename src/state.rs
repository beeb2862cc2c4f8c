//! Device state - the single record of what the Profiler is doing
//!
//! The reader task is the only writer; the display reads snapshots.

mod store;
mod types;

pub use store::StateStore;
pub use types::{ConnectionState, DeviceName, DeviceStatus, MAX_NAME_LEN, PLACEHOLDER_NAME};
