//! Name queries sent to the device
//!
//! After connecting and after every accepted performance change, the device
//! is asked for the performance name and the names of the monitored slots.
//! The replies come back as status SysEx and are picked up by the reader.

use tracing::{debug, trace};

use crate::error::DeviceError;
use crate::midi::format_hex;
use crate::protocol::{Query, NAME_QUERIES};
use crate::state::StateStore;
use crate::transport::Transport;

/// Sends the fixed query table; a failed write moves the store to `Error`
pub struct QueryDispatcher {
    store: StateStore,
    queries: &'static [Query],
}

impl QueryDispatcher {
    pub fn new(store: StateStore) -> Self {
        Self {
            store,
            queries: &NAME_QUERIES,
        }
    }

    /// Send every query in order, stopping at the first failed write
    pub fn query_all<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<(), DeviceError> {
        for query in self.queries {
            if let Err(e) = transport.send_sysex(&query.bytes) {
                self.store.mark_error(&e);
                return Err(e);
            }
            trace!("Query {:?}: {}", query.target, format_hex(&query.bytes));
        }
        debug!("Sent {} name queries", self.queries.len());
        Ok(())
    }
}
