//! Reader loop
//!
//! Polls the transport at a fixed cadence and pushes whatever arrives through
//! reassembly, decoding and the state store. A performance change triggers
//! fresh name queries from the same task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::connector::DeviceConnector;
use crate::dispatcher::QueryDispatcher;
use crate::error::DeviceError;
use crate::frame::FrameReassembler;
use crate::protocol::decode;
use crate::state::StateStore;
use crate::transport::{MidiBackend, Transport};


/// Cooperative stop request shared by the background loops
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Owns the transport and is the only writer of the state store
pub struct Monitor<T: Transport> {
    transport: T,
    store: StateStore,
    dispatcher: QueryDispatcher,
    reassembler: FrameReassembler,
    poll_interval: Duration,
}

impl<T: Transport> Monitor<T> {
    pub fn new(transport: T, store: StateStore, poll_interval: Duration) -> Self {
        Self {
            transport,
            dispatcher: QueryDispatcher::new(store.clone()),
            store,
            reassembler: FrameReassembler::new(),
            poll_interval,
        }
    }

    /// Connect through `connector` and send the initial name queries
    pub async fn connect<B>(
        connector: &mut DeviceConnector<B>,
        store: StateStore,
        poll_interval: Duration,
    ) -> Result<Self, DeviceError>
    where
        B: MidiBackend<Transport = T>,
    {
        let transport = connector.connect().await?;
        let mut monitor = Self::new(transport, store, poll_interval);
        monitor.dispatcher.query_all(&mut monitor.transport)?;
        Ok(monitor)
    }

    /// One poll cycle: at most one frame is read and applied.
    ///
    /// Returns an error only when a query write failed, which ends the
    /// session.
    pub fn step(&mut self) -> Result<(), DeviceError> {
        if !self.transport.poll() {
            return Ok(());
        }

        let Some(frame) = self.reassembler.next_frame(&mut self.transport) else {
            return Ok(());
        };
        let Some(event) = decode(&frame, self.store.current_performance()) else {
            return Ok(());
        };

        debug!("Event: {:?}", event);
        if self.store.apply(&event) {
            self.dispatcher.query_all(&mut self.transport)?;
        }
        Ok(())
    }

    /// Run until `shutdown` is triggered or the session fails
    pub async fn run(mut self, shutdown: ShutdownFlag) {
        info!("Reader loop started (poll every {:?})", self.poll_interval);

        while !shutdown.is_triggered() {
            if let Err(e) = self.step() {
                warn!("Reader loop stopped: {}", e);
                return;
            }
            sleep(self.poll_interval).await;
        }

        info!("Reader loop stopped");
    }
}
