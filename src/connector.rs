//! Device discovery and connection
//!
//! Waits for a Profiler to appear on the MIDI subsystem, then opens both
//! directions. Discovery retries forever at a fixed interval; open failures
//! are terminal and leave the store in `Error`.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::DeviceError;
use crate::state::StateStore;
use crate::transport::{DeviceId, DeviceInfo, MidiBackend};

/// Pick the input and output whose names start with `prefix`.
///
/// When several devices match, the one enumerated last wins for each
/// direction.
pub fn select_devices(devices: &[DeviceInfo], prefix: &str) -> (Option<DeviceId>, Option<DeviceId>) {
    let mut input = None;
    let mut output = None;

    for device in devices.iter().filter(|d| d.name.starts_with(prefix)) {
        if device.input {
            input = Some(device.id);
        }
        if device.output {
            output = Some(device.id);
        }
    }

    (input, output)
}

/// Waits for a Profiler input/output pair and connects to it.
///
/// Port choice follows `select_devices`.
pub struct DeviceConnector<B: MidiBackend> {
    backend: B,
    store: StateStore,
    prefix: String,
    retry_interval: Duration,
    buffer_size: usize,
}

impl<B: MidiBackend> DeviceConnector<B> {
    pub fn new(backend: B, store: StateStore, config: &AppConfig) -> Self {
        Self {
            backend,
            store,
            prefix: config.device.name_prefix.clone(),
            retry_interval: config.timing.retry_interval(),
            buffer_size: config.device.buffer_size,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Block until a matching input/output pair is found, then open it.
    ///
    /// Only subsystem init and open failures return an error; a missing
    /// device is retried indefinitely.
    pub async fn connect(&mut self) -> Result<B::Transport, DeviceError> {
        let mut attempt: u64 = 0;

        let (input, output) = loop {
            attempt += 1;

            if let Err(e) = self.backend.initialize() {
                self.store.mark_error(&e);
                return Err(e);
            }

            match select_devices(&self.backend.devices(), &self.prefix) {
                (Some(input), Some(output)) => break (input, output),
                (input, output) => {
                    let missing = DeviceError::DeviceNotFound {
                        prefix: self.prefix.clone(),
                    };
                    if attempt == 1 {
                        info!("Waiting for device: {}", missing);
                    }
                    debug!(
                        "Discovery attempt #{} (input: {:?}, output: {:?}), retrying in {:?}",
                        attempt, input, output, self.retry_interval
                    );
                }
            }

            self.backend.terminate();
            sleep(self.retry_interval).await;
        };

        info!(
            "Found device matching '{}' after {} attempt(s): input #{}, output #{}",
            self.prefix, attempt, input, output
        );

        let transport = match self.backend.open(input, output, self.buffer_size) {
            Ok(transport) => transport,
            Err(e) => {
                self.store.mark_error(&e);
                return Err(e);
            }
        };

        self.store.mark_connected();
        Ok(transport)
    }
}
