//! midir-backed implementation of the transport boundary

use crossbeam::channel::{self, Receiver, Sender};
use midir::{
    Ignore, MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use tracing::{debug, info, trace, warn};

use super::{DeviceId, DeviceInfo, MidiBackend, Transport};
use crate::error::{DeviceError, Direction};
use crate::frame::RawEvent;
use crate::midi::{format_hex, pack_message};

/// Input filter: SysEx and clock pass, Active Sensing (`FE`) is dropped
const INPUT_IGNORE: Ignore = Ignore::ActiveSense;

/// Ports enumerated during one `initialize` call
struct Session {
    midi_in: MidiInput,
    midi_out: MidiOutput,
    in_ports: Vec<MidiInputPort>,
    out_ports: Vec<MidiOutputPort>,
    devices: Vec<DeviceInfo>,
}

/// MIDI subsystem backed by midir
///
/// Inputs and outputs are listed in one id space: inputs first, then outputs.
pub struct MidirBackend {
    client_name: String,
    session: Option<Session>,
}

impl MidirBackend {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            session: None,
        }
    }
}

impl MidiBackend for MidirBackend {
    type Transport = MidirTransport;

    fn initialize(&mut self) -> Result<(), DeviceError> {
        let mut midi_in = MidiInput::new(&format!("{}-in", self.client_name))
            .map_err(|e| DeviceError::SubsystemInit(e.to_string()))?;
        midi_in.ignore(INPUT_IGNORE);
        let midi_out = MidiOutput::new(&format!("{}-out", self.client_name))
            .map_err(|e| DeviceError::SubsystemInit(e.to_string()))?;

        let in_ports = midi_in.ports();
        let out_ports = midi_out.ports();

        let mut devices = Vec::with_capacity(in_ports.len() + out_ports.len());
        for (index, port) in in_ports.iter().enumerate() {
            if let Ok(name) = midi_in.port_name(port) {
                devices.push(DeviceInfo::input(index, name));
            }
        }
        for (index, port) in out_ports.iter().enumerate() {
            if let Ok(name) = midi_out.port_name(port) {
                devices.push(DeviceInfo::output(in_ports.len() + index, name));
            }
        }
        debug!(
            "Enumerated {} input and {} output ports",
            in_ports.len(),
            out_ports.len()
        );

        self.session = Some(Session {
            midi_in,
            midi_out,
            in_ports,
            out_ports,
            devices,
        });
        Ok(())
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.session
            .as_ref()
            .map(|s| s.devices.clone())
            .unwrap_or_default()
    }

    fn terminate(&mut self) {
        self.session = None;
    }

    fn open(
        &mut self,
        input: DeviceId,
        output: DeviceId,
        buffer_size: usize,
    ) -> Result<MidirTransport, DeviceError> {
        let session = self.session.take().ok_or_else(|| DeviceError::TransportOpen {
            direction: Direction::Input,
            cause: "MIDI subsystem not initialized".to_string(),
        })?;

        let in_port = session
            .in_ports
            .get(input)
            .cloned()
            .ok_or_else(|| DeviceError::TransportOpen {
                direction: Direction::Input,
                cause: format!("no input device with id {}", input),
            })?;
        let out_port = output
            .checked_sub(session.in_ports.len())
            .and_then(|index| session.out_ports.get(index))
            .cloned()
            .ok_or_else(|| DeviceError::TransportOpen {
                direction: Direction::Output,
                cause: format!("no output device with id {}", output),
            })?;

        let (event_tx, event_rx) = channel::bounded(buffer_size);
        let input_conn = session
            .midi_in
            .connect(
                &in_port,
                &self.client_name,
                move |timestamp, data, _| {
                    enqueue(&event_tx, timestamp, data);
                },
                (),
            )
            .map_err(|e| DeviceError::TransportOpen {
                direction: Direction::Input,
                cause: e.to_string(),
            })?;

        let output_conn = session
            .midi_out
            .connect(&out_port, &self.client_name)
            .map_err(|e| DeviceError::TransportOpen {
                direction: Direction::Output,
                cause: e.to_string(),
            })?;

        info!("Opened MIDI input #{} and output #{}", input, output);

        Ok(MidirTransport {
            _input_conn: input_conn,
            output_conn,
            events: event_rx,
        })
    }
}

/// Split an incoming message into packed events and queue them.
///
/// A message is queued whole or not at all: a partial SysEx left in the queue
/// would be glued to the next message by the reassembler. The callback is the
/// only producer, so the free space can only grow between check and send.
fn enqueue(event_tx: &Sender<RawEvent>, timestamp: u64, data: &[u8]) -> bool {
    trace!("RX {}", format_hex(data));
    let words = pack_message(data);

    if let Some(capacity) = event_tx.capacity() {
        let free = capacity.saturating_sub(event_tx.len());
        if words.len() > free {
            warn!(
                "MIDI input queue full, dropping {}-byte message ({} free events)",
                data.len(),
                free
            );
            return false;
        }
    }

    for word in words {
        if event_tx.try_send(RawEvent::new(word, timestamp)).is_err() {
            warn!("MIDI input queue closed, dropping event");
            return false;
        }
    }
    true
}

/// Open connection to the device through midir
pub struct MidirTransport {
    _input_conn: MidiInputConnection<()>,
    output_conn: MidiOutputConnection,
    events: Receiver<RawEvent>,
}

// midir connections are only touched from the reader task that owns the transport
unsafe impl Send for MidirTransport {}

impl Transport for MidirTransport {
    fn poll(&mut self) -> bool {
        !self.events.is_empty()
    }

    fn read_one(&mut self) -> Option<RawEvent> {
        self.events.try_recv().ok()
    }

    fn send_sysex(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        self.output_conn
            .send(bytes)
            .map_err(|e| DeviceError::TransportWrite(e.to_string()))?;
        trace!("TX {}", format_hex(bytes));
        Ok(())
    }
}

/// Port listing utilities for `--list-ports`
pub mod discovery {
    use super::*;
    use colored::*;

    /// Enumerate every port the subsystem currently exposes
    pub fn discover_devices(client_name: &str) -> Result<Vec<DeviceInfo>, DeviceError> {
        let mut backend = MidirBackend::new(client_name);
        backend.initialize()?;
        let devices = backend.devices();
        backend.terminate();
        Ok(devices)
    }

    /// Print all ports, marking the ones the connector would consider
    pub fn print_ports(client_name: &str, prefix: &str) -> Result<(), DeviceError> {
        let devices = discover_devices(client_name)?;

        println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());
        for (title, is_input) in [("Input Ports:", true), ("Output Ports:", false)] {
            println!("\n{}", title.bold());
            let ports: Vec<_> = devices
                .iter()
                .filter(|d| if is_input { d.input } else { d.output })
                .collect();
            if ports.is_empty() {
                println!("  {}", "No ports found".dimmed());
            }
            for port in ports {
                let marker = if port.name.starts_with(prefix) {
                    "[MATCH]".green()
                } else {
                    "       ".normal()
                };
                println!("  {} {:>3}: {}", marker, port.id, port.name);
            }
        }
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::pack;

    #[test]
    fn test_input_filter_keeps_sysex() {
        assert!(matches!(INPUT_IGNORE, Ignore::ActiveSense));
    }

    #[test]
    fn test_enqueue_packs_message() {
        let (tx, rx) = channel::bounded(8);
        assert!(enqueue(&tx, 42, &[0xB0, 0x2F, 0x05]));

        let event = rx.try_recv().unwrap();
        assert_eq!(event, RawEvent::new(pack(&[0xB0, 0x2F, 0x05]), 42));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_enqueue_drops_whole_message_when_queue_is_short() {
        let (tx, rx) = channel::bounded(4);
        assert!(enqueue(&tx, 0, &[0xB0, 0x2F, 0x05]));
        assert!(enqueue(&tx, 0, &[0xB0, 0x32, 0x01]));

        // Six words needed, two free: nothing of the reply may be queued
        let reply = [
            0xF0, 0x00, 0x20, 0x33, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, b'L',
            b'e', b'a', b'd', 0x00, 0x00, 0x00, 0xF7,
        ];
        assert!(!enqueue(&tx, 0, &reply));
        assert_eq!(rx.len(), 2);

        // A message that fits still goes through afterwards
        assert!(enqueue(&tx, 0, &[0xB0, 0x33, 0x01]));
        let statuses: Vec<u8> = rx.try_iter().map(|e| e.status()).collect();
        assert_eq!(statuses, vec![0xB0, 0xB0, 0xB0]);
    }

    #[test]
    fn test_enqueue_fills_queue_exactly() {
        let (tx, rx) = channel::bounded(2);
        let sysex = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];
        assert!(enqueue(&tx, 0, &sysex));
        assert_eq!(rx.len(), 2);
        assert!(!enqueue(&tx, 0, &[0xB0, 0x2F, 0x01]));
    }

    #[test]
    fn test_enqueue_after_receiver_dropped() {
        let (tx, rx) = channel::bounded(4);
        drop(rx);
        assert!(!enqueue(&tx, 0, &[0xB0, 0x2F, 0x01]));
    }
}
