//! Scripted transport and backend for tests

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use super::{DeviceId, DeviceInfo, MidiBackend, Transport};
use crate::error::{DeviceError, Direction};
use crate::frame::RawEvent;
use crate::midi::pack_message;

#[derive(Default)]
struct Shared {
    inbox: VecDeque<RawEvent>,
    sent: Vec<Vec<u8>>,
    fail_writes: Option<String>,
}

/// In-memory transport; the paired `MockHandle` feeds and inspects it
pub struct MockTransport {
    shared: Arc<Mutex<Shared>>,
}

/// Test-side view of a `MockTransport`
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: shared.clone(),
            },
            MockHandle { shared },
        )
    }
}

impl MockHandle {
    /// Queue a complete message, packed the way a backend would
    pub fn push_message(&self, data: &[u8]) {
        let mut shared = self.shared.lock();
        for word in pack_message(data) {
            shared.inbox.push_back(RawEvent::new(word, 0));
        }
    }

    /// Queue one raw packed event
    pub fn push_word(&self, word: u32) {
        self.shared.lock().inbox.push_back(RawEvent::new(word, 0));
    }

    /// Everything written so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.lock().sent.clone()
    }

    pub fn pending(&self) -> usize {
        self.shared.lock().inbox.len()
    }

    /// Make every following write fail with `cause`
    pub fn fail_writes(&self, cause: &str) {
        self.shared.lock().fail_writes = Some(cause.to_string());
    }
}

impl Transport for MockTransport {
    fn poll(&mut self) -> bool {
        !self.shared.lock().inbox.is_empty()
    }

    fn read_one(&mut self) -> Option<RawEvent> {
        self.shared.lock().inbox.pop_front()
    }

    fn send_sysex(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        let mut shared = self.shared.lock();
        if let Some(cause) = &shared.fail_writes {
            return Err(DeviceError::TransportWrite(cause.clone()));
        }
        shared.sent.push(bytes.to_vec());
        Ok(())
    }
}

/// Backend whose device list changes per discovery attempt
pub struct MockBackend {
    /// Device lists for successive attempts; the last one repeats
    pub attempts: VecDeque<Vec<DeviceInfo>>,
    pub init_error: Option<String>,
    pub open_error: Option<(Direction, String)>,
    pub initialize_calls: usize,
    pub terminate_calls: usize,
    pub opened: Option<(DeviceId, DeviceId, usize)>,
    /// Handle of the last transport handed out
    pub handle: Option<MockHandle>,
    current: Vec<DeviceInfo>,
}

impl MockBackend {
    pub fn new(attempts: Vec<Vec<DeviceInfo>>) -> Self {
        Self {
            attempts: attempts.into(),
            init_error: None,
            open_error: None,
            initialize_calls: 0,
            terminate_calls: 0,
            opened: None,
            handle: None,
            current: Vec::new(),
        }
    }
}

impl MidiBackend for MockBackend {
    type Transport = MockTransport;

    fn initialize(&mut self) -> Result<(), DeviceError> {
        self.initialize_calls += 1;
        if let Some(cause) = &self.init_error {
            return Err(DeviceError::SubsystemInit(cause.clone()));
        }
        if self.attempts.len() > 1 {
            self.current = self.attempts.pop_front().unwrap_or_default();
        } else if let Some(last) = self.attempts.front() {
            self.current = last.clone();
        }
        Ok(())
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.current.clone()
    }

    fn terminate(&mut self) {
        self.terminate_calls += 1;
        self.current.clear();
    }

    fn open(
        &mut self,
        input: DeviceId,
        output: DeviceId,
        buffer_size: usize,
    ) -> Result<MockTransport, DeviceError> {
        if let Some((direction, cause)) = &self.open_error {
            return Err(DeviceError::TransportOpen {
                direction: *direction,
                cause: cause.clone(),
            });
        }
        self.opened = Some((input, output, buffer_size));
        let (transport, handle) = MockTransport::new();
        self.handle = Some(handle);
        Ok(transport)
    }
}
