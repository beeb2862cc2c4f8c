//! StateStore - shared device status guarded by one lock
//!
//! Every mutation and every snapshot takes the same mutex for the duration of
//! one field-group update or one copy, never across transport I/O.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::types::{ConnectionState, DeviceName, DeviceStatus};
use crate::protocol::{DeviceEvent, NameTarget, SLOT_COUNT};

/// Shared handle to the one `DeviceStatus` of the process
#[derive(Clone, Default)]
pub struct StateStore {
    status: Arc<Mutex<DeviceStatus>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a decoded event.
    ///
    /// Returns `true` when the event invalidated the names and fresh queries
    /// should be sent to the device.
    pub fn apply(&self, event: &DeviceEvent) -> bool {
        let mut status = self.status.lock();

        match event {
            DeviceEvent::PerformanceChanged(index) => {
                if status.current_performance == Some(*index) {
                    return false;
                }
                status.current_performance = Some(*index);
                status.current_slot = 0;
                status.performance_name = DeviceName::placeholder();
                drop(status);
                info!("Performance changed to {}", index);
                true
            }
            DeviceEvent::SlotSelected(index) => {
                if *index >= SLOT_COUNT {
                    return false;
                }
                status.current_slot = *index;
                drop(status);
                debug!("Slot {} selected", index + 1);
                false
            }
            DeviceEvent::NameReceived { target, name } => {
                match target {
                    NameTarget::Performance => status.performance_name = name.clone(),
                    NameTarget::Slot(index) => match status.slot_names.get_mut(*index) {
                        Some(slot) => *slot = name.clone(),
                        None => return false,
                    },
                }
                drop(status);
                debug!("{:?} name: '{}'", target, name);
                false
            }
        }
    }

    /// Consistent copy of the whole record
    pub fn snapshot(&self) -> DeviceStatus {
        self.status.lock().clone()
    }

    pub fn current_performance(&self) -> Option<u8> {
        self.status.lock().current_performance
    }

    pub fn connection(&self) -> ConnectionState {
        self.status.lock().connection
    }

    /// Both transport directions are open; names go back to the placeholder
    pub fn mark_connected(&self) {
        {
            let mut status = self.status.lock();
            status.connection = ConnectionState::Connected;
            status.error_message = None;
            status.current_slot = 0;
            status.performance_name = DeviceName::placeholder();
            for name in status.slot_names.iter_mut() {
                *name = DeviceName::placeholder();
            }
        }
        info!("Connected to device");
    }

    /// Record a transport failure; the store stays in `Error`
    pub fn mark_error(&self, cause: impl fmt::Display) {
        let message = cause.to_string();
        error!("Device error: {}", message);

        let mut status = self.status.lock();
        status.connection = ConnectionState::Error;
        status.error_message = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn name_event(target: NameTarget, name: &str) -> DeviceEvent {
        DeviceEvent::NameReceived {
            target,
            name: DeviceName::new(name),
        }
    }

    #[test]
    fn test_performance_change_resets_slot_and_name() {
        let store = StateStore::new();
        store.apply(&DeviceEvent::PerformanceChanged(3));
        store.apply(&DeviceEvent::SlotSelected(2));
        store.apply(&name_event(NameTarget::Performance, "Blues"));
        store.apply(&name_event(NameTarget::Slot(0), "Clean"));

        assert!(store.apply(&DeviceEvent::PerformanceChanged(4)));

        let status = store.snapshot();
        assert_eq!(status.current_performance, Some(4));
        assert_eq!(status.current_slot, 0);
        assert!(status.performance_name.is_placeholder());
        // Slot names are refreshed by the follow-up queries, not reset here
        assert_eq!(status.slot_names[0].as_str(), "Clean");
    }

    #[test]
    fn test_repeated_performance_is_noop() {
        let store = StateStore::new();
        store.apply(&DeviceEvent::PerformanceChanged(5));
        store.apply(&DeviceEvent::SlotSelected(1));
        store.apply(&name_event(NameTarget::Performance, "Lead Tone"));
        let before = store.snapshot();

        assert!(!store.apply(&DeviceEvent::PerformanceChanged(5)));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_slot_selection() {
        let store = StateStore::new();
        assert!(!store.apply(&DeviceEvent::SlotSelected(2)));
        assert_eq!(store.snapshot().current_slot, 2);

        // Out of range indices never reach the record
        store.apply(&DeviceEvent::SlotSelected(SLOT_COUNT));
        assert_eq!(store.snapshot().current_slot, 2);
    }

    #[test]
    fn test_names() {
        let store = StateStore::new();
        store.apply(&name_event(NameTarget::Performance, "Lead Tone"));
        store.apply(&name_event(NameTarget::Slot(1), "Crunch"));
        store.apply(&name_event(NameTarget::Slot(7), "Nope"));

        let status = store.snapshot();
        assert_eq!(status.performance_name.as_str(), "Lead Tone");
        assert!(status.slot_names[0].is_placeholder());
        assert_eq!(status.slot_names[1].as_str(), "Crunch");
        assert!(status.slot_names[2].is_placeholder());
    }

    #[test]
    fn test_connection_transitions() {
        let store = StateStore::new();
        assert_eq!(store.connection(), ConnectionState::Disconnected);

        store.apply(&name_event(NameTarget::Slot(0), "Old"));
        store.apply(&DeviceEvent::SlotSelected(1));
        store.mark_connected();
        let status = store.snapshot();
        assert_eq!(status.connection, ConnectionState::Connected);
        assert_eq!(status.current_slot, 0);
        assert!(status.slot_names[0].is_placeholder());

        store.mark_error(DeviceError::TransportWrite("unplugged".to_string()));
        let status = store.snapshot();
        assert_eq!(status.connection, ConnectionState::Error);
        assert_eq!(
            status.error_message.as_deref(),
            Some("failed to write to device: unplugged")
        );
    }

    fn event_strategy() -> impl Strategy<Value = DeviceEvent> {
        prop_oneof![
            (0u8..4).prop_map(DeviceEvent::PerformanceChanged),
            (0usize..SLOT_COUNT).prop_map(DeviceEvent::SlotSelected),
            (0u8..=3, "[a-z]{1,8}").prop_map(|(indicator, name)| DeviceEvent::NameReceived {
                target: NameTarget::from_indicator(indicator).unwrap(),
                name: DeviceName::new(&name),
            }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// A reader racing the writer only ever sees states reachable by
        /// applying a prefix of the event sequence in order.
        #[test]
        fn prop_concurrent_snapshots_are_prefix_states(
            events in proptest::collection::vec(event_strategy(), 1..40)
        ) {
            let reference = StateStore::new();
            let mut reachable = vec![reference.snapshot()];
            for event in &events {
                reference.apply(event);
                reachable.push(reference.snapshot());
            }

            let store = StateStore::new();
            let done = Arc::new(AtomicBool::new(false));
            let reader = {
                let store = store.clone();
                let done = done.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while !done.load(Ordering::Acquire) {
                        seen.push(store.snapshot());
                    }
                    seen.push(store.snapshot());
                    seen
                })
            };

            for event in &events {
                store.apply(event);
            }
            done.store(true, Ordering::Release);
            let seen = reader.join().unwrap();

            for snapshot in &seen {
                prop_assert!(reachable.contains(snapshot), "unreachable state {:?}", snapshot);
            }
            prop_assert_eq!(seen.last(), reachable.last());
        }
    }
}
