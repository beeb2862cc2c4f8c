//! Terminal status display
//!
//! Periodically redraws the screen from a store snapshot. Read-only: the
//! display never mutates device state.

use colored::*;
use std::io::Write;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::monitor::ShutdownFlag;
use crate::state::{ConnectionState, DeviceStatus, StateStore};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Render one frame of the status screen
pub fn render(status: &DeviceStatus) -> String {
    match status.connection {
        ConnectionState::Disconnected => {
            format!("{}\n", "Not connected to profiler".bold().blue())
        }
        ConnectionState::Error => {
            let message = status.error_message.as_deref().unwrap_or("unknown error");
            format!("{}\n", message.bold().red())
        }
        ConnectionState::Connected => {
            let mut out = format!("{}\n\n", "Kemper Profiler Monitor".bold().blue());

            let slots: Vec<String> = status
                .slot_names
                .iter()
                .enumerate()
                .map(|(index, name)| {
                    let entry = format!(" {}. {} ", index + 1, name);
                    if index == status.current_slot {
                        entry.reversed().to_string()
                    } else {
                        entry
                    }
                })
                .collect();
            out.push_str(&slots.join("   "));
            out.push_str("\n\n");

            let performance = match status.current_performance {
                Some(index) => format!("{} (#{})", status.performance_name, index),
                None => status.performance_name.to_string(),
            };
            out.push_str(&format!("{}\n", performance.bold().green()));
            out
        }
    }
}

/// Redraw every `refresh` until `shutdown` is triggered
pub async fn run(store: StateStore, refresh: Duration, shutdown: ShutdownFlag) {
    debug!("Display loop started (refresh every {:?})", refresh);
    let mut last: Option<DeviceStatus> = None;

    while !shutdown.is_triggered() {
        let status = store.snapshot();
        if last.as_ref() != Some(&status) {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = write!(stdout, "{}{}", CLEAR_SCREEN, render(&status))
                .and_then(|_| stdout.flush())
            {
                warn!("Failed to draw status: {}", e);
            }
            last = Some(status);
        }
        sleep(refresh).await;
    }
}

/// Log state changes instead of drawing them (headless mode)
pub async fn run_headless(store: StateStore, refresh: Duration, shutdown: ShutdownFlag) {
    let mut last: Option<DeviceStatus> = None;

    while !shutdown.is_triggered() {
        let status = store.snapshot();
        if last.as_ref() != Some(&status) {
            tracing::info!(
                connection = %status.connection,
                performance = ?status.current_performance,
                slot = status.current_slot + 1,
                "{} | {}",
                status.performance_name,
                status.current_slot_name()
            );
            last = Some(status);
        }
        sleep(refresh).await;
    }
}
