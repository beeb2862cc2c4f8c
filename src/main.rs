//! Profiler Monitor - Kemper Profiler performance/slot monitor
//!
//! Shows the active performance and slot of a Kemper Profiler connected over MIDI.

use anyhow::Result;
use clap::Parser;
use std::io::BufRead;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use profiler_monitor::config::{AppConfig, LoggingConfig};
use profiler_monitor::connector::DeviceConnector;
use profiler_monitor::display;
use profiler_monitor::monitor::{Monitor, ShutdownFlag};
use profiler_monitor::state::StateStore;
use profiler_monitor::transport::{discovery, MidirBackend, MidirTransport};

/// How long a connection error stays on screen before exiting
const ERROR_LINGER: Duration = Duration::from_secs(3);

/// Profiler Monitor - follow performance and slot changes on a Kemper Profiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PROFILER_MONITOR_CONFIG",
        default_value = "profiler-monitor.yaml"
    )]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log to stderr instead of the log file
    #[arg(long)]
    log_stdout: bool,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Do not draw the status screen, log state changes instead
    #[arg(long)]
    no_display: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = AppConfig::load_or_default(&args.config).await?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&args.log_level, args.log_stdout, &config.logging)?;

    info!("Starting Profiler Monitor...");
    info!("Configuration file: {}", args.config);

    if args.list_ports {
        discovery::print_ports(&config.device.client_name, &config.device.name_prefix)?;
        return Ok(());
    }

    let store = StateStore::new();
    let shutdown = ShutdownFlag::new();

    let display_task = {
        let store = store.clone();
        let shutdown = shutdown.clone();
        let refresh = config.timing.display_refresh();
        if args.no_display {
            tokio::spawn(display::run_headless(store, refresh, shutdown))
        } else {
            tokio::spawn(display::run(store, refresh, shutdown))
        }
    };

    let mut exit = exit_requests();
    let mut connector = DeviceConnector::new(
        MidirBackend::new(config.device.client_name.clone()),
        store.clone(),
        &config,
    );

    let connected = tokio::select! {
        result = Monitor::<MidirTransport>::connect(&mut connector, store.clone(), config.timing.poll_interval()) => Some(result),
        _ = exit.recv() => None,
    };

    let outcome = match connected {
        Some(Ok(monitor)) => {
            let reader_task = tokio::spawn(monitor.run(shutdown.clone()));
            exit.recv().await;
            shutdown.trigger();
            if let Err(e) = reader_task.await {
                warn!("Reader task failed: {}", e);
            }
            Ok(())
        }
        Some(Err(e)) => {
            error!("Could not connect: {}", e);
            // Leave the error on screen for a moment
            tokio::time::sleep(ERROR_LINGER).await;
            Err(e.into())
        }
        None => Ok(()),
    };

    shutdown.trigger();
    if let Err(e) = display_task.await {
        warn!("Display task failed: {}", e);
    }

    info!("Profiler Monitor shutdown complete");
    outcome
}

fn init_logging(level: &str, to_stderr: bool, logging: &LoggingConfig) -> Result<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (writer, guard) = if to_stderr {
        tracing_appender::non_blocking(std::io::stderr())
    } else {
        std::fs::create_dir_all(&logging.directory)?;
        let appender = tracing_appender::rolling::daily(&logging.directory, &logging.file_prefix);
        tracing_appender::non_blocking(appender)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(to_stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(guard)
}

/// Fires once for 'q' on stdin and on every Ctrl+C
fn exit_requests() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(4);

    // Plain thread: a blocked stdin read must not hold up runtime shutdown
    let stdin_tx = tx.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                    let _ = stdin_tx.blocking_send(());
                    return;
                }
                Ok(_) => {}
                Err(_) => return,
            }
        }
    });

    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            info!("Shutdown signal received");
            if tx.send(()).await.is_err() {
                return;
            }
        }
    });

    rx
}
