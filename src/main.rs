//! # CRSF RX
//!
//! Reads CRSF frames from a receiver UART and tracks RC channel state.
//!
//! Usage:
//! ```bash
//! crsf-rx [config.toml]
//! ```
//! Without a config file the defaults apply (`/dev/ttyAMA0`, 420000 baud).

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crsf_rx::config::{Config, LoggingConfig};
use crsf_rx::crsf::decoder::CrsfDecoder;
use crsf_rx::crsf::protocol::{ticks_to_us, RcChannels};
use crsf_rx::serial::{receive_frame, CrsfSerial};
use crsf_rx::snapshot::{ChannelSnapshot, SnapshotWriter};

/// Channels shown in the periodic status line
const STATUS_CHANNELS: usize = 8;

/// Back-off after a failed serial read
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// File name prefix for rolling log files
const LOG_FILE_PREFIX: &str = "crsf-rx.log";

/// Main entry point for CRSF RX
///
/// # Control Flow
///
/// 1. Load configuration and set up logging
/// 2. Open the receiver UART
/// 3. Loop until Ctrl+C:
///    - decode each frame read from the UART
///    - log channel state and link loss every status interval
///    - append channel snapshots when enabled
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading config {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);

    info!("CRSF RX v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut decoder = CrsfDecoder::with_strategy(config.decoder.unpacker);
    decoder.set_log_rejections(config.decoder.log_rejections);
    debug!("Channel unpacker: {:?}", decoder.strategy());

    let mut serial = CrsfSerial::open(
        &config.serial.port,
        config.serial.baud_rate,
        Duration::from_millis(config.serial.timeout_ms),
    )?;
    info!("Receiver serial port opened at: {}", serial.device_path());

    let mut snapshots = if config.snapshot.enabled {
        let writer = SnapshotWriter::open(&config.snapshot.path)?;
        info!("Writing channel snapshots to {}", writer.path().display());
        Some(writer)
    } else {
        None
    };

    let failsafe_timeout = Duration::from_millis(config.link.failsafe_timeout_ms);
    let mut status_interval = interval(Duration::from_millis(config.link.status_interval_ms));
    let mut snapshot_interval = interval(Duration::from_millis(config.snapshot.interval_ms));
    let mut link_up = false;

    info!("Waiting for CRSF frames. Press Ctrl+C to exit");

    loop {
        tokio::select! {
            result = receive_frame(&mut serial, &mut decoder) => {
                if let Err(e) = result {
                    warn!("Serial read failed: {}", e);
                    tokio::time::sleep(READ_ERROR_BACKOFF).await;
                }
            }

            _ = status_interval.tick() => {
                let snapshot = ChannelSnapshot::capture(&decoder, Instant::now(), failsafe_timeout);

                if snapshot.stale && link_up {
                    warn!("Link lost: no valid RC frame within {}ms", config.link.failsafe_timeout_ms);
                    link_up = false;
                } else if !snapshot.stale && !link_up {
                    info!("Link acquired");
                    link_up = true;
                }

                if link_up {
                    info!("Channels (us): {}", describe_channels(&snapshot.channels));
                }
                debug!("Decode stats: {:?}", snapshot.stats);
            }

            _ = snapshot_interval.tick(), if snapshots.is_some() => {
                if let Some(writer) = snapshots.as_mut() {
                    let snapshot = ChannelSnapshot::capture(&decoder, Instant::now(), failsafe_timeout);
                    if let Err(e) = writer.write(&snapshot) {
                        warn!("Failed to write channel snapshot: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    if let Some(writer) = snapshots.as_mut() {
        writer.flush()?;
        info!("Wrote {} channel snapshots", writer.records());
    }

    let stats = decoder.stats();
    info!(
        "Frames: {} valid, {} address errors, {} payload errors, {} unsupported",
        stats.valid, stats.address_errors, stats.payload_errors, stats.unsupported
    );

    Ok(())
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. With a log directory set, output
/// goes to a daily rolling file; the returned guard must stay alive so
/// buffered lines get flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Format the first channels as PWM microseconds
fn describe_channels(channels: &RcChannels) -> String {
    channels
        .iter()
        .take(STATUS_CHANNELS)
        .enumerate()
        .map(|(i, &ticks)| format!("CH{}={}", i + 1, ticks_to_us(ticks)))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_channels() {
        let mut channels = [992u16; 16];
        channels[2] = 172;

        assert_eq!(
            describe_channels(&channels),
            "CH1=1500 CH2=1500 CH3=988 CH4=1500 CH5=1500 CH6=1500 CH7=1500 CH8=1500"
        );
    }

    #[test]
    fn test_status_channels_within_range() {
        assert!(STATUS_CHANNELS <= crsf_rx::crsf::protocol::CRSF_NUM_CHANNELS);
    }

    #[test]
    fn test_read_error_backoff() {
        assert_eq!(READ_ERROR_BACKOFF, Duration::from_millis(100));
    }
}
