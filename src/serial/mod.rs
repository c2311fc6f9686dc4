//! # Serial Communication Module
//!
//! Reads candidate CRSF frames from the receiver UART.
//!
//! This module handles:
//! - Opening the serial port at the CRSF baud rate (8N1, no flow control)
//! - Reading one burst of bytes per call, bounded at 64 bytes
//! - Handing each burst to the decoder as one candidate frame
//!
//! No byte-level resynchronization is done here: each read burst is taken as
//! one frame and anything else is rejected by the decoder. A tty read may
//! split one frame or join two, so on real hardware valid frames will be
//! dropped unless a framer that splits the byte stream on the length byte
//! sits in front of [`receive_frame`].

pub mod port_trait;

use std::future::Future;
use std::time::Duration;

use crate::crsf::decoder::CrsfDecoder;
use crate::crsf::protocol::{FrameType, CRSF_FRAME_SIZE_MAX};
use crate::error::{CrsfRxError, FrameError, Result};
use port_trait::{SerialPortIO, TokioSerialPort};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub use crate::crsf::protocol::CRSF_BAUD_RATE;

/// Default receiver UART paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyAMA0", // Raspberry Pi primary UART
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Buffer holding one candidate frame
pub type FrameBuffer = [u8; CRSF_FRAME_SIZE_MAX];

/// Source of candidate frames
pub trait FrameSource {
    /// Read one candidate frame into `buf`
    ///
    /// Returns the number of bytes read; `0` means nothing arrived before the
    /// read timeout.
    fn read_frame(&mut self, buf: &mut FrameBuffer) -> impl Future<Output = Result<usize>> + Send;
}

/// CRSF receiver serial port
///
/// Generic over the port so tests can substitute an in-memory port.
pub struct CrsfSerial<P = TokioSerialPort> {
    /// Serial port handle
    port: P,
    /// Device path (e.g., /dev/ttyAMA0)
    device_path: String,
    /// Per-read timeout
    timeout: Duration,
}

impl<P> std::fmt::Debug for CrsfSerial<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrsfSerial")
            .field("device_path", &self.device_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CrsfSerial<TokioSerialPort> {
    /// Open the receiver UART, trying the default device paths
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    pub fn open_default(baud_rate: u32, timeout: Duration) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate, timeout)
    }

    /// Open the receiver UART at `path`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use crsf_rx::serial::{CrsfSerial, CRSF_BAUD_RATE};
    ///
    /// let serial = CrsfSerial::open("/dev/ttyAMA0", CRSF_BAUD_RATE, Duration::from_millis(100))?;
    /// # Ok::<(), crsf_rx::error::CrsfRxError>(())
    /// ```
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        Self::open_with_paths(&[path], baud_rate, timeout)
    }

    /// Open the first device in `paths` that succeeds
    ///
    /// # Returns
    ///
    /// * `Result<CrsfSerial>` - Connected serial port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened CRSF receiver at {} ({} baud)", path, baud_rate);
                    return Ok(Self::with_port(TokioSerialPort::new(port), path, timeout));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(CrsfRxError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with CRSF settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| CrsfRxError::Serial(format!("Failed to open {}: {}", path, e)))
    }
}

impl<P: SerialPortIO> CrsfSerial<P> {
    /// Wrap an already-open port
    pub fn with_port(port: P, device_path: &str, timeout: Duration) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            timeout,
        }
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl<P: SerialPortIO> FrameSource for CrsfSerial<P> {
    async fn read_frame(&mut self, buf: &mut FrameBuffer) -> Result<usize> {
        match tokio::time::timeout(self.timeout, self.port.read(buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(CrsfRxError::Serial(format!(
                "Failed to read from {}: {}",
                self.device_path, e
            ))),
            Err(_) => Ok(0),
        }
    }
}

/// Read one candidate frame from `source` and decode it
///
/// # Returns
///
/// * `Ok(None)` - nothing arrived before the read timeout
/// * `Ok(Some(result))` - decode outcome for the burst that arrived
///
/// # Errors
///
/// Returns error only for I/O failures; malformed frames are decode outcomes.
pub async fn receive_frame<S: FrameSource>(
    source: &mut S,
    decoder: &mut CrsfDecoder,
) -> Result<Option<std::result::Result<FrameType, FrameError>>> {
    let mut buf: FrameBuffer = [0; CRSF_FRAME_SIZE_MAX];
    let n = source.read_frame(&mut buf).await?;

    if n == 0 {
        return Ok(None);
    }

    Ok(Some(decoder.decode_frame(&buf[..n])))
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::MockSerialPort;
    use super::*;
    use crate::crsf::encoder::{encode_frame, encode_rc_channels_frame};
    use std::io;

    fn mock_serial(port: MockSerialPort) -> CrsfSerial<MockSerialPort> {
        CrsfSerial::with_port(port, "/dev/mock0", Duration::from_millis(50))
    }

    #[test]
    fn test_constants() {
        assert_eq!(CRSF_BAUD_RATE, 420_000);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyAMA0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyUSB0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result =
            CrsfSerial::open_with_paths(invalid_paths, CRSF_BAUD_RATE, Duration::from_millis(10));

        match result.unwrap_err() {
            CrsfRxError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result =
            CrsfSerial::open_with_paths(empty_paths, CRSF_BAUD_RATE, Duration::from_millis(10));

        assert!(matches!(result, Err(CrsfRxError::SerialPortNotFound(_))));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = CrsfSerial::open_port("/dev/nonexistent_serial_device_12345", CRSF_BAUD_RATE);

        match result.unwrap_err() {
            CrsfRxError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_receive_valid_frame() {
        let port = MockSerialPort::new();
        port.push_read(encode_rc_channels_frame(&[992; 16]));
        let mut serial = mock_serial(port);
        let mut decoder = CrsfDecoder::new();

        let result = receive_frame(&mut serial, &mut decoder).await.unwrap();

        assert_eq!(result, Some(Ok(FrameType::RcChannelsPacked)));
        assert_eq!(decoder.channels(), [992; 16]);
    }

    #[tokio::test]
    async fn test_receive_sequence_of_frames() {
        let port = MockSerialPort::new();
        port.push_read(encode_rc_channels_frame(&[1000; 16]));
        port.push_read(encode_frame(0x14, &[0u8; 10]).unwrap());
        port.push_read(vec![0xEE, 0x04, 0x28, 0x00, 0xEA, 0x54]);
        let mut serial = mock_serial(port);
        let mut decoder = CrsfDecoder::new();

        let first = receive_frame(&mut serial, &mut decoder).await.unwrap();
        assert_eq!(first, Some(Ok(FrameType::RcChannelsPacked)));

        let second = receive_frame(&mut serial, &mut decoder).await.unwrap();
        assert_eq!(
            second,
            Some(Err(FrameError::UnsupportedType {
                frame_type: FrameType::LinkStatistics
            }))
        );

        let third = receive_frame(&mut serial, &mut decoder).await.unwrap();
        assert_eq!(third, Some(Err(FrameError::Address { address: 0xEE })));

        // Rejected frames leave the channels alone
        assert_eq!(decoder.channels(), [1000; 16]);
        assert_eq!(decoder.stats().total(), 3);
    }

    #[tokio::test]
    async fn test_receive_timeout_yields_none() {
        let mut serial = mock_serial(MockSerialPort::new());
        let mut decoder = CrsfDecoder::new();

        let result = receive_frame(&mut serial, &mut decoder).await.unwrap();

        assert_eq!(result, None);
        assert_eq!(decoder.stats().total(), 0);
    }

    #[tokio::test]
    async fn test_receive_read_error() {
        let port = MockSerialPort::new();
        port.set_read_error(io::ErrorKind::BrokenPipe);
        let mut serial = mock_serial(port);
        let mut decoder = CrsfDecoder::new();

        match receive_frame(&mut serial, &mut decoder).await {
            Err(CrsfRxError::Serial(msg)) => assert!(msg.contains("/dev/mock0")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_burst_is_truncated() {
        let port = MockSerialPort::new();
        port.push_read(vec![0xC8; 100]);
        let mut serial = mock_serial(port);
        let mut buf: FrameBuffer = [0; CRSF_FRAME_SIZE_MAX];

        let n = serial.read_frame(&mut buf).await.unwrap();
        assert_eq!(n, CRSF_FRAME_SIZE_MAX);
    }

    #[test]
    fn test_debug_shows_device_path() {
        let serial = mock_serial(MockSerialPort::new());
        assert_eq!(serial.device_path(), "/dev/mock0");
        assert!(format!("{:?}", serial).contains("/dev/mock0"));
    }

    // Integration test - only runs if receiver hardware is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_read_with_real_hardware() {
        let result = CrsfSerial::open_default(CRSF_BAUD_RATE, Duration::from_millis(100));

        if let Ok(mut serial) = result {
            let mut decoder = CrsfDecoder::new();
            for _ in 0..50 {
                if let Ok(Some(outcome)) = receive_frame(&mut serial, &mut decoder).await {
                    println!("Frame outcome: {:?}", outcome);
                }
            }
            println!("Decode stats: {:?}", decoder.stats());
        } else {
            println!("No receiver hardware detected (skipping read test)");
        }
    }
}
