//! # Error Types
//!
//! Custom error types for CRSF RX using `thiserror`.
//!
//! Two families live here:
//! - [`FrameError`]: per-frame decode outcomes. Always recoverable: drop the
//!   frame, keep the previous channel state, keep reading.
//! - [`CrsfRxError`]: application-level failures (configuration, serial I/O).

use thiserror::Error;

use crate::crsf::protocol::FrameType;

/// Why a frame was rejected as structurally invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayloadFault {
    /// Buffer too short to hold an address and length byte
    #[error("frame too short: {len} bytes")]
    TooShort { len: usize },

    /// Declared frame length below the protocol minimum
    #[error("declared frame length {frame_length} below minimum {min}")]
    LengthTooSmall { frame_length: u8, min: u8 },

    /// Buffer exceeds the maximum CRSF frame size
    #[error("frame size {len} exceeds maximum {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Declared frame length does not match the buffer
    #[error("declared frame length {frame_length} does not match buffer length {len}")]
    LengthMismatch { frame_length: u8, len: usize },

    /// Checksum mismatch
    #[error("CRC mismatch: expected 0x{expected:02X}, got 0x{received:02X}")]
    CrcMismatch { expected: u8, received: u8 },

    /// Payload size wrong for the declared frame type
    #[error("payload size {size} invalid for {frame_type:?}, expected {expected}")]
    PayloadSize {
        frame_type: FrameType,
        size: usize,
        expected: usize,
    },

    /// Channel unpacking rejected the payload
    #[error("channel unpack failed: {0}")]
    Unpack(#[from] UnpackError),
}

/// Frame decode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame not addressed to the flight controller
    #[error("frame addressed to 0x{address:02X}, not the flight controller")]
    Address { address: u8 },

    /// Structurally invalid frame
    #[error("invalid frame: {0}")]
    Payload(#[from] PayloadFault),

    /// Valid CRSF frame of a type this decoder does not interpret
    #[error("unsupported frame type {frame_type:?} (0x{:02X})", .frame_type.to_byte())]
    UnsupportedType { frame_type: FrameType },
}

/// Channel unpacking failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnpackError {
    /// Bit width outside 1..=16
    #[error("unsupported channel bit width {bits}")]
    BitWidth { bits: u32 },

    /// More channels requested than the channel array holds
    #[error("channel count {count} exceeds {max}")]
    ChannelCount { count: usize, max: usize },

    /// Payload shorter than the packed channel data
    #[error("payload of {len} bytes too short, need {needed}")]
    PayloadTooShort { len: usize, needed: usize },
}

/// Main error type for CRSF RX
#[derive(Debug, Error)]
pub enum CrsfRxError {
    /// CRSF protocol errors outside frame decoding
    #[error("CRSF protocol error: {0}")]
    CrsfProtocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No serial device could be opened
    #[error("Serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Snapshot encoding errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Result type alias for CRSF RX
pub type Result<T> = std::result::Result<T, CrsfRxError>;
