//! # CRSF Frame Decoder
//!
//! Validates candidate frames and decodes RC channels packets into channel
//! state.
//!
//! Validation order, stopping at the first failure:
//! 1. address must be the flight controller (0xC8)
//! 2. declared frame length must be sane and match the buffer
//! 3. CRC over type + payload must match the trailing byte
//! 4. frame type must be RC channels packed, with a 22-byte payload
//!
//! The caller supplies exactly one frame's bytes per call. Channel state is
//! only overwritten by a fully validated RC channels frame.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, trace};

use super::channels::{ChannelUnpacker, UnpackStrategy};
use super::crc::crc8_dvb_s2;
use super::protocol::*;
use crate::error::{FrameError, PayloadFault};

/// Outcome of a decode call, with C-style integer status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Frame decoded, channel state updated
    Valid,
    /// Frame not addressed to this node
    AddressError,
    /// Structurally invalid frame
    PayloadError,
    /// Valid frame of a type this decoder does not interpret
    UnsupportedType,
}

impl FrameStatus {
    /// Numeric status code
    pub fn code(self) -> i8 {
        match self {
            Self::Valid => 1,
            Self::AddressError => -1,
            Self::PayloadError => -2,
            Self::UnsupportedType => -3,
        }
    }
}

impl From<&FrameError> for FrameStatus {
    fn from(err: &FrameError) -> Self {
        match err {
            FrameError::Address { .. } => Self::AddressError,
            FrameError::Payload(_) => Self::PayloadError,
            FrameError::UnsupportedType { .. } => Self::UnsupportedType,
        }
    }
}

impl<T> From<&Result<T, FrameError>> for FrameStatus {
    fn from(result: &Result<T, FrameError>) -> Self {
        match result {
            Ok(_) => Self::Valid,
            Err(e) => e.into(),
        }
    }
}

/// Running count of decode outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub valid: u64,
    pub address_errors: u64,
    pub payload_errors: u64,
    pub unsupported: u64,
}

impl DecodeStats {
    fn record(&mut self, status: FrameStatus) {
        let counter = match status {
            FrameStatus::Valid => &mut self.valid,
            FrameStatus::AddressError => &mut self.address_errors,
            FrameStatus::PayloadError => &mut self.payload_errors,
            FrameStatus::UnsupportedType => &mut self.unsupported,
        };
        *counter = counter.saturating_add(1);
    }

    /// Total frames seen
    pub fn total(&self) -> u64 {
        self.valid
            .saturating_add(self.address_errors)
            .saturating_add(self.payload_errors)
            .saturating_add(self.unsupported)
    }
}

/// CRSF receive-side decoder, one per physical link
///
/// Owns the last valid channel snapshot and the time it arrived. Decoding
/// takes `&mut self`; sharing one decoder between threads needs an outer lock.
///
/// # Examples
///
/// ```
/// use crsf_rx::crsf::decoder::CrsfDecoder;
/// use crsf_rx::crsf::encoder::encode_rc_channels_frame;
/// use crsf_rx::crsf::protocol::FrameType;
///
/// let mut decoder = CrsfDecoder::new();
/// let frame = encode_rc_channels_frame(&[992; 16]);
///
/// assert_eq!(decoder.decode_frame(&frame), Ok(FrameType::RcChannelsPacked));
/// assert_eq!(decoder.channel(0), Some(992));
/// assert_eq!(decoder.channel(16), None);
/// ```
#[derive(Debug, Clone)]
pub struct CrsfDecoder {
    channels: RcChannels,
    last_update: Option<Instant>,
    unpacker: UnpackStrategy,
    stats: DecodeStats,
    log_rejections: bool,
}

impl Default for CrsfDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrsfDecoder {
    /// Create a decoder with all channels at zero
    pub fn new() -> Self {
        Self::with_strategy(UnpackStrategy::default())
    }

    /// Create a decoder using the given channel unpacker
    pub fn with_strategy(unpacker: UnpackStrategy) -> Self {
        Self {
            channels: [0; CRSF_NUM_CHANNELS],
            last_update: None,
            unpacker,
            stats: DecodeStats::default(),
            log_rejections: true,
        }
    }

    /// Enable or disable debug logging of rejected frames
    pub fn set_log_rejections(&mut self, enabled: bool) {
        self.log_rejections = enabled;
    }

    /// Decode one frame, stamping a successful decode with `Instant::now()`
    pub fn decode_frame(&mut self, buf: &[u8]) -> Result<FrameType, FrameError> {
        self.decode_frame_at(buf, Instant::now())
    }

    /// Decode one frame, stamping a successful decode with `now`
    ///
    /// # Arguments
    ///
    /// * `buf` - Exactly one frame: address, length, type, payload, crc
    /// * `now` - Time recorded as the last update on success
    ///
    /// # Returns
    ///
    /// * `Ok(FrameType::RcChannelsPacked)` - channels and last update replaced
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Address is not the flight controller
    /// - Declared length is out of range or disagrees with the buffer
    /// - CRC check fails
    /// - Frame type is not RC channels packed
    pub fn decode_frame_at(&mut self, buf: &[u8], now: Instant) -> Result<FrameType, FrameError> {
        let result = self.validate_and_unpack(buf, now);

        self.stats.record(FrameStatus::from(&result));

        if let Err(ref e) = result {
            if self.log_rejections {
                match e {
                    FrameError::Address { address: addr } => debug!(
                        "Rejected CRSF frame ({} bytes) for {}: {}",
                        buf.len(),
                        address::name(*addr).unwrap_or("unknown device"),
                        e
                    ),
                    _ => debug!("Rejected CRSF frame ({} bytes): {}", buf.len(), e),
                }
            }
        }

        result
    }

    /// Decode one frame, reporting the status/type pair
    ///
    /// The frame type is [`FrameType::Error`] for every non-valid status.
    pub fn decode_status(&mut self, buf: &[u8], now: Instant) -> (FrameStatus, FrameType) {
        let result = self.decode_frame_at(buf, now);
        let status = FrameStatus::from(&result);
        (status, result.unwrap_or(FrameType::Error))
    }

    fn validate_and_unpack(&mut self, buf: &[u8], now: Instant) -> Result<FrameType, FrameError> {
        let Some(&address) = buf.first() else {
            return Err(PayloadFault::TooShort { len: 0 }.into());
        };

        if address != CRSF_SYNC_BYTE {
            return Err(FrameError::Address { address });
        }

        let Some(&frame_length) = buf.get(1) else {
            return Err(PayloadFault::TooShort { len: buf.len() }.into());
        };

        if frame_length < CRSF_FRAME_LENGTH_MIN {
            return Err(PayloadFault::LengthTooSmall {
                frame_length,
                min: CRSF_FRAME_LENGTH_MIN,
            }
            .into());
        }

        if buf.len() > CRSF_FRAME_SIZE_MAX {
            return Err(PayloadFault::FrameTooLarge {
                len: buf.len(),
                max: CRSF_FRAME_SIZE_MAX,
            }
            .into());
        }

        if frame_length as usize + CRSF_HEADER_LEN != buf.len() {
            return Err(PayloadFault::LengthMismatch {
                frame_length,
                len: buf.len(),
            }
            .into());
        }

        // Type through last payload byte; the checks above guarantee at least
        // type + 3 payload bytes + crc
        let crc_index = buf.len() - 1;
        let expected = crc8_dvb_s2(&buf[CRSF_HEADER_LEN..crc_index]);
        let received = buf[crc_index];
        if expected != received {
            return Err(PayloadFault::CrcMismatch { expected, received }.into());
        }

        let frame_type = FrameType::from_byte(buf[2]);
        let payload = &buf[CRSF_HEADER_LEN + 1..crc_index];

        match frame_type {
            FrameType::RcChannelsPacked => {
                if payload.len() != CRSF_RC_CHANNELS_PAYLOAD_SIZE {
                    return Err(PayloadFault::PayloadSize {
                        frame_type,
                        size: payload.len(),
                        expected: CRSF_RC_CHANNELS_PAYLOAD_SIZE,
                    }
                    .into());
                }

                self.unpacker
                    .unpack(payload, &mut self.channels)
                    .map_err(PayloadFault::from)?;
                self.last_update = Some(now);

                trace!("RC channels: {:?}", self.channels);
                Ok(frame_type)
            }
            other => Err(FrameError::UnsupportedType { frame_type: other }),
        }
    }

    /// Value of one channel, or `None` if `index` is not in `0..16`
    pub fn channel(&self, index: usize) -> Option<u16> {
        self.channels.get(index).copied()
    }

    /// Snapshot of all 16 channels (zeros before the first valid frame)
    pub fn channels(&self) -> RcChannels {
        self.channels
    }

    /// Time of the last successful RC channels decode
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Nominal baud rate of the serial link
    pub fn baud_rate(&self) -> u32 {
        CRSF_BAUD_RATE
    }

    /// Decode outcome counters
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Channel unpacker in use
    pub fn strategy(&self) -> UnpackStrategy {
        self.unpacker
    }
}
