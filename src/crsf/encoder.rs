//! # CRSF Frame Encoder
//!
//! Builds well-formed CRSF frames addressed to the flight controller.
//!
//! The receive path never transmits, but loopback checks, fixtures and tests
//! need frames whose length and CRC agree with what the decoder expects.

use super::crc::crc8_dvb_s2;
use super::protocol::*;
use crate::error::{CrsfRxError, Result};

/// Encode an arbitrary frame type and payload into a complete CRSF frame
///
/// # Arguments
///
/// * `frame_type` - Frame type byte
/// * `payload` - Payload data (max 60 bytes)
///
/// # Returns
///
/// * `Result<Vec<u8>>` - Address + Length + Type + Payload + CRC
///
/// # Errors
///
/// Returns error if payload exceeds CRSF_MAX_PAYLOAD_SIZE (60 bytes)
///
/// # Examples
///
/// ```
/// use crsf_rx::crsf::encoder::encode_frame;
///
/// let frame = encode_frame(0x02, &[0u8; 15])?;
/// assert_eq!(frame.len(), 19);
/// # Ok::<(), crsf_rx::error::CrsfRxError>(())
/// ```
pub fn encode_frame(frame_type: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > CRSF_MAX_PAYLOAD_SIZE {
        return Err(CrsfRxError::CrsfProtocol(format!(
            "Payload size {} exceeds maximum {}",
            payload.len(),
            CRSF_MAX_PAYLOAD_SIZE
        )));
    }

    // Guaranteed to fit: payload is at most 60 bytes
    let frame_length = (payload.len() + CRSF_FRAME_LENGTH_TYPE_CRC) as u8;

    let mut frame = Vec::with_capacity(CRSF_HEADER_LEN + frame_length as usize);
    frame.push(CRSF_SYNC_BYTE);
    frame.push(frame_length);
    frame.push(frame_type);
    frame.extend_from_slice(payload);

    // CRC over Type + Payload
    let crc = crc8_dvb_s2(&frame[CRSF_HEADER_LEN..]);
    frame.push(crc);

    Ok(frame)
}

/// Encode RC channels into a complete CRSF frame
///
/// # Arguments
///
/// * `channels` - Array of 16 channel values (11-bit: 0-2047)
///
/// # Returns
///
/// * `Vec<u8>` - Complete CRSF frame (26 bytes: address + length + type + 22-byte payload + crc)
///
/// # Examples
///
/// ```
/// use crsf_rx::crsf::encoder::encode_rc_channels_frame;
///
/// let channels = [992u16; 16];
/// let frame = encode_rc_channels_frame(&channels);
/// assert_eq!(frame.len(), 26);
/// ```
pub fn encode_rc_channels_frame(channels: &RcChannels) -> Vec<u8> {
    let payload = encode_rc_channels_payload(channels);

    let mut frame = Vec::with_capacity(CRSF_HEADER_LEN + CRSF_RC_CHANNELS_FRAME_LENGTH as usize);
    frame.push(CRSF_SYNC_BYTE);
    frame.push(CRSF_RC_CHANNELS_FRAME_LENGTH);
    frame.push(CRSF_FRAMETYPE_RC_CHANNELS_PACKED);
    frame.extend_from_slice(&payload);

    let crc = crc8_dvb_s2(&frame[CRSF_HEADER_LEN..]);
    frame.push(crc);

    frame
}

/// Encode RC channels into payload (22 bytes)
///
/// Packs 16 channels (11 bits each) into 22 bytes using bit packing.
/// Channels are packed as a continuous bitstream, LSB first. Values above
/// 2047 are clamped.
pub fn encode_rc_channels_payload(channels: &RcChannels) -> [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] {
    let mut payload = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    let mut bit_index = 0;

    for &channel in channels.iter() {
        let value = channel.min(CRSF_CHANNEL_VALUE_MAX);

        for bit in 0..CRSF_CHANNEL_BITS {
            if (value >> bit) & 1 == 1 {
                payload[bit_index / 8] |= 1 << (bit_index % 8);
            }
            bit_index += 1;
        }
    }

    payload
}
