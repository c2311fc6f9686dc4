//! # RC Channel Unpacking
//!
//! Extracts proportional channel values from a bit-packed payload.
//!
//! Channels are packed as one continuous little-endian bitstream, LSB first,
//! with no padding. Channel `i` occupies bits `[bits * i, bits * i + bits)`:
//! ```text
//! Byte 0: Ch1[0:7]
//! Byte 1: Ch1[8:10] | Ch2[0:4]
//! Byte 2: Ch2[5:10] | Ch3[0:1]
//! ...
//! ```
//!
//! Two unpackers sit behind [`ChannelUnpacker`]: a generic bit cursor and the
//! unrolled 16 × 11 layout. They produce identical results for RC frames.

use serde::Deserialize;

use super::protocol::{
    RcChannels, CRSF_CHANNEL_BITS, CRSF_NUM_CHANNELS, CRSF_RC_CHANNELS_PAYLOAD_SIZE,
};
use crate::error::UnpackError;

/// 11-bit channel mask
const MASK_11BIT: u16 = 0x07FF;

/// Unpacks packed channel data into a channel array
pub trait ChannelUnpacker {
    /// Unpack `payload` into `out`
    ///
    /// `out` is only written when the whole payload unpacks successfully.
    fn unpack(&self, payload: &[u8], out: &mut RcChannels) -> Result<(), UnpackError>;
}

/// Generic bit-cursor unpacker
///
/// Walks the stream `bits` at a time, keeping a byte and a bit offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitCursorUnpacker {
    channel_count: usize,
    bits: u32,
}

impl BitCursorUnpacker {
    /// Unpacker for `channel_count` channels of `bits` bits each
    pub fn new(channel_count: usize, bits: u32) -> Self {
        Self {
            channel_count,
            bits,
        }
    }

    /// Unpacker for the RC channels frame layout (16 × 11 bits)
    pub fn rc_channels() -> Self {
        Self::new(CRSF_NUM_CHANNELS, CRSF_CHANNEL_BITS)
    }
}

impl ChannelUnpacker for BitCursorUnpacker {
    fn unpack(&self, payload: &[u8], out: &mut RcChannels) -> Result<(), UnpackError> {
        if self.bits == 0 || self.bits > 16 {
            return Err(UnpackError::BitWidth { bits: self.bits });
        }

        if self.channel_count > CRSF_NUM_CHANNELS {
            return Err(UnpackError::ChannelCount {
                count: self.channel_count,
                max: CRSF_NUM_CHANNELS,
            });
        }

        let needed = (self.channel_count * self.bits as usize).div_ceil(8);
        if payload.len() < needed {
            return Err(UnpackError::PayloadTooShort {
                len: payload.len(),
                needed,
            });
        }

        let mask = (1u32 << self.bits) - 1;
        let mut channels = *out;
        let mut byte_start = 0usize;
        let mut bit_start = 0u32;

        for channel in channels.iter_mut().take(self.channel_count) {
            // A value of up to 16 bits at a bit offset of up to 7 spans 3 bytes
            let mut window: u32 = 0;
            for (k, &byte) in payload[byte_start..needed].iter().take(3).enumerate() {
                window |= u32::from(byte) << (8 * k);
            }

            *channel = ((window >> bit_start) & mask) as u16;

            bit_start += self.bits;
            byte_start += (bit_start / 8) as usize;
            bit_start %= 8;
        }

        *out = channels;
        Ok(())
    }
}

/// Unrolled unpacker for exactly 16 channels × 11 bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedLayoutUnpacker;

impl ChannelUnpacker for FixedLayoutUnpacker {
    fn unpack(&self, payload: &[u8], out: &mut RcChannels) -> Result<(), UnpackError> {
        let data: &[u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] =
            payload
                .try_into()
                .map_err(|_| UnpackError::PayloadTooShort {
                    len: payload.len(),
                    needed: CRSF_RC_CHANNELS_PAYLOAD_SIZE,
                })?;

        // Widen to make room for shifting
        let d: [u16; CRSF_RC_CHANNELS_PAYLOAD_SIZE] = core::array::from_fn(|i| u16::from(data[i]));

        *out = [
            (d[0] | d[1] << 8) & MASK_11BIT,
            (d[1] >> 3 | d[2] << 5) & MASK_11BIT,
            (d[2] >> 6 | d[3] << 2 | d[4] << 10) & MASK_11BIT,
            (d[4] >> 1 | d[5] << 7) & MASK_11BIT,
            (d[5] >> 4 | d[6] << 4) & MASK_11BIT,
            (d[6] >> 7 | d[7] << 1 | d[8] << 9) & MASK_11BIT,
            (d[8] >> 2 | d[9] << 6) & MASK_11BIT,
            (d[9] >> 5 | d[10] << 3) & MASK_11BIT,
            (d[11] | d[12] << 8) & MASK_11BIT,
            (d[12] >> 3 | d[13] << 5) & MASK_11BIT,
            (d[13] >> 6 | d[14] << 2 | d[15] << 10) & MASK_11BIT,
            (d[15] >> 1 | d[16] << 7) & MASK_11BIT,
            (d[16] >> 4 | d[17] << 4) & MASK_11BIT,
            (d[17] >> 7 | d[18] << 1 | d[19] << 9) & MASK_11BIT,
            (d[19] >> 2 | d[20] << 6) & MASK_11BIT,
            (d[20] >> 5 | d[21] << 3) & MASK_11BIT,
        ];

        Ok(())
    }
}

/// Which unpacker the decoder uses for RC channel frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpackStrategy {
    /// Generic bit cursor
    #[default]
    BitCursor,
    /// Unrolled 16 × 11 layout
    FixedLayout,
}

impl ChannelUnpacker for UnpackStrategy {
    fn unpack(&self, payload: &[u8], out: &mut RcChannels) -> Result<(), UnpackError> {
        match self {
            Self::BitCursor => BitCursorUnpacker::rc_channels().unpack(payload, out),
            Self::FixedLayout => FixedLayoutUnpacker.unpack(payload, out),
        }
    }
}
