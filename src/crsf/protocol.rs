//! # CRSF Protocol Constants and Types
//!
//! Core protocol definitions for CRSF (Crossfire) communication.
//!
//! Frame format:
//! ```text
//! <address><frame length><type><payload><crc>
//! ```
//! `frame length` counts type + payload + crc, so a full frame is
//! `frame length + 2` bytes.

/// CRSF frame sync byte, also the flight controller address (0xC8)
pub const CRSF_SYNC_BYTE: u8 = 0xC8;

/// Nominal CRSF baud rate
pub const CRSF_BAUD_RATE: u32 = 420_000;

/// Maximum CRSF frame size, address and length bytes included
pub const CRSF_FRAME_SIZE_MAX: usize = 64;

/// Maximum CRSF payload size
/// Frame structure: sync(1) + length(1) + type(1) + payload(N) + crc(1)
/// Maximum frame size is 64 bytes, so max payload = 64 - 4 = 60 bytes
pub const CRSF_MAX_PAYLOAD_SIZE: usize = 60;

/// Smallest accepted value of the frame length byte
pub const CRSF_FRAME_LENGTH_MIN: u8 = 5;

/// Length of the address + frame length header
pub const CRSF_HEADER_LEN: usize = 2;

/// Length of the type + crc fields combined
pub const CRSF_FRAME_LENGTH_TYPE_CRC: usize = 2;

/// RC channels packet type
pub const CRSF_FRAMETYPE_RC_CHANNELS_PACKED: u8 = 0x16;

/// RC channels payload size (22 bytes for 16 channels × 11 bits)
pub const CRSF_RC_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// RC channels frame length (type + payload + crc)
pub const CRSF_RC_CHANNELS_FRAME_LENGTH: u8 = 0x18; // 24 bytes

/// Number of RC channels
pub const CRSF_NUM_CHANNELS: usize = 16;

/// Bits per packed RC channel
pub const CRSF_CHANNEL_BITS: u32 = 11;

/// Channel value range (11-bit: 0-2047)
pub const CRSF_CHANNEL_VALUE_MIN: u16 = 0;
pub const CRSF_CHANNEL_VALUE_MAX: u16 = 2047;
pub const CRSF_CHANNEL_VALUE_CENTER: u16 = 1024;

/// Tick value that maps to a 1500us pulse
const CRSF_CHANNEL_VALUE_MID_US: u16 = 992;

/// RC channels array type (16 channels, 11-bit values)
pub type RcChannels = [u16; CRSF_NUM_CHANNELS];

/// CRSF frame types
///
/// Only [`FrameType::RcChannelsPacked`] is decoded. The rest are named so that
/// rejections can say what went past on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Invalid, unsupported or corrupt frame
    Error,
    Gps,
    BatterySensor,
    Heartbeat,
    LinkStatistics,
    RcChannelsPacked,
    SubsetRcChannelsPacked,
    LinkStatisticsRx,
    LinkStatisticsTx,
    Attitude,
    FlightMode,
    DevicePing,
    DeviceInfo,
    ParameterSettingsEntry,
    ParameterRead,
    ParameterWrite,
    Command,
    MspRequest,
    MspResponse,
    MspWrite,
    DisplayPortCommand,
    /// Type byte not listed above
    Unknown(u8),
}

impl FrameType {
    /// Map a raw type byte to a frame type
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::Error,
            0x02 => Self::Gps,
            0x08 => Self::BatterySensor,
            0x0B => Self::Heartbeat,
            0x14 => Self::LinkStatistics,
            0x16 => Self::RcChannelsPacked,
            0x17 => Self::SubsetRcChannelsPacked,
            0x1C => Self::LinkStatisticsRx,
            0x1D => Self::LinkStatisticsTx,
            0x1E => Self::Attitude,
            0x21 => Self::FlightMode,
            0x28 => Self::DevicePing,
            0x29 => Self::DeviceInfo,
            0x2B => Self::ParameterSettingsEntry,
            0x2C => Self::ParameterRead,
            0x2D => Self::ParameterWrite,
            0x32 => Self::Command,
            0x7A => Self::MspRequest,
            0x7B => Self::MspResponse,
            0x7C => Self::MspWrite,
            0x7D => Self::DisplayPortCommand,
            other => Self::Unknown(other),
        }
    }

    /// Raw type byte
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Error => 0x00,
            Self::Gps => 0x02,
            Self::BatterySensor => 0x08,
            Self::Heartbeat => 0x0B,
            Self::LinkStatistics => 0x14,
            Self::RcChannelsPacked => 0x16,
            Self::SubsetRcChannelsPacked => 0x17,
            Self::LinkStatisticsRx => 0x1C,
            Self::LinkStatisticsTx => 0x1D,
            Self::Attitude => 0x1E,
            Self::FlightMode => 0x21,
            Self::DevicePing => 0x28,
            Self::DeviceInfo => 0x29,
            Self::ParameterSettingsEntry => 0x2B,
            Self::ParameterRead => 0x2C,
            Self::ParameterWrite => 0x2D,
            Self::Command => 0x32,
            Self::MspRequest => 0x7A,
            Self::MspResponse => 0x7B,
            Self::MspWrite => 0x7C,
            Self::DisplayPortCommand => 0x7D,
            Self::Unknown(byte) => byte,
        }
    }
}

/// Known CRSF device addresses
pub mod address {
    pub const BROADCAST: u8 = 0x00;
    pub const USB: u8 = 0x10;
    pub const TBS_CORE_PNP_PRO: u8 = 0x80;
    pub const RESERVED1: u8 = 0x8A;
    pub const CURRENT_SENSOR: u8 = 0xC0;
    pub const GPS: u8 = 0xC2;
    pub const TBS_BLACKBOX: u8 = 0xC4;
    pub const FLIGHT_CONTROLLER: u8 = super::CRSF_SYNC_BYTE;
    pub const RESERVED2: u8 = 0xCA;
    pub const RACE_TAG: u8 = 0xCC;
    pub const RADIO_TRANSMITTER: u8 = 0xEA;
    pub const CRSF_RECEIVER: u8 = 0xEC;
    pub const CRSF_TRANSMITTER: u8 = 0xEE;

    /// Human-readable name of a device address, for log output
    pub fn name(addr: u8) -> Option<&'static str> {
        Some(match addr {
            BROADCAST => "broadcast",
            USB => "usb",
            TBS_CORE_PNP_PRO => "tbs-core-pnp-pro",
            RESERVED1 | RESERVED2 => "reserved",
            CURRENT_SENSOR => "current-sensor",
            GPS => "gps",
            TBS_BLACKBOX => "tbs-blackbox",
            FLIGHT_CONTROLLER => "flight-controller",
            RACE_TAG => "race-tag",
            RADIO_TRANSMITTER => "radio-transmitter",
            CRSF_RECEIVER => "crsf-receiver",
            CRSF_TRANSMITTER => "crsf-transmitter",
            _ => return None,
        })
    }
}

/// Convert a CRSF channel value to a PWM pulse width in microseconds
///
/// 172 ticks map to 988us and 992 to 1500us.
pub fn ticks_to_us(ticks: u16) -> u16 {
    let ticks = i32::from(ticks.min(CRSF_CHANNEL_VALUE_MAX));
    let us = (ticks - i32::from(CRSF_CHANNEL_VALUE_MID_US)) * 5 / 8 + 1500;
    us as u16
}
