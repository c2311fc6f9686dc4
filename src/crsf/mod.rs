//! # CRSF Protocol Module
//!
//! Receive-side implementation of the Crossfire (CRSF) protocol.
//!
//! This module handles:
//! - Frame validation (address, length, CRC8-DVB-S2)
//! - RC channels packet decoding (16 channels, 11-bit resolution)
//! - Frame encoding for loopback and fixtures

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod channels;
pub mod crc;
