//! # CRSF RX Library
//!
//! Receiver-side Crossfire (CRSF) frame validation and RC channel decoding.
//!
//! This library validates CRSF frames handed over by a serial collaborator
//! and keeps the latest 16 RC channel values for the application to read.

pub mod config;
pub mod error;
pub mod crsf;
pub mod serial;
pub mod snapshot;
