//! Testing utilities for CrabRelay
//!
//! Synthetic capture hardware and peer senders so camera switching can be
//! exercised offline, without a browser or physical cameras.

pub mod synthetic_devices;

pub use synthetic_devices::{RecordingSenders, SyntheticCapture, SyntheticDevice};
