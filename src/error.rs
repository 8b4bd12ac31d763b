//! Unified error type for myolink.
//!
//! All variants carry only fixed-size data so the type stays cheap to
//! move through channels and to log from callback context.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Bluedroid reported a Bluetooth-level error.
    Bt(BtError),

    /// A servo PWM channel rejected its duty update.
    Servo,

    /// Buffer too small (or empty) for the requested operation.
    BufferOverflow,

    /// The far side of a state-update channel is gone.
    ChannelClosed,
}

/// Subset of Bluetooth errors we propagate (keeps the enum `Copy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtError {
    /// Raw ESP-IDF error code.
    Raw(i32),
    /// An SPP write was rejected outright.
    WriteFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bt(e) => write!(f, "bluetooth error: {e}"),
            Error::Servo => write!(f, "servo duty update rejected"),
            Error::BufferOverflow => write!(f, "buffer too small"),
            Error::ChannelClosed => write!(f, "state channel closed"),
        }
    }
}

impl fmt::Display for BtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BtError::Raw(code) => write!(f, "esp error code {code}"),
            BtError::WriteFailed => write!(f, "SPP write failed"),
        }
    }
}

impl std::error::Error for Error {}

// Convenience conversions

impl From<BtError> for Error {
    fn from(e: BtError) -> Self {
        Error::Bt(e)
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_svc::sys::EspError> for Error {
    fn from(e: esp_idf_svc::sys::EspError) -> Self {
        Error::Bt(BtError::Raw(e.code()))
    }
}
