#![no_std]
#![forbid(unsafe_code)]

//! # GPIB Core
//!
//! Types shared by every layer of the GPIB bridge: the error taxonomy, the
//! single-producer/single-consumer ring buffer the handshake interrupts feed,
//! the tick-driven timeout counter, the status/error indicators, the IEEE-488
//! command bytes and the persisted EOS configuration.

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

pub mod command;
pub mod config;
pub mod ring;
pub mod status;
pub mod timeout;

pub use command::Address;
pub use config::{Configuration, EoiMode, Eos, Terminator};
pub use ring::{Consumer, Producer, Ring};
pub use status::{Blinker, Indicators, Leds, Status};
pub use timeout::TimeoutCounter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the bridge
pub type GpibResult<T> = Result<T, GpibError>;

/// Error conditions of the bridge.
///
/// None of them is fatal: they are latched into [`Indicators`] for the
/// operator and the failing operation returns `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpibError {
    /// A blocking handshake wait ran out of ticks
    Timeout,
    /// A talker presented data while the acceptor signalled not ready
    Overflow,
    /// The serial link reported a framing, parity or overrun error
    Transmission,
    /// The serial receive buffer ran out of room
    SerialOverflow,
    /// The terminal sent a command the interpreter could not parse
    Terminal,
    /// The configuration store could not be accessed
    Storage,
}

impl GpibError {
    /// Blink pattern shown on the error LED, one bit per 128 ms step
    pub const fn pattern(self) -> u16 {
        match self {
            GpibError::Timeout => 0xFFFF,
            GpibError::Overflow => 0x00AA,
            GpibError::Transmission => 0xFFFE,
            GpibError::SerialOverflow => 0xAAAA,
            GpibError::Terminal => 0x0001,
            GpibError::Storage => 0x0F0F,
        }
    }

    pub(crate) const fn to_raw(self) -> u8 {
        match self {
            GpibError::Timeout => 1,
            GpibError::Overflow => 2,
            GpibError::Transmission => 3,
            GpibError::SerialOverflow => 4,
            GpibError::Terminal => 5,
            GpibError::Storage => 6,
        }
    }

    pub(crate) const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(GpibError::Timeout),
            2 => Some(GpibError::Overflow),
            3 => Some(GpibError::Transmission),
            4 => Some(GpibError::SerialOverflow),
            5 => Some(GpibError::Terminal),
            6 => Some(GpibError::Storage),
            _ => None,
        }
    }
}

impl fmt::Display for GpibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpibError::Timeout => write!(f, "GPIB handshake timed out"),
            GpibError::Overflow => write!(f, "GPIB receive overflow"),
            GpibError::Transmission => write!(f, "serial transmission error"),
            GpibError::SerialOverflow => write!(f, "serial receive overflow"),
            GpibError::Terminal => write!(f, "malformed terminal command"),
            GpibError::Storage => write!(f, "configuration storage failure"),
        }
    }
}

impl From<hal::HalError> for GpibError {
    fn from(value: hal::HalError) -> Self {
        match value {
            hal::HalError::BufferOverflow => GpibError::SerialOverflow,
            hal::HalError::Storage => GpibError::Storage,
            _ => GpibError::Transmission,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GpibError {}

#[cfg(feature = "defmt")]
impl defmt::Format for GpibError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            GpibError::Timeout => defmt::write!(fmt, "Timeout"),
            GpibError::Overflow => defmt::write!(fmt, "Overflow"),
            GpibError::Transmission => defmt::write!(fmt, "Transmission"),
            GpibError::SerialOverflow => defmt::write!(fmt, "SerialOverflow"),
            GpibError::Terminal => defmt::write!(fmt, "Terminal"),
            GpibError::Storage => defmt::write!(fmt, "Storage"),
        }
    }
}
