//! Common error types for HAL operations

use core::fmt;

/// HAL operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Invalid parameter provided
    InvalidParameter,
    /// Received character had a framing error
    Framing,
    /// Received character had a parity error
    Parity,
    /// Receiver data register was overrun
    Overrun,
    /// Receive buffer ran out of room
    BufferOverflow,
    /// Non-volatile storage access failed
    Storage,
    /// Vendor-specific error code
    VendorError(i32),
}

impl HalError {
    /// Whether this error describes a corrupted character on the serial line
    pub const fn is_line_error(self) -> bool {
        matches!(self, Self::Framing | Self::Parity | Self::Overrun)
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::Framing => write!(f, "framing error"),
            Self::Parity => write!(f, "parity error"),
            Self::Overrun => write!(f, "receiver overrun"),
            Self::BufferOverflow => write!(f, "receive buffer overflow"),
            Self::Storage => write!(f, "storage access failed"),
            Self::VendorError(code) => write!(f, "vendor error code: {}", code),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidParameter => defmt::write!(fmt, "InvalidParameter"),
            Self::Framing => defmt::write!(fmt, "Framing"),
            Self::Parity => defmt::write!(fmt, "Parity"),
            Self::Overrun => defmt::write!(fmt, "Overrun"),
            Self::BufferOverflow => defmt::write!(fmt, "BufferOverflow"),
            Self::Storage => defmt::write!(fmt, "Storage"),
            Self::VendorError(code) => defmt::write!(fmt, "VendorError({})", code),
        }
    }
}

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;
