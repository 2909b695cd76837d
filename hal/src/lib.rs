//! Hardware Abstraction Layer (HAL) for the GPIB bridge
//!
//! This crate provides the capability traits the bridge firmware is written
//! against: the GPIB control/data lines, the serial link to the terminal host
//! and the non-volatile configuration store. Platform ports implement them
//! against their register-access facility; the protocol logic never sees a
//! register layout.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod error;
pub mod gpio;
pub mod gpib;
pub mod uart;
pub mod storage;

// Re-export commonly used types
pub use error::{HalError, HalResult};
pub use gpib::{BusLines, Control, Irq, Line};
pub use gpio::{Edge, PinMode};
pub use storage::NvStorage;
pub use uart::SerialPort;
