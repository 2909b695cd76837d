#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

//! # GPIB Bus Engine
//!
//! Drives the IEEE-488 lines as controller-in-charge. The engine is split in
//! two halves:
//!
//! - [`BusState`] is shared with the interrupt handlers. It owns the lines,
//!   both byte rings and the timeout counter, and exposes the handshake
//!   entry points [`on_nrfd`](BusState::on_nrfd), [`on_ndac`](BusState::on_ndac),
//!   [`on_dav`](BusState::on_dav) and [`on_tick`](BusState::on_tick).
//! - [`BusEngine`] is the foreground handle. It performs role switching and
//!   the blocking, timeout-guarded byte accessors.
//!
//! ```text
//!   foreground                         interrupts
//!   ----------                         ----------
//!   enqueue_byte ──► tx ring ──► on_nrfd / on_ndac ──► DIO, DAV, EOI
//!   get_byte     ◄── rx ring ◄── on_dav            ◄── DIO, EOI
//!   wait loops   ◄── timeout ◄── on_tick (16 ms)
//! ```

pub mod engine;
mod roles;
pub mod state;

#[cfg(test)]
mod testing;

pub use engine::BusEngine;
pub use state::BusState;

/// Default ring length; holds one byte less
pub const DEFAULT_BUFFER_LEN: usize = 64;

/// Settle time for REN and the IFC pulse
pub const SETTLE_DELAY_US: u32 = 150;

/// Which pump is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    /// Source handshake armed
    Transmitting = 0,
    /// Neither pump armed
    Idle = 1,
    /// Acceptor handshake armed
    Receiving = 2,
}

impl Direction {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Direction::Transmitting,
            2 => Direction::Receiving,
            _ => Direction::Idle,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Direction {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Direction::Transmitting => defmt::write!(fmt, "Transmitting"),
            Direction::Idle => defmt::write!(fmt, "Idle"),
            Direction::Receiving => defmt::write!(fmt, "Receiving"),
        }
    }
}
