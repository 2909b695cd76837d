#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

//! # GPIB Streams
//!
//! Two byte streams with end-of-string (EOS) semantics, one over the GPIB
//! bus engine and one over the serial terminal link. Reading stops at the
//! configured input terminator (or at EOI on the bus) and reports
//! end-of-stream until it is cleared; writing appends the output terminator
//! when the caller ends the stream.

use embedded_hal::delay::DelayNs;
use gpib_bus::BusEngine;
use gpib_core::{GpibResult, Indicators};
use hal::BusLines;

pub mod bus;
pub mod tty;

pub use bus::BusStream;
pub use tty::TtyStream;

/// Byte transfer primitives of the bus engine
pub trait BusIo {
    /// Switch to talking
    fn begin_transmit(&mut self);

    /// Queue one byte
    fn enqueue_byte(&mut self, byte: u8) -> GpibResult<()>;

    /// Queue the byte sent with EOI and wait for it
    fn enqueue_last_byte(&mut self, byte: u8) -> GpibResult<()>;

    /// Wait until queued output has been accepted
    fn flush(&mut self) -> GpibResult<()>;

    /// Switch to listening
    fn begin_receive(&mut self) -> GpibResult<()>;

    /// Take one received byte
    fn get_byte(&mut self) -> GpibResult<u8>;

    /// Whether the last byte taken carried EOI; reading clears it
    fn end_of_transaction(&mut self) -> bool;
}

/// Controller primitives of the bus engine
pub trait BusControl: BusIo {
    /// Give up control
    fn go_passive(&mut self);

    /// Become controller in charge
    fn take_control(&mut self);

    /// Drive or release ATN
    fn set_attention(&mut self, attention: bool) -> GpibResult<()>;

    /// Drive or release REN
    fn set_remote(&mut self, remote: bool);

    /// Pulse IFC
    fn pulse_clear(&mut self);

    /// Status and error latches
    fn indicators(&self) -> &Indicators;
}

impl<L: BusLines, D: DelayNs, const N: usize> BusIo for BusEngine<'_, L, D, N> {
    fn begin_transmit(&mut self) {
        BusEngine::begin_transmit(self)
    }

    fn enqueue_byte(&mut self, byte: u8) -> GpibResult<()> {
        BusEngine::enqueue_byte(self, byte)
    }

    fn enqueue_last_byte(&mut self, byte: u8) -> GpibResult<()> {
        BusEngine::enqueue_last_byte(self, byte)
    }

    fn flush(&mut self) -> GpibResult<()> {
        BusEngine::flush(self)
    }

    fn begin_receive(&mut self) -> GpibResult<()> {
        BusEngine::begin_receive(self)
    }

    fn get_byte(&mut self) -> GpibResult<u8> {
        BusEngine::get_byte(self)
    }

    fn end_of_transaction(&mut self) -> bool {
        BusEngine::end_of_transaction(self)
    }
}

impl<L: BusLines, D: DelayNs, const N: usize> BusControl for BusEngine<'_, L, D, N> {
    fn go_passive(&mut self) {
        BusEngine::go_passive(self)
    }

    fn take_control(&mut self) {
        BusEngine::take_control(self)
    }

    fn set_attention(&mut self, attention: bool) -> GpibResult<()> {
        BusEngine::set_attention(self, attention)
    }

    fn set_remote(&mut self, remote: bool) {
        BusEngine::set_remote(self, remote)
    }

    fn pulse_clear(&mut self) {
        BusEngine::pulse_clear(self)
    }

    fn indicators(&self) -> &Indicators {
        BusEngine::indicators(self)
    }
}
