//! UART (Universal Asynchronous Receiver/Transmitter) abstraction
//!
//! The serial link to the terminal host. Flow control is the port's concern:
//! a port stalls the remote sender (CTS) rather than dropping characters.

use crate::error::HalError;

/// Byte-oriented serial port with `nb` semantics.
///
/// Callers that need blocking behavior wrap the calls in `nb::block!`.
pub trait SerialPort {
    /// Take one received character
    ///
    /// Line errors (framing, parity, overrun) are reported once for the
    /// corrupted character.
    fn read(&mut self) -> nb::Result<u8, HalError>;

    /// Queue one character for transmission
    fn write(&mut self, byte: u8) -> nb::Result<(), HalError>;

    /// Wait for queued characters to leave the transmitter
    fn flush(&mut self) -> nb::Result<(), HalError>;
}

impl<T: SerialPort + ?Sized> SerialPort for &mut T {
    fn read(&mut self) -> nb::Result<u8, HalError> {
        (**self).read()
    }

    fn write(&mut self, byte: u8) -> nb::Result<(), HalError> {
        (**self).write(byte)
    }

    fn flush(&mut self) -> nb::Result<(), HalError> {
        (**self).flush()
    }
}
