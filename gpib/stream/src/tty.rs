//! EOS framing over the serial link

use core::fmt;

use gpib_core::{Eos, GpibError, GpibResult};
use hal::SerialPort;
use log::trace;

/// Terminal channel with EOS framing
pub struct TtyStream<S> {
    port: S,
    eos: Eos,
    pushback: Option<u8>,
    /// Line error hit while looking past a terminator prefix
    deferred: Option<GpibError>,
    eof: bool,
}

impl<S: SerialPort> TtyStream<S> {
    /// Wrap a serial port with the given terminators
    pub fn new(port: S, eos: Eos) -> Self {
        Self {
            port,
            eos,
            pushback: None,
            deferred: None,
            eof: false,
        }
    }

    /// Underlying port
    pub fn port(&self) -> &S {
        &self.port
    }

    /// Underlying port
    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    /// Current terminators
    pub fn eos(&self) -> Eos {
        self.eos
    }

    /// Change the terminators
    pub fn configure(&mut self, eos: Eos) {
        self.eos = eos;
    }

    /// Read one character; `None` once the input terminator was matched.
    ///
    /// A line error is returned once for the corrupted character and does
    /// not end the stream.
    pub fn get(&mut self) -> GpibResult<Option<u8>> {
        if self.eof {
            return Ok(None);
        }

        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        let byte = match self.pushback.take() {
            Some(byte) => byte,
            None => self.receive()?,
        };

        let terminator = self.eos.input;
        if terminator.first() != Some(byte) {
            return Ok(Some(byte));
        }
        if let Some(second) = terminator.second() {
            let next = match self.receive() {
                Ok(next) => next,
                Err(err) => {
                    self.deferred = Some(err);
                    return Ok(Some(byte));
                }
            };
            if next != second {
                self.pushback = Some(next);
                return Ok(Some(byte));
            }
        }

        trace!("tty stream end");
        self.eof = true;
        Ok(None)
    }

    /// Whether end-of-stream is latched
    pub fn is_end_of_stream(&self) -> bool {
        self.eof
    }

    /// Forget a latched end-of-stream
    pub fn clear_end_of_stream(&mut self) {
        self.eof = false;
        self.deferred = None;
    }

    /// Write one character
    pub fn put(&mut self, byte: u8) -> GpibResult<()> {
        nb::block!(self.port.write(byte)).map_err(GpibError::from)
    }

    /// Append the output terminator and push it out
    pub fn put_end_of_stream(&mut self) -> GpibResult<()> {
        let terminator = self.eos.output;
        for &byte in terminator.as_slice() {
            self.put(byte)?;
        }
        nb::block!(self.port.flush()).map_err(GpibError::from)
    }

    fn receive(&mut self) -> GpibResult<u8> {
        nb::block!(self.port.read()).map_err(GpibError::from)
    }
}

impl<S: SerialPort> fmt::Write for TtyStream<S> {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        text.bytes()
            .try_for_each(|byte| self.put(byte))
            .map_err(|_| fmt::Error)
    }
}
