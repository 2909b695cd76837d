//! EOS framing over the bus engine
//!
//! Output is held back by one byte. When the stream is ended there is then
//! always a byte left to carry EOI, even with no output terminator.

use gpib_core::{EoiMode, Eos, GpibError, GpibResult};
use log::trace;

use crate::BusIo;

/// Bus channel with EOS and EOI framing
pub struct BusStream<B> {
    bus: B,
    eos: Eos,
    eoi: EoiMode,
    pushback: Option<u8>,
    end_pending: bool,
    /// Error from a failed terminator lookahead, reported on the next read
    deferred: Option<GpibError>,
    eof: bool,
    delayed: Option<u8>,
}

impl<B: BusIo> BusStream<B> {
    /// Wrap a bus with the given framing
    pub fn new(bus: B, eos: Eos, eoi: EoiMode) -> Self {
        Self {
            bus,
            eos,
            eoi,
            pushback: None,
            end_pending: false,
            deferred: None,
            eof: false,
            delayed: None,
        }
    }

    /// Underlying bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Underlying bus, for raw command bytes and role changes
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Current terminators
    pub fn eos(&self) -> Eos {
        self.eos
    }

    /// Current EOI handling
    pub fn eoi(&self) -> EoiMode {
        self.eoi
    }

    /// Change the framing
    pub fn configure(&mut self, eos: Eos, eoi: EoiMode) {
        self.eos = eos;
        self.eoi = eoi;
    }

    /// Change only whether EOI goes out with the last byte
    pub fn set_output_eoi(&mut self, output: bool) {
        self.eoi.output = output;
    }

    /// Read one byte; `None` once the end of the stream was reached.
    ///
    /// The end stays latched until [`clear_end_of_stream`]. A bus timeout
    /// latches the end too and is returned as the error.
    ///
    /// [`clear_end_of_stream`]: BusStream::clear_end_of_stream
    pub fn get(&mut self) -> GpibResult<Option<u8>> {
        if self.eof {
            return Ok(None);
        }
        let result = self.read();
        if !matches!(result, Ok(Some(_))) {
            self.eof = true;
        }
        result
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

    /// Write one data byte
    pub fn put(&mut self, byte: u8) -> GpibResult<()> {
        self.bus.begin_transmit();
        match self.delayed.replace(byte) {
            Some(previous) => self.bus.enqueue_byte(previous),
            None => Ok(()),
        }
    }

    /// End the message: the held byte, the output terminator and EOI on
    /// the final byte when configured
    pub fn put_end_of_stream(&mut self) -> GpibResult<()> {
        self.bus.begin_transmit();
        let delayed = self.delayed.take();

        let last = match self.eos.output.as_slice().split_last() {
            Some((&last, rest)) => {
                if let Some(byte) = delayed {
                    self.bus.enqueue_byte(byte)?;
                }
                for &byte in rest {
                    self.bus.enqueue_byte(byte)?;
                }
                last
            }
            None => match delayed {
                Some(byte) => byte,
                None => return Ok(()),
            },
        };

        if self.eoi.output {
            self.bus.enqueue_last_byte(last)
        } else {
            self.bus.enqueue_byte(last)
        }
    }

    /// Send the held byte without ending the message
    pub fn flush(&mut self) -> GpibResult<()> {
        if let Some(byte) = self.delayed.take() {
            self.bus.begin_transmit();
            self.bus.enqueue_byte(byte)?;
        }
        Ok(())
    }

    fn next_byte(&mut self) -> GpibResult<u8> {
        let byte = self.bus.get_byte()?;
        if self.bus.end_of_transaction() && self.eoi.input {
            self.end_pending = true;
        }
        Ok(byte)
    }

    fn read(&mut self) -> GpibResult<Option<u8>> {
        self.bus.begin_receive()?;

        let byte = match self.pushback.take() {
            Some(byte) => byte,
            None => {
                if let Some(err) = self.deferred.take() {
                    return Err(err);
                }
                if self.end_pending {
                    self.end_pending = false;
                    trace!("bus stream end: EOI");
                    return Ok(None);
                }
                self.next_byte()?
            }
        };

        let terminator = self.eos.input;
        if terminator.first() != Some(byte) {
            return Ok(Some(byte));
        }

        match terminator.second() {
            Some(second) if !self.end_pending => {
                let next = match self.next_byte() {
                    Ok(next) => next,
                    Err(err) => {
                        // The prefix byte is data; the error ends the stream next
                        self.deferred = Some(err);
                        return Ok(Some(byte));
                    }
                };
                if next == second {
                    self.end_pending = false;
                    trace!("bus stream end: terminator");
                    return Ok(None);
                }
                self.pushback = Some(next);
                Ok(Some(byte))
            }
            _ => {
                // Single-byte terminator, or EOI arrived on its first byte
                self.end_pending = false;
                trace!("bus stream end: terminator");
                Ok(None)
            }
        }
    }
}
