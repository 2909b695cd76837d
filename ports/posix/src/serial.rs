//! Terminal link over host byte streams

use std::io::{self, ErrorKind, Read, Write};

use hal::{HalError, SerialPort};
use log::warn;

/// Serial port backed by a reader and a writer.
///
/// The end of the input is reported once as a framing error and then as
/// [`is_closed`](PipeSerial::is_closed).
#[derive(Debug)]
pub struct PipeSerial<R, W> {
    reader: R,
    writer: W,
    closed: bool,
}

/// The process's own standard streams
pub type StdioSerial = PipeSerial<io::StdinLock<'static>, io::Stdout>;

impl StdioSerial {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: Read, W: Write> PipeSerial<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            closed: false,
        }
    }

    /// Input reached its end
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

fn line_error(err: io::Error) -> nb::Error<HalError> {
    match err.kind() {
        ErrorKind::Interrupted | ErrorKind::WouldBlock => nb::Error::WouldBlock,
        _ => {
            warn!("serial I/O: {}", err);
            nb::Error::Other(HalError::Framing)
        }
    }
}

impl<R: Read, W: Write> SerialPort for PipeSerial<R, W> {
    fn read(&mut self) -> nb::Result<u8, HalError> {
        if self.closed {
            return Err(nb::Error::Other(HalError::Framing));
        }
        let mut byte = [0u8; 1];
        match self.reader.read(&mut byte) {
            Ok(0) => {
                self.closed = true;
                Err(nb::Error::Other(HalError::Framing))
            }
            Ok(_) => Ok(byte[0]),
            Err(err) => Err(line_error(err)),
        }
    }

    fn write(&mut self, byte: u8) -> nb::Result<(), HalError> {
        self.writer.write_all(&[byte]).map_err(line_error)
    }

    fn flush(&mut self) -> nb::Result<(), HalError> {
        self.writer.flush().map_err(line_error)
    }
}
