//! Character-level reader over the terminal stream
//!
//! Adds a single character of pushback above the EOS framing, plus the
//! scanning primitives the command grammar is built from. The end of the
//! current line reads as `None`.

use gpib_core::GpibError;
use gpib_stream::TtyStream;
use hal::SerialPort;

/// Case-insensitive keyword table, sorted by name
pub(crate) type Table<T> = [(&'static str, T)];

/// One command line at a time from the terminal
pub(crate) struct LineReader<S> {
    tty: TtyStream<S>,
    peeked: Option<Option<u8>>,
    fault: Option<GpibError>,
}

impl<S: SerialPort> LineReader<S> {
    pub fn new(tty: TtyStream<S>) -> Self {
        Self {
            tty,
            peeked: None,
            fault: None,
        }
    }

    pub fn tty(&self) -> &TtyStream<S> {
        &self.tty
    }

    pub fn tty_mut(&mut self) -> &mut TtyStream<S> {
        &mut self.tty
    }

    /// Start reading the next line
    pub fn next_line(&mut self) {
        self.tty.clear_end_of_stream();
        if self.peeked == Some(None) {
            self.peeked = None;
        }
    }

    /// Serial error seen since the last call
    pub fn take_fault(&mut self) -> Option<GpibError> {
        self.fault.take()
    }

    pub fn getc(&mut self) -> Option<u8> {
        if let Some(peeked) = self.peeked.take() {
            return peeked;
        }
        match self.tty.get() {
            Ok(byte) => byte,
            Err(err) => {
                // The rest of the line is unreliable
                self.fault = Some(err);
                None
            }
        }
    }

    pub fn ungetc(&mut self, byte: Option<u8>) {
        self.peeked = Some(byte);
    }

    pub fn peek(&mut self) -> Option<u8> {
        let byte = self.getc();
        self.ungetc(byte);
        byte
    }

    /// Skip whitespace
    pub fn chomp(&mut self) {
        loop {
            let byte = self.getc();
            if !byte.is_some_and(|byte| byte.is_ascii_whitespace()) {
                self.ungetc(byte);
                return;
            }
        }
    }

    /// Consume `expected` if it is next
    pub fn accept(&mut self, expected: u8) -> bool {
        let byte = self.getc();
        if byte == Some(expected) {
            true
        } else {
            self.ungetc(byte);
            false
        }
    }

    /// Unsigned decimal after optional whitespace
    pub fn number(&mut self) -> Option<u32> {
        self.chomp();
        let mut value: Option<u32> = None;
        loop {
            let byte = self.getc();
            match byte {
                Some(digit @ b'0'..=b'9') => {
                    let digit = u32::from(digit - b'0');
                    value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit));
                }
                _ => {
                    self.ungetc(byte);
                    return value;
                }
            }
        }
    }

    /// Longest keyword prefix from `table`.
    ///
    /// Characters are taken while they continue some keyword. An
    /// abbreviation shared by several keywords selects the alphabetically
    /// first of them.
    pub fn token<T: Copy>(&mut self, table: &Table<T>) -> Option<T> {
        self.chomp();
        let (mut lo, mut hi) = (0, table.len());
        let mut typed = 0;

        loop {
            let byte = self.getc();
            let Some(upper) = byte.map(|byte| byte.to_ascii_uppercase()) else {
                self.ungetc(byte);
                break;
            };
            let continues = |entry: &(&str, T)| entry.0.as_bytes().get(typed) == Some(&upper);
            let Some(first) = table[lo..hi].iter().position(continues) else {
                self.ungetc(byte);
                break;
            };
            let count = table[lo + first..hi]
                .iter()
                .take_while(|&entry| continues(entry))
                .count();
            lo += first;
            hi = lo + count;
            typed += 1;
        }

        (typed > 0).then(|| table[lo].1)
    }

    /// Discard the rest of the line
    pub fn drain(&mut self) {
        while self.getc().is_some() {}
    }
}
