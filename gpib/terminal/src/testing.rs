//! Fakes for the interpreter tests

use std::collections::VecDeque;
use std::vec::Vec;

use gpib_core::{GpibError, GpibResult, Indicators};
use gpib_stream::{BusControl, BusIo};
use hal::{HalError, HalResult, NvStorage, SerialPort};

/// Terminal port fed from a script
#[derive(Default)]
pub struct Console {
    pub input: VecDeque<Result<u8, HalError>>,
    pub output: Vec<u8>,
}

impl Console {
    pub fn typed(text: &[u8]) -> Self {
        Self {
            input: text.iter().map(|&byte| Ok(byte)).collect(),
            ..Self::default()
        }
    }

    pub fn printed(&self) -> &str {
        core::str::from_utf8(&self.output).unwrap_or("<binary>")
    }
}

impl SerialPort for Console {
    fn read(&mut self) -> nb::Result<u8, HalError> {
        match self.input.pop_front() {
            Some(Ok(byte)) => Ok(byte),
            Some(Err(err)) => Err(nb::Error::Other(err)),
            None => panic!("console script exhausted"),
        }
    }

    fn write(&mut self, byte: u8) -> nb::Result<(), HalError> {
        self.output.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), HalError> {
        Ok(())
    }
}

/// What the interpreter asked the bus to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Passive,
    Control,
    Attention(bool),
    Remote(bool),
    Clear,
    Transmit,
    Receive,
    Byte(u8),
    Last(u8),
}

/// Bus recording every primitive in call order
#[derive(Default)]
pub struct FakeBus {
    pub events: Vec<Event>,
    pub incoming: VecDeque<(u8, bool)>,
    indicators: Indicators,
    end: bool,
}

impl FakeBus {
    /// Queue a reply from the addressed talker, EOI on its last byte
    pub fn reply(&mut self, bytes: &[u8]) {
        for (index, &byte) in bytes.iter().enumerate() {
            self.incoming.push_back((byte, index + 1 == bytes.len()));
        }
    }

    /// Bytes sent while ATN was asserted
    pub fn commands(&self) -> Vec<u8> {
        let mut attention = false;
        let mut commands = Vec::new();
        for event in &self.events {
            match *event {
                Event::Attention(level) => attention = level,
                Event::Byte(byte) if attention => commands.push(byte),
                _ => {}
            }
        }
        commands
    }

    /// Bytes sent as data, with their EOI flag
    pub fn data(&self) -> Vec<(u8, bool)> {
        let mut attention = false;
        let mut data = Vec::new();
        for event in &self.events {
            match *event {
                Event::Attention(level) => attention = level,
                Event::Byte(byte) if !attention => data.push((byte, false)),
                Event::Last(byte) => data.push((byte, true)),
                _ => {}
            }
        }
        data
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl BusIo for FakeBus {
    fn begin_transmit(&mut self) {
        self.events.push(Event::Transmit);
    }

    fn enqueue_byte(&mut self, byte: u8) -> GpibResult<()> {
        self.events.push(Event::Byte(byte));
        Ok(())
    }

    fn enqueue_last_byte(&mut self, byte: u8) -> GpibResult<()> {
        self.events.push(Event::Last(byte));
        Ok(())
    }

    fn flush(&mut self) -> GpibResult<()> {
        Ok(())
    }

    fn begin_receive(&mut self) -> GpibResult<()> {
        self.events.push(Event::Receive);
        Ok(())
    }

    fn get_byte(&mut self) -> GpibResult<u8> {
        let (byte, eoi) = self.incoming.pop_front().ok_or(GpibError::Timeout)?;
        self.end = eoi;
        Ok(byte)
    }

    fn end_of_transaction(&mut self) -> bool {
        core::mem::take(&mut self.end)
    }
}

impl BusControl for FakeBus {
    fn go_passive(&mut self) {
        self.events.push(Event::Passive);
    }

    fn take_control(&mut self) {
        self.events.push(Event::Control);
    }

    fn set_attention(&mut self, attention: bool) -> GpibResult<()> {
        self.events.push(Event::Attention(attention));
        Ok(())
    }

    fn set_remote(&mut self, remote: bool) {
        self.events.push(Event::Remote(remote));
    }

    fn pulse_clear(&mut self) {
        self.events.push(Event::Clear);
    }

    fn indicators(&self) -> &Indicators {
        &self.indicators
    }
}

/// Byte-addressed EEPROM that counts cell writes
pub struct Eeprom {
    pub cells: [u8; 64],
    pub writes: usize,
}

impl Default for Eeprom {
    fn default() -> Self {
        Self {
            cells: [0xFF; 64],
            writes: 0,
        }
    }
}

impl NvStorage for Eeprom {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> HalResult<()> {
        let cells = self
            .cells
            .get(offset..offset + buffer.len())
            .ok_or(HalError::InvalidParameter)?;
        buffer.copy_from_slice(cells);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> HalResult<()> {
        self.cells
            .get_mut(offset..offset + data.len())
            .ok_or(HalError::InvalidParameter)?
            .copy_from_slice(data);
        self.writes += data.len();
        Ok(())
    }
}
