//! End-of-string configuration and its non-volatile record
//!
//! The record is a flat fixed-size block at [`RECORD_OFFSET`]:
//!
//! | offset | content                                  |
//! |--------|------------------------------------------|
//! | 0      | [`RECORD_MAGIC`]                         |
//! | 1..7   | serial EOS: `in[2] nin out[2] nout`      |
//! | 7..13  | bus EOS: `in[2] nin out[2] nout`         |
//! | 13     | bus EOI ends input (0/1)                 |
//! | 14     | bus EOI on output (0/1)                  |
//!
//! A blank or corrupt record loads [`Configuration::DEFAULT`].

use hal::NvStorage;
use log::{debug, warn};

use crate::{GpibError, GpibResult};

/// Size of the persisted record in bytes
pub const RECORD_LEN: usize = 15;

/// Location of the record in the store
pub const RECORD_OFFSET: usize = 0;

/// First byte of a valid record; erased EEPROM reads 0xFF
pub const RECORD_MAGIC: u8 = 0xB1;

/// Terminator sequence of zero, one or two bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Terminator {
    bytes: [u8; 2],
    len: u8,
}

impl Terminator {
    /// Maximum terminator length
    pub const MAX_LEN: usize = 2;

    /// Empty terminator; never matches
    pub const NONE: Self = Self {
        bytes: [0; 2],
        len: 0,
    };

    /// Line feed
    pub const LF: Self = Self::one(b'\n');

    /// Carriage return, line feed
    pub const CRLF: Self = Self::two(b'\r', b'\n');

    /// Single-byte terminator
    pub const fn one(byte: u8) -> Self {
        Self {
            bytes: [byte, 0],
            len: 1,
        }
    }

    /// Two-byte terminator
    pub const fn two(first: u8, second: u8) -> Self {
        Self {
            bytes: [first, second],
            len: 2,
        }
    }

    /// Build from up to two bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [] => Some(Self::NONE),
            [a] => Some(Self::one(a)),
            [a, b] => Some(Self::two(a, b)),
            _ => None,
        }
    }

    /// Append a byte; `false` when already two bytes long
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len() >= Self::MAX_LEN {
            return false;
        }
        self.bytes[self.len()] = byte;
        self.len += 1;
        true
    }

    /// Terminator bytes in order
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Number of bytes
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Zero-length terminator
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First byte, if any
    pub fn first(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    /// Second byte, if any
    pub fn second(&self) -> Option<u8> {
        self.as_slice().get(1).copied()
    }
}

/// Input and output terminators of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Eos {
    /// Sequence that ends an incoming message
    pub input: Terminator,
    /// Sequence appended to an outgoing message
    pub output: Terminator,
}

impl Eos {
    /// Same terminator both ways
    pub const fn symmetric(terminator: Terminator) -> Self {
        Self {
            input: terminator,
            output: terminator,
        }
    }
}

/// How the bus channel uses the EOI line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EoiMode {
    /// EOI on the last received byte ends the stream
    pub input: bool,
    /// EOI is asserted with the last byte of an outgoing message
    pub output: bool,
}

/// Persisted bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    /// Terminal (serial) channel terminators
    pub serial: Eos,
    /// GPIB channel terminators
    pub bus: Eos,
    /// GPIB channel EOI handling
    pub eoi: EoiMode,
}

impl Configuration {
    /// Settings used when the store holds no valid record
    pub const DEFAULT: Self = Self {
        serial: Eos::symmetric(Terminator::LF),
        bus: Eos::symmetric(Terminator::CRLF),
        eoi: EoiMode {
            input: true,
            output: true,
        },
    };

    /// Factory record restored by `RESET`: CR LF on both channels
    pub const FACTORY: Self = Self {
        serial: Eos::symmetric(Terminator::CRLF),
        ..Self::DEFAULT
    };

    /// Serialize into the fixed record layout
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        record[0] = RECORD_MAGIC;
        encode_eos(&self.serial, &mut record[1..7]);
        encode_eos(&self.bus, &mut record[7..13]);
        record[13] = self.eoi.input as u8;
        record[14] = self.eoi.output as u8;
        record
    }

    /// Parse a record, `None` when blank or corrupt
    pub fn from_record(record: &[u8; RECORD_LEN]) -> Option<Self> {
        if record[0] != RECORD_MAGIC {
            return None;
        }
        Some(Self {
            serial: decode_eos(&record[1..7])?,
            bus: decode_eos(&record[7..13])?,
            eoi: EoiMode {
                input: decode_flag(record[13])?,
                output: decode_flag(record[14])?,
            },
        })
    }

    /// Load from the store, falling back to the defaults
    pub fn load<S: NvStorage>(storage: &mut S) -> Self {
        let mut record = [0u8; RECORD_LEN];
        if let Err(err) = storage.read(RECORD_OFFSET, &mut record) {
            warn!("configuration read failed: {}; using defaults", err);
            return Self::DEFAULT;
        }
        match Self::from_record(&record) {
            Some(config) => {
                debug!("configuration loaded");
                config
            }
            None => {
                warn!("no valid configuration record; using defaults");
                Self::DEFAULT
            }
        }
    }

    /// Persist, rewriting only the bytes that changed
    pub fn store<S: NvStorage>(&self, storage: &mut S) -> GpibResult<()> {
        if storage.capacity() < RECORD_OFFSET + RECORD_LEN {
            return Err(GpibError::Storage);
        }
        storage
            .update(RECORD_OFFSET, &self.to_record())
            .map_err(|err| {
                warn!("configuration store failed: {}", err);
                GpibError::Storage
            })
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn encode_terminator(terminator: &Terminator, out: &mut [u8]) {
    out[..terminator.len()].copy_from_slice(terminator.as_slice());
    out[2] = terminator.len() as u8;
}

fn encode_eos(eos: &Eos, out: &mut [u8]) {
    encode_terminator(&eos.input, &mut out[0..3]);
    encode_terminator(&eos.output, &mut out[3..6]);
}

fn decode_terminator(raw: &[u8]) -> Option<Terminator> {
    let len = raw[2] as usize;
    if len > Terminator::MAX_LEN {
        return None;
    }
    Terminator::from_slice(&raw[..len])
}

fn decode_eos(raw: &[u8]) -> Option<Eos> {
    Some(Eos {
        input: decode_terminator(&raw[0..3])?,
        output: decode_terminator(&raw[3..6])?,
    })
}

fn decode_flag(raw: u8) -> Option<bool> {
    match raw {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::{HalError, HalResult};

    struct Eeprom {
        cells: [u8; 32],
        writes: usize,
    }

    impl Eeprom {
        fn blank() -> Self {
            Self {
                cells: [0xFF; 32],
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

    #[test]
    fn test_terminator_push_limit() {
        let mut terminator = Terminator::NONE;
        assert!(terminator.is_empty());
        assert!(terminator.push(b'\r'));
        assert!(terminator.push(b'\n'));
        assert!(!terminator.push(b'x'));
        assert_eq!(terminator, Terminator::CRLF);
        assert_eq!(terminator.first(), Some(b'\r'));
        assert_eq!(terminator.second(), Some(b'\n'));
        assert_eq!(Terminator::from_slice(b"abc"), None);
    }

    #[test]
    fn test_blank_store_loads_defaults() {
        let mut eeprom = Eeprom::blank();
        assert_eq!(Configuration::load(&mut eeprom), Configuration::DEFAULT);
    }

    #[test]
    fn test_store_then_load() {
        let mut eeprom = Eeprom::blank();
        let config = Configuration {
            serial: Eos {
                input: Terminator::one(b'\r'),
                output: Terminator::CRLF,
            },
            bus: Eos::symmetric(Terminator::NONE),
            eoi: EoiMode {
                input: true,
                output: false,
            },
        };
        config.store(&mut eeprom).unwrap();
        assert_eq!(Configuration::load(&mut eeprom), config);
    }

    #[test]
    fn test_unchanged_store_writes_nothing() {
        let mut eeprom = Eeprom::blank();
        Configuration::DEFAULT.store(&mut eeprom).unwrap();
        let writes = eeprom.writes;
        Configuration::DEFAULT.store(&mut eeprom).unwrap();
        assert_eq!(eeprom.writes, writes);
    }

    #[test]
    fn test_factory_record_differs_only_in_serial_eos() {
        assert_eq!(Configuration::FACTORY.serial, Eos::symmetric(Terminator::CRLF));
        assert_eq!(Configuration::FACTORY.bus, Configuration::DEFAULT.bus);
        assert_eq!(Configuration::FACTORY.eoi, Configuration::DEFAULT.eoi);
    }

    #[test]
    fn test_corrupt_length_rejected() {
        let mut record = Configuration::DEFAULT.to_record();
        record[3] = 3;
        assert_eq!(Configuration::from_record(&record), None);

        let mut record = Configuration::DEFAULT.to_record();
        record[14] = 7;
        assert_eq!(Configuration::from_record(&record), None);
    }
}
