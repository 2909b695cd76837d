//! IEEE-488.1 interface messages sent with ATN asserted

use core::fmt;

/// Universal command group
const fn ucg(code: u8) -> u8 {
    0x10 | (code & 0x0F)
}

/// Addressed command group
const fn acg(code: u8) -> u8 {
    code & 0x0F
}

/// Local lockout
pub const LLO: u8 = ucg(0x1);
/// Device clear
pub const DCL: u8 = ucg(0x4);
/// Parallel poll unconfigure
pub const PPU: u8 = ucg(0x5);
/// Serial poll enable
pub const SPE: u8 = ucg(0x8);
/// Serial poll disable
pub const SPD: u8 = ucg(0x9);

/// Go to local
pub const GTL: u8 = acg(0x1);
/// Selected device clear
pub const SDC: u8 = acg(0x4);
/// Parallel poll configure
pub const PPC: u8 = acg(0x5);
/// Group execute trigger
pub const GET: u8 = acg(0x8);
/// Take control
pub const TCT: u8 = acg(0x9);

/// Listen address group base
pub const LAG: u8 = 0x20;
/// Talk address group base
pub const TAG: u8 = 0x40;
/// Unlisten
pub const UNL: u8 = LAG | 0x1F;
/// Untalk
pub const UNT: u8 = TAG | 0x1F;

/// Whether a byte received under ATN is an addressed command
pub const fn is_addressed_command(byte: u8) -> bool {
    byte & 0x70 == 0x00
}

/// Whether a byte received under ATN is a universal command
pub const fn is_universal_command(byte: u8) -> bool {
    byte & 0x70 == 0x10
}

/// Primary bus address of a device (0..=30)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u8);

impl Address {
    /// Highest assignable address; 31 is reserved for UNL/UNT
    pub const MAX: u8 = 30;

    /// Validate a primary address
    pub const fn new(address: u8) -> Option<Self> {
        if address <= Self::MAX {
            Some(Self(address))
        } else {
            None
        }
    }

    /// Raw address value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// My-listen-address command byte for this device
    pub const fn listen(self) -> u8 {
        LAG | self.0
    }

    /// My-talk-address command byte for this device
    pub const fn talk(self) -> u8 {
        TAG | self.0
    }

    /// Decode a listen address command byte
    pub const fn from_listen(byte: u8) -> Option<Self> {
        let byte = byte & 0x7F;
        if byte & 0x60 == LAG && byte != UNL {
            Some(Self(byte & 0x1F))
        } else {
            None
        }
    }

    /// Decode a talk address command byte
    pub const fn from_talk(byte: u8) -> Option<Self> {
        let byte = byte & 0x7F;
        if byte & 0x60 == TAG && byte != UNT {
            Some(Self(byte & 0x1F))
        } else {
            None
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Address {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.0);
    }
}
