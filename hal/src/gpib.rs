//! GPIB (IEEE-488) bus line capability
//!
//! The bus is driven through a pair of bus transceivers (a 75160-style data
//! transceiver and a 75162-style management transceiver). This trait exposes
//! just what the protocol needs: assert/release/sense named lines, switch
//! their direction, drive the transceiver controls, move a raw byte over the
//! data lines and arm edge-triggered interrupts on the three handshake lines.

use crate::gpio::{Edge, PinMode};

/// GPIB signal lines (all active low on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Data valid
    Dav,
    /// Not ready for data
    Nrfd,
    /// Not data accepted
    Ndac,
    /// End or identify
    Eoi,
    /// Attention
    Atn,
    /// Interface clear
    Ifc,
    /// Remote enable
    Ren,
    /// Service request
    Srq,
}

impl Line {
    /// All lines, handshake lines first
    pub const ALL: [Line; 8] = [
        Line::Dav,
        Line::Nrfd,
        Line::Ndac,
        Line::Eoi,
        Line::Atn,
        Line::Ifc,
        Line::Ren,
        Line::Srq,
    ];
}

#[cfg(feature = "defmt")]
impl defmt::Format for Line {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Dav => defmt::write!(fmt, "DAV"),
            Self::Nrfd => defmt::write!(fmt, "NRFD"),
            Self::Ndac => defmt::write!(fmt, "NDAC"),
            Self::Eoi => defmt::write!(fmt, "EOI"),
            Self::Atn => defmt::write!(fmt, "ATN"),
            Self::Ifc => defmt::write!(fmt, "IFC"),
            Self::Ren => defmt::write!(fmt, "REN"),
            Self::Srq => defmt::write!(fmt, "SRQ"),
        }
    }
}

/// Transceiver control inputs, named by the state they select when enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Push-pull drivers with bus termination (PE)
    Terminate,
    /// Controller side of the management transceiver (DC low)
    Controller,
    /// System controller owns IFC and REN (SC)
    SystemController,
    /// Data and handshake transceivers face the bus as talker (TE)
    TalkEnable,
}

/// Edge-triggered handshake interrupts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Irq {
    /// NRFD edge, drives the source handshake
    Nrfd,
    /// NDAC edge, signals data accepted
    Ndac,
    /// DAV edge, drives the acceptor handshake
    Dav,
}

/// Capability interface over the GPIB lines.
///
/// `assert`/`release` operate on the output latch of a line; the latch only
/// reaches the bus while the line is in [`PinMode::Output`]. `is_driving`
/// reads the latch back, `is_asserted` senses the wire.
pub trait BusLines: Send {
    /// Set the output latch of a line to its asserted (low) level
    fn assert(&mut self, line: Line);

    /// Set the output latch of a line to its released (high) level
    fn release(&mut self, line: Line);

    /// Read back the output latch of a line
    fn is_driving(&self, line: Line) -> bool;

    /// Sense whether the line is asserted on the bus
    fn is_asserted(&self, line: Line) -> bool;

    /// Switch a line between input and output
    fn set_mode(&mut self, line: Line, mode: PinMode);

    /// Drive a transceiver control input
    fn set_control(&mut self, control: Control, enabled: bool);

    /// Read back a transceiver control input
    fn control(&self, control: Control) -> bool;

    /// Switch the eight data lines between input and output
    fn set_data_mode(&mut self, mode: PinMode);

    /// Write the raw electrical level of the data lines
    fn write_data(&mut self, raw: u8);

    /// Read the raw electrical level of the data lines
    fn read_data(&self) -> u8;

    /// Arm an interrupt on the given edge and discard any pending request
    fn enable_interrupt(&mut self, irq: Irq, edge: Edge);

    /// Disarm an interrupt
    fn disable_interrupt(&mut self, irq: Irq);

    /// Edge an interrupt is armed for, `None` while disarmed
    fn interrupt_edge(&self, irq: Irq) -> Option<Edge>;

    /// Check if an interrupt is armed
    fn is_interrupt_enabled(&self, irq: Irq) -> bool {
        self.interrupt_edge(irq).is_some()
    }
}
