//! Simulated IEEE-488 cable
//!
//! Every line is open collector: it is asserted when either end pulls it
//! low. The controller end is [`SimBus`], which implements [`BusLines`]
//! with output latches, pin modes and edge detection on the handshake
//! lines. The device end is driven by whatever holds a [`Cable`] clone,
//! normally the [`Instrument`](crate::Instrument).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hal::{BusLines, Control, Edge, Irq, Line, PinMode};
use log::trace;

const LINES: usize = Line::ALL.len();
const IRQS: [(Irq, Line); 3] = [
    (Irq::Nrfd, Line::Nrfd),
    (Irq::Ndac, Line::Ndac),
    (Irq::Dav, Line::Dav),
];

/// Electrical state of both ends
#[derive(Debug)]
pub struct Wire {
    latch: [bool; LINES],
    output: [bool; LINES],
    controls: [bool; 4],
    data_output: bool,
    data: u8,
    edges: [Option<Edge>; 3],
    pending: [bool; 3],
    sensed: [bool; 3],
    device: [bool; LINES],
    device_data: u8,
}

impl Wire {
    fn new() -> Self {
        Self {
            latch: [false; LINES],
            output: [false; LINES],
            controls: [false; 4],
            data_output: false,
            data: 0xFF,
            edges: [None; 3],
            pending: [false; 3],
            sensed: [false; 3],
            device: [false; LINES],
            device_data: 0xFF,
        }
    }

    /// Level seen by both ends
    pub fn is_asserted(&self, line: Line) -> bool {
        let index = line as usize;
        (self.output[index] && self.latch[index]) || self.device[index]
    }

    /// Byte on the data lines, already inverted back to logic levels
    pub fn data(&self) -> u8 {
        !self.raw_data()
    }

    /// Pull a line low from the device end, or let it go
    pub fn drive(&mut self, line: Line, asserted: bool) {
        self.device[line as usize] = asserted;
        self.sense();
    }

    /// Whether the device end pulls a line
    pub fn is_driven(&self, line: Line) -> bool {
        self.device[line as usize]
    }

    /// Put a byte on the data lines from the device end, `None` to let go
    pub fn drive_data(&mut self, byte: Option<u8>) {
        self.device_data = byte.map_or(0xFF, |byte| !byte);
    }

    /// Release everything the device end holds
    pub fn let_go(&mut self) {
        self.device = [false; LINES];
        self.device_data = 0xFF;
        self.sense();
    }

    fn raw_data(&self) -> u8 {
        let local = if self.data_output { self.data } else { 0xFF };
        local & self.device_data
    }

    /// Latch edges on the handshake lines for the armed interrupts
    fn sense(&mut self) {
        for (index, &(irq, line)) in IRQS.iter().enumerate() {
            let level = self.is_asserted(line);
            if level == self.sensed[index] {
                continue;
            }
            self.sensed[index] = level;
            let edge = if level { Edge::Falling } else { Edge::Rising };
            if self.edges[index] == Some(edge) {
                trace!("{:?} {:?} edge", irq, edge);
                self.pending[index] = true;
            }
        }
    }
}

/// Shared handle on the simulated wire
#[derive(Debug, Clone)]
pub struct Cable {
    wire: Arc<Mutex<Wire>>,
}

impl Cable {
    /// Idle cable, nothing driven
    pub fn new() -> Self {
        Self {
            wire: Arc::new(Mutex::new(Wire::new())),
        }
    }

    /// Run `f` with exclusive access to the wire
    pub fn with<R>(&self, f: impl FnOnce(&mut Wire) -> R) -> R {
        f(&mut self.lock())
    }

    /// Consume a pending interrupt request
    pub fn take_pending(&self, irq: Irq) -> bool {
        let mut wire = self.lock();
        let pending = &mut wire.pending[irq as usize];
        std::mem::take(pending)
    }

    fn lock(&self) -> MutexGuard<'_, Wire> {
        self.wire.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Cable {
    fn default() -> Self {
        Self::new()
    }
}

/// Controller end of a [`Cable`]
#[derive(Debug, Clone)]
pub struct SimBus {
    cable: Cable,
}

impl SimBus {
    /// Attach to a cable
    pub fn new(cable: Cable) -> Self {
        Self { cable }
    }

    /// The cable this end is plugged into
    pub fn cable(&self) -> &Cable {
        &self.cable
    }

    /// Whether a line is an output at this end
    pub fn mode(&self, line: Line) -> PinMode {
        self.cable
            .with(|wire| PinMode::output_if(wire.output[line as usize]))
    }
}

impl BusLines for SimBus {
    fn assert(&mut self, line: Line) {
        self.cable.with(|wire| {
            wire.latch[line as usize] = true;
            wire.sense();
        });
    }

    fn release(&mut self, line: Line) {
        self.cable.with(|wire| {
            wire.latch[line as usize] = false;
            wire.sense();
        });
    }

    fn is_driving(&self, line: Line) -> bool {
        self.cable.with(|wire| wire.latch[line as usize])
    }

    fn is_asserted(&self, line: Line) -> bool {
        self.cable.with(|wire| wire.is_asserted(line))
    }

    fn set_mode(&mut self, line: Line, mode: PinMode) {
        self.cable.with(|wire| {
            wire.output[line as usize] = mode == PinMode::Output;
            wire.sense();
        });
    }

    fn set_control(&mut self, control: Control, enabled: bool) {
        self.cable
            .with(|wire| wire.controls[control as usize] = enabled);
    }

    fn control(&self, control: Control) -> bool {
        self.cable.with(|wire| wire.controls[control as usize])
    }

    fn set_data_mode(&mut self, mode: PinMode) {
        self.cable
            .with(|wire| wire.data_output = mode == PinMode::Output);
    }

    fn write_data(&mut self, raw: u8) {
        self.cable.with(|wire| wire.data = raw);
    }

    fn read_data(&self) -> u8 {
        self.cable.with(|wire| wire.raw_data())
    }

    fn enable_interrupt(&mut self, irq: Irq, edge: Edge) {
        self.cable.with(|wire| {
            wire.edges[irq as usize] = Some(edge);
            wire.pending[irq as usize] = false;
        });
    }

    fn disable_interrupt(&mut self, irq: Irq) {
        self.cable.with(|wire| {
            wire.edges[irq as usize] = None;
            wire.pending[irq as usize] = false;
        });
    }

    fn interrupt_edge(&self, irq: Irq) -> Option<Edge> {
        self.cable.with(|wire| wire.edges[irq as usize])
    }
}
