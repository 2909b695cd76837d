//! Deterministic bus lines for handler tests

use hal::{BusLines, Control, Edge, Irq, Line, PinMode};

/// Lines with an explicit remote side; tests call the handlers themselves
pub(crate) struct FakeLines {
    latch: [bool; 8],
    output: [bool; 8],
    remote: [bool; 8],
    controls: [bool; 4],
    data_output: bool,
    pub data: u8,
    pub remote_data: u8,
    edges: [Option<Edge>; 3],
}

impl FakeLines {
    pub fn new() -> Self {
        Self {
            latch: [false; 8],
            output: [false; 8],
            remote: [false; 8],
            controls: [false; 4],
            data_output: false,
            data: 0xFF,
            remote_data: 0xFF,
            edges: [None; 3],
        }
    }

    /// Assert or release a line from the other end of the cable
    pub fn set_remote(&mut self, line: Line, asserted: bool) {
        self.remote[line as usize] = asserted;
    }

    pub fn mode(&self, line: Line) -> PinMode {
        PinMode::output_if(self.output[line as usize])
    }

    pub fn is_output(&self, line: Line) -> bool {
        self.output[line as usize]
    }
}

impl BusLines for FakeLines {
    fn assert(&mut self, line: Line) {
        self.latch[line as usize] = true;
    }

    fn release(&mut self, line: Line) {
        self.latch[line as usize] = false;
    }

    fn is_driving(&self, line: Line) -> bool {
        self.latch[line as usize]
    }

    fn is_asserted(&self, line: Line) -> bool {
        let index = line as usize;
        (self.output[index] && self.latch[index]) || self.remote[index]
    }

    fn set_mode(&mut self, line: Line, mode: PinMode) {
        self.output[line as usize] = mode == PinMode::Output;
    }

    fn set_control(&mut self, control: Control, enabled: bool) {
        self.controls[control as usize] = enabled;
    }

    fn control(&self, control: Control) -> bool {
        self.controls[control as usize]
    }

    fn set_data_mode(&mut self, mode: PinMode) {
        self.data_output = mode == PinMode::Output;
    }

    fn write_data(&mut self, raw: u8) {
        self.data = raw;
    }

    fn read_data(&self) -> u8 {
        if self.data_output {
            self.data
        } else {
            self.remote_data
        }
    }

    fn enable_interrupt(&mut self, irq: Irq, edge: Edge) {
        self.edges[irq as usize] = Some(edge);
    }

    fn disable_interrupt(&mut self, irq: Irq) {
        self.edges[irq as usize] = None;
    }

    fn interrupt_edge(&self, irq: Irq) -> Option<Edge> {
        self.edges[irq as usize]
    }
}
