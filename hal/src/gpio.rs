//! GPIO (General Purpose Input/Output) vocabulary

/// GPIO pin modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Input (floating)
    Input,
    /// Output (push-pull)
    Output,
}

impl PinMode {
    /// Output when `output` holds, input otherwise
    pub const fn output_if(output: bool) -> Self {
        if output {
            Self::Output
        } else {
            Self::Input
        }
    }
}

/// Interrupt trigger edge, in electrical terms.
///
/// GPIB lines are active low: a `Falling` edge is the line becoming asserted,
/// a `Rising` edge is the line being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Rising edge (line released)
    Rising,
    /// Falling edge (line asserted)
    Falling,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Edge {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Rising => defmt::write!(fmt, "Rising"),
            Self::Falling => defmt::write!(fmt, "Falling"),
        }
    }
}
