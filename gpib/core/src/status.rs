//! Operator-visible status and error indicators
//!
//! The bridge has two LEDs: yellow shows what the bus is doing, red shows the
//! last error. Both are latched values written from the foreground and from
//! interrupt handlers and blinked out as 16-bit patterns.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::GpibError;

/// Ticks of the 16 ms timer per blink step (128 ms)
pub const BLINK_POSTSCALER: u8 = 8;

/// Blink steps per pattern
pub const PATTERN_STEPS: u8 = 16;

/// Bus activity shown on the status LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Not controlling the bus
    Offline = 0,
    /// Controller in charge, bus idle
    Online = 1,
    /// Listening, nothing pending
    Receive = 2,
    /// Listening, bytes arriving
    Receiving = 3,
    /// Talking, nothing pending
    Transmit = 4,
    /// Talking, bytes leaving
    Transmitting = 5,
}

impl Status {
    /// Blink pattern, one bit per step, LSB first
    pub const fn pattern(self) -> u16 {
        match self {
            Status::Offline => 0x0000,
            Status::Online => 0x0001,
            Status::Receive => 0x00FF,
            Status::Receiving => 0x00AA,
            Status::Transmit => 0x0F0F,
            Status::Transmitting => 0x0A0A,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Status::Online,
            2 => Status::Receive,
            3 => Status::Receiving,
            4 => Status::Transmit,
            5 => Status::Transmitting,
            _ => Status::Offline,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Status::Offline => defmt::write!(fmt, "Offline"),
            Status::Online => defmt::write!(fmt, "Online"),
            Status::Receive => defmt::write!(fmt, "Receive"),
            Status::Receiving => defmt::write!(fmt, "Receiving"),
            Status::Transmit => defmt::write!(fmt, "Transmit"),
            Status::Transmitting => defmt::write!(fmt, "Transmitting"),
        }
    }
}

/// Latched status and error values
pub struct Indicators {
    status: AtomicU8,
    error: AtomicU8,
}

impl Indicators {
    /// Offline, no error
    pub const fn new() -> Self {
        Self {
            status: AtomicU8::new(Status::Offline as u8),
            error: AtomicU8::new(0),
        }
    }

    /// Publish the current bus activity
    pub fn set_status(&self, status: Status) {
        self.status.store(status as u8, Ordering::Relaxed);
    }

    /// Current bus activity
    pub fn status(&self) -> Status {
        Status::from_raw(self.status.load(Ordering::Relaxed))
    }

    /// Latch an error; it stays until cleared or replaced
    pub fn raise(&self, error: GpibError) {
        self.error.store(error.to_raw(), Ordering::Relaxed);
    }

    /// Forget the latched error
    pub fn clear_error(&self) {
        self.error.store(0, Ordering::Relaxed);
    }

    /// Latched error, if any
    pub fn error(&self) -> Option<GpibError> {
        GpibError::from_raw(self.error.load(Ordering::Relaxed))
    }
}

impl Default for Indicators {
    fn default() -> Self {
        Self::new()
    }
}

/// LED levels for one blink step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Leds {
    /// Error LED
    pub red: bool,
    /// Status LED
    pub yellow: bool,
}

/// Shifts the latched patterns out to the LEDs.
///
/// Patterns are sampled at the start of each 16-step cycle, so a short-lived
/// status still blinks a complete pattern.
#[derive(Debug, Clone, Copy)]
pub struct Blinker {
    postscaler: u8,
    position: u8,
    red: u16,
    yellow: u16,
}

impl Blinker {
    /// Start at the end of a cycle so the first step samples the patterns
    pub const fn new() -> Self {
        Self {
            postscaler: 0,
            position: PATTERN_STEPS - 1,
            red: 0,
            yellow: 0,
        }
    }

    /// Advance by one timer tick; returns new LED levels every
    /// [`BLINK_POSTSCALER`] ticks
    pub fn tick(&mut self, indicators: &Indicators) -> Option<Leds> {
        self.postscaler += 1;
        if self.postscaler < BLINK_POSTSCALER {
            return None;
        }
        self.postscaler = 0;
        Some(self.step(indicators))
    }

    fn step(&mut self, indicators: &Indicators) -> Leds {
        self.position += 1;
        if self.position >= PATTERN_STEPS {
            self.position = 0;
            self.red = indicators.error().map_or(0, GpibError::pattern);
            self.yellow = indicators.status().pattern();
        }

        let leds = Leds {
            red: self.red & 1 != 0,
            yellow: self.yellow & 1 != 0,
        };
        self.red >>= 1;
        self.yellow >>= 1;
        leds
    }
}

impl Default for Blinker {
    fn default() -> Self {
        Self::new()
    }
}
