//! POSIX host port for the GPIB bridge.
//!
//! Runs the bus engine, the streams and the command interpreter on a
//! workstation. The IEEE-488 cable is simulated ([`Cable`], [`SimBus`]) with
//! a single [`Instrument`] on the far end, and a [`Dispatcher`] thread plays
//! the part of the interrupt controller and the 16 ms timer.
//!
//! ```no_run
//! use gpib_core::Address;
//! use gpib_posix::{Bench, Instrument, StdDelay};
//!
//! let instrument = Instrument::new(Address::new(5).unwrap(), "SIM,1");
//! let bench = Bench::start(instrument).unwrap();
//! let mut engine = bench.engine(StdDelay);
//! engine.prepare();
//! engine.take_control();
//! ```

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use gpib_bus::{BusEngine, BusState};

pub mod cable;
pub mod delay;
pub mod dispatcher;
pub mod error;
pub mod instrument;
pub mod serial;
pub mod storage;

pub use cable::{Cable, SimBus};
pub use delay::{NoDelay, StdDelay};
pub use dispatcher::Dispatcher;
pub use error::{SimError, SimResult};
pub use instrument::Instrument;
pub use serial::{PipeSerial, StdioSerial};
pub use storage::{FileStorage, MemStorage};

/// Bus state wired to a simulated cable
pub type SimState = BusState<SimBus>;

/// A simulated bus with one instrument attached and interrupts running
pub struct Bench {
    state: Arc<SimState>,
    dispatcher: Dispatcher,
}

impl Bench {
    /// Attach `instrument` to a fresh cable and start the dispatcher
    pub fn start(instrument: Instrument) -> SimResult<Self> {
        let cable = Cable::new();
        let state = Arc::new(BusState::new(SimBus::new(cable.clone())));
        let dispatcher = Dispatcher::spawn(Arc::clone(&state), cable, instrument)?;
        Ok(Self { state, dispatcher })
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Foreground handle on the bus
    pub fn engine<D: DelayNs>(&self, delay: D) -> BusEngine<'_, SimBus, D> {
        BusEngine::new(&self.state, delay)
    }

    /// Stop the dispatcher and hand back the instrument
    pub fn finish(self) -> SimResult<Instrument> {
        self.dispatcher.stop()
    }
}
