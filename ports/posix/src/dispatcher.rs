//! Interrupt dispatcher thread
//!
//! Stands in for the interrupt controller and the tick timer: it steps the
//! simulated instrument, runs the `BusState` handler of every pending
//! handshake interrupt and calls the tick handler every 16 ms.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use gpib_bus::BusState;
use gpib_core::timeout::TICK_PERIOD_MS;
use gpib_core::Leds;
use hal::Irq;
use log::{debug, trace};

use crate::cable::{Cable, SimBus};
use crate::error::{SimError, SimResult};
use crate::instrument::Instrument;

/// Pause between instrument steps
const STEP_PAUSE: Duration = Duration::from_micros(20);

/// Handle on the running dispatcher thread
pub struct Dispatcher {
    running: Arc<AtomicBool>,
    handle: JoinHandle<Instrument>,
}

impl Dispatcher {
    /// Start serving `state` with `instrument` on the other end of `cable`
    pub fn spawn<const N: usize>(
        state: Arc<BusState<SimBus, N>>,
        cable: Cable,
        mut instrument: Instrument,
    ) -> SimResult<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("gpib-irq".into())
            .spawn(move || {
                let tick = Duration::from_millis(u64::from(TICK_PERIOD_MS));
                let mut next_tick = Instant::now() + tick;
                let mut leds = Leds::default();

                while flag.load(Ordering::Acquire) {
                    instrument.step(&cable);
                    deliver(&state, &cable);

                    let now = Instant::now();
                    if now >= next_tick {
                        next_tick += tick;
                        if let Some(update) = state.on_tick() {
                            if update != leds {
                                trace!("leds {:?}", update);
                                leds = update;
                            }
                        }
                    }
                    thread::sleep(STEP_PAUSE);
                }
                instrument
            })?;

        debug!("dispatcher started");
        Ok(Self { running, handle })
    }

    /// Stop the thread and hand back the instrument
    pub fn stop(self) -> SimResult<Instrument> {
        self.running.store(false, Ordering::Release);
        let instrument = self.handle.join().map_err(|_| SimError::Dispatcher)?;
        debug!("dispatcher stopped");
        Ok(instrument)
    }
}

/// Run the handler of every pending handshake interrupt
fn deliver<const N: usize>(state: &BusState<SimBus, N>, cable: &Cable) {
    if cable.take_pending(Irq::Nrfd) {
        state.on_nrfd();
    }
    if cable.take_pending(Irq::Ndac) {
        state.on_ndac();
    }
    if cable.take_pending(Irq::Dav) {
        state.on_dav();
    }
}
