//! Bus state shared between the foreground and the handshake interrupts
//!
//! ## Transmit (source handshake)
//!
//! ```text
//! NRFD released  ─► on_nrfd: put !byte on DIO, EOI if last, assert DAV
//! NRFD asserted  ─► on_nrfd: arm NDAC released
//! NDAC released  ─► on_ndac: arm NRFD released, release DAV
//! ```
//!
//! ## Receive (acceptor handshake)
//!
//! ```text
//! DAV asserted   ─► on_dav: assert NRFD, stage !DIO and EOI, release NDAC
//! DAV released   ─► on_dav: assert NDAC, commit staged byte, release NRFD
//! ```
//!
//! A staged byte that does not fit keeps NRFD asserted and the DAV interrupt
//! off; the foreground commits it once it has taken a byte out.

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use critical_section::Mutex;
use gpib_core::timeout::DEFAULT_TIMEOUT_TICKS;
use gpib_core::{Blinker, GpibError, Indicators, Leds, Ring, Status, TimeoutCounter};
use hal::{BusLines, Edge, Irq, Line};

use crate::{Direction, DEFAULT_BUFFER_LEN};

const NO_SLOT: usize = usize::MAX;

/// Everything the handshake interrupts and the foreground share
pub struct BusState<L, const N: usize = DEFAULT_BUFFER_LEN> {
    lines: Mutex<RefCell<L>>,
    pub(crate) tx: Ring<N>,
    /// Ring slot of the byte that goes out with EOI
    pub(crate) tx_last: AtomicUsize,
    pub(crate) rx: Ring<N>,
    /// EOI level captured with the byte in the same rx slot
    pub(crate) rx_marks: [AtomicBool; N],
    pub(crate) rx_stalled: AtomicBool,
    pub(crate) rx_halted: AtomicBool,
    direction: AtomicU8,
    pub(crate) timeout: TimeoutCounter,
    indicators: Indicators,
    blinker: Mutex<Cell<Blinker>>,
}

impl<L: BusLines, const N: usize> BusState<L, N> {
    /// Wrap the bus lines; call [`BusEngine::prepare`] before use
    ///
    /// [`BusEngine::prepare`]: crate::BusEngine::prepare
    pub const fn new(lines: L) -> Self {
        Self {
            lines: Mutex::new(RefCell::new(lines)),
            tx: Ring::new(),
            tx_last: AtomicUsize::new(NO_SLOT),
            rx: Ring::new(),
            rx_marks: [const { AtomicBool::new(false) }; N],
            rx_stalled: AtomicBool::new(false),
            rx_halted: AtomicBool::new(false),
            direction: AtomicU8::new(Direction::Idle as u8),
            timeout: TimeoutCounter::new(DEFAULT_TIMEOUT_TICKS),
            indicators: Indicators::new(),
            blinker: Mutex::new(Cell::new(Blinker::new())),
        }
    }

    /// Run `f` with exclusive access to the lines
    pub fn with_lines<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        critical_section::with(|cs| f(&mut self.lines.borrow(cs).borrow_mut()))
    }

    /// Status and error latches
    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    /// Shared timeout counter
    pub fn timeout(&self) -> &TimeoutCounter {
        &self.timeout
    }

    /// Pump currently armed
    pub fn direction(&self) -> Direction {
        Direction::from_raw(self.direction.load(Ordering::Acquire))
    }

    pub(crate) fn set_direction(&self, direction: Direction) {
        self.direction.store(direction as u8, Ordering::Release);
    }

    /// Reception stopped by an overflow until the next `begin_receive`
    pub fn is_halted(&self) -> bool {
        self.rx_halted.load(Ordering::Acquire)
    }

    /// NRFD edge interrupt
    pub fn on_nrfd(&self) {
        self.with_lines(|lines| match lines.interrupt_edge(Irq::Nrfd) {
            Some(Edge::Rising) => self.source_ready(lines),
            Some(Edge::Falling) => lines.enable_interrupt(Irq::Ndac, Edge::Rising),
            None => {}
        });
    }

    /// NDAC released interrupt: all acceptors took the byte
    pub fn on_ndac(&self) {
        self.with_lines(|lines| {
            lines.disable_interrupt(Irq::Ndac);
            lines.enable_interrupt(Irq::Nrfd, Edge::Rising);
            lines.release(Line::Dav);
        });
    }

    /// DAV edge interrupt
    pub fn on_dav(&self) {
        self.with_lines(|lines| match lines.interrupt_edge(Irq::Dav) {
            Some(Edge::Falling) => self.acceptor_data_valid(lines),
            Some(Edge::Rising) => self.acceptor_data_taken(lines),
            None => {}
        });
    }

    /// Periodic 16 ms tick; returns LED levels when the blinker steps
    pub fn on_tick(&self) -> Option<Leds> {
        self.timeout.tick();
        critical_section::with(|cs| {
            let cell = self.blinker.borrow(cs);
            let mut blinker = cell.get();
            let leds = blinker.tick(&self.indicators);
            cell.set(blinker);
            leds
        })
    }

    fn source_ready(&self, lines: &mut L) {
        let consumer = self.tx.consumer();
        let slot = consumer.index();
        match consumer.pop() {
            Some(byte) => {
                lines.write_data(!byte);
                if self.tx_last.load(Ordering::Acquire) == slot {
                    lines.assert(Line::Eoi);
                    self.tx_last.store(NO_SLOT, Ordering::Release);
                } else {
                    lines.release(Line::Eoi);
                }
                lines.enable_interrupt(Irq::Nrfd, Edge::Falling);
                lines.assert(Line::Dav);
                self.indicators.set_status(Status::Transmitting);
            }
            None => {
                lines.disable_interrupt(Irq::Nrfd);
                lines.release(Line::Eoi);
                self.indicators.set_status(Status::Transmit);
            }
        }
    }

    fn acceptor_data_valid(&self, lines: &mut L) {
        if lines.is_driving(Line::Nrfd) {
            self.indicators.raise(GpibError::Overflow);
            lines.disable_interrupt(Irq::Dav);
            self.rx_halted.store(true, Ordering::Release);
            return;
        }

        lines.assert(Line::Nrfd);
        lines.enable_interrupt(Irq::Dav, Edge::Rising);

        let producer = self.rx.producer();
        producer.stage(!lines.read_data());
        self.rx_marks[producer.index()].store(lines.is_asserted(Line::Eoi), Ordering::Relaxed);

        lines.release(Line::Ndac);
        self.indicators.set_status(Status::Receiving);
    }

    fn acceptor_data_taken(&self, lines: &mut L) {
        lines.enable_interrupt(Irq::Dav, Edge::Falling);
        lines.assert(Line::Ndac);

        if self.rx.producer().commit() {
            lines.release(Line::Nrfd);
        } else {
            lines.disable_interrupt(Irq::Dav);
            self.rx_stalled.store(true, Ordering::Release);
        }
    }

    /// Commit a stalled byte after the foreground freed a slot
    pub(crate) fn resume_reception(&self) {
        self.with_lines(|lines| {
            if !self.rx_stalled.load(Ordering::Acquire) {
                return;
            }
            if self.rx.producer().commit() {
                self.rx_stalled.store(false, Ordering::Release);
                lines.enable_interrupt(Irq::Dav, Edge::Falling);
                lines.release(Line::Nrfd);
            }
        });
    }

    /// Start the source handshake if it went idle
    pub(crate) fn kick_transmitter(&self) {
        self.with_lines(|lines| {
            if !lines.is_interrupt_enabled(Irq::Nrfd) && !lines.is_interrupt_enabled(Irq::Ndac) {
                lines.enable_interrupt(Irq::Nrfd, Edge::Rising);
                if !lines.is_asserted(Line::Nrfd) {
                    self.source_ready(lines);
                }
            }
        });
    }

    /// Disarm every handshake interrupt
    pub(crate) fn silence(&self, lines: &mut L) {
        lines.disable_interrupt(Irq::Nrfd);
        lines.disable_interrupt(Irq::Ndac);
        lines.disable_interrupt(Irq::Dav);
    }

    /// Drop queued output; the source interrupts must be off
    pub(crate) fn reset_transmitter(&self) {
        self.tx.reset();
        self.tx_last.store(NO_SLOT, Ordering::Release);
    }

    /// Drop buffered input; the acceptor interrupt must be off
    pub(crate) fn reset_receiver(&self) {
        self.rx.reset();
        self.rx_stalled.store(false, Ordering::Release);
        self.rx_halted.store(false, Ordering::Release);
    }

    pub(crate) fn last_byte_pending(&self) -> bool {
        self.tx_last.load(Ordering::Acquire) != NO_SLOT
    }

    pub(crate) fn transmit_complete(&self) -> bool {
        self.tx.is_empty() && !self.with_lines(|lines| lines.is_asserted(Line::Dav))
    }
}
