//! Foreground side of the bus engine
//!
//! Every blocking call arms the shared timeout and spins until its condition
//! holds or the tick interrupt expires the counter. A timeout latches
//! [`GpibError::Timeout`] in the indicators and is returned to the caller;
//! nothing is retried.

use core::sync::atomic::Ordering;

use embedded_hal::delay::DelayNs;
use gpib_core::{GpibError, GpibResult, Indicators, Status};
use hal::{BusLines, Control, Edge, Irq, Line};
use log::{debug, warn};

use crate::roles;
use crate::state::BusState;
use crate::{Direction, DEFAULT_BUFFER_LEN, SETTLE_DELAY_US};

/// Foreground handle on a [`BusState`]
pub struct BusEngine<'a, L, D, const N: usize = DEFAULT_BUFFER_LEN> {
    state: &'a BusState<L, N>,
    delay: D,
    end: bool,
}

impl<'a, L: BusLines, D: DelayNs, const N: usize> BusEngine<'a, L, D, N> {
    /// Create the foreground handle
    pub fn new(state: &'a BusState<L, N>, delay: D) -> Self {
        Self {
            state,
            delay,
            end: false,
        }
    }

    /// Shared state, for wiring the interrupt handlers
    pub fn state(&self) -> &'a BusState<L, N> {
        self.state
    }

    /// Status and error latches
    pub fn indicators(&self) -> &'a Indicators {
        self.state.indicators()
    }

    /// Pump currently armed
    pub fn direction(&self) -> Direction {
        self.state.direction()
    }

    /// Bring the lines into a passive, quiet state after reset
    pub fn prepare(&mut self) {
        self.state.with_lines(|lines| {
            self.state.silence(lines);
            roles::control(lines, false);
            roles::talk(lines, false);
            lines.release(Line::Ndac);
        });
        self.state.reset_transmitter();
        self.state.reset_receiver();
        self.end = false;
        self.state.set_direction(Direction::Idle);
        self.state.indicators().set_status(Status::Offline);
        debug!("bus prepared");
    }

    /// Give up the controller lines, stop talking and release REN
    pub fn go_passive(&mut self) {
        self.state.with_lines(|lines| {
            self.state.silence(lines);
            roles::talk(lines, false);
            roles::control(lines, false);
            lines.release(Line::Ren);
        });
        self.state.reset_transmitter();
        self.state.reset_receiver();
        self.end = false;
        self.state.set_direction(Direction::Idle);
        self.state.indicators().set_status(Status::Offline);
        debug!("bus passive");
    }

    /// Become system controller with the bus idle
    pub fn take_control(&mut self) {
        self.state.with_lines(|lines| {
            self.state.silence(lines);
            roles::control(lines, true);
            roles::talk(lines, false);
        });
        self.state.reset_transmitter();
        self.state.reset_receiver();
        self.end = false;
        self.state.set_direction(Direction::Idle);
        self.state.indicators().set_status(Status::Online);
        debug!("bus controller in charge");
    }

    /// Whether this end holds the controller lines
    pub fn is_controller(&self) -> bool {
        self.state.with_lines(|lines| lines.control(Control::Controller))
    }

    /// Drive or release ATN once pending output has left
    pub fn set_attention(&mut self, attention: bool) -> GpibResult<()> {
        if self.direction() == Direction::Transmitting {
            self.flush()?;
        }
        self.state
            .with_lines(|lines| roles::attention_line(lines, attention));
        Ok(())
    }

    /// Drive or release REN
    pub fn set_remote(&mut self, remote: bool) {
        if remote {
            self.state.with_lines(|lines| lines.assert(Line::Ren));
            self.delay.delay_us(SETTLE_DELAY_US);
        } else {
            self.state.with_lines(|lines| lines.release(Line::Ren));
        }
    }

    /// Pulse IFC
    pub fn pulse_clear(&mut self) {
        self.state.with_lines(|lines| lines.assert(Line::Ifc));
        self.delay.delay_us(SETTLE_DELAY_US);
        self.state.with_lines(|lines| lines.release(Line::Ifc));
    }

    /// Switch to talking; a no-op while already transmitting
    pub fn begin_transmit(&mut self) {
        if self.direction() == Direction::Transmitting {
            return;
        }
        self.state.with_lines(|lines| {
            self.state.silence(lines);
            roles::talk(lines, true);
        });
        self.state.reset_transmitter();
        self.state.set_direction(Direction::Transmitting);
        self.state.indicators().set_status(Status::Transmit);
        debug!("bus transmitting");
    }

    /// Queue one byte, waiting for room
    pub fn enqueue_byte(&mut self, byte: u8) -> GpibResult<()> {
        self.queue(byte, false)
    }

    /// Queue the byte that ends the message and wait until it went out
    /// with EOI
    pub fn enqueue_last_byte(&mut self, byte: u8) -> GpibResult<()> {
        self.queue(byte, true)?;
        self.wait_for(|state| (!state.last_byte_pending()).then_some(()))
            .map_err(|err| self.abort_transmit(err))
    }

    fn queue(&mut self, byte: u8, last: bool) -> GpibResult<()> {
        self.wait_for(|state| state.tx.producer().has_room().then_some(()))
            .map_err(|err| self.abort_transmit(err))?;

        let producer = self.state.tx.producer();
        if last {
            self.state.tx_last.store(producer.index(), Ordering::Release);
        }
        producer.stage(byte);
        producer.commit();
        self.state.kick_transmitter();
        Ok(())
    }

    /// All queued bytes left and DAV is released
    pub fn transmit_complete(&self) -> bool {
        self.state.transmit_complete()
    }

    /// Wait until [`transmit_complete`](Self::transmit_complete)
    pub fn flush(&mut self) -> GpibResult<()> {
        self.wait_for(|state| state.transmit_complete().then_some(()))
            .map_err(|err| self.abort_transmit(err))
    }

    /// Switch to listening once output has drained; a no-op while receiving
    /// unless an overflow halted reception
    pub fn begin_receive(&mut self) -> GpibResult<()> {
        if self.direction() == Direction::Receiving && !self.state.is_halted() {
            return Ok(());
        }
        if self.direction() == Direction::Transmitting {
            self.flush()?;
        }

        self.state.with_lines(|lines| {
            self.state.silence(lines);
            roles::talk(lines, false);
        });
        self.state.reset_receiver();
        self.end = false;
        self.state.with_lines(|lines| {
            lines.enable_interrupt(Irq::Dav, Edge::Falling);
            lines.release(Line::Nrfd);
        });
        self.state.set_direction(Direction::Receiving);
        self.state.indicators().set_status(Status::Receive);
        debug!("bus receiving");
        Ok(())
    }

    /// Take the next received byte, waiting for one
    pub fn get_byte(&mut self) -> GpibResult<u8> {
        let state = self.state;
        let (byte, eoi) = self
            .wait_for(|state| {
                let consumer = state.rx.consumer();
                let slot = consumer.index();
                match consumer.pop() {
                    Some(byte) => Some((byte, state.rx_marks[slot].load(Ordering::Relaxed))),
                    None => {
                        state.indicators().set_status(Status::Receive);
                        None
                    }
                }
            })
            .map_err(|err| {
                warn!("bus receive timed out");
                err
            })?;

        state.resume_reception();
        if eoi {
            self.end = true;
        }
        Ok(byte)
    }

    /// Whether a received byte is waiting
    pub fn byte_available(&self) -> bool {
        if self.state.rx.is_empty() {
            self.state.indicators().set_status(Status::Receive);
            false
        } else {
            true
        }
    }

    /// Whether the last byte taken carried EOI; reading clears it
    pub fn end_of_transaction(&mut self) -> bool {
        core::mem::take(&mut self.end)
    }

    fn wait_for<T>(&self, mut poll: impl FnMut(&BusState<L, N>) -> Option<T>) -> GpibResult<T> {
        let timeout = self.state.timeout();
        timeout.arm();
        loop {
            if let Some(value) = poll(self.state) {
                return Ok(value);
            }
            if timeout.is_expired() {
                self.state.indicators().raise(GpibError::Timeout);
                return Err(GpibError::Timeout);
            }
            core::hint::spin_loop();
        }
    }

    fn abort_transmit(&self, err: GpibError) -> GpibError {
        warn!("bus transmit aborted: {}", err);
        self.state.with_lines(|lines| {
            lines.disable_interrupt(Irq::Nrfd);
            lines.disable_interrupt(Irq::Ndac);
            lines.release(Line::Dav);
            lines.release(Line::Eoi);
        });
        self.state.reset_transmitter();
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLines;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Duration;

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Tick the timeout from another thread until the test body returns
    fn with_ticker<R>(state: &BusState<FakeLines, 4>, body: impl FnOnce() -> R) -> R {
        let done = AtomicBool::new(false);
        thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    state.on_tick();
                    thread::sleep(Duration::from_micros(200));
                }
            });
            let result = body();
            done.store(true, Ordering::Release);
            result
        })
    }

    fn controller() -> BusState<FakeLines, 4> {
        let state = BusState::new(FakeLines::new());
        {
            let mut engine = BusEngine::new(&state, NoDelay);
            engine.prepare();
            engine.take_control();
        }
        state.timeout().set_reload(5);
        state
    }

    #[test]
    fn test_take_control_is_idempotent() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.take_control();
        assert!(engine.is_controller());
        assert_eq!(engine.direction(), Direction::Idle);
        assert_eq!(engine.indicators().status(), Status::Online);

        engine.go_passive();
        assert!(!engine.is_controller());
        assert_eq!(engine.indicators().status(), Status::Offline);
    }

    #[test]
    fn test_last_byte_goes_out_with_eoi() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.begin_transmit();
        assert_eq!(engine.direction(), Direction::Transmitting);

        engine.enqueue_last_byte(b'\n').unwrap();
        state.with_lines(|lines| {
            assert_eq!(lines.data, !b'\n');
            assert!(lines.is_driving(Line::Dav));
            assert!(lines.is_driving(Line::Eoi));
        });
        assert!(!engine.transmit_complete());
    }

    #[test]
    fn test_full_ring_times_out_on_enqueue() {
        let state = controller();
        state.with_lines(|lines| lines.set_remote(Line::Nrfd, true));
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.begin_transmit();
        for byte in 0..3 {
            engine.enqueue_byte(byte).unwrap();
        }

        let result = with_ticker(&state, || engine.enqueue_byte(3));
        assert_eq!(result, Err(GpibError::Timeout));
        assert_eq!(state.indicators().error(), Some(GpibError::Timeout));

        // The source handshake is disarmed and the queue dropped
        state.with_lines(|lines| {
            assert!(!lines.is_interrupt_enabled(Irq::Nrfd));
            assert!(!lines.is_driving(Line::Dav));
        });
        assert!(engine.transmit_complete());
    }

    #[test]
    fn test_receive_waits_for_transmit_complete() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.begin_transmit();
        engine.enqueue_byte(0x3F).unwrap();
        assert!(!engine.transmit_complete());

        // Nobody accepts: begin_receive blocks until the timeout fires
        let result = with_ticker(&state, || engine.begin_receive());
        assert_eq!(result, Err(GpibError::Timeout));
        assert_eq!(engine.direction(), Direction::Transmitting);
    }

    #[test]
    fn test_receive_after_accepted_byte() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.begin_transmit();
        engine.enqueue_byte(0x3F).unwrap();

        state.with_lines(|lines| lines.set_remote(Line::Nrfd, true));
        state.on_nrfd();
        state.with_lines(|lines| lines.set_remote(Line::Ndac, false));
        state.on_ndac();
        assert!(engine.transmit_complete());

        engine.begin_receive().unwrap();
        assert_eq!(engine.direction(), Direction::Receiving);
        state.with_lines(|lines| {
            assert!(!lines.is_driving(Line::Nrfd));
            assert!(lines.is_driving(Line::Ndac));
            assert_eq!(lines.interrupt_edge(Irq::Dav), Some(Edge::Falling));
        });
    }

    #[test]
    fn test_get_byte_reports_eoi_once() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.begin_receive().unwrap();

        for (byte, eoi) in [(b'O', false), (b'K', true)] {
            state.with_lines(|lines| {
                lines.remote_data = !byte;
                lines.set_remote(Line::Eoi, eoi);
                lines.set_remote(Line::Dav, true);
            });
            state.on_dav();
            state.with_lines(|lines| {
                lines.set_remote(Line::Dav, false);
                lines.set_remote(Line::Eoi, false);
            });
            state.on_dav();
        }

        assert!(engine.byte_available());
        assert_eq!(engine.get_byte(), Ok(b'O'));
        assert!(!engine.end_of_transaction());
        assert_eq!(engine.get_byte(), Ok(b'K'));
        assert!(engine.end_of_transaction());
        assert!(!engine.end_of_transaction());
        assert!(!engine.byte_available());
        assert_eq!(engine.indicators().status(), Status::Receive);
    }

    #[test]
    fn test_get_byte_timeout() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.begin_receive().unwrap();
        let result = with_ticker(&state, || engine.get_byte());
        assert_eq!(result, Err(GpibError::Timeout));

        // Reception stays armed
        state.with_lines(|lines| assert!(lines.is_interrupt_enabled(Irq::Dav)));
    }

    #[test]
    fn test_overflow_halts_until_receive_reissued() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.begin_receive().unwrap();
        state.with_lines(|lines| {
            lines.assert(Line::Nrfd);
            lines.set_remote(Line::Dav, true);
        });
        state.on_dav();
        assert!(state.is_halted());

        state.with_lines(|lines| lines.set_remote(Line::Dav, false));
        engine.begin_receive().unwrap();
        assert!(!state.is_halted());
        state.with_lines(|lines| assert!(lines.is_interrupt_enabled(Irq::Dav)));
    }

    #[test]
    fn test_attention_and_remote_lines() {
        let state = controller();
        let mut engine = BusEngine::new(&state, NoDelay);
        engine.set_attention(true).unwrap();
        engine.set_remote(true);
        state.with_lines(|lines| {
            assert!(lines.is_driving(Line::Atn));
            assert!(lines.is_driving(Line::Ren));
        });

        engine.pulse_clear();
        engine.set_attention(false).unwrap();
        engine.set_remote(false);
        state.with_lines(|lines| {
            assert!(!lines.is_driving(Line::Ifc));
            assert!(!lines.is_driving(Line::Atn));
            assert!(!lines.is_driving(Line::Ren));
        });
    }
}
