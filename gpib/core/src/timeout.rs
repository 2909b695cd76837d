//! Tick-driven timeout for blocking handshake waits
//!
//! A periodic tick (every [`TICK_PERIOD_MS`]) decrements the counter; the
//! foreground re-arms it before each blocking wait and polls [`is_expired`]
//! from its spin loop. Arming at `N` ticks expires on tick `N + 1`.
//!
//! [`is_expired`]: TimeoutCounter::is_expired

use core::cell::Cell;
use critical_section::Mutex;

/// Period of the tick interrupt
pub const TICK_PERIOD_MS: u32 = 16;

/// Default number of ticks a wait may take (about two seconds)
pub const DEFAULT_TIMEOUT_TICKS: u16 = 123;

#[derive(Debug, Clone, Copy)]
struct Countdown {
    reload: u16,
    remaining: u16,
    expired: bool,
}

/// Shared countdown with a sticky expired flag
pub struct TimeoutCounter {
    state: Mutex<Cell<Countdown>>,
}

impl TimeoutCounter {
    /// Create a disarmed (already expired) counter reloading to `ticks`
    pub const fn new(ticks: u16) -> Self {
        Self {
            state: Mutex::new(Cell::new(Countdown {
                reload: ticks,
                remaining: 0,
                expired: true,
            })),
        }
    }

    /// Reload the counter and clear the expired flag
    pub fn arm(&self) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.remaining = state.reload;
            state.expired = false;
            cell.set(state);
        });
    }

    /// Stop counting; the counter reads as expired until re-armed
    pub fn disarm(&self) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.expired = true;
            cell.set(state);
        });
    }

    /// Advance by one tick. Called from the periodic tick interrupt.
    pub fn tick(&self) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            if !state.expired {
                if state.remaining > 0 {
                    state.remaining -= 1;
                } else {
                    state.expired = true;
                }
                cell.set(state);
            }
        });
    }

    /// Whether the armed period has run out
    pub fn is_expired(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().expired)
    }

    /// Change the number of ticks used by subsequent arms
    pub fn set_reload(&self, ticks: u16) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            state.reload = ticks;
            cell.set(state);
        });
    }

    /// Number of ticks an arm loads
    pub fn reload(&self) -> u16 {
        critical_section::with(|cs| self.state.borrow(cs).get().reload)
    }
}

impl Default for TimeoutCounter {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_TICKS)
    }
}
