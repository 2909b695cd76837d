//! Interrupt-safe circular byte buffer
//!
//! A fixed ring of `N` slots with a `head` (next slot to fill) and a `tail`
//! (next slot to drain). `head == tail` means empty, so at most `N - 1` bytes
//! are live; the spare slot is where a producer may stage the next byte
//! before it has room to publish it.
//!
//! Each index has exactly one writer. The [`Producer`] cursor is the only code
//! that stores `head`, the [`Consumer`] cursor the only code that stores
//! `tail`. One side lives in the foreground, the other in an interrupt
//! handler; every read of the opposite index is a fresh atomic load, so a
//! spin-wait always observes the other side's progress. No lock is needed.
//!
//! The contract is carried by the cursor types: code that owns one side of a
//! buffer holds the matching cursor and never constructs the other.

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Fixed-capacity single-producer/single-consumer byte ring
pub struct Ring<const N: usize> {
    slots: [AtomicU8; N],
    head: AtomicUsize,
    tail: AtomicUsize,
}

impl<const N: usize> Ring<N> {
    /// Number of bytes the ring can hold at once
    pub const CAPACITY: usize = N - 1;

    /// Create an empty ring
    pub const fn new() -> Self {
        assert!(N >= 2, "ring needs at least two slots");
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Cursor for the side that fills the ring
    pub fn producer(&self) -> Producer<'_, N> {
        Producer { ring: self }
    }

    /// Cursor for the side that drains the ring
    pub fn consumer(&self) -> Consumer<'_, N> {
        Consumer { ring: self }
    }

    /// Snapshot: no live bytes
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Snapshot of the number of live bytes
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        if head >= tail {
            head - tail
        } else {
            head + N - tail
        }
    }

    /// Drop all content.
    ///
    /// Both sides write an index here, so this is only valid while the
    /// interrupt that owns one side is disarmed.
    pub fn reset(&self) {
        self.head.store(0, Ordering::Release);
        self.tail.store(0, Ordering::Release);
    }

    const fn next(index: usize) -> usize {
        if index + 1 >= N {
            0
        } else {
            index + 1
        }
    }
}

impl<const N: usize> Default for Ring<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Filling side of a [`Ring`]; sole writer of `head`
pub struct Producer<'a, const N: usize> {
    ring: &'a Ring<N>,
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Slot the next byte goes into
    pub fn index(&self) -> usize {
        self.ring.head.load(Ordering::Relaxed)
    }

    /// Write a byte into the head slot without publishing it.
    ///
    /// The head slot is never inside the live range, so this is safe even
    /// when the ring has no room; the byte becomes visible on [`commit`].
    ///
    /// [`commit`]: Producer::commit
    pub fn stage(&self, byte: u8) {
        self.ring.slots[self.index()].store(byte, Ordering::Relaxed);
    }

    /// Whether publishing the staged byte keeps the ring from looking empty
    pub fn has_room(&self) -> bool {
        Ring::<N>::next(self.index()) != self.ring.tail.load(Ordering::Acquire)
    }

    /// Publish the staged byte. Returns `false` and leaves it staged when
    /// the ring is full.
    pub fn commit(&self) -> bool {
        if !self.has_room() {
            return false;
        }
        self.ring
            .head
            .store(Ring::<N>::next(self.index()), Ordering::Release);
        true
    }

    /// Stage and publish in one step, handing the byte back when full
    pub fn push(&self, byte: u8) -> Result<(), u8> {
        if !self.has_room() {
            return Err(byte);
        }
        self.stage(byte);
        self.commit();
        Ok(())
    }
}

/// Draining side of a [`Ring`]; sole writer of `tail`
pub struct Consumer<'a, const N: usize> {
    ring: &'a Ring<N>,
}

impl<'a, const N: usize> Consumer<'a, N> {
    /// Slot the next byte is taken from
    pub fn index(&self) -> usize {
        self.ring.tail.load(Ordering::Relaxed)
    }

    /// Whether a published byte is waiting
    pub fn is_empty(&self) -> bool {
        self.index() == self.ring.head.load(Ordering::Acquire)
    }

    /// Look at the next byte without taking it
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.ring.slots[self.index()].load(Ordering::Relaxed))
        }
    }

    /// Take the next byte
    pub fn pop(&self) -> Option<u8> {
        let byte = self.peek()?;
        self.ring
            .tail
            .store(Ring::<N>::next(self.index()), Ordering::Release);
        Some(byte)
    }
}
