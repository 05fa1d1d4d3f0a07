use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};

use super::utils::trace;

/// This bit is set in the `state` of an `Entry` once a publisher has taken exclusive
/// ownership of the value slot. It is never cleared.
const CLAIMED: u32 = 0b001;

/// This bit is set in the `state` of an `Entry` once the value slot is initialized. It is
/// never cleared, and is always accompanied by `CLAIMED`.
const READY: u32 = 0b010;

/// This bit is set in the `state` of an `Entry` by a reader that is about to sleep on the
/// state word.
const PARKED: u32 = 0b100;

/// The state of a single key.
///
/// # State table:
///
/// READY | CLAIMED | Description
///   0   |    0    | Pending. No value has been published and no publisher has claimed the
///       |         | slot. Readers may be parked, in which case `PARKED` is set.
/// ------+---------+-----------------------------------------------------------------------
///   0   |    1    | Claimed. Exactly one publisher is writing the value slot. Readers still
///       |         | treat the entry as pending.
/// ------+---------+-----------------------------------------------------------------------
///   1   |    1    | Ready. The value slot is initialized and immutable. `PARKED` may remain
///       |         | set but is no longer meaningful.
///
/// The state word doubles as the wait primitive for the entry: readers sleep on it with a
/// futex wait that only blocks if the word still holds the value the reader last observed,
/// so a publication that lands between a reader's check and its sleep is never missed.
pub struct Entry<V> {
    state: AtomicU32,
    value: UnsafeCell<MaybeUninit<V>>,
}

// Safety: The value slot is written exactly once, by the thread holding the `Claim`, before
// `READY` is published with release ordering. After that it is only ever read through shared
// references, so values must be both `Send` and `Sync`.
unsafe impl<V: Send + Sync> Sync for Entry<V> {}

/// Exclusive permission to publish the value of a pending entry.
///
/// Dropping a claim without publishing leaves the entry pending forever.
#[must_use]
pub struct Claim<'entry, V> {
    entry: &'entry Entry<V>,
}

impl<V> Entry<V> {
    /// Creates an entry with no value.
    pub fn pending() -> Entry<V> {
        Entry {
            state: AtomicU32::new(0),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Creates an entry that is already ready.
    ///
    /// No reader can be waiting on an entry that did not exist, so this skips the wakeup.
    pub fn ready(value: V) -> Entry<V> {
        Entry {
            state: AtomicU32::new(CLAIMED | READY),
            value: UnsafeCell::new(MaybeUninit::new(value)),
        }
    }

    /// Returns `true` if a value has been published.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) & READY != 0
    }

    /// Returns the published value, if any, without blocking.
    #[inline]
    pub fn value(&self) -> Option<&V> {
        if self.is_ready() {
            // Safety: `READY` was observed with acquire ordering.
            Some(unsafe { self.value_unchecked() })
        } else {
            None
        }
    }

    /// Returns the published value, blocking until one is available.
    #[inline]
    pub fn wait(&self) -> &V {
        // Fast path, the entry is already ready.
        match self.value() {
            Some(value) => value,
            None => self.wait_slow(),
        }
    }

    #[cold]
    #[inline(never)]
    fn wait_slow(&self) -> &V {
        let mut state = self.state.load(Ordering::Acquire);

        loop {
            if state & READY != 0 {
                // Safety: `READY` was observed with acquire ordering.
                return unsafe { self.value_unchecked() };
            }

            // Announce that we are about to sleep so the publisher knows to wake us.
            //
            // If the state changed in the meantime, it was either another reader setting
            // `PARKED` or a publisher, so recheck the state before going any further.
            if state & PARKED == 0 {
                match self.state.compare_exchange_weak(
                    state,
                    state | PARKED,
                    Ordering::Acquire,
                    Ordering::Acquire,
                ) {
                    Ok(_) => state |= PARKED,
                    Err(found) => {
                        state = found;
                        continue;
                    }
                }
            }

            trace!(state, "parking on pending entry");

            // Sleep until the state changes. This returns immediately if the state is no
            // longer what we last observed, and may also wake up spuriously, so loop and
            // recheck either way.
            atomic_wait::wait(&self.state, state);
            state = self.state.load(Ordering::Acquire);
        }
    }

    /// Attempts to claim the right to publish this entry's value.
    ///
    /// Returns `None` if the entry is ready or was already claimed by another publisher.
    #[inline]
    pub fn claim(&self) -> Option<Claim<'_, V>> {
        let state = self.state.fetch_or(CLAIMED, Ordering::Acquire);

        if state & CLAIMED != 0 {
            return None;
        }

        Some(Claim { entry: self })
    }

    // Returns a reference to the value.
    //
    // # Safety
    //
    // `READY` must have been observed with acquire ordering.
    #[inline]
    unsafe fn value_unchecked(&self) -> &V {
        unsafe { (*self.value.get()).assume_init_ref() }
    }
}

impl<V> Claim<'_, V> {
    /// Publishes the value and wakes every reader waiting on the entry.
    pub fn publish(self, value: V) {
        let entry = self.entry;

        // Safety: Holding the claim gives us exclusive access to the uninitialized slot, and
        // no reader touches it until `READY` is set.
        unsafe { (*entry.value.get()).write(value) };

        let state = entry.state.fetch_or(READY, Ordering::Release);
        debug_assert_eq!(state & (CLAIMED | READY), CLAIMED);

        // Fast path, no one is waiting to be woken up.
        if state & PARKED == 0 {
            trace!("published entry with no waiters");
            return;
        }

        trace!("published entry, waking parked readers");
        atomic_wait::wake_all(&entry.state);
    }
}

impl<V> Drop for Entry<V> {
    fn drop(&mut self) {
        if *self.state.get_mut() & READY != 0 {
            // Safety: The slot is initialized and we have exclusive access.
            unsafe { self.value.get_mut().assume_init_drop() }
        }
    }
}
