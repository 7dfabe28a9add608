//! Counting gate over per-symbol fetch threads.
//!
//! A symbol's fetches run on a helper thread that is abandoned, not killed,
//! when the symbol times out. The gate hands out one permit per helper and a
//! permit is only returned when the helper thread actually exits, so the
//! number of provider calls in flight never exceeds the gate's capacity,
//! however many symbols have timed out.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct FetchGate {
    in_flight: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
}

impl FetchGate {
    pub(crate) fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            in_flight: Mutex::new(0),
            freed: Condvar::new(),
            capacity: capacity.max(1),
        })
    }

    // The counter is a single integer, so a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait up to `timeout` for a free slot.
    pub(crate) fn acquire(self: &Arc<Self>, timeout: Duration) -> Option<FetchPermit> {
        let guard = self.lock();
        let (mut in_flight, _) = self
            .freed
            .wait_timeout_while(guard, timeout, |n| *n >= self.capacity)
            .unwrap_or_else(|e| e.into_inner());
        if *in_flight >= self.capacity {
            return None;
        }
        *in_flight += 1;
        Some(FetchPermit {
            gate: Arc::clone(self),
        })
    }

    pub(crate) fn in_flight(&self) -> usize {
        *self.lock()
    }
}

/// Slot held by one helper thread; released on drop, including on unwind.
#[derive(Debug)]
pub(crate) struct FetchPermit {
    gate: Arc<FetchGate>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        let mut in_flight = self.gate.lock();
        *in_flight = in_flight.saturating_sub(1);
        drop(in_flight);
        self.gate.freed.notify_one();
    }
}
