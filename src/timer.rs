//! Cancellable one-shot timers for a single threaded event loop.
//!
//! Timers do not run on their own. The loop asks for [`Timers::next_deadline`]
//! to bound its event poll and then collects the payloads of everything that
//! expired with [`Timers::expired`].

use std::time::{Duration, Instant};

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Entry<T> {
    handle: TimerHandle,
    deadline: Instant,
    payload: T,
}

#[derive(Debug)]
pub struct Timers<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> Timers<T> {
    pub fn start(&mut self, now: Instant, delay: Duration, payload: T) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.entries.push(Entry {
            handle,
            deadline: now + delay,
            payload,
        });
        trace!("Started timer {:?}, fires in {}ms", handle, delay.as_millis());
        handle
    }

    /// Returns true if the timer was still pending. Cancelling a fired or
    /// already cancelled timer does nothing.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        let cancelled = self.entries.len() != before;
        if cancelled {
            trace!("Cancelled timer {:?}", handle);
        }
        cancelled
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Removes and returns the payloads of all timers due at `now`, in
    /// deadline order.
    pub fn expired(&mut self, now: Instant) -> Vec<(TimerHandle, T)> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.deadline <= now);
        self.entries = pending;
        due.sort_by_key(|e| (e.deadline, e.handle.0));
        due.into_iter().map(|e| (e.handle, e.payload)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_once_after_deadline() {
        let t0 = Instant::now();
        let mut timers = Timers::default();
        let h = timers.start(t0, Duration::from_millis(100), "refresh");

        assert!(timers.expired(t0 + Duration::from_millis(99)).is_empty());
        assert_eq!(
            timers.expired(t0 + Duration::from_millis(100)),
            vec![(h, "refresh")]
        );
        assert!(timers.expired(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let t0 = Instant::now();
        let mut timers = Timers::default();
        let h = timers.start(t0, Duration::from_millis(10), ());
        assert!(timers.cancel(h));
        assert!(!timers.cancel(h));
        assert!(!timers.is_pending(h));
        assert!(timers.expired(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn next_deadline_is_the_earliest() {
        let t0 = Instant::now();
        let mut timers = Timers::default();
        assert_eq!(timers.next_deadline(), None);
        timers.start(t0, Duration::from_millis(50), 1);
        let h = timers.start(t0, Duration::from_millis(20), 2);
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(20)));
        timers.cancel(h);
        assert_eq!(timers.next_deadline(), Some(t0 + Duration::from_millis(50)));
    }

    #[test]
    fn expired_payloads_come_in_deadline_order() {
        let t0 = Instant::now();
        let mut timers = Timers::default();
        timers.start(t0, Duration::from_millis(30), "b");
        timers.start(t0, Duration::from_millis(10), "a");
        let fired: Vec<&str> = timers
            .expired(t0 + Duration::from_millis(30))
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(fired, vec!["a", "b"]);
        assert!(timers.is_empty());
    }
}
