//! Debounced refresh of the displayed collection.
//!
//! Every view state change restarts the delay. Only when the delay passes
//! without another change is the derived collection computed, against the
//! view state current at that moment, and committed. The scheduler is the only
//! writer of the displayed collection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::pipeline::{Derived, DerivedCache};
use crate::record::{Record, ViewState};
use crate::timer::{TimerHandle, Timers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Committing,
}

/// Summary of one applied refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub seq: u64,
    pub request: u64,
    pub view_state: ViewState,
    pub rows: usize,
}

#[derive(Debug)]
pub struct RefreshScheduler {
    delay: Duration,
    timers: Timers<u64>,
    pending: Option<TimerHandle>,
    phase: Phase,
    displayed: Derived,
    committed_view: ViewState,
    cache: DerivedCache,
    requests: u64,
    committed_request: u64,
    commits: u64,
    torn_down: bool,
}

impl RefreshScheduler {
    /// Commits the initial view synchronously, so the scheduler starts Idle.
    pub fn new(delay: Duration, raw: &Arc<Vec<Record>>, view_state: &ViewState) -> Self {
        let mut cache = DerivedCache::default();
        let displayed = cache.get(raw, view_state);
        debug!("Initial commit with {} rows", displayed.len());
        Self {
            delay,
            timers: Timers::default(),
            pending: None,
            phase: Phase::Idle,
            displayed,
            committed_view: view_state.clone(),
            cache,
            requests: 0,
            committed_request: 0,
            commits: 1,
            torn_down: false,
        }
    }

    /// An input changed: drop the outstanding commit and restart the delay.
    pub fn request(&mut self, now: Instant) {
        if self.torn_down {
            trace!("Ignoring refresh request after teardown");
            return;
        }
        if let Some(handle) = self.pending.take() {
            self.timers.cancel(handle);
        }
        self.requests += 1;
        self.pending = Some(self.timers.start(now, self.delay, self.requests));
        self.enter(Phase::Pending);
        trace!("Refresh request {} pending", self.requests);
    }

    /// Fires a due refresh. `view_state` is the latest one, not the one at
    /// request time.
    pub fn poll(
        &mut self,
        now: Instant,
        raw: &Arc<Vec<Record>>,
        view_state: &ViewState,
    ) -> Option<Commit> {
        let mut commit = None;
        for (handle, request) in self.timers.expired(now) {
            if self.pending != Some(handle) || request <= self.committed_request {
                trace!("Dropping superseded refresh {}", request);
                continue;
            }
            self.pending = None;
            self.enter(Phase::Committing);
            let start_time = Instant::now();
            self.displayed = self.cache.get(raw, view_state);
            self.committed_view = view_state.clone();
            self.committed_request = request;
            self.commits += 1;
            self.enter(Phase::Idle);
            debug!(
                "Commit {} (request {}): {} rows in {}ms",
                self.commits,
                request,
                self.displayed.len(),
                start_time.elapsed().as_millis()
            );
            commit = Some(Commit {
                seq: self.commits,
                request,
                view_state: view_state.clone(),
                rows: self.displayed.len(),
            });
        }
        commit
    }

    /// Cancels any outstanding commit. Nothing is committed afterwards.
    pub fn teardown(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.timers.cancel(handle);
        }
        self.timers.cancel_all();
        self.torn_down = true;
        self.enter(Phase::Idle);
        debug!("Refresh scheduler torn down");
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            trace!("Refresh phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn is_loading(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn displayed(&self) -> &Derived {
        &self.displayed
    }

    pub fn committed_view_state(&self) -> &ViewState {
        &self.committed_view
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn computations(&self) -> usize {
        self.cache.misses()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Generator, Provider};
    use crate::record::{SortDirection, SortKey, StatusFilter};

    const DELAY: Duration = Duration::from_millis(400);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup() -> (Arc<Vec<Record>>, ViewState, RefreshScheduler, Instant) {
        let raw = Arc::new(Generator::new(100).list(100));
        let vs = ViewState::default();
        let scheduler = RefreshScheduler::new(DELAY, &raw, &vs);
        (raw, vs, scheduler, Instant::now())
    }

    #[test]
    fn starts_idle_with_initial_commit() {
        let (_, _, scheduler, _) = setup();
        assert!(!scheduler.is_loading());
        assert_eq!(scheduler.displayed().len(), 100);
        assert_eq!(scheduler.commits(), 1);
    }

    #[test]
    fn burst_of_changes_commits_once_with_last_state() {
        let (raw, mut vs, mut scheduler, t0) = setup();

        for (i, text) in ["I", "It", "Ite", "Item 9"].iter().enumerate() {
            let now = t0 + ms(100 * i as u64);
            vs.search_text = text.to_string();
            scheduler.request(now);
            assert!(scheduler.is_loading());
            assert!(scheduler.poll(now, &raw, &vs).is_none());
        }

        // 300ms after the last keystroke nothing happened yet
        assert!(scheduler.poll(t0 + ms(300 + 399), &raw, &vs).is_none());
        let commit = scheduler.poll(t0 + ms(300 + 400), &raw, &vs).unwrap();
        assert_eq!(commit.view_state.search_text, "Item 9");
        assert_eq!(commit.seq, 2);
        // "Item 9" and "Item 9x"
        assert_eq!(commit.rows, 11);
        assert!(!scheduler.is_loading());
        assert_eq!(scheduler.computations(), 2);

        assert!(scheduler.poll(t0 + ms(10_000), &raw, &vs).is_none());
        assert_eq!(scheduler.commits(), 2);
    }

    #[test]
    fn commit_uses_view_state_at_commit_time() {
        let (raw, mut vs, mut scheduler, t0) = setup();
        vs.status_filter = StatusFilter::Active;
        scheduler.request(t0);
        // changed without a new request, e.g. a sort toggled in the same tick
        vs.toggle_sort(SortKey::Id);
        let commit = scheduler.poll(t0 + DELAY, &raw, &vs).unwrap();
        assert_eq!(commit.view_state.sort_direction, SortDirection::Desc);
        assert_eq!(scheduler.committed_view_state(), &vs);
        // 100 is Inactive, so the highest Active id leads
        let first = scheduler.displayed()[0];
        assert_eq!(raw[first].id, 99);
    }

    #[test]
    fn phase_follows_request_and_commit() {
        let (raw, mut vs, mut scheduler, t0) = setup();
        assert_eq!(scheduler.phase(), Phase::Idle);
        vs.search_text = "Item 5".to_string();
        scheduler.request(t0);
        assert_eq!(scheduler.phase(), Phase::Pending);
        scheduler.poll(t0 + ms(100), &raw, &vs);
        assert_eq!(scheduler.phase(), Phase::Pending);
        assert!(scheduler.poll(t0 + DELAY, &raw, &vs).is_some());
        assert_eq!(scheduler.phase(), Phase::Idle);

        scheduler.request(t0 + DELAY);
        scheduler.teardown();
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[test]
    fn teardown_cancels_pending_commit() {
        let (raw, mut vs, mut scheduler, t0) = setup();
        let before = Arc::clone(scheduler.displayed());
        vs.search_text = "Item 1".to_string();
        scheduler.request(t0);
        scheduler.teardown();
        assert!(!scheduler.is_loading());
        assert!(scheduler.next_deadline().is_none());
        assert!(scheduler.poll(t0 + ms(5_000), &raw, &vs).is_none());

        scheduler.request(t0 + ms(5_000));
        assert!(scheduler.poll(t0 + ms(10_000), &raw, &vs).is_none());
        assert!(Arc::ptr_eq(&before, scheduler.displayed()));
    }

    #[test]
    fn displayed_collection_only_changes_on_commit() {
        let (raw, mut vs, mut scheduler, t0) = setup();
        let before = Arc::clone(scheduler.displayed());
        vs.status_filter = StatusFilter::Inactive;
        scheduler.request(t0);
        scheduler.poll(t0 + ms(399), &raw, &vs);
        assert!(Arc::ptr_eq(&before, scheduler.displayed()));
        scheduler.poll(t0 + DELAY, &raw, &vs);
        assert_eq!(scheduler.displayed().len(), 34);
    }

    #[test]
    fn reverting_to_committed_state_reuses_cached_result() {
        let (raw, mut vs, mut scheduler, t0) = setup();
        vs.search_text = "x".to_string();
        scheduler.request(t0);
        vs.search_text.clear();
        scheduler.poll(t0 + DELAY, &raw, &vs);
        assert_eq!(scheduler.computations(), 1);
        assert_eq!(scheduler.commits(), 2);
    }
}
