//! Derived view computation: search, status filter and stable sort over the raw
//! collection. The result maps display rows to indices of the raw collection.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::trace;

use crate::record::{Record, SortDirection, ViewState};

/// Display row index -> raw collection index.
pub type Derived = Arc<Vec<usize>>;

/// Pure: same inputs always give the same ordered output, `raw` is never touched.
pub fn compute(raw: &[Record], view_state: &ViewState) -> Vec<usize> {
    let start_time = Instant::now();
    let needle = view_state.search_text.to_lowercase();
    let status_filter = view_state.status_filter;

    // par_iter keeps the input order when collecting into a Vec
    let mut rows: Vec<usize> = raw
        .par_iter()
        .enumerate()
        .filter(|(_, r)| needle.is_empty() || r.name.to_lowercase().contains(&needle))
        .filter(|(_, r)| status_filter.matches(r.status))
        .map(|(idx, _)| idx)
        .collect();

    let key = view_state.sort_key;
    // par_sort_by is stable, so equal keys keep their filtered order in both directions
    match view_state.sort_direction {
        SortDirection::Asc => rows.par_sort_by(|&a, &b| key.compare(&raw[a], &raw[b])),
        SortDirection::Desc => {
            rows.par_sort_by(|&a, &b| key.compare(&raw[a], &raw[b]).reverse())
        }
    }

    trace!(
        "Derived {} of {} rows for {:?} in {}ms",
        rows.len(),
        raw.len(),
        view_state,
        start_time.elapsed().as_millis()
    );
    rows
}

/// Memo for `compute`, keyed by the identity of the raw collection and the
/// full view state.
#[derive(Debug, Default)]
pub struct DerivedCache {
    key: Option<(Arc<Vec<Record>>, ViewState)>,
    value: Derived,
    misses: usize,
}

impl DerivedCache {
    pub fn get(&mut self, raw: &Arc<Vec<Record>>, view_state: &ViewState) -> Derived {
        if let Some((cached_raw, cached_state)) = &self.key
            && Arc::ptr_eq(cached_raw, raw)
            && cached_state == view_state
        {
            return Arc::clone(&self.value);
        }
        self.misses += 1;
        self.value = Arc::new(compute(raw, view_state));
        self.key = Some((Arc::clone(raw), view_state.clone()));
        Arc::clone(&self.value)
    }

    /// Number of actual computations performed.
    pub fn misses(&self) -> usize {
        self.misses
    }
}
