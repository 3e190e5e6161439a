//! Windowed rendering arithmetic.
//!
//! Content height is `count * row_height` lines, so the scrollbar is sized for
//! the whole collection while only the rows intersecting the viewport (plus
//! overscan) are materialised. All operations are index arithmetic and do not
//! depend on the collection size.

use std::ops::Range;

use tracing::trace;

/// Index range to render and the absolute top offset of each row in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub offsets: Vec<usize>,
    pub total_height: usize,
}

impl Window {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Pure window computation for a fixed row height.
pub fn compute_window(
    count: usize,
    row_height: usize,
    overscan: usize,
    scroll_offset: usize,
    viewport_height: usize,
) -> Window {
    let row_height = row_height.max(1);
    let total_height = count * row_height;
    if count == 0 {
        return Window {
            total_height,
            ..Default::default()
        };
    }

    let first = scroll_offset / row_height;
    let last = (scroll_offset + viewport_height).div_ceil(row_height);
    let start = first.saturating_sub(overscan).min(count);
    let end = last.saturating_add(overscan).min(count).max(start);
    let offsets = (start..end).map(|idx| idx * row_height).collect();

    Window {
        start,
        end,
        offsets,
        total_height,
    }
}

/// Scroll state of one table body.
#[derive(Debug, Clone)]
pub struct Virtualizer {
    row_height: usize,
    overscan: usize,
    count: usize,
    viewport_height: usize,
    scroll_offset: usize,
}

impl Virtualizer {
    pub fn new(row_height: usize, overscan: usize) -> Self {
        Self {
            row_height: row_height.max(1),
            overscan,
            count: 0,
            viewport_height: 0,
            scroll_offset: 0,
        }
    }

    pub fn row_height(&self) -> usize {
        self.row_height
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn total_height(&self) -> usize {
        self.count * self.row_height
    }

    pub fn max_scroll(&self) -> usize {
        self.total_height().saturating_sub(self.viewport_height)
    }

    /// Number of whole rows that fit the viewport, at least one.
    pub fn page_size(&self) -> usize {
        (self.viewport_height / self.row_height).max(1)
    }

    /// A new displayed collection. Scroll goes back to the top so no index
    /// can point past the new length.
    pub fn set_count(&mut self, count: usize) {
        trace!("Virtualizer count {} -> {}", self.count, count);
        self.count = count;
        self.scroll_offset = 0;
    }

    pub fn resize(&mut self, viewport_height: usize) {
        self.viewport_height = viewport_height;
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    pub fn scroll_to(&mut self, offset: usize) {
        self.scroll_offset = offset.min(self.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let target = self.scroll_offset.saturating_add_signed(delta);
        self.scroll_to(target);
    }

    /// Adjusts the scroll offset by the least amount that shows row `index`
    /// completely.
    pub fn ensure_visible(&mut self, index: usize) {
        if self.count == 0 {
            return;
        }
        let index = index.min(self.count - 1);
        let top = index * self.row_height;
        let bottom = top + self.row_height;
        if top < self.scroll_offset {
            self.scroll_to(top);
        } else if bottom > self.scroll_offset + self.viewport_height {
            self.scroll_to(bottom.saturating_sub(self.viewport_height));
        }
    }

    /// Row index at the top edge of the viewport.
    pub fn first_visible(&self) -> usize {
        if self.count == 0 {
            return 0;
        }
        (self.scroll_offset / self.row_height).min(self.count - 1)
    }

    pub fn window(&self) -> Window {
        compute_window(
            self.count,
            self.row_height,
            self.overscan,
            self.scroll_offset,
            self.viewport_height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_collection_has_empty_window() {
        let w = compute_window(0, 1, 5, 0, 20);
        assert!(w.is_empty());
        assert_eq!(w.total_height, 0);
        assert!(w.offsets.is_empty());
    }

    #[test]
    fn window_at_top_includes_trailing_overscan() {
        let w = compute_window(1_000, 1, 3, 0, 10);
        assert_eq!(w.range(), 0..13);
        assert_eq!(w.offsets[12], 12);
    }

    #[test]
    fn window_in_the_middle_has_overscan_on_both_sides() {
        let w = compute_window(50_000, 2, 3, 200, 20);
        // rows 100..110 visible
        assert_eq!(w.range(), 97..113);
        assert_eq!(w.offsets[0], 194);
        assert_eq!(w.total_height, 100_000);
    }

    #[test]
    fn partially_visible_row_is_included() {
        let w = compute_window(100, 3, 0, 1, 3);
        // lines 1..4 touch rows 0 and 1
        assert_eq!(w.range(), 0..2);
    }

    #[test]
    fn small_collection_is_clamped() {
        let w = compute_window(4, 1, 5, 0, 40);
        assert_eq!(w.range(), 0..4);
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut v = Virtualizer::new(1, 2);
        v.set_count(100);
        v.resize(10);
        v.scroll_to(1_000);
        assert_eq!(v.scroll_offset(), 90);
        v.scroll_by(-200);
        assert_eq!(v.scroll_offset(), 0);
    }

    #[test]
    fn new_count_resets_scroll() {
        let mut v = Virtualizer::new(1, 2);
        v.set_count(10_000);
        v.resize(20);
        v.scroll_to(9_000);
        v.set_count(5);
        assert_eq!(v.scroll_offset(), 0);
        assert!(v.window().end <= 5);
    }

    #[test]
    fn ensure_visible_scrolls_minimally() {
        let mut v = Virtualizer::new(1, 0);
        v.set_count(100);
        v.resize(10);
        v.ensure_visible(15);
        assert_eq!(v.scroll_offset(), 6);
        v.ensure_visible(8);
        assert_eq!(v.scroll_offset(), 6);
        v.ensure_visible(2);
        assert_eq!(v.scroll_offset(), 2);
    }

    #[test]
    fn resize_shrinking_content_clamps_scroll() {
        let mut v = Virtualizer::new(1, 0);
        v.set_count(30);
        v.resize(10);
        v.scroll_to(20);
        v.resize(25);
        assert_eq!(v.scroll_offset(), 5);
    }

    proptest! {
        #[test]
        fn window_is_contiguous_subset(
            count in 0usize..100_000,
            row_height in 1usize..5,
            overscan in 0usize..10,
            scroll in 0usize..1_000_000,
            viewport in 0usize..200,
        ) {
            let w = compute_window(count, row_height, overscan, scroll, viewport);
            prop_assert!(w.start <= w.end);
            prop_assert!(w.end <= count);
            prop_assert_eq!(w.offsets.len(), w.len());
            prop_assert_eq!(w.total_height, count * row_height);
            for (i, offset) in w.offsets.iter().enumerate() {
                prop_assert_eq!(*offset, (w.start + i) * row_height);
            }
        }

        #[test]
        fn window_covers_the_viewport(
            count in 1usize..10_000,
            row_height in 1usize..4,
            scroll_frac in 0.0f64..1.0,
            viewport in 1usize..100,
        ) {
            let mut v = Virtualizer::new(row_height, 2);
            v.set_count(count);
            v.resize(viewport);
            v.scroll_to((v.max_scroll() as f64 * scroll_frac) as usize);
            let w = v.window();
            let top_row = v.scroll_offset() / row_height;
            let bottom_row = ((v.scroll_offset() + viewport).div_ceil(row_height)).min(count);
            prop_assert!(w.start <= top_row);
            prop_assert!(w.end >= bottom_row);
        }
    }
}
