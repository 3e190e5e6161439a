use std::collections::HashMap;
use std::sync::Arc;

use crate::format::wrap_cell_content;

/// Display form of one record at one absolute offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub id: u64,
    pub top: usize,
    pub cells: [String; 5],
    /// Detail address the name cell links to.
    pub link: String,
}

/// Display strings of one record, computed before they reach the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowContent {
    pub cells: [String; 5],
    pub link: String,
}

impl RenderedRow {
    pub fn as_csv(&self) -> String {
        self.cells
            .iter()
            .map(|c| wrap_cell_content(c))
            .collect::<Vec<String>>()
            .join(",")
    }
}

/// Memoizes rendered rows by `(id, offset)`, so a row whose record and
/// position did not change is handed out as the same `Arc`.
#[derive(Debug, Default)]
pub struct RowRenderer {
    cache: HashMap<(u64, usize), Arc<RenderedRow>>,
    rendered: usize,
}

impl RowRenderer {
    /// `content` is only asked for when `(id, top)` is not cached.
    pub fn render(
        &mut self,
        id: u64,
        top: usize,
        content: impl FnOnce() -> RowContent,
    ) -> Arc<RenderedRow> {
        if let Some(row) = self.cache.get(&(id, top)) {
            return Arc::clone(row);
        }
        self.rendered += 1;
        let RowContent { cells, link } = content();
        let row = Arc::new(RenderedRow {
            id,
            top,
            cells,
            link,
        });
        self.cache.insert((id, top), Arc::clone(&row));
        row
    }

    /// Drops every cached row not part of `rows`, bounding the cache to one
    /// window.
    pub fn retain_window(&mut self, rows: &[Arc<RenderedRow>]) {
        self.cache
            .retain(|key, _| rows.iter().any(|r| (r.id, r.top) == *key));
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Rows built from scratch since creation.
    pub fn rendered(&self) -> usize {
        self.rendered
    }
}
