//! `iv` shows a large inventory collection in a terminal table. Only the rows
//! inside the viewport are built per frame, and filter or sort changes are
//! applied through a debounced refresh so fast typing never shows stale or
//! partial results.

pub mod controller;
pub mod dataset;
pub mod detail;
pub mod domain;
pub mod filters;
pub mod format;
pub mod inputter;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod record;
pub mod row;
pub mod scheduler;
pub mod terminal;
pub mod timer;
pub mod ui;
pub mod virtualizer;

pub use domain::{IvConfig, IvError, Message};
