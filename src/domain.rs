use std::time::Duration;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IvError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("loading failed: {0}")]
    LoadingFailed(String),
    #[error("file not found")]
    FileNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unknown file type")]
    UnknownFileType,
    #[error("logging setup failed: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct IvConfig {
    /// Upper bound for a single terminal event poll in ms.
    pub event_poll_time: u64,
    /// Quiet period before a changed ViewState is committed.
    pub refresh_delay: Duration,
    /// Estimated height of one row in terminal lines.
    pub row_height: usize,
    /// Rows rendered above and below the visible region.
    pub overscan: usize,
    /// Number of records to generate when no file is given.
    pub count: usize,
    /// How long a status line message stays visible.
    pub status_message_ttl: Duration,
}

impl Default for IvConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            refresh_delay: Duration::from_millis(400),
            row_height: 1,
            overscan: 5,
            count: 50_000,
            status_message_ttl: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    ScrollBy(isize),
    Resize(usize, usize),
    Search,
    SetSearch(String),
    CycleStatus,
    SetStatus(crate::record::StatusFilter),
    Sort(crate::record::SortKey),
    EnterDetail,
    Enter,
    Exit,
    CopyRow,
    CopyAddress,
    Help,
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
iv - inventory viewer

Navigation
  j / Down        next row
  k / Up          previous row
  PgDn / PgUp     next / previous page
  g / G           first / last row
  J / K / wheel   scroll without moving the selection

Filtering and sorting
  /               search in names
  f               cycle status filter (All, Active, Inactive)
  1 .. 5          sort by Id, Name, Type, Status, Last Updated
                  (again to flip direction)

Records
  Enter           show detail of selected row
  :               show detail of an id
  c               copy row as csv
  y               copy detail address

  ?               help
  Esc             close popup
  q               quit";
