use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::IvError;

pub const DEFAULT_LOG_FILE: &str = "iv.log";

/// Call once near the start of `main`. The terminal belongs to the ui, so
/// everything goes to `path`. `RUST_LOG` overrides the default `info` level.
pub fn init(path: &Path) -> Result<(), IvError> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| IvError::Logging(e.to_string()))
}
