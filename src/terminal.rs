use std::io::{self, Write};

use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::{error, info};

/// Mouse reporting that is switched off again when dropped, also when the
/// event loop leaves early through `?`.
pub struct MouseCapture<W: Write> {
    out: W,
}

impl<W: Write> MouseCapture<W> {
    pub fn enable(mut out: W) -> io::Result<Self> {
        execute!(out, EnableMouseCapture)?;
        Ok(Self { out })
    }
}

impl<W: Write> Drop for MouseCapture<W> {
    fn drop(&mut self) {
        match execute!(self.out, DisableMouseCapture) {
            Ok(()) => info!("Mouse capture disabled"),
            Err(e) => error!("Failed to disable mouse capture: {}", e),
        }
    }
}

/// Chains onto the current panic hook. Install after `ratatui::init` so the
/// mouse is released before the terminal is restored.
pub fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = execute!(io::stdout(), DisableMouseCapture);
        error!("Application panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}
