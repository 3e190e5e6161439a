//! Search text and status inputs. Every change is reported immediately as a
//! [`Message`]; debouncing happens in the refresh scheduler.

use ratatui::crossterm::event::KeyEvent;

use crate::domain::Message;
use crate::inputter::{InputResult, Inputter};
use crate::record::StatusFilter;

#[derive(Default, Debug)]
pub struct FilterControls {
    input: Inputter,
    restore: String,
    last: InputResult,
}

impl FilterControls {
    /// Starts editing, seeded with the active search text.
    pub fn open(&mut self, current: &str) {
        self.input.clear();
        self.input.set(current);
        self.restore = current.to_string();
        self.last = self.input.get();
    }

    /// Feeds one key. Returns the new search text if it changed. Escape
    /// reports the text that was active when editing started.
    pub fn read(&mut self, key: KeyEvent) -> Option<Message> {
        let before = self.last.input.clone();
        self.last = self.input.read(key);
        if self.last.canceled {
            self.last.input = self.restore.clone();
            return (before != self.restore).then(|| Message::SetSearch(self.restore.clone()));
        }
        (self.last.input != before).then(|| Message::SetSearch(self.last.input.clone()))
    }

    pub fn finished(&self) -> bool {
        self.last.finished
    }

    pub fn state(&self) -> &InputResult {
        &self.last
    }

    pub fn cycle_status(current: StatusFilter) -> Message {
        Message::SetStatus(current.next())
    }
}
