use std::time::{Duration, Instant};

use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use tracing::trace;

use crate::domain::{IvConfig, IvError, Message};
use crate::model::{Model, UILayout};
use crate::record::SortKey;
use crate::ui::TableUI;

const WHEEL_LINES: isize = 3;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &IvConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Waits for the next event, but never past the model's next timer.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, IvError> {
        let timeout = self.poll_timeout(model.next_deadline(), Instant::now());
        if !event::poll(timeout)? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Mouse(mouse) if !model.raw_keyevents() => {
                self.handle_mouse(mouse, &model.get_uidata().layout)
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    pub fn poll_timeout(&self, deadline: Option<Instant>, now: Instant) -> Duration {
        let max = Duration::from_millis(self.event_poll_time);
        match deadline {
            Some(d) => d.saturating_duration_since(now).min(max),
            None => max,
        }
    }

    pub fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('J'), _) => Some(Message::ScrollBy(1)),
            (KeyCode::Char('K'), _) => Some(Message::ScrollBy(-1)),
            (KeyCode::PageDown, _) | (KeyCode::Char(' '), _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('f'), _) => Some(Message::CycleStatus),
            (KeyCode::Char(c @ '1'..='5'), _) => {
                let idx = c as usize - '1' as usize;
                Some(Message::Sort(SortKey::ALL[idx]))
            }
            (KeyCode::Char(':'), _) => Some(Message::EnterDetail),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('c'), _) => Some(Message::CopyRow),
            (KeyCode::Char('y'), _) => Some(Message::CopyAddress),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, mouse: MouseEvent, layout: &UILayout) -> Option<Message> {
        match mouse.kind {
            MouseEventKind::ScrollDown => Some(Message::ScrollBy(WHEEL_LINES)),
            MouseEventKind::ScrollUp => Some(Message::ScrollBy(-WHEEL_LINES)),
            // Clicking a column header sorts by it
            MouseEventKind::Down(MouseButton::Left) => {
                TableUI::header_key_at(layout, mouse.column, mouse.row).map(Message::Sort)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        Controller::new(&IvConfig::default())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn number_keys_sort_by_column() {
        let c = controller();
        assert_eq!(
            c.handle_key(press(KeyCode::Char('1'))),
            Some(Message::Sort(SortKey::Id))
        );
        assert_eq!(
            c.handle_key(press(KeyCode::Char('5'))),
            Some(Message::Sort(SortKey::LastUpdated))
        );
        assert_eq!(c.handle_key(press(KeyCode::Char('6'))), None);
    }

    #[test]
    fn ctrl_c_quits_but_c_copies() {
        let c = controller();
        assert_eq!(
            c.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Message::Quit)
        );
        assert_eq!(
            c.handle_key(press(KeyCode::Char('c'))),
            Some(Message::CopyRow)
        );
    }

    #[test]
    fn poll_timeout_is_bounded_by_next_timer() {
        let c = controller();
        let now = Instant::now();
        assert_eq!(c.poll_timeout(None, now), Duration::from_millis(100));
        assert_eq!(
            c.poll_timeout(Some(now + Duration::from_millis(30)), now),
            Duration::from_millis(30)
        );
        assert_eq!(
            c.poll_timeout(Some(now - Duration::from_millis(5)), now),
            Duration::ZERO
        );
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn wheel_scrolls_the_viewport() {
        let c = controller();
        let layout = UILayout::from_values(80, 24);
        assert_eq!(
            c.handle_mouse(mouse(MouseEventKind::ScrollDown, 0, 0), &layout),
            Some(Message::ScrollBy(3))
        );
    }

    #[test]
    fn clicking_a_header_cell_sorts_by_its_column() {
        let c = controller();
        let layout = UILayout::from_values(80, 24);
        let click = |column, row| {
            c.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), column, row), &layout)
        };
        // filter bar on row 0, table border on row 1, header on row 2
        assert_eq!(click(2, 2), Some(Message::Sort(SortKey::Id)));
        assert_eq!(click(20, 2), Some(Message::Sort(SortKey::Name)));
        assert_eq!(click(70, 2), Some(Message::Sort(SortKey::LastUpdated)));
        // rows, the border and the gaps between cells do not sort
        assert_eq!(click(2, 5), None);
        assert_eq!(click(0, 2), None);
        assert_eq!(click(9, 2), None);
        assert_eq!(
            c.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Right), 2, 2), &layout),
            None
        );
    }
}
