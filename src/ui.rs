use std::time::Duration;

use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{
        Block, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Widget, Wrap,
    },
};

use crate::domain::{CMDMode, IvConfig};
use crate::model::{Body, Model, Popup, UIData, UILayout};
use crate::record::SortKey;
use crate::row::RenderedRow;

pub const FILTER_BAR_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const BORDER_HEIGHT: usize = 2;
pub const SCROLLBAR_WIDTH: u16 = 1;
pub const COLUMN_SPACING: u16 = 1;

pub const EMPTY_MESSAGE: &str = "No results found.";
const SKELETON_CELL: &str = "░";

const COLUMN_CONSTRAINTS: [Constraint; 5] = [
    Constraint::Length(8),
    Constraint::Min(12),
    Constraint::Length(12),
    Constraint::Length(9),
    Constraint::Length(19),
];

#[derive(Debug)]
pub struct TableUI {
    status_message_ttl: Duration,
}

impl TableUI {
    pub fn new(config: &IvConfig) -> Self {
        Self {
            status_message_ttl: config.status_message_ttl,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [filter_area, table_area, status_area] = Self::screen_areas(frame.area());

        frame.render_widget(Self::filter_bar(uidata), filter_area);
        self.draw_table(uidata, table_area, frame);
        self.draw_statusline(uidata, status_area, frame);

        if let Some(popup) = &uidata.popup {
            Self::draw_popup(popup, frame);
        }
    }

    fn screen_areas(area: Rect) -> [Rect; 3] {
        Layout::vertical([
            Constraint::Length(FILTER_BAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGHT as u16),
        ])
        .areas(area)
    }

    // Header, rows and scrollbar inside the table border.
    fn table_areas(inner: Rect) -> (Rect, Rect, Rect) {
        let [header_area, body_area] = Layout::vertical([
            Constraint::Length(TABLE_HEADER_HEIGHT as u16),
            Constraint::Min(0),
        ])
        .areas(inner);
        let [rows_area, scrollbar_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(SCROLLBAR_WIDTH)])
                .areas(body_area);
        (header_area, rows_area, scrollbar_area)
    }

    // Header cells share the row columns, the scrollbar column stays empty
    fn header_columns(header_area: Rect, rows_area: Rect) -> Vec<Rect> {
        Self::columns(Rect {
            y: header_area.y,
            height: 1,
            ..rows_area
        })
    }

    /// Sort key of the header cell drawn at `(column, row)` for a screen of
    /// the given layout.
    pub fn header_key_at(layout: &UILayout, column: u16, row: u16) -> Option<SortKey> {
        let screen = Rect::new(0, 0, layout.width as u16, layout.height as u16);
        let [_, table_area, _] = Self::screen_areas(screen);
        let (header_area, rows_area, _) = Self::table_areas(Block::bordered().inner(table_area));
        let position = Position::new(column, row);
        Self::header_columns(header_area, rows_area)
            .iter()
            .position(|rect| rect.contains(position))
            .and_then(|idx| SortKey::ALL.get(idx).copied())
    }

    fn filter_bar(uidata: &UIData) -> Line<'_> {
        let vs = &uidata.view_state;
        let mut spans = vec![
            " Search: ".into(),
            format!("\"{}\"", vs.search_text).yellow(),
            "  Status: ".into(),
            vs.status_filter.to_string().yellow(),
        ];
        if uidata.loading {
            spans.push("  loading ...".italic().dark_gray());
        }
        Line::from(spans)
    }

    fn draw_table(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let title = Line::from(format!(" {} ", uidata.name).bold());
        let block = Block::bordered()
            .title(title.centered())
            .border_set(border::PLAIN);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (header_area, rows_area, scrollbar_area) = Self::table_areas(inner);

        let buf = frame.buffer_mut();
        let columns = Self::header_columns(header_area, rows_area);
        for (cell, rect) in uidata.header.iter().zip(columns.iter()) {
            buf.set_stringn(
                rect.x,
                header_area.y,
                &cell.title,
                rect.width as usize,
                Style::default().add_modifier(Modifier::BOLD),
            );
        }

        match &uidata.body {
            Body::Skeleton(nrows) => {
                Self::draw_skeleton(*nrows, uidata.row_height, rows_area, buf)
            }
            Body::Empty => {
                Paragraph::new(EMPTY_MESSAGE)
                    .dark_gray()
                    .render(rows_area, buf);
            }
            Body::Rows(rows) => {
                for row in rows.iter() {
                    Self::draw_row(row, uidata, rows_area, buf);
                }
                let mut state = ScrollbarState::new(
                    uidata
                        .total_height
                        .saturating_sub(rows_area.height as usize),
                )
                .position(uidata.scroll_offset)
                .viewport_content_length(rows_area.height as usize);
                frame.render_stateful_widget(
                    Scrollbar::new(ScrollbarOrientation::VerticalRight)
                        .begin_symbol(None)
                        .end_symbol(None),
                    scrollbar_area,
                    &mut state,
                );
            }
        }
    }

    fn columns(area: Rect) -> Vec<Rect> {
        Layout::horizontal(COLUMN_CONSTRAINTS)
            .spacing(COLUMN_SPACING)
            .split(area)
            .to_vec()
    }

    // Rows are placed at their absolute offset relative to the scroll position.
    fn draw_row(row: &RenderedRow, uidata: &UIData, area: Rect, buf: &mut Buffer) {
        let rel = row.top as isize - uidata.scroll_offset as isize;
        if rel < 0 || rel >= area.height as isize {
            return;
        }
        let y = area.y + rel as u16;
        let selected = uidata.selected.map(|s| s * uidata.row_height) == Some(row.top);
        let base = if selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        if selected {
            let lines = std::cmp::min(uidata.row_height as u16, area.height - rel as u16);
            buf.set_style(
                Rect {
                    y,
                    height: lines,
                    ..area
                },
                base,
            );
        }

        let columns = Self::columns(Rect {
            y,
            height: 1,
            ..area
        });
        for (idx, (text, rect)) in row.cells.iter().zip(columns.iter()).enumerate() {
            // The name links to the detail view
            let style = if idx == 1 {
                base.fg(Color::Blue).add_modifier(Modifier::UNDERLINED)
            } else {
                base
            };
            buf.set_stringn(rect.x, y, text, rect.width as usize, style);
        }
    }

    fn draw_skeleton(nrows: usize, row_height: usize, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(Color::DarkGray);
        for i in 0..nrows {
            let rel = i * row_height;
            if rel >= area.height as usize {
                break;
            }
            let y = area.y + rel as u16;
            for rect in Self::columns(Rect {
                y,
                height: 1,
                ..area
            }) {
                let width = (rect.width as usize * 2 / 3).max(1);
                buf.set_stringn(
                    rect.x,
                    y,
                    SKELETON_CELL.repeat(width),
                    rect.width as usize,
                    style,
                );
            }
        }
    }

    fn draw_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if uidata.active_cmdinput {
            let prefix = match uidata.cmd_mode {
                Some(CMDMode::Search) => "/",
                Some(CMDMode::Detail) => ":",
                None => "",
            };
            let line = Line::from(vec![
                prefix.bold(),
                Span::raw(uidata.cmdinput.input.clone()),
            ]);
            frame.render_widget(line, area);
            let x = area.x + (prefix.len() + uidata.cmdinput.cursor_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let [left, right] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(30)]).areas(area);

        let message = if uidata.last_status_message_update.elapsed() < self.status_message_ttl {
            uidata.status_message.clone()
        } else {
            "? help  q quit".to_string()
        };
        frame.render_widget(Line::from(message).dark_gray(), left);

        let position = match uidata.selected {
            Some(s) => format!("{}/{} of {}", s + 1, uidata.nrows, uidata.ntotal),
            None if uidata.loading => "loading ...".to_string(),
            None => format!("0/{} of {}", uidata.nrows, uidata.ntotal),
        };
        frame.render_widget(Line::from(position).right_aligned(), right);
    }

    fn draw_popup(popup: &Popup, frame: &mut Frame) {
        let area = frame.area();
        let width = std::cmp::min(area.width, 64);
        let height = std::cmp::min(area.height, popup.lines.len() as u16 + 2);
        let rect = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", popup.title).bold()).centered())
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::THICK);
        let text: Vec<Line> = popup.lines.iter().map(|l| Line::from(l.as_str())).collect();
        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
            rect,
        );
    }
}
