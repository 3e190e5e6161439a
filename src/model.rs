use std::sync::Arc;
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace, warn};

use crate::dataset::Dataset;
use crate::detail::{self, DetailOutcome};
use crate::domain::{CMDMode, HELP_TEXT, IvConfig, IvError, Message};
use crate::filters::FilterControls;
use crate::format::row_content;
use crate::inputter::{InputResult, Inputter};
use crate::record::{SortKey, ViewState};
use crate::row::{RenderedRow, RowRenderer};
use crate::scheduler::{Commit, RefreshScheduler};
use crate::ui::{BORDER_HEIGHT, CMDLINE_HEIGHT, FILTER_BAR_HEIGHT, TABLE_HEADER_HEIGHT};
use crate::virtualizer::Virtualizer;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Popup,
    CmdInput,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
    pub statusline_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(FILTER_BAR_HEIGHT)
            .saturating_sub(CMDLINE_HEIGHT)
            .saturating_sub(BORDER_HEIGHT)
            .saturating_sub(TABLE_HEADER_HEIGHT);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height,
            statusline_height: CMDLINE_HEIGHT,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// What the table body shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Results are stale while a refresh is pending.
    Skeleton(usize),
    /// The committed collection is empty.
    Empty,
    Rows(Vec<Arc<RenderedRow>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub key: SortKey,
    pub title: String,
}

pub struct UIData {
    pub name: String,
    pub header: Vec<HeaderCell>,
    pub body: Body,
    pub view_state: ViewState,
    pub loading: bool,
    pub nrows: usize,
    pub ntotal: usize,
    pub selected: Option<usize>,
    pub scroll_offset: usize,
    pub total_height: usize,
    pub row_height: usize,
    pub popup: Option<Popup>,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
    pub layout: UILayout,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            header: Vec::new(),
            body: Body::Empty,
            view_state: ViewState::default(),
            loading: false,
            nrows: 0,
            ntotal: 0,
            selected: None,
            scroll_offset: 0,
            total_height: 0,
            row_height: 1,
            popup: None,
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
            layout: UILayout::default(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Dataset,
    view_state: ViewState,
    scheduler: RefreshScheduler,
    virtualizer: Virtualizer,
    renderer: RowRenderer,
    filters: FilterControls,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    selected: usize,
    popup: Option<Popup>,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &IvConfig,
        dataset: Dataset,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, IvError> {
        let view_state = ViewState::default();
        let scheduler =
            RefreshScheduler::new(config.refresh_delay, dataset.records(), &view_state);
        let uilayout = UILayout::from_values(ui_width, ui_height);
        let mut virtualizer = Virtualizer::new(config.row_height, config.overscan);
        virtualizer.set_count(scheduler.displayed().len());
        virtualizer.resize(uilayout.table_height);

        let mut model = Self {
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            dataset,
            view_state,
            scheduler,
            virtualizer,
            renderer: RowRenderer::default(),
            filters: FilterControls::default(),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            selected: 0,
            popup: None,
            uilayout,
            uidata: UIData::empty(),
            clipboard: None,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        let loaded = format!("Loaded {} items", model.dataset.len());
        model.set_status_message(loaded);
        model.update_uidata();
        Ok(model)
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), IvError> {
        self.update_at(message, Instant::now())
    }

    /// Fires due timers, applies `message` and rebuilds the ui snapshot.
    pub fn update_at(&mut self, message: Option<Message>, now: Instant) -> Result<(), IvError> {
        self.tick(now);

        if let Some(msg) = message {
            match self.modus {
                Modus::Table => self.handle_table_message(msg, now),
                Modus::Popup => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Enter => self.exit(),
                    _ => (),
                },
                Modus::CmdInput => match msg {
                    Message::RawKey(key) => self.raw_input(key, now),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        self.update_uidata();
        Ok(())
    }

    fn handle_table_message(&mut self, msg: Message, now: Instant) {
        match msg {
            Message::Quit => self.quit(),
            Message::Resize(width, height) => self.ui_resize(width, height),
            Message::SetSearch(text) => {
                if text != self.view_state.search_text {
                    self.view_state.search_text = text;
                    self.view_state_changed(now);
                }
            }
            Message::SetStatus(filter) => {
                if filter != self.view_state.status_filter {
                    self.view_state.status_filter = filter;
                    self.view_state_changed(now);
                }
            }
            Message::CycleStatus => {
                let next = FilterControls::cycle_status(self.view_state.status_filter);
                self.handle_table_message(next, now);
            }
            Message::Sort(key) => {
                self.view_state.toggle_sort(key);
                self.view_state_changed(now);
            }
            Message::Search => self.enter_cmd_mode(CMDMode::Search),
            Message::EnterDetail => self.enter_cmd_mode(CMDMode::Detail),
            Message::Help => self.show_popup(Popup {
                title: "Help".to_string(),
                lines: HELP_TEXT.lines().map(String::from).collect(),
            }),
            // The rows are stale while a refresh is pending
            _ if self.scheduler.is_loading() => trace!("Ignoring {:?} while loading", msg),
            Message::MoveUp => self.move_selection(-1),
            Message::MoveDown => self.move_selection(1),
            Message::MovePageUp => self.move_selection(-(self.virtualizer.page_size() as isize)),
            Message::MovePageDown => self.move_selection(self.virtualizer.page_size() as isize),
            Message::MoveBeginning => self.select(0),
            Message::MoveEnd => self.select(self.scheduler.displayed().len().saturating_sub(1)),
            Message::ScrollBy(lines) => self.scroll_by(lines),
            Message::Enter => self.open_selected_detail(),
            Message::CopyRow => self.copy_selected(false),
            Message::CopyAddress => self.copy_selected(true),
            _ => (),
        }
    }

    /// Fires a due refresh, if any.
    pub fn tick(&mut self, now: Instant) {
        let raw = Arc::clone(self.dataset.records());
        if let Some(commit) = self.scheduler.poll(now, &raw, &self.view_state) {
            self.on_commit(commit);
        }
    }

    fn view_state_changed(&mut self, now: Instant) {
        debug!("View state changed: {:?}", self.view_state);
        self.scheduler.request(now);
    }

    fn on_commit(&mut self, commit: Commit) {
        // New collection: indices from the previous one are meaningless
        self.virtualizer.set_count(commit.rows);
        self.selected = 0;
        info!(
            "Showing {} of {} items (commit {})",
            commit.rows,
            self.dataset.len(),
            commit.seq
        );
    }

    /// Earliest moment the model needs a tick without user input.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn teardown(&mut self) {
        self.scheduler.teardown();
    }

    pub fn quit(&mut self) {
        self.teardown();
        self.status = Status::Quitting;
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CmdInput
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn selected_id(&self) -> Option<u64> {
        let displayed = self.scheduler.displayed();
        displayed
            .get(self.selected)
            .map(|&idx| self.dataset.records()[idx].id)
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.virtualizer.resize(self.uilayout.table_height);
    }

    fn select(&mut self, index: usize) {
        let count = self.scheduler.displayed().len();
        if count == 0 {
            return;
        }
        self.selected = index.min(count - 1);
        self.virtualizer.ensure_visible(self.selected);
    }

    fn move_selection(&mut self, delta: isize) {
        self.select(self.selected.saturating_add_signed(delta));
    }

    // Scrolls the viewport and drags the selection along when it leaves it.
    fn scroll_by(&mut self, lines: isize) {
        self.virtualizer.scroll_by(lines);
        let count = self.scheduler.displayed().len();
        if count == 0 {
            return;
        }
        let first = self.virtualizer.first_visible();
        let last = std::cmp::min(first + self.virtualizer.page_size(), count) - 1;
        self.selected = self.selected.clamp(first, last.max(first));
    }

    fn selected_row(&mut self) -> Option<Arc<RenderedRow>> {
        let displayed = Arc::clone(self.scheduler.displayed());
        let idx = *displayed.get(self.selected)?;
        let record = &self.dataset.records()[idx];
        let top = self.selected * self.virtualizer.row_height();
        Some(self.renderer.render(record.id, top, || row_content(record)))
    }

    fn open_selected_detail(&mut self) {
        if let Some(row) = self.selected_row() {
            self.show_detail(&row.link);
        }
    }

    fn show_detail(&mut self, param: &str) {
        let outcome: DetailOutcome = detail::resolve(param, &self.dataset);
        self.show_popup(Popup {
            title: outcome.title(),
            lines: outcome.lines(),
        });
    }

    fn show_popup(&mut self, popup: Popup) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup = Some(popup);
    }

    fn exit(&mut self) {
        if self.modus == Modus::Popup {
            trace!("Close popup ...");
            self.popup = None;
            self.modus = self.previous_modus;
            self.previous_modus = Modus::Popup;
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);
        match mode {
            CMDMode::Search => {
                self.filters.open(&self.view_state.search_text);
                self.last_input = self.filters.state().clone();
            }
            CMDMode::Detail => {
                self.input.clear();
                self.last_input = self.input.get();
            }
        }
    }

    fn raw_input(&mut self, key: KeyEvent, now: Instant) {
        match self.cmd_mode {
            Some(CMDMode::Search) => {
                if let Some(msg) = self.filters.read(key) {
                    self.handle_table_message(msg, now);
                }
                self.last_input = self.filters.state().clone();
                if self.filters.finished() {
                    self.leave_cmd_mode();
                }
            }
            Some(CMDMode::Detail) => {
                self.last_input = self.input.read(key);
                if self.last_input.finished {
                    let param = self.last_input.input.clone();
                    let canceled = self.last_input.canceled;
                    self.leave_cmd_mode();
                    if !canceled {
                        self.show_detail(&param);
                    }
                }
            }
            None => {
                warn!("Raw key without command mode");
                self.leave_cmd_mode();
            }
        }
    }

    fn leave_cmd_mode(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CmdInput;
        self.cmd_mode = None;
    }

    fn copy_selected(&mut self, address_only: bool) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let content = if address_only {
            row.link.clone()
        } else {
            row.as_csv()
        };

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard unavailable: {:?}", e);
                    self.set_status_message("Clipboard unavailable!");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(content) {
                Ok(_) => {
                    trace!("Copied row {} to clipboard.", row.id);
                    self.set_status_message(format!("Copied item {}", row.id));
                }
                Err(e) => {
                    warn!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copy failed!");
                }
            }
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn header(&self) -> Vec<HeaderCell> {
        SortKey::ALL
            .iter()
            .map(|&key| {
                let title = if key == self.view_state.sort_key {
                    format!("{} {}", key.title(), self.view_state.sort_direction.arrow())
                } else {
                    key.title().to_string()
                };
                HeaderCell { key, title }
            })
            .collect()
    }

    // Only the rows of the current window are materialized.
    fn build_body(&mut self) -> Body {
        if self.scheduler.is_loading() {
            return Body::Skeleton(self.virtualizer.page_size());
        }
        let displayed = Arc::clone(self.scheduler.displayed());
        if displayed.is_empty() {
            self.renderer.clear();
            return Body::Empty;
        }
        let window = self.virtualizer.window();
        let records = Arc::clone(self.dataset.records());
        let rows: Vec<Arc<RenderedRow>> = window
            .range()
            .zip(window.offsets.iter())
            .map(|(idx, &top)| {
                let record = &records[displayed[idx]];
                self.renderer.render(record.id, top, || row_content(record))
            })
            .collect();
        self.renderer.retain_window(&rows);
        Body::Rows(rows)
    }

    fn update_uidata(&mut self) {
        let body = self.build_body();
        let loading = self.scheduler.is_loading();
        let nrows = self.scheduler.displayed().len();
        self.uidata = UIData {
            name: self.dataset.name.clone(),
            header: self.header(),
            body,
            view_state: self.view_state.clone(),
            loading,
            nrows,
            ntotal: self.dataset.len(),
            selected: (!loading && nrows > 0).then_some(self.selected),
            scroll_offset: self.virtualizer.scroll_offset(),
            total_height: self.virtualizer.total_height(),
            row_height: self.virtualizer.row_height(),
            popup: self.popup.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.modus == Modus::CmdInput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
            layout: self.uilayout.clone(),
            last_update: Instant::now(),
        };
    }
}
