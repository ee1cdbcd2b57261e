use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace, warn};

use tabedit::export::csv_line;
use tabedit::record::RecordId;
use tabedit::session::{Session, View};
use tabedit::view::Direction;
use tabedit::{Schema, ValidationError};

use crate::domain::{CMDMode, HELP_TEXT, Message, TVConfig, TVError};
use crate::inputter::{InputResult, Inputter};
use crate::ui::{
    CHECKBOX_WIDTH, CMDLINE_HEIGHT, COLUMN_WIDTH_MARGIN, STATS_HEIGHT, TABLE_HEADER_HEIGHT,
    TITLE_HEIGHT,
};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Everything the UI needs to draw one frame. Rebuilt from the session after every
/// message.
pub struct UIData {
    pub name: String,
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
    pub checked: Vec<bool>,
    pub all_selected: bool,
    pub selected_row: Option<usize>,
    pub selected_column: usize,
    pub stats: String,
    pub filter: String,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
            checked: Vec::new(),
            all_selected: false,
            selected_row: None,
            selected_column: 0,
            stats: String::new(),
            filter: String::new(),
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(CHECKBOX_WIDTH),
            table_height: ui_height
                .saturating_sub(TITLE_HEIGHT + TABLE_HEADER_HEIGHT + STATS_HEIGHT + CMDLINE_HEIGHT)
                .max(1),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

// Cell being edited through the command line.
struct EditTarget {
    id: RecordId,
    column: String,
}

pub struct Model {
    config: TVConfig,
    session: Session,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    curser_row: usize,    // Row on the current page
    curser_column: usize, // Index into the header list
    offset_row: usize,    // First page row shown when the page is taller than the screen
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    edit_target: Option<EditTarget>,
    status_message: String,
}

impl Model {
    pub fn init(config: &TVConfig, ui_width: usize, ui_height: usize) -> Self {
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Clipboard not available: {:?}", e);
                None
            }
        };
        let mut model = Self {
            config: config.clone(),
            session: Session::new(Schema::default(), config.page_size),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            edit_target: None,
            status_message: "Started tabedit! Press ? for help.".to_string(),
        };
        model.update_table_data();
        model
    }

    pub fn load_data_file(&mut self, path: PathBuf) -> Result<usize, TVError> {
        let start_time = Instant::now();
        self.reset_cursor();
        match self.session.load(&path) {
            Ok(n) => {
                let duration = start_time.elapsed().as_millis();
                self.set_status_message(format!("Loaded {n} records in {duration}ms ..."));
                self.update_table_data();
                Ok(n)
            }
            Err(e) => {
                self.set_status_message(format!("Error: {e}"));
                self.update_table_data();
                Err(e.into())
            }
        }
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn notice(&mut self, warning: ValidationError) {
        debug!("Validation notice: {warning}");
        self.set_status_message(format!("Warning: {warning}"));
    }

    fn reset_cursor(&mut self) {
        self.curser_row = 0;
        self.curser_column = 0;
        self.offset_row = 0;
        self.offset_column = 0;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveDown => self.move_selection_down(),
                    Message::MoveUp => self.move_selection_up(),
                    Message::MoveLeft => self.move_selection_left(),
                    Message::MoveRight => self.move_selection_right(),
                    Message::NextPage => self.change_page(|s| s.next_page()),
                    Message::PreviousPage => self.change_page(|s| s.previous_page()),
                    Message::FirstPage => self.change_page(|s| s.first_page()),
                    Message::LastPage => self.change_page(|s| s.last_page()),
                    Message::CyclePageSize => self.cycle_page_size(),
                    Message::Sort => self.sort_current_column(),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::ToggleSelect => self.toggle_select(),
                    Message::ToggleSelectAll => self.session.toggle_all_on_page(),
                    Message::AddRecord => self.add_record(),
                    Message::EditCell => self.enter_cmd_mode(CMDMode::EditCell),
                    Message::DeleteRecord => self.delete_record(),
                    Message::DeleteSelected => self.delete_selected(),
                    Message::DuplicateSelected => self.duplicate_selected(),
                    Message::ExportCsv => self.export(false),
                    Message::ExportXlsx => self.export(true),
                    Message::CopyCell => self.copy_table_cell(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::OpenFile => self.enter_cmd_mode(CMDMode::OpenFile),
                    Message::ClearAll => self.clear_all(),
                    Message::Help => self.show_help(),
                    Message::Exit => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Help => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }

        // Every message recomputes the view from the whole store.
        self.update_table_data();
        Ok(())
    }

    // -------------------- View building ---------------------- //

    fn update_table_data(&mut self) {
        let view = self.session.view();
        let page_rows = view.page_rows();
        let headers = self.session.headers();

        // The page may have shrunk under the cursor (delete, filter, clamp).
        self.curser_row = self.curser_row.min(page_rows.len().saturating_sub(1));
        self.curser_column = self.curser_column.min(headers.len().saturating_sub(1));

        let table_height = self.uilayout.table_height;
        if self.curser_row < self.offset_row {
            self.offset_row = self.curser_row;
        } else if self.curser_row >= self.offset_row + table_height {
            self.offset_row = self.curser_row + 1 - table_height;
        }
        self.offset_row = self.offset_row.min(page_rows.len().saturating_sub(1));

        let records = self.session.page_records(&view);
        let rbegin = self.offset_row.min(records.len());
        let rend = std::cmp::min(rbegin + table_height, records.len());
        let visible_records = &records[rbegin..rend];

        // Calculate render width for each column from the rows on this page
        let widths_all: Vec<usize> = headers
            .iter()
            .map(|h| {
                let longest = records
                    .iter()
                    .map(|r| r.get(h).map_or(0, |v| v.chars().count()))
                    .max()
                    .unwrap_or(0);
                std::cmp::min(
                    std::cmp::max(h.chars().count() + 2, longest) + COLUMN_WIDTH_MARGIN,
                    self.config.max_column_width,
                )
            })
            .collect();

        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
        let mut visible_columns = self.fit_columns(&widths_all);
        while !visible_columns.contains(&self.curser_column) && self.offset_column < self.curser_column {
            self.offset_column += 1;
            visible_columns = self.fit_columns(&widths_all);
        }

        let sort = self.session.sort();
        let headers_view = visible_columns
            .iter()
            .map(|&cidx| {
                let name = &headers[cidx];
                let marker = match (sort.is_sorted_by(name), sort.direction) {
                    (true, Direction::Ascending) => " ▲",
                    (true, Direction::Descending) => " ▼",
                    (false, _) => "",
                };
                format!("{name}{marker}")
            })
            .collect();
        let rows = visible_records
            .iter()
            .map(|r| {
                visible_columns
                    .iter()
                    .map(|&cidx| r.get(&headers[cidx]).unwrap_or("").replace('\n', " ↵ "))
                    .collect()
            })
            .collect();
        let selection = self.session.selection();
        let checked = visible_records
            .iter()
            .map(|r| selection.contains(r.id()))
            .collect();
        let all_selected = selection.all_selected(&self.session.page_ids(&view));

        let name = match self.session.source() {
            Some(path) => path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("???")
                .to_string(),
            None => "no file".to_string(),
        };

        self.uidata = UIData {
            name,
            headers: headers_view,
            widths: visible_columns.iter().map(|&c| widths_all[c]).collect(),
            rows,
            checked,
            all_selected,
            selected_row: if visible_records.is_empty() {
                None
            } else {
                Some(self.curser_row - rbegin)
            },
            selected_column: visible_columns
                .iter()
                .position(|&c| c == self.curser_column)
                .unwrap_or(0),
            stats: self.session.stats_for(&view).to_string(),
            filter: self.session.filter().to_string(),
            show_popup: matches!(self.modus, Modus::POPUP),
            popup_message: self.uidata.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
        };
    }

    // Columns from offset_column on that fit the table width. The last one may be cut.
    fn fit_columns(&self, widths: &[usize]) -> Vec<usize> {
        let mut visible = Vec::new();
        let mut visible_width = 0;
        for (cidx, width) in widths.iter().enumerate().skip(self.offset_column) {
            if visible_width >= self.uilayout.table_width && !visible.is_empty() {
                break;
            }
            visible.push(cidx);
            visible_width += width + 1;
        }
        visible
    }

    fn current_view(&self) -> View {
        self.session.view()
    }

    fn current_record_id(&self) -> Option<RecordId> {
        let view = self.current_view();
        self.session.page_ids(&view).get(self.curser_row).copied()
    }

    fn current_column(&self) -> Option<String> {
        self.session.headers().get(self.curser_column).cloned()
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                // Leaving a search is the only way back out of the table
                if !self.session.filter().is_empty() {
                    self.session.set_filter("");
                    self.reset_cursor();
                    self.set_status_message("Search cleared");
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.uidata.popup_message = HELP_TEXT.to_string();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?} ...", mode);
        let preset = match mode {
            CMDMode::Search => self.session.filter().to_string(),
            CMDMode::OpenFile => String::new(),
            CMDMode::EditCell => {
                let (Some(id), Some(column)) = (self.current_record_id(), self.current_column())
                else {
                    self.set_status_message("Nothing to edit");
                    return;
                };
                let value = self
                    .session
                    .record(id)
                    .and_then(|r| r.get(&column))
                    .unwrap_or("")
                    .to_string();
                self.edit_target = Some(EditTarget { id, column });
                value
            }
        };

        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.set(&preset);
        self.last_input = self.input.get();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        let cmd_input = self.last_input.input.clone();
        let canceled = self.last_input.canceled;
        let mode = self.cmd_mode.take();
        let target = self.edit_target.take();
        self.last_input = InputResult::default();

        if canceled {
            return;
        }
        match mode {
            Some(CMDMode::Search) => self.search(&cmd_input),
            Some(CMDMode::EditCell) => {
                if let Some(target) = target {
                    self.session.update_field(target.id, &target.column, &cmd_input);
                    self.set_status_message(format!("Updated {} of {}", target.column, target.id));
                }
            }
            Some(CMDMode::OpenFile) => {
                let path = expand_path(&cmd_input);
                if let Err(e) = self.load_data_file(path) {
                    error!("Open failed: {e}");
                }
            }
            None => info!("Cmd mode is none!"),
        }
    }

    fn search(&mut self, term: &str) {
        let start_time = Instant::now();
        self.session.set_filter(term);
        self.reset_cursor();
        let matches = self.session.view().projection.len();
        trace!(
            "Search found {} matching rows in {}ms",
            matches,
            start_time.elapsed().as_millis()
        );
        if term.is_empty() {
            self.set_status_message("Search cleared");
        } else if matches == 0 {
            self.set_status_message("Found no matches!");
        } else {
            self.set_status_message(format!("Found {matches} results"));
        }
    }

    fn sort_current_column(&mut self) {
        if let Some(column) = self.current_column() {
            self.session.toggle_sort(&column);
            self.curser_row = 0;
            self.offset_row = 0;
        }
    }

    fn change_page(&mut self, step: impl FnOnce(&mut Session)) {
        step(&mut self.session);
        self.curser_row = 0;
        self.offset_row = 0;
    }

    fn cycle_page_size(&mut self) {
        let size = self.session.page_size().next();
        self.session.set_page_size(size);
        self.curser_row = 0;
        self.offset_row = 0;
        self.set_status_message(format!("Page size {size}"));
    }

    fn toggle_select(&mut self) {
        if let Some(id) = self.current_record_id() {
            self.session.toggle_selected(id);
        }
    }

    fn add_record(&mut self) {
        let id = self.session.add_record(&HashMap::new());
        let view = self.current_view();
        let position = view
            .projection
            .iter()
            .position(|&idx| self.session.records()[idx].id() == id);
        match position {
            Some(pos) => {
                let rows = self.session.page_size().rows();
                self.session.set_page(pos / rows + 1);
                self.curser_row = pos % rows;
                self.set_status_message(format!("Added record {id}"));
            }
            None => self.set_status_message(format!("Added record {id} (hidden by search)")),
        }
    }

    fn delete_record(&mut self) {
        if let Some(id) = self.current_record_id() {
            self.session.delete_record(id);
            self.set_status_message(format!("Deleted record {id}"));
        }
    }

    fn delete_selected(&mut self) {
        match self.session.delete_selected() {
            Ok(n) => self.set_status_message(format!("Deleted {n} records")),
            Err(warning) => self.notice(warning),
        }
    }

    fn duplicate_selected(&mut self) {
        match self.session.duplicate_selected() {
            Ok(n) => self.set_status_message(format!("Duplicated {n} records")),
            Err(warning) => self.notice(warning),
        }
    }

    fn export_path(&self, extension: &str) -> PathBuf {
        let stem = self
            .session
            .source()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("records");
        self.config
            .export_dir
            .join(format!("{stem}_export.{extension}"))
    }

    fn export(&mut self, xlsx: bool) {
        let path = self.export_path(if xlsx { "xlsx" } else { "csv" });
        let result = if xlsx {
            self.session.export_xlsx(&path)
        } else {
            self.session.export_csv(&path)
        };
        match result {
            Ok(()) => self.set_status_message(format!("Exported to {}", path.display())),
            Err(tabedit::ExportError::Validation(warning)) => self.notice(warning),
            Err(e) => {
                error!("Export to {} failed: {e}", path.display());
                self.set_status_message(format!("Error: {e}"));
            }
        }
    }

    fn clear_all(&mut self) {
        self.session.clear();
        self.reset_cursor();
        self.set_status_message("Cleared");
    }

    fn copy_to_clipboard(&mut self, content: String) {
        match self.clipboard.as_mut().map(|c| c.set_text(content)) {
            Some(Ok(_)) => {
                trace!("Copied content to clipboard.");
                self.set_status_message("Copied to clipboard");
            }
            Some(Err(e)) => trace!("Error copying to clipboard: {:?}", e),
            None => self.set_status_message("Clipboard not available"),
        }
    }

    fn copy_table_cell(&mut self) {
        let (Some(id), Some(column)) = (self.current_record_id(), self.current_column()) else {
            return;
        };
        let cell = self
            .session
            .record(id)
            .and_then(|r| r.get(&column))
            .unwrap_or("")
            .to_string();
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn copy_table_row(&mut self) {
        let Some(id) = self.current_record_id() else {
            return;
        };
        let Some(record) = self.session.record(id) else {
            return;
        };
        let row_content = csv_line(record.values(self.session.headers()));
        self.copy_to_clipboard(row_content);
    }

    fn move_selection_up(&mut self) {
        if self.curser_row > 0 {
            self.curser_row -= 1;
        } else if self.current_view().window.has_previous() {
            // At the top of the page, continue at the bottom of the previous one
            self.session.previous_page();
            self.curser_row = self.session.page_size().rows() - 1;
        }
    }

    fn move_selection_down(&mut self) {
        let window = self.current_view().window;
        if self.curser_row + 1 < window.len() {
            self.curser_row += 1;
        } else if window.has_next() {
            self.session.next_page();
            self.curser_row = 0;
            self.offset_row = 0;
        }
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
    }

    fn move_selection_right(&mut self) {
        if self.curser_column + 1 < self.session.headers().len() {
            self.curser_column += 1;
        }
    }
}

pub fn expand_path(input: &str) -> PathBuf {
    let input = input.trim();
    match shellexpand::full(input) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            warn!("Could not expand {input}: {e}");
            Path::new(input).to_path_buf()
        }
    }
}
