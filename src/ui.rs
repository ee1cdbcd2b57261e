use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Wrap},
};

use crate::domain::CMDMode;
use crate::model::UIData;

pub const TITLE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATS_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;
pub const CHECKBOX_WIDTH: usize = 4;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

#[derive(Debug, Default)]
pub struct TableUI;

impl TableUI {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let [title_area, table_area, stats_area, cmd_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Min((TABLE_HEADER_HEIGHT + 1) as u16),
            Constraint::Length(STATS_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.render_title(uidata, frame, title_area);
        self.render_table(uidata, frame, table_area);
        frame.render_widget(
            Paragraph::new(Line::from(uidata.stats.as_str()).cyan()),
            stats_area,
        );
        self.render_cmdline(uidata, frame, cmd_area);

        if uidata.show_popup {
            self.render_popup(uidata, frame);
        }
    }

    fn render_title(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![" tabedit ".bold().reversed(), " ".into(), uidata.name.as_str().yellow()];
        if !uidata.filter.is_empty() {
            spans.push("  search: ".into());
            spans.push(uidata.filter.as_str().green().bold());
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let checkbox = |checked: bool| if checked { "[x]" } else { "[ ]" };

        let header = Row::new(
            std::iter::once(Cell::from(checkbox(uidata.all_selected)))
                .chain(uidata.headers.iter().map(|h| Cell::from(h.as_str()))),
        )
        .style(Style::default().add_modifier(Modifier::BOLD).underlined());

        let rows = uidata.rows.iter().enumerate().map(|(ridx, row)| {
            let is_cursor_row = uidata.selected_row == Some(ridx);
            let checked = uidata.checked.get(ridx).copied().unwrap_or(false);
            let cells = std::iter::once(Cell::from(checkbox(checked))).chain(
                row.iter().enumerate().map(|(cidx, value)| {
                    let cell = Cell::from(value.as_str());
                    if is_cursor_row && cidx == uidata.selected_column {
                        cell.reversed()
                    } else {
                        cell
                    }
                }),
            );
            let row = Row::new(cells);
            if is_cursor_row { row.bold() } else { row }
        });

        let widths = std::iter::once(Constraint::Length((CHECKBOX_WIDTH - 1) as u16))
            .chain(uidata.widths.iter().map(|&w| Constraint::Length(w as u16)));

        let table = Table::new(rows, widths).header(header).column_spacing(1);
        if uidata.headers.is_empty() {
            let hint = Paragraph::new("No data loaded. Press O to open a file, + to add a record, ? for help.")
                .centered()
                .dark_gray();
            frame.render_widget(hint, area);
        } else {
            frame.render_widget(table, area);
        }
    }

    fn render_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::Search) => "/",
                Some(CMDMode::EditCell) => "edit: ",
                Some(CMDMode::OpenFile) => "open: ",
                None => ":",
            };
            let line = Line::from(vec![
                Span::from(prompt).bold(),
                Span::from(uidata.cmdinput.input.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        } else {
            let message = uidata.status_message.as_str();
            let line = if message.starts_with("Error") {
                Line::from(message).red()
            } else if message.starts_with("Warning") {
                Line::from(message).yellow()
            } else {
                Line::from(message)
            };
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn render_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = centered(frame.area(), 84, 30);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(vec![" Close ".into(), "<Esc> ".blue().bold()]).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.as_str())
                .wrap(Wrap { trim: false })
                .block(block),
            area,
        );
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}
