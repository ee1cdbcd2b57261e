use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TVConfig, TVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Char('n') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::PageUp => Some(Message::PreviousPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('z') => Some(Message::CyclePageSize),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char(' ') => Some(Message::ToggleSelect),
            KeyCode::Char('a') => Some(Message::ToggleSelectAll),
            KeyCode::Char('+') | KeyCode::Char('o') => Some(Message::AddRecord),
            KeyCode::Char('e') | KeyCode::Enter => Some(Message::EditCell),
            KeyCode::Char('x') => Some(Message::DeleteRecord),
            KeyCode::Char('X') | KeyCode::Delete => Some(Message::DeleteSelected),
            KeyCode::Char('D') => Some(Message::DuplicateSelected),
            KeyCode::Char('w') => Some(Message::ExportCsv),
            KeyCode::Char('W') => Some(Message::ExportXlsx),
            KeyCode::Char('c') => Some(Message::CopyCell),
            KeyCode::Char('C') => Some(Message::CopyRow),
            KeyCode::Char('O') => Some(Message::OpenFile),
            KeyCode::Char('R') => Some(Message::ClearAll),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
