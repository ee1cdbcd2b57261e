use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use tabedit::pagination::PageSize;
use tabedit::{ExportError, IngestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TVError {
    #[error("IO error: {0}")]
    IoError(#[from] Error),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub page_size: PageSize,
    pub export_dir: PathBuf,
    pub max_column_width: usize,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            page_size: PageSize::default(),
            export_dir: PathBuf::from("."),
            max_column_width: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Search,
    EditCell,
    OpenFile,
}

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    CyclePageSize,
    Sort,
    Search,
    ToggleSelect,
    ToggleSelectAll,
    AddRecord,
    EditCell,
    DeleteRecord,
    DeleteSelected,
    DuplicateSelected,
    ExportCsv,
    ExportXlsx,
    CopyCell,
    CopyRow,
    OpenFile,
    ClearAll,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  j / k / Down / Up      move row        h / l / Left / Right   move column
  n / p / PgDn / PgUp    next / previous page
  g / G / Home / End     first / last page
  z                      cycle page size (10, 25, 50, 100)

View
  /                      search all columns (empty search shows everything)
  s                      sort by current column, again to reverse
  Esc                    close popup, clear search

Selection
  Space                  toggle row          a   select / deselect page

Editing
  + / o                  add record          e / Enter   edit cell
  x                      delete row          X / Del     delete selected
  D                      duplicate selected

Files
  O                      open file           R   clear everything
  w                      export CSV          W   export XLSX
  c / C                  copy cell / row to clipboard

  ?                      this help           q   quit";
