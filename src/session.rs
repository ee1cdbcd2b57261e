//! Caller owned state of one editing session.
//!
//! The session holds the record store and the view settings (filter, sort, page,
//! selection). Views are never cached: `view()` runs filter, sort and pagination over the
//! whole store every time it is called.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::error::{ExportError, IngestError, ValidationError};
use crate::export;
use crate::ingest::{self, LoadedTable};
use crate::mutation;
use crate::pagination::{PageSize, PageWindow, paginate};
use crate::record::{IdGenerator, Record, RecordId};
use crate::schema::{RawRow, Schema};
use crate::selection::Selection;
use crate::stats::Stats;
use crate::view::{self, Projection, SortSpec};

/// One computed view: the projection and the page window over it.
#[derive(Debug, Clone)]
pub struct View {
    pub projection: Projection,
    pub window: PageWindow,
}

impl View {
    /// Store indices of the rows on the current page.
    pub fn page_rows(&self) -> &[usize] {
        self.window.rows(&self.projection)
    }
}

#[derive(Debug)]
pub struct Session {
    schema: Schema,
    records: Vec<Record>,
    headers: Vec<String>,
    source: Option<PathBuf>,
    filter: String,
    sort: SortSpec,
    page: usize,
    page_size: PageSize,
    default_page_size: PageSize,
    selection: Selection,
    ids: IdGenerator,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Schema::default(), PageSize::default())
    }
}

impl Session {
    pub fn new(schema: Schema, page_size: PageSize) -> Self {
        Self {
            schema,
            records: Vec::new(),
            headers: Vec::new(),
            source: None,
            filter: String::new(),
            sort: SortSpec::default(),
            page: 1,
            page_size,
            default_page_size: page_size,
            selection: Selection::default(),
            ids: IdGenerator::default(),
        }
    }

    // -------------------- Accessors ---------------------- //

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == id)
    }

    // -------------------- Loading ---------------------- //

    /// Replace everything with the contents of `path`. On failure the session is left
    /// empty.
    pub fn load(&mut self, path: &Path) -> Result<usize, IngestError> {
        self.clear();
        match ingest::load(path, &self.schema, &mut self.ids, today()) {
            Ok(table) => {
                self.source = Some(path.to_path_buf());
                Ok(self.install(table))
            }
            Err(e) => {
                warn!("Loading {} failed: {}", path.display(), e);
                Err(e)
            }
        }
    }

    /// Load rows handed over by some other reader.
    pub fn load_rows(&mut self, rows: &[RawRow], today: NaiveDate) -> usize {
        self.clear();
        let table = ingest::normalize_rows(rows, &self.schema, &mut self.ids, today);
        self.install(table)
    }

    fn install(&mut self, table: LoadedTable) -> usize {
        self.headers = table.headers;
        self.records = table.records;
        info!("Session holds {} records", table.row_count);
        table.row_count
    }

    /// Back to the initial, empty state.
    pub fn clear(&mut self) {
        self.records.clear();
        self.headers.clear();
        self.source = None;
        self.filter.clear();
        self.sort = SortSpec::default();
        self.page = 1;
        self.page_size = self.default_page_size;
        self.selection.clear();
    }

    // -------------------- View ---------------------- //

    pub fn view(&self) -> View {
        let projection = view::project(&self.records, &self.headers, &self.filter, &self.sort);
        let window = paginate(projection.len(), self.page_size, self.page);
        View { projection, window }
    }

    pub fn page_records<'a>(&'a self, view: &View) -> Vec<&'a Record> {
        view.page_rows().iter().map(|&idx| &self.records[idx]).collect()
    }

    pub fn page_ids(&self, view: &View) -> Vec<RecordId> {
        view.page_rows()
            .iter()
            .map(|&idx| self.records[idx].id())
            .collect()
    }

    pub fn stats(&self) -> Stats {
        let view = self.view();
        self.stats_for(&view)
    }

    pub fn stats_for(&self, view: &View) -> Stats {
        Stats::compute(
            &self.records,
            &view.projection,
            &view.window,
            self.selection.len(),
            self.schema.amount_column(),
        )
    }

    /// A new search term starts over on page one with nothing selected.
    pub fn set_filter(&mut self, term: &str) {
        if term == self.filter {
            return;
        }
        debug!("Filter \"{}\" -> \"{}\"", self.filter, term);
        self.filter = term.to_string();
        self.page = 1;
        self.selection.clear();
    }

    pub fn toggle_sort(&mut self, column: &str) {
        self.sort = self.sort.toggled(column);
        debug!("Sort {:?}", self.sort);
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = paginate(self.view().projection.len(), self.page_size, page).page;
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.page = 1;
    }

    pub fn last_page(&mut self) {
        self.set_page(usize::MAX);
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.page = 1;
    }

    // -------------------- Selection ---------------------- //

    pub fn toggle_selected(&mut self, id: RecordId) {
        self.selection.toggle(id);
    }

    pub fn select_all_on_page(&mut self) {
        let view = self.view();
        let ids = self.page_ids(&view);
        self.selection.select_page(ids);
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    pub fn all_selected(&self) -> bool {
        let view = self.view();
        self.selection.all_selected(&self.page_ids(&view))
    }

    /// Select the whole page, or nothing if the whole page is already selected.
    pub fn toggle_all_on_page(&mut self) {
        if self.all_selected() {
            self.deselect_all();
        } else {
            self.select_all_on_page();
        }
    }

    // -------------------- Mutations ---------------------- //

    fn replace_records(&mut self, records: Vec<Record>) {
        self.records = records;
        self.selection.retain_existing(&self.records);
        // The page may have run past the end of a shrunken view.
        self.set_page(self.page);
    }

    fn ensure_headers(&mut self) {
        if self.headers.is_empty() {
            self.headers = self.schema.headers();
        }
    }

    /// New row in front of the store. Missing fields get their schema defaults.
    pub fn add_record(&mut self, fields: &HashMap<String, String>) -> RecordId {
        self.ensure_headers();
        let fields = self.schema.conform(fields, today());
        let records = mutation::add(&self.records, fields, &mut self.ids);
        let id = records[0].id();
        self.replace_records(records);
        id
    }

    pub fn edit_record(&mut self, edited: &Record) {
        let fields = self.schema.conform(edited.fields(), today());
        let edited = Record::new(edited.id(), fields);
        let records = mutation::edit(&self.records, edited);
        self.replace_records(records);
    }

    /// Change one cell. Unknown ids are ignored like any other stale edit. The column is
    /// matched like a source header, so `chan_amt` edits `CHAN_AMT`.
    pub fn update_field(&mut self, id: RecordId, column: &str, value: &str) {
        let Some(column) = self.schema.resolve(column).map(str::to_string) else {
            debug!("Ignoring edit of unknown column {:?}", column);
            return;
        };
        let Some(mut record) = self.record(id).cloned() else {
            debug!("Ignoring edit of missing record {}", id);
            return;
        };
        record.set(&column, value);
        self.edit_record(&record);
    }

    pub fn delete_record(&mut self, id: RecordId) {
        let records = mutation::delete_one(&self.records, id);
        self.replace_records(records);
    }

    pub fn delete_selected(&mut self) -> Result<usize, ValidationError> {
        let records = mutation::delete_many(&self.records, self.selection.ids())?;
        let removed = self.records.len() - records.len();
        self.selection.clear();
        self.replace_records(records);
        Ok(removed)
    }

    pub fn duplicate_selected(&mut self) -> Result<usize, ValidationError> {
        let records = mutation::duplicate_many(&self.records, self.selection.ids(), &mut self.ids)?;
        let added = records.len() - self.records.len();
        self.selection.clear();
        self.replace_records(records);
        Ok(added)
    }

    // -------------------- Export ---------------------- //

    pub fn export_csv(&self, path: &Path) -> Result<(), ExportError> {
        export::write_csv(path, &self.records, &self.headers)
    }

    pub fn export_xlsx(&self, path: &Path) -> Result<(), ExportError> {
        export::write_xlsx(
            path,
            &self.records,
            &self.headers,
            self.schema.amount_column(),
        )
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
