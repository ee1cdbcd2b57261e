use std::collections::HashMap;
use std::fmt;

/// Session unique identifier of a record. Not a data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out record ids for one session. Ids only ever increase, so two calls never
/// return the same id, even inside a batch.
#[derive(Debug)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    pub fn mint(&mut self) -> RecordId {
        let id = RecordId(self.next);
        self.next += 1;
        id
    }
}

/// One row of the table: column name to value, plus its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: HashMap<String, String>,
}

impl Record {
    pub fn new(id: RecordId, fields: HashMap<String, String>) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Value of a column, `None` if the record has no such field.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.fields.insert(column.to_string(), value.into());
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Values in header order, missing fields as empty strings.
    pub fn values<'a>(&'a self, headers: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        headers.iter().map(|h| self.get(h).unwrap_or(""))
    }

    /// Same fields, new identity.
    pub fn with_id(&self, id: RecordId) -> Self {
        Self {
            id,
            fields: self.fields.clone(),
        }
    }

    /// True if both records hold the same data, ignoring ids.
    pub fn same_content(&self, other: &Record) -> bool {
        self.fields == other.fields
    }
}
