//! In-memory tabular record engine.
//!
//! Records are loaded once from a spreadsheet or delimited file, normalized to a fixed
//! column schema and kept in a plain `Vec<Record>`. Every view of the data (search filter,
//! sort, page window) is recomputed from that store on demand, and every mutation returns a
//! whole new store which replaces the old one.

pub mod error;
pub mod export;
pub mod ingest;
pub mod mutation;
pub mod pagination;
pub mod record;
pub mod schema;
pub mod selection;
pub mod session;
pub mod stats;
pub mod view;

pub use error::{ExportError, IngestError, ValidationError};
pub use record::{IdGenerator, Record, RecordId};
pub use schema::Schema;
pub use session::Session;
