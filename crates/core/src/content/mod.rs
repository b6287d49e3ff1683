//! Content requests and the repositories that hold them.

mod airtable;
mod sqlite_store;
mod store;
mod types;

pub use airtable::{status_from_label, status_label, AirtableRepository};
pub use sqlite_store::SqliteContentRepository;
pub use store::{ContentRepository, RepositoryError};
pub use types::{
    AspectRatio, ContentRequest, ContentStatus, ContentUpdate, NewContentRequest, Quality,
    StatusCounts, DEFAULT_MODEL,
};
