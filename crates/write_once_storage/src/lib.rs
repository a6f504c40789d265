#![forbid(unsafe_code)]

pub mod record;
pub mod repo;
pub mod schema;
pub mod store;

pub use record::Record;
pub use repo::WriteOnceRecordRepo;
pub use schema::{BelongsTo, RecordSchema};
pub use store::{RecordStore, StorageError};
