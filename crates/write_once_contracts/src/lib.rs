#![forbid(unsafe_code)]

pub mod common;
pub mod record;
pub mod violation;

pub use common::{ContractViolation, SchemaVersion, Validate};
pub use record::{FieldName, FieldValue, RecordId, RecordTypeId};
pub use violation::WriteOnceViolation;
