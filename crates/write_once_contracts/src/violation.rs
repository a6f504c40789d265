#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{FieldName, FieldValue, RecordTypeId};

/// Raised when a persisted record tries to change a write-once field that
/// already holds a value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error(
    "write-once field `{field}` on `{record_type}` cannot change from {old_value} to {new_value}"
)]
pub struct WriteOnceViolation {
    pub record_type: RecordTypeId,
    pub field: FieldName,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

impl WriteOnceViolation {
    pub fn field(&self) -> &FieldName {
        &self.field
    }
}
