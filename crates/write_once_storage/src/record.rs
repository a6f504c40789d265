#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::Serialize;
use write_once_contracts::{FieldName, FieldValue, RecordId, RecordTypeId};
use write_once_engine::GuardedRecord;

/// In-memory instance of a record type. Fields only change through
/// `RecordStore`, which routes every write through the write guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    record_type: RecordTypeId,
    id: Option<RecordId>,
    persisted: bool,
    values: BTreeMap<FieldName, FieldValue>,
}

impl Record {
    pub(crate) fn blank<'a, I>(record_type: RecordTypeId, fields: I) -> Self
    where
        I: IntoIterator<Item = &'a FieldName>,
    {
        Self {
            record_type,
            id: None,
            persisted: false,
            values: fields
                .into_iter()
                .map(|f| (f.clone(), FieldValue::Null))
                .collect(),
        }
    }

    pub(crate) fn loaded(
        record_type: RecordTypeId,
        id: RecordId,
        values: BTreeMap<FieldName, FieldValue>,
    ) -> Self {
        Self {
            record_type,
            id: Some(id),
            persisted: true,
            values,
        }
    }

    pub fn record_type(&self) -> &RecordTypeId {
        &self.record_type
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Field value, `Null` when unset or unknown.
    pub fn value(&self, field: &str) -> FieldValue {
        self.get(field).cloned().unwrap_or_default()
    }

    pub fn values(&self) -> &BTreeMap<FieldName, FieldValue> {
        &self.values
    }

    pub(crate) fn set_raw(&mut self, field: FieldName, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub(crate) fn mark_persisted(&mut self, id: RecordId) {
        self.id = Some(id);
        self.persisted = true;
    }
}

impl GuardedRecord for Record {
    fn record_type(&self) -> &RecordTypeId {
        &self.record_type
    }

    fn is_new_record(&self) -> bool {
        !self.persisted
    }

    fn read_field(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }
}
