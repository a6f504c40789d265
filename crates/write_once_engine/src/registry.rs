#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use write_once_contracts::{FieldName, RecordTypeId};

/// Write-once fields declared for one record type.
///
/// `ordered` keeps declaration order for listing; `index` answers lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTypeDescriptor {
    record_type: RecordTypeId,
    ordered: Vec<FieldName>,
    index: BTreeSet<FieldName>,
}

impl RecordTypeDescriptor {
    fn new(record_type: RecordTypeId) -> Self {
        Self {
            record_type,
            ordered: Vec::new(),
            index: BTreeSet::new(),
        }
    }

    pub fn record_type(&self) -> &RecordTypeId {
        &self.record_type
    }

    pub fn protected_fields(&self) -> &[FieldName] {
        &self.ordered
    }

    pub fn is_protected(&self, field: &str) -> bool {
        self.index.contains(field)
    }

    fn declare(&mut self, field: FieldName) -> bool {
        if !self.index.insert(field.clone()) {
            return false;
        }
        self.ordered.push(field);
        true
    }
}

/// Per-type registry of write-once fields.
///
/// Built with `&mut` access while types are being declared, then shared as
/// `Arc<FieldRegistry>`; lookups after that never lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    types: BTreeMap<RecordTypeId, RecordTypeDescriptor>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions `fields` into the protected set of `record_type`.
    pub fn declare_protected<I>(&mut self, record_type: &RecordTypeId, fields: I)
    where
        I: IntoIterator<Item = FieldName>,
    {
        let descriptor = self
            .types
            .entry(record_type.clone())
            .or_insert_with(|| RecordTypeDescriptor::new(record_type.clone()));
        for field in fields {
            if descriptor.declare(field.clone()) {
                tracing::debug!(
                    record_type = %record_type,
                    field = %field,
                    "declared write-once field"
                );
            }
        }
    }

    pub fn is_protected(&self, record_type: &str, field: &str) -> bool {
        self.types
            .get(record_type)
            .is_some_and(|d| d.is_protected(field))
    }

    pub fn protected_fields(&self, record_type: &str) -> Vec<FieldName> {
        self.types
            .get(record_type)
            .map(|d| d.protected_fields().to_vec())
            .unwrap_or_default()
    }

    pub fn descriptor(&self, record_type: &str) -> Option<&RecordTypeDescriptor> {
        self.types.get(record_type)
    }

    pub fn record_types(&self) -> impl Iterator<Item = &RecordTypeId> {
        self.types.keys()
    }
}
