#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use thiserror::Error;
use write_once_contracts::{
    ContractViolation, FieldName, FieldValue, RecordId, RecordTypeId, Validate,
    WriteOnceViolation,
};
use write_once_engine::{FieldRegistry, GuardDecision, PolicyHandle, WriteGuard};

use crate::record::Record;
use crate::schema::{BelongsTo, RecordSchema};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error(transparent)]
    WriteOnce(#[from] WriteOnceViolation),
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
    #[error("unknown record type `{record_type}`")]
    UnknownRecordType { record_type: String },
    #[error("duplicate schema for record type `{record_type}`")]
    DuplicateSchema { record_type: String },
    #[error("record type `{record_type}` has no field `{field}`")]
    UnknownField { record_type: String, field: String },
    #[error("record type `{record_type}` has no association `{association}`")]
    UnknownAssociation {
        record_type: String,
        association: String,
    },
    #[error("association `{association}` expects `{expected}`, got `{got}`")]
    AssociationTargetMismatch {
        association: String,
        expected: String,
        got: String,
    },
    #[error("association `{association}` target must be saved before it is assigned")]
    AssociationTargetNotPersisted { association: String },
    #[error("`{record_type}` record {id} not found")]
    NotFound { record_type: String, id: RecordId },
}

/// In-memory record store.
///
/// Every field mutation (build-time values, direct assignment, bulk
/// assignment, association assignment) goes through `write_field`, which is
/// the only caller of `WriteGuard::intercept_write`.
#[derive(Debug)]
pub struct RecordStore {
    guard: WriteGuard,
    schemas: BTreeMap<RecordTypeId, RecordSchema>,
    // Per-type field lookup for the write path.
    field_index: BTreeMap<RecordTypeId, BTreeSet<FieldName>>,
    rows: BTreeMap<(RecordTypeId, RecordId), BTreeMap<FieldName, FieldValue>>,
    next_record_seq: u64,
}

impl RecordStore {
    pub fn new_in_memory(
        schemas: Vec<RecordSchema>,
        policy: PolicyHandle,
    ) -> Result<Self, StorageError> {
        let mut registry = FieldRegistry::new();
        let mut by_type = BTreeMap::new();
        for schema in schemas {
            schema.validate()?;
            registry.declare_protected(&schema.record_type, schema.write_once.iter().cloned());
            let record_type = schema.record_type.clone();
            if by_type.insert(record_type.clone(), schema).is_some() {
                return Err(StorageError::DuplicateSchema {
                    record_type: record_type.to_string(),
                });
            }
        }
        for schema in by_type.values() {
            for a in &schema.associations {
                if !by_type.contains_key(&a.target_type) {
                    return Err(StorageError::UnknownRecordType {
                        record_type: a.target_type.to_string(),
                    });
                }
            }
        }
        let field_index = by_type
            .iter()
            .map(|(t, s)| (t.clone(), s.fields.iter().cloned().collect()))
            .collect();
        Ok(Self {
            guard: WriteGuard::new(Arc::new(registry), policy),
            schemas: by_type,
            field_index,
            rows: BTreeMap::new(),
            next_record_seq: 1,
        })
    }

    pub fn with_global_policy(schemas: Vec<RecordSchema>) -> Result<Self, StorageError> {
        Self::new_in_memory(schemas, write_once_engine::global_policy().clone())
    }

    pub fn guard(&self) -> &WriteGuard {
        &self.guard
    }

    pub fn policy(&self) -> &PolicyHandle {
        self.guard.policy()
    }

    pub fn schema(&self, record_type: &str) -> Option<&RecordSchema> {
        self.schemas.get(record_type)
    }

    pub fn write_once_attributes(&self, record_type: &str) -> Vec<FieldName> {
        self.guard.registry().protected_fields(record_type)
    }

    pub fn write_once_attribute(&self, record_type: &str, field: &str) -> bool {
        self.guard.registry().is_protected(record_type, field)
    }

    /// New, unsaved record with `initial` applied in order.
    pub fn build(
        &self,
        record_type: &RecordTypeId,
        initial: Vec<(FieldName, FieldValue)>,
    ) -> Result<Record, StorageError> {
        let schema = self.schema_for(record_type)?;
        let mut record = Record::blank(record_type.clone(), &schema.fields);
        for (field, value) in initial {
            self.write_field(&mut record, &field, value)?;
        }
        Ok(record)
    }

    pub fn create(
        &mut self,
        record_type: &RecordTypeId,
        initial: Vec<(FieldName, FieldValue)>,
    ) -> Result<Record, StorageError> {
        let mut record = self.build(record_type, initial)?;
        self.save(&mut record)?;
        Ok(record)
    }

    pub fn assign(
        &self,
        record: &mut Record,
        field: &FieldName,
        value: FieldValue,
    ) -> Result<GuardDecision, StorageError> {
        self.write_field(record, field, value)
    }

    /// All-or-nothing bulk assignment: writes are staged on a copy and only
    /// committed when every one of them is allowed.
    pub fn assign_many(
        &self,
        record: &mut Record,
        values: Vec<(FieldName, FieldValue)>,
    ) -> Result<Vec<GuardDecision>, StorageError> {
        for (field, _) in &values {
            self.ensure_field(record.record_type(), field)?;
        }
        let mut staged = record.clone();
        let mut decisions = Vec::with_capacity(values.len());
        for (field, value) in values {
            decisions.push(self.write_field(&mut staged, &field, value)?);
        }
        *record = staged;
        Ok(decisions)
    }

    /// Bulk assignment followed by a save; nothing is assigned or saved when
    /// any write is rejected.
    pub fn update(
        &mut self,
        record: &mut Record,
        values: Vec<(FieldName, FieldValue)>,
    ) -> Result<Vec<GuardDecision>, StorageError> {
        let decisions = self.assign_many(record, values)?;
        self.save(record)?;
        Ok(decisions)
    }

    /// Sets the association's foreign key to `target`'s id.
    pub fn associate(
        &self,
        record: &mut Record,
        association: &str,
        target: &Record,
    ) -> Result<GuardDecision, StorageError> {
        let relation = self.association_for(record.record_type(), association)?;
        if target.record_type() != &relation.target_type {
            return Err(StorageError::AssociationTargetMismatch {
                association: association.to_string(),
                expected: relation.target_type.to_string(),
                got: target.record_type().to_string(),
            });
        }
        let target_id = match target.id() {
            Some(id) if target.is_persisted() => id,
            _ => {
                return Err(StorageError::AssociationTargetNotPersisted {
                    association: association.to_string(),
                })
            }
        };
        let foreign_key = relation.foreign_key.clone();
        self.write_field(record, &foreign_key, FieldValue::try_from(target_id)?)
    }

    /// Loads the record the association currently points at, if any.
    pub fn associated(
        &self,
        record: &Record,
        association: &str,
    ) -> Result<Option<Record>, StorageError> {
        let relation = self.association_for(record.record_type(), association)?;
        let Some(raw) = record.value(relation.foreign_key.as_str()).as_int() else {
            return Ok(None);
        };
        let Ok(id) = u64::try_from(raw) else {
            return Ok(None);
        };
        match self.find(&relation.target_type, RecordId(id)) {
            Ok(found) => Ok(Some(found)),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(&mut self, record: &mut Record) -> Result<RecordId, StorageError> {
        self.schema_for(record.record_type())?;
        let id = match record.id() {
            Some(id) => id,
            None => {
                let id = RecordId(self.next_record_seq);
                self.next_record_seq += 1;
                id
            }
        };
        self.rows.insert(
            (record.record_type().clone(), id),
            record.values().clone(),
        );
        record.mark_persisted(id);
        tracing::debug!(record_type = %record.record_type(), id = id.0, "record saved");
        Ok(id)
    }

    pub fn find(&self, record_type: &RecordTypeId, id: RecordId) -> Result<Record, StorageError> {
        self.schema_for(record_type)?;
        self.rows
            .get(&(record_type.clone(), id))
            .map(|values| Record::loaded(record_type.clone(), id, values.clone()))
            .ok_or_else(|| StorageError::NotFound {
                record_type: record_type.to_string(),
                id,
            })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn write_field(
        &self,
        record: &mut Record,
        field: &FieldName,
        value: FieldValue,
    ) -> Result<GuardDecision, StorageError> {
        self.ensure_field(record.record_type(), field)?;
        let decision = self
            .guard
            .intercept_write(record, field, value, |r, v| r.set_raw(field.clone(), v))?;
        Ok(decision)
    }

    fn ensure_field(
        &self,
        record_type: &RecordTypeId,
        field: &FieldName,
    ) -> Result<(), StorageError> {
        let fields = self
            .field_index
            .get(record_type)
            .ok_or_else(|| StorageError::UnknownRecordType {
                record_type: record_type.to_string(),
            })?;
        if fields.contains(field) {
            return Ok(());
        }
        Err(StorageError::UnknownField {
            record_type: record_type.to_string(),
            field: field.to_string(),
        })
    }

    fn schema_for(&self, record_type: &RecordTypeId) -> Result<&RecordSchema, StorageError> {
        self.schemas
            .get(record_type)
            .ok_or_else(|| StorageError::UnknownRecordType {
                record_type: record_type.to_string(),
            })
    }

    fn association_for(
        &self,
        record_type: &RecordTypeId,
        association: &str,
    ) -> Result<&BelongsTo, StorageError> {
        self.schema_for(record_type)?
            .association(association)
            .ok_or_else(|| StorageError::UnknownAssociation {
                record_type: record_type.to_string(),
                association: association.to_string(),
            })
    }
}
