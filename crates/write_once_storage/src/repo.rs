#![forbid(unsafe_code)]

use write_once_contracts::{FieldName, FieldValue, RecordId, RecordTypeId};
use write_once_engine::GuardDecision;

use crate::record::Record;
use crate::store::{RecordStore, StorageError};

/// Typed repository interface for write-once guarded records.
pub trait WriteOnceRecordRepo {
    fn build_record(
        &self,
        record_type: &RecordTypeId,
        initial: Vec<(FieldName, FieldValue)>,
    ) -> Result<Record, StorageError>;
    fn create_record(
        &mut self,
        record_type: &RecordTypeId,
        initial: Vec<(FieldName, FieldValue)>,
    ) -> Result<Record, StorageError>;
    fn assign_field(
        &self,
        record: &mut Record,
        field: &FieldName,
        value: FieldValue,
    ) -> Result<GuardDecision, StorageError>;
    fn update_record(
        &mut self,
        record: &mut Record,
        values: Vec<(FieldName, FieldValue)>,
    ) -> Result<Vec<GuardDecision>, StorageError>;
    fn associate_record(
        &self,
        record: &mut Record,
        association: &str,
        target: &Record,
    ) -> Result<GuardDecision, StorageError>;
    fn save_record(&mut self, record: &mut Record) -> Result<RecordId, StorageError>;
    fn find_record(&self, record_type: &RecordTypeId, id: RecordId)
        -> Result<Record, StorageError>;
    fn write_once_fields(&self, record_type: &str) -> Vec<FieldName>;
}

impl WriteOnceRecordRepo for RecordStore {
    fn build_record(
        &self,
        record_type: &RecordTypeId,
        initial: Vec<(FieldName, FieldValue)>,
    ) -> Result<Record, StorageError> {
        self.build(record_type, initial)
    }

    fn create_record(
        &mut self,
        record_type: &RecordTypeId,
        initial: Vec<(FieldName, FieldValue)>,
    ) -> Result<Record, StorageError> {
        self.create(record_type, initial)
    }

    fn assign_field(
        &self,
        record: &mut Record,
        field: &FieldName,
        value: FieldValue,
    ) -> Result<GuardDecision, StorageError> {
        self.assign(record, field, value)
    }

    fn update_record(
        &mut self,
        record: &mut Record,
        values: Vec<(FieldName, FieldValue)>,
    ) -> Result<Vec<GuardDecision>, StorageError> {
        self.update(record, values)
    }

    fn associate_record(
        &self,
        record: &mut Record,
        association: &str,
        target: &Record,
    ) -> Result<GuardDecision, StorageError> {
        self.associate(record, association, target)
    }

    fn save_record(&mut self, record: &mut Record) -> Result<RecordId, StorageError> {
        self.save(record)
    }

    fn find_record(
        &self,
        record_type: &RecordTypeId,
        id: RecordId,
    ) -> Result<Record, StorageError> {
        self.find(record_type, id)
    }

    fn write_once_fields(&self, record_type: &str) -> Vec<FieldName> {
        self.write_once_attributes(record_type)
    }
}
