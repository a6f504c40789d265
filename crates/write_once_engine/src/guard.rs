#![forbid(unsafe_code)]

use std::sync::Arc;

use write_once_contracts::{FieldName, FieldValue, RecordTypeId, WriteOnceViolation};

use crate::policy::{EnforcementMode, PolicyHandle};
use crate::registry::FieldRegistry;
use crate::sink::WriteOnceWarning;

/// What the guard needs to know about a record. Implemented by the record
/// layer that owns field storage and persistence state.
pub trait GuardedRecord {
    fn record_type(&self) -> &RecordTypeId;
    /// `true` until the record has been durably stored once.
    fn is_new_record(&self) -> bool;
    fn read_field(&self, field: &str) -> Option<&FieldValue>;
}

/// Policy-free verdict for one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Allow,
    Violation(WriteOnceViolation),
}

/// Result of an enforced write that was allowed to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allowed,
    /// A violation that permissive enforcement let through after warning.
    Warned,
}

#[derive(Debug, Clone)]
pub struct WriteGuard {
    registry: Arc<FieldRegistry>,
    policy: PolicyHandle,
}

impl WriteGuard {
    pub fn new(registry: Arc<FieldRegistry>, policy: PolicyHandle) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    pub fn evaluate<R>(&self, record: &R, field: &FieldName, new_value: &FieldValue) -> WriteOutcome
    where
        R: GuardedRecord + ?Sized,
    {
        let record_type = record.record_type();
        if !self
            .registry
            .is_protected(record_type.as_str(), field.as_str())
        {
            return WriteOutcome::Allow;
        }
        if record.is_new_record() {
            return WriteOutcome::Allow;
        }
        match record.read_field(field.as_str()) {
            None | Some(FieldValue::Null) => WriteOutcome::Allow,
            Some(current) if current == new_value => WriteOutcome::Allow,
            Some(current) => WriteOutcome::Violation(WriteOnceViolation {
                record_type: record_type.clone(),
                field: field.clone(),
                old_value: current.clone(),
                new_value: new_value.clone(),
            }),
        }
    }

    /// Evaluates the write and applies the current enforcement policy.
    pub fn guard_write<R>(
        &self,
        record: &R,
        field: &FieldName,
        new_value: &FieldValue,
    ) -> Result<GuardDecision, WriteOnceViolation>
    where
        R: GuardedRecord + ?Sized,
    {
        let violation = match self.evaluate(record, field, new_value) {
            WriteOutcome::Allow => return Ok(GuardDecision::Allowed),
            WriteOutcome::Violation(v) => v,
        };

        let policy = self.policy.current();
        match policy.mode {
            EnforcementMode::Strict => {
                tracing::debug!(
                    record_type = %violation.record_type,
                    field = %violation.field,
                    "blocked write-once field change"
                );
                Err(violation)
            }
            EnforcementMode::Permissive => {
                policy
                    .warning_sink
                    .warn(&WriteOnceWarning::from_violation(&violation));
                Ok(GuardDecision::Warned)
            }
        }
    }

    /// The single interception point for field writes: `proceed` performs the
    /// underlying mutation and only runs when the guard allows it.
    pub fn intercept_write<R, F>(
        &self,
        record: &mut R,
        field: &FieldName,
        new_value: FieldValue,
        proceed: F,
    ) -> Result<GuardDecision, WriteOnceViolation>
    where
        R: GuardedRecord + ?Sized,
        F: FnOnce(&mut R, FieldValue),
    {
        let decision = self.guard_write(&*record, field, &new_value)?;
        proceed(record, new_value);
        Ok(decision)
    }
}
