#![forbid(unsafe_code)]

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use write_once_contracts::{FieldName, FieldValue, RecordTypeId, WriteOnceViolation};

/// Structured warning emitted when permissive enforcement lets a write-once
/// field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOnceWarning {
    pub message: String,
    pub record_type: RecordTypeId,
    pub field: FieldName,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

impl WriteOnceWarning {
    pub fn from_violation(violation: &WriteOnceViolation) -> Self {
        Self {
            message: format!("write-once attribute {} changed", violation.field),
            record_type: violation.record_type.clone(),
            field: violation.field.clone(),
            old_value: violation.old_value.clone(),
            new_value: violation.new_value.clone(),
        }
    }
}

pub trait WarningSink: Send + Sync + fmt::Debug {
    fn warn(&self, warning: &WriteOnceWarning);
}

/// Default sink: one `WARN` event per warning, routed by whatever subscriber
/// the process installed.
///
/// With no subscriber installed the event is discarded. Embedders that want
/// warnings on stderr install one at startup, e.g.
/// `tracing_subscriber::fmt().with_writer(std::io::stderr).init()`, or plug
/// in their own `WarningSink`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn warn(&self, warning: &WriteOnceWarning) {
        tracing::warn!(
            record_type = %warning.record_type,
            field = %warning.field,
            old_value = %warning.old_value,
            new_value = %warning.new_value,
            "{}",
            warning.message
        );
    }
}

/// Keeps every warning in memory; used to assert on permissive enforcement
/// and to audit violations before switching a deployment to strict.
#[derive(Debug, Default)]
pub struct RecordingWarningSink {
    warnings: Mutex<Vec<WriteOnceWarning>>,
}

impl RecordingWarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<WriteOnceWarning> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WriteOnceWarning>> {
        self.warnings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WarningSink for RecordingWarningSink {
    fn warn(&self, warning: &WriteOnceWarning) {
        self.lock().push(warning.clone());
    }
}
