#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use write_once_contracts::{ContractViolation, FieldName, RecordTypeId, SchemaVersion, Validate};

pub const RECORD_SCHEMA_VERSION: SchemaVersion = SchemaVersion(1);

/// A `belongs_to` relation: assigning a target record sets `foreign_key` to
/// the target's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BelongsTo {
    pub name: FieldName,
    pub foreign_key: FieldName,
    pub target_type: RecordTypeId,
}

impl BelongsTo {
    pub fn v1(name: FieldName, foreign_key: FieldName, target_type: RecordTypeId) -> Self {
        Self {
            name,
            foreign_key,
            target_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub schema_version: SchemaVersion,
    pub record_type: RecordTypeId,
    pub fields: Vec<FieldName>,
    pub write_once: Vec<FieldName>,
    pub associations: Vec<BelongsTo>,
}

impl RecordSchema {
    pub fn v1(
        record_type: RecordTypeId,
        fields: Vec<FieldName>,
        write_once: Vec<FieldName>,
        associations: Vec<BelongsTo>,
    ) -> Result<Self, ContractViolation> {
        let s = Self {
            schema_version: RECORD_SCHEMA_VERSION,
            record_type,
            fields,
            write_once,
            associations,
        };
        s.validate()?;
        Ok(s)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.as_str() == field)
    }

    pub fn association(&self, name: &str) -> Option<&BelongsTo> {
        self.associations.iter().find(|a| a.name.as_str() == name)
    }
}

impl Validate for RecordSchema {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != RECORD_SCHEMA_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "record_schema.schema_version",
                reason: "must match RECORD_SCHEMA_VERSION",
            });
        }
        self.record_type.validate()?;
        let mut seen = BTreeSet::new();
        for f in &self.fields {
            f.validate()?;
            if !seen.insert(f.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "record_schema.fields",
                    reason: "must be unique",
                });
            }
        }
        if self.write_once.iter().any(|f| !seen.contains(f.as_str())) {
            return Err(ContractViolation::InvalidValue {
                field: "record_schema.write_once",
                reason: "must name declared fields",
            });
        }
        let mut names = BTreeSet::new();
        for a in &self.associations {
            if !seen.contains(a.foreign_key.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "record_schema.associations.foreign_key",
                    reason: "must name a declared field",
                });
            }
            if seen.contains(a.name.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "record_schema.associations.name",
                    reason: "must not shadow a field",
                });
            }
            if !names.insert(a.name.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "record_schema.associations.name",
                    reason: "must be unique",
                });
            }
        }
        Ok(())
    }
}
