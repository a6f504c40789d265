#![forbid(unsafe_code)]

pub mod config;
pub mod guard;
pub mod policy;
pub mod registry;
pub mod sink;

pub use config::{ConfigError, WriteOnceConfig};
pub use guard::{GuardDecision, GuardedRecord, WriteGuard, WriteOutcome};
pub use policy::{global_policy, EnforcementMode, EnforcementPolicy, PolicyHandle};
pub use registry::{FieldRegistry, RecordTypeDescriptor};
pub use sink::{RecordingWarningSink, TracingWarningSink, WarningSink, WriteOnceWarning};
