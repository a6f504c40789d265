#![forbid(unsafe_code)]

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::WriteOnceConfig;
use crate::sink::{TracingWarningSink, WarningSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Reject the write with a `WriteOnceViolation`.
    Strict,
    /// Apply the write and report it through the warning sink.
    Permissive,
}

#[derive(Debug, Clone)]
pub struct EnforcementPolicy {
    pub mode: EnforcementMode,
    pub warning_sink: Arc<dyn WarningSink>,
}

impl EnforcementPolicy {
    /// Strict enforcement with the `TracingWarningSink`. Permissive warnings
    /// from this sink are only visible once the process installs a `tracing`
    /// subscriber.
    pub fn strict() -> Self {
        Self {
            mode: EnforcementMode::Strict,
            warning_sink: Arc::new(TracingWarningSink),
        }
    }

    pub fn from_config(config: &WriteOnceConfig) -> Self {
        Self {
            mode: config.mode(),
            ..Self::strict()
        }
    }

    pub fn with_warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.warning_sink = sink;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.mode == EnforcementMode::Strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.mode = if strict {
            EnforcementMode::Strict
        } else {
            EnforcementMode::Permissive
        };
    }
}

/// Same as [`EnforcementPolicy::strict`].
impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

/// Shared, swappable enforcement policy.
///
/// Readers take a snapshot `Arc`; `configure` builds the next policy on a copy
/// and swaps it in whole, so a snapshot never mixes the old mode with the new
/// sink.
#[derive(Debug, Clone)]
pub struct PolicyHandle {
    inner: Arc<RwLock<Arc<EnforcementPolicy>>>,
}

impl PolicyHandle {
    pub fn new(policy: EnforcementPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(policy))),
        }
    }

    pub fn current(&self) -> Arc<EnforcementPolicy> {
        let slot = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*slot)
    }

    pub fn configure<F>(&self, mutator: F)
    where
        F: FnOnce(&mut EnforcementPolicy),
    {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**slot).clone();
        mutator(&mut next);
        tracing::debug!(mode = ?next.mode, "write-once enforcement policy updated");
        *slot = Arc::new(next);
    }

    pub fn apply_config(&self, config: &WriteOnceConfig) {
        let mode = config.mode();
        self.configure(|p| p.mode = mode);
    }

    pub fn shares_state_with(&self, other: &PolicyHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for PolicyHandle {
    fn default() -> Self {
        Self::new(EnforcementPolicy::default())
    }
}

static GLOBAL_POLICY: OnceLock<PolicyHandle> = OnceLock::new();

/// Process-wide policy, created on first access from `WriteOnceConfig::from_env`.
pub fn global_policy() -> &'static PolicyHandle {
    GLOBAL_POLICY.get_or_init(|| {
        PolicyHandle::new(EnforcementPolicy::from_config(&WriteOnceConfig::from_env()))
    })
}
