//! Configuration types for the scheduler

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};

/// Process label that marks a tag as belonging to no process
pub const DEFAULT_NONE_PROCESS_LABEL: &str = "none";

/// What to do about upstream actors that nothing will ever fire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Say nothing
    Ignore,
    /// Log each unreachable actor at warn level
    #[default]
    Warn,
    /// Treat unreachable actors as an error
    Error,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Process label (case-insensitive) that means "no process"
    pub none_process_label: String,
    /// Handling of unreachable actors when a session is checked
    pub unreachable_policy: UnreachablePolicy,
    /// Return the cached schedule while it is still valid
    pub reuse_cached_schedule: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            none_process_label: DEFAULT_NONE_PROCESS_LABEL.to_string(),
            unreachable_policy: UnreachablePolicy::default(),
            reuse_cached_schedule: true,
        }
    }
}

impl SchedulerConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SchedulingError::Config(e.to_string()))
    }

    pub fn with_unreachable_policy(mut self, policy: UnreachablePolicy) -> Self {
        self.unreachable_policy = policy;
        self
    }

    pub fn with_none_process_label(mut self, label: impl Into<String>) -> Self {
        self.none_process_label = label.into();
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.reuse_cached_schedule = enabled;
        self
    }
}
