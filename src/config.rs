//! Configuration surface read from the operator's config provider.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub(crate) const DEFAULT_STRATEGY: &str = "simple";
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime-adjustable knobs for [`crate::Checker`].
///
/// Applied via [`crate::Checker::configure`]; unknown strategy names are
/// rejected there rather than silently defaulted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckerConfig {
    /// Name of the active strategy: `"simple"` or `"twopass"`.
    pub strategy: String,
    /// Overall per-request timeout; carried as milliseconds on the wire.
    #[serde(rename = "timeout_ms", deserialize_with = "duration_from_millis")]
    pub timeout: Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CheckerConfig {
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn duration_from_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}
