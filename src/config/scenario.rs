//! Scenario presets for latency and error injection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{MockError, MockResult};

/// Named preset injecting artificial latency and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// No injection
    HappyPath,
    /// Randomized extra delay on every request
    Slow,
    /// Random 4xx/5xx short-circuits
    ErrorHeavy,
    /// Both delay and errors
    SadPath,
}

impl Scenario {
    pub fn injects_latency(&self) -> bool {
        matches!(self, Self::Slow | Self::SadPath)
    }

    pub fn injects_errors(&self) -> bool {
        matches!(self, Self::ErrorHeavy | Self::SadPath)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HappyPath => "happy-path",
            Self::Slow => "slow",
            Self::ErrorHeavy => "error-heavy",
            Self::SadPath => "sad-path",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = MockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "happy-path" | "happy" => Ok(Self::HappyPath),
            "slow" => Ok(Self::Slow),
            "error-heavy" | "errors" => Ok(Self::ErrorHeavy),
            "sad-path" | "sad" => Ok(Self::SadPath),
            other => Err(MockError::config(
                format!("Unknown scenario '{}'", other),
                "server.scenario",
            )),
        }
    }
}

/// Tunable bands used by the scenario engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Lower bound of the extra delay added by `slow`
    pub slow_delay_min_ms: u64,
    /// Upper bound of the extra delay added by `slow`
    pub slow_delay_max_ms: u64,
    /// Chance that `error-heavy` short-circuits a request
    pub error_probability: f64,
    /// Statuses an injected error is drawn from
    pub error_statuses: Vec<u16>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            slow_delay_min_ms: 500,
            slow_delay_max_ms: 2000,
            error_probability: 0.3,
            error_statuses: vec![400, 404, 409, 429, 500, 502, 503],
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> MockResult<()> {
        if self.slow_delay_min_ms > self.slow_delay_max_ms {
            return Err(MockError::config(
                "slow_delay_min_ms cannot exceed slow_delay_max_ms",
                "scenarios.slow_delay_min_ms",
            ));
        }
        if !(0.0..=1.0).contains(&self.error_probability) {
            return Err(MockError::config(
                "error_probability must be between 0.0 and 1.0",
                "scenarios.error_probability",
            ));
        }
        if self.error_statuses.is_empty() {
            return Err(MockError::config(
                "error_statuses cannot be empty",
                "scenarios.error_statuses",
            ));
        }
        for (i, status) in self.error_statuses.iter().enumerate() {
            if !(400..=599).contains(status) {
                return Err(MockError::config(
                    format!("Status {} is not a 4xx/5xx code", status),
                    format!("scenarios.error_statuses[{}]", i),
                ));
            }
        }
        Ok(())
    }

    /// Minimum extra latency a `slow` request experiences
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.slow_delay_min_ms)
    }

    /// Maximum extra latency a `slow` request experiences
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.slow_delay_max_ms)
    }
}
