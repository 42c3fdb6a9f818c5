//! Scenario-driven latency and error injection

use rand::prelude::*;
use rand_distr::Uniform;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::{Scenario, ScenarioConfig};
use crate::error::MockError;

/// Applies a [`Scenario`]'s effects to individual requests
pub struct ScenarioEngine {
    config: ScenarioConfig,
    delay: Uniform<u64>,
    request_counter: AtomicU64,
}

impl ScenarioEngine {
    pub fn new(config: ScenarioConfig) -> Self {
        let (lo, hi) = (config.slow_delay_min_ms, config.slow_delay_max_ms);
        Self {
            delay: Uniform::new_inclusive(lo.min(hi), hi.max(lo)),
            config,
            request_counter: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Extra latency for this request, if the scenario adds any
    pub fn sample_delay(&self, scenario: Scenario) -> Option<Duration> {
        if !scenario.injects_latency() {
            return None;
        }
        let ms = self.delay.sample(&mut rand::thread_rng());
        Some(Duration::from_millis(ms))
    }

    /// Maybe short-circuit this request with a randomized 4xx/5xx error
    pub fn maybe_inject_error(&self, scenario: Scenario) -> Option<MockError> {
        if !scenario.injects_errors() {
            return None;
        }

        let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed);
        let mut rng = rand::thread_rng();
        if rng.gen::<f64>() >= self.config.error_probability {
            return None;
        }

        let status_code = self
            .config
            .error_statuses
            .choose(&mut rng)
            .copied()
            .unwrap_or(500);

        Some(MockError::Injected {
            status_code,
            message: format!(
                "Injected {} error by scenario '{}' (request #{})",
                status_code,
                scenario,
                request_id + 1
            ),
        })
    }
}

impl Default for ScenarioEngine {
    fn default() -> Self {
        Self::new(ScenarioConfig::default())
    }
}
