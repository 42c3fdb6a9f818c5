//! Configuration module for schema-mock
//!
//! Provides hierarchical configuration with support for:
//! - YAML/TOML/JSON config files
//! - Environment variable overrides
//! - Validation before any resource is acquired

mod scenario;

pub use scenario::*;

use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;
use crate::error::{MockError, MockResult};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MockServerConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Synthetic data generation settings
    pub generation: GenerationConfig,
    /// Scenario injection bands
    pub scenarios: ScenarioConfig,
    /// Compiled schema cache settings
    pub cache: CacheConfig,
    /// Telemetry settings
    pub telemetry: TelemetryConfig,
}

impl MockServerConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> MockResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MockError::Config {
            message: format!("Failed to read config file: {}", e),
            param: None,
        })?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| MockError::config(format!("YAML parse error: {}", e), "file"))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| MockError::config(format!("TOML parse error: {}", e), "file"))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MockError::config(format!("JSON parse error: {}", e), "file"))?,
            _ => {
                return Err(MockError::config(
                    "Unsupported config file format. Use .yaml, .toml, or .json",
                    "file",
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn from_env() -> MockResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `SCHEMA_MOCK_*` environment variables onto this configuration
    pub fn apply_env(&mut self) -> MockResult<()> {
        if let Ok(port) = std::env::var("SCHEMA_MOCK_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| MockError::config("Invalid port number", "server.port"))?;
        }

        if let Ok(host) = std::env::var("SCHEMA_MOCK_HOST") {
            self.server.host = host;
        }

        if let Ok(val) = std::env::var("SCHEMA_MOCK_STRICT") {
            self.server.strict_mode = val.parse().unwrap_or(false);
        }

        if let Ok(val) = std::env::var("SCHEMA_MOCK_SCENARIO") {
            self.server.scenario = Some(val.parse()?);
        }

        if let Ok(level) = std::env::var("SCHEMA_MOCK_LOG_LEVEL") {
            self.telemetry.log_level = level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> MockResult<()> {
        self.server.validate()?;
        self.generation.validate()?;
        self.scenarios.validate()?;
        self.cache.validate()?;
        Ok(())
    }

    /// Configuration suited to tests: loopback host, no scenario, fixed seed
    pub fn for_testing(port: u16) -> Self {
        let mut config = Self::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = port;
        config.generation.seed = Some(7);
        config
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (1-65535)
    pub port: u16,
    /// Enable permissive CORS
    pub cors_enabled: bool,
    /// Validate request bodies against route schemas
    pub strict_mode: bool,
    /// Latency/error injection preset
    pub scenario: Option<Scenario>,
    /// Suppress the generator identity header and metadata field
    pub hide_branding: bool,
    /// Prefix for schema-derived CRUD routes
    pub base_path: String,
    /// Resource noun overriding the schema title
    pub resource_name: Option<String>,
    /// Maximum time `stop()` waits for in-flight requests
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: crate::DEFAULT_PORT,
            cors_enabled: true,
            strict_mode: false,
            scenario: None,
            hide_branding: false,
            base_path: "/api".to_string(),
            resource_name: None,
            drain_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> MockResult<()> {
        if self.port == 0 {
            return Err(MockError::config("Port must be between 1 and 65535", "server.port"));
        }
        self.socket_addr()?;
        if !self.base_path.is_empty() && !self.base_path.starts_with('/') {
            return Err(MockError::config(
                format!("base_path must start with '/': {}", self.base_path),
                "server.base_path",
            ));
        }
        if let Some(name) = &self.resource_name {
            if name.trim().is_empty() {
                return Err(MockError::config(
                    "resource_name cannot be empty",
                    "server.resource_name",
                ));
            }
        }
        Ok(())
    }

    /// Resolve the bind address; accepts IP literals and host names
    pub fn socket_addr(&self) -> MockResult<SocketAddr> {
        if self.host.is_empty() || self.host.contains(char::is_whitespace) {
            return Err(MockError::config(
                format!("Invalid host '{}'", self.host),
                "server.host",
            ));
        }
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| MockError::config(
                format!("Cannot resolve bind address {}:{}", self.host, self.port),
                "server.host",
            ))
    }
}

/// Synthetic data generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Probability that a non-required property is emitted
    pub optional_property_probability: f64,
    /// Nesting bound for anonymous schemas
    pub max_depth: usize,
    /// Item count range for list endpoints
    pub list_min: usize,
    pub list_max: usize,
    /// Prefer the first `examples` entry over synthesis
    pub use_examples: bool,
    /// Seed for deterministic generation (None = entropy)
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            optional_property_probability: DEFAULT_OPTIONAL_PROBABILITY,
            max_depth: 8,
            list_min: 3,
            list_max: 10,
            use_examples: false,
            seed: None,
        }
    }
}

/// Chance that an optional object property is included in a compiled value
pub const DEFAULT_OPTIONAL_PROBABILITY: f64 = 0.7;

impl GenerationConfig {
    pub fn validate(&self) -> MockResult<()> {
        if !(0.0..1.0).contains(&self.optional_property_probability) {
            return Err(MockError::config(
                "optional_property_probability must be in [0.0, 1.0)",
                "generation.optional_property_probability",
            ));
        }
        if self.max_depth == 0 {
            return Err(MockError::config(
                "max_depth must be greater than 0",
                "generation.max_depth",
            ));
        }
        if self.list_min > self.list_max {
            return Err(MockError::config(
                "list_min cannot exceed list_max",
                "generation.list_min",
            ));
        }
        Ok(())
    }
}

/// Compiled schema cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of memoized artifacts
    pub capacity: usize,
    /// Lazy expiry for entries (None = never)
    #[serde(with = "humantime_serde::option")]
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            ttl: None,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> MockResult<()> {
        if self.capacity == 0 {
            return Err(MockError::config("cache capacity must be greater than 0", "cache.capacity"));
        }
        Ok(())
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable the tracing subscriber
    pub enabled: bool,
    /// Log level
    pub log_level: String,
    /// Enable JSON logging
    pub json_logs: bool,
    /// Service name attached to startup logs
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "schema-mock".to_string(),
        }
    }
}

/// Helper module for Duration serialization
pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(millis) = s.strip_suffix("ms") {
            millis.trim().parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| format!("Invalid duration: {}", s))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim().parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| format!("Invalid duration: {}", s))
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim().parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| format!("Invalid duration: {}", s))
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| format!("Invalid duration: {}", s))
        }
    }

    pub mod option {
        use super::parse_duration;
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&format!("{}ms", d.as_millis())),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s: Option<String> = Option::deserialize(deserializer)?;
            s.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
