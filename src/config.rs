//! Configuration management for the conduit binary.

use std::time::Duration;

use anyhow::{Context, Result};
use conduit_output::{DeliveryOptions, OutputConfig};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "conduit.toml";
const ENV_PREFIX: &str = "CONDUIT_";

/// Binary configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables prefixed with `CONDUIT_` (highest priority)
/// 2. Configuration file (`conduit.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// `uri` and `addresses` have no usable default and must be set. List values
/// in the environment use array syntax, e.g.
/// `CONDUIT_ADDRESSES='["10.0.0.1:8080","10.0.0.2:8080"]'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // Target
    /// Request path, optionally containing `{#TOPIC}`.
    ///
    /// Environment variable: `CONDUIT_URI`
    pub uri: String,
    /// Collector addresses as `host:port`.
    ///
    /// Environment variable: `CONDUIT_ADDRESSES`
    pub addresses: Vec<String>,
    /// `Content-Type` header of every request.
    ///
    /// Environment variable: `CONDUIT_CONTENT_TYPE`
    pub content_type: String,

    // Timeouts
    /// Connection timeout in milliseconds.
    ///
    /// Environment variable: `CONDUIT_CONNECT_TIMEOUT_MS`
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds.
    ///
    /// Environment variable: `CONDUIT_REQUEST_TIMEOUT_MS`
    pub request_timeout_ms: u64,

    // Workers
    /// Number of concurrent delivery workers.
    ///
    /// Environment variable: `CONDUIT_WORKER_COUNT`
    pub worker_count: usize,
    /// Number of events that can wait for a worker.
    ///
    /// Environment variable: `CONDUIT_QUEUE_CAPACITY`
    pub queue_capacity: usize,

    // Retry
    /// Retries after a failed attempt; `-1` retries forever.
    ///
    /// Environment variable: `CONDUIT_MAX_RETRIES`
    pub max_retries: i32,
    /// Wait between attempts in milliseconds.
    ///
    /// Environment variable: `CONDUIT_RETRY_INTERVAL_MS`
    pub retry_interval_ms: u64,
    /// Submit every event as guaranteed, ignoring `max_retries`.
    ///
    /// Environment variable: `CONDUIT_GUARANTEED`
    pub guaranteed: bool,

    // Shutdown
    /// How long to wait for workers when shutting down, in milliseconds.
    ///
    /// Environment variable: `CONDUIT_SHUTDOWN_TIMEOUT_MS`
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// Load configuration from defaults, `conduit.toml`, and environment
    /// variable overrides, then validate it.
    pub fn load() -> Result<Self> {
        let config: Self = Self::figment().extract().context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// The layered configuration sources.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Convert to the output crate's configuration type.
    pub fn to_output_config(&self) -> OutputConfig {
        OutputConfig {
            uri: self.uri.clone(),
            addresses: self.addresses.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            worker_count: self.worker_count,
            max_retries: self.max_retries,
            queue_capacity: self.queue_capacity,
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            content_type: self.content_type.clone(),
        }
    }

    /// Options attached to every submitted event.
    pub fn delivery_options(&self) -> DeliveryOptions {
        DeliveryOptions { guaranteed: self.guaranteed }
    }

    /// Maximum wait for workers on shutdown.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            anyhow::bail!("connect_timeout_ms must be greater than 0");
        }

        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be greater than 0");
        }

        if self.shutdown_timeout_ms == 0 {
            anyhow::bail!("shutdown_timeout_ms must be greater than 0");
        }

        self.to_output_config().validate().context("invalid output settings")?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri: String::new(),
            addresses: Vec::new(),
            content_type: conduit_output::DEFAULT_CONTENT_TYPE.to_string(),
            connect_timeout_ms: conduit_output::DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: conduit_output::DEFAULT_REQUEST_TIMEOUT_SECONDS * 1000,
            worker_count: conduit_output::DEFAULT_WORKER_COUNT,
            queue_capacity: conduit_output::DEFAULT_QUEUE_CAPACITY,
            max_retries: conduit_output::DEFAULT_MAX_RETRIES,
            retry_interval_ms: conduit_output::DEFAULT_RETRY_INTERVAL_MS,
            guaranteed: false,
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    fn valid() -> Config {
        Config {
            uri: "/ingest".to_string(),
            addresses: vec!["127.0.0.1:8080".to_string()],
            ..Config::default()
        }
    }

    #[test]
    fn defaults_mirror_output_defaults() {
        let output = Config::default().to_output_config();
        let expected = OutputConfig::default();

        assert_eq!(output, expected);
    }

    #[test]
    fn defaults_alone_are_rejected() {
        let error = Config::default().validate().unwrap_err();
        assert!(format!("{error:#}").contains("uri must be set"));
    }

    #[test]
    fn file_then_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                uri = "/ingest/{#TOPIC}"
                addresses = ["h1:80", "h2:80"]
                worker_count = 2
                max_retries = 5
                "#,
            )?;
            jail.set_env("CONDUIT_WORKER_COUNT", "8");
            jail.set_env("CONDUIT_RETRY_INTERVAL_MS", "50");
            jail.set_env("CONDUIT_GUARANTEED", "true");

            let config: Config = Config::figment().extract()?;

            assert_eq!(config.uri, "/ingest/{#TOPIC}");
            assert_eq!(config.addresses, ["h1:80", "h2:80"]);
            assert_eq!(config.worker_count, 8);
            assert_eq!(config.max_retries, 5);
            assert_eq!(config.retry_interval_ms, 50);
            assert!(config.delivery_options().guaranteed);
            assert_eq!(config.queue_capacity, 256);
            Ok(())
        });
    }

    #[test]
    fn addresses_from_env_array() {
        Jail::expect_with(|jail| {
            jail.set_env("CONDUIT_URI", "/ingest");
            jail.set_env("CONDUIT_ADDRESSES", r#"["10.0.0.1:8080","10.0.0.2:8080"]"#);

            let config: Config = Config::figment().extract()?;

            assert_eq!(config.addresses, ["10.0.0.1:8080", "10.0.0.2:8080"]);
            assert!(config.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn conversion_uses_milliseconds() {
        let config = Config {
            connect_timeout_ms: 150,
            request_timeout_ms: 2_500,
            retry_interval_ms: 40,
            max_retries: -1,
            ..valid()
        };

        let output = config.to_output_config();

        assert_eq!(output.connect_timeout, Duration::from_millis(150));
        assert_eq!(output.request_timeout, Duration::from_millis(2_500));
        assert_eq!(output.retry_interval, Duration::from_millis(40));
        assert_eq!(output.max_retries, -1);
    }

    #[test]
    fn invalid_config_validation_fails() {
        assert!(valid().validate().is_ok());

        let config = Config { addresses: Vec::new(), ..valid() };
        assert!(config.validate().is_err());

        let config = Config { worker_count: 0, ..valid() };
        assert!(config.validate().is_err());

        let config = Config { max_retries: -3, ..valid() };
        assert!(config.validate().is_err());

        let config = Config { shutdown_timeout_ms: 0, ..valid() };
        assert!(config.validate().is_err());

        let config = Config { connect_timeout_ms: 0, ..valid() };
        assert!(config.validate().is_err());
    }
}
