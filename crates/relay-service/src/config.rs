//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use relay_tracing::{Reporter, TracingConfig};
use serde::Deserialize;

/// Top-level relay configuration. Read once at startup, immutable afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub relay: RelaySettings,
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

/// Where relayed requests go.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Full URL of the first (answering) call.
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Extra peers called after `url`. Their results are only logged.
    #[serde(default)]
    pub peers: Vec<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Relay behavior knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Fixed delay before the outbound call. 0 disables it.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// Correlation entry attached on `/correlation`.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrelationConfig {
    #[serde(default = "default_correlation_key")]
    pub key: String,

    #[serde(default = "default_correlation_value")]
    pub value: String,
}

/// CPU workload run by `/profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_profile_duration_ms")]
    pub duration_ms: u64,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_upstream_url() -> String {
    "http://localhost:8081/info".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_delay_ms() -> u64 {
    500
}

fn default_profile_duration_ms() -> u64 {
    500
}

fn default_correlation_key() -> String {
    "CONSUMER_KEY".to_string()
}

fn default_correlation_value() -> String {
    "consumer".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            peers: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            key: default_correlation_key(),
            value: default_correlation_value(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_profile_duration_ms(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Plain env vars: UPSTREAM_URL, COLLECTOR_ADDRESS, REPORTER, SERVICE_NAME
    /// 2. Environment variables (RELAY_ prefix, __ for nesting)
    /// 3. TOML config file
    /// 4. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let mut config: RelayConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("RELAY_").split("__"))
            .extract()?;

        // Names used by the test environments that launch this fixture
        if let Ok(url) = std::env::var("UPSTREAM_URL") {
            config.upstream.url = url;
        }
        if let Ok(address) = std::env::var("COLLECTOR_ADDRESS") {
            config.tracing.collector_endpoint = address;
        }
        if let Ok(name) = std::env::var("SERVICE_NAME") {
            config.tracing.service_name = name;
        }
        if let Ok(reporter) = std::env::var("REPORTER") {
            config.tracing.reporter = Reporter::parse(&reporter).ok_or_else(|| {
                anyhow::anyhow!("unknown REPORTER '{reporter}', expected log, grpc or http")
            })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let config = RelayConfig::load("missing.toml").unwrap();
            assert_eq!(config.server.listen_address, "0.0.0.0:8080");
            assert_eq!(config.upstream.timeout_secs, 10);
            assert_eq!(config.relay.delay_ms, 500);
            assert_eq!(config.profile.duration_ms, 500);
            assert_eq!(config.correlation.key, "CONSUMER_KEY");
            assert_eq!(config.tracing.reporter, Reporter::Log);
            assert!(config.upstream.peers.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_toml_then_prefixed_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "relay.toml",
                r#"
                [upstream]
                url = "http://provider:9090/info"
                peers = ["http://peer:9091/info"]

                [relay]
                delay_ms = 0

                [tracing]
                reporter = "grpc"
                "#,
            )?;
            jail.set_env("RELAY_SERVER__LISTEN_ADDRESS", "127.0.0.1:9999");

            let config = RelayConfig::load("relay.toml").unwrap();
            assert_eq!(config.upstream.url, "http://provider:9090/info");
            assert_eq!(config.upstream.peers, vec!["http://peer:9091/info"]);
            assert_eq!(config.relay.delay_ms, 0);
            assert_eq!(config.tracing.reporter, Reporter::Grpc);
            assert_eq!(config.server.listen_address, "127.0.0.1:9999");
            Ok(())
        });
    }

    #[test]
    fn test_profile_duration_independent_of_delay() {
        Jail::expect_with(|jail| {
            jail.create_file("relay.toml", "[relay]\ndelay_ms = 0\n")?;
            let config = RelayConfig::load("relay.toml").unwrap();
            assert_eq!(config.relay.delay_ms, 0);
            assert_eq!(config.profile.duration_ms, 500);

            jail.create_file("relay.toml", "[profile]\nduration_ms = 50\n")?;
            let config = RelayConfig::load("relay.toml").unwrap();
            assert_eq!(config.relay.delay_ms, 500);
            assert_eq!(config.profile.duration_ms, 50);
            Ok(())
        });
    }

    #[test]
    fn test_plain_env_overrides_win() {
        Jail::expect_with(|jail| {
            jail.create_file("relay.toml", "[upstream]\nurl = \"http://file/info\"\n")?;
            jail.set_env("UPSTREAM_URL", "http://up/ok");
            jail.set_env("COLLECTOR_ADDRESS", "http://oap:4317");
            jail.set_env("REPORTER", "http");
            jail.set_env("SERVICE_NAME", "consumer");

            let config = RelayConfig::load("relay.toml").unwrap();
            assert_eq!(config.upstream.url, "http://up/ok");
            assert_eq!(config.tracing.collector_endpoint, "http://oap:4317");
            assert_eq!(config.tracing.reporter, Reporter::Http);
            assert_eq!(config.tracing.service_name, "consumer");
            Ok(())
        });
    }

    #[test]
    fn test_unknown_reporter_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("REPORTER", "kafka");
            assert!(RelayConfig::load("missing.toml").is_err());
            Ok(())
        });
    }
}
