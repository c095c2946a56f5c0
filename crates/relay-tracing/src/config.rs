//! Tracing configuration types.

use serde::Deserialize;

/// Configuration for the tracing subsystem and its span reporter.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// The service name attached to every exported span.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Where completed spans go.
    #[serde(default)]
    pub reporter: Reporter,

    /// Collector endpoint for the network reporters (e.g. "http://oap:4317").
    /// Ignored by [`Reporter::Log`].
    #[serde(default = "default_collector_endpoint")]
    pub collector_endpoint: String,

    /// Log level filter (e.g. "info", "debug", "relay_service=debug,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Span export mechanism.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Reporter {
    /// Completed spans are written as log lines on stderr.
    #[default]
    Log,
    /// OTLP over gRPC.
    Grpc,
    /// OTLP over HTTP/protobuf.
    Http,
}

impl Reporter {
    /// Parse a reporter name as it appears in env vars (`log`, `grpc`, `http`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Some(Reporter::Log),
            "grpc" => Some(Reporter::Grpc),
            "http" => Some(Reporter::Http),
            _ => None,
        }
    }
}

fn default_service_name() -> String {
    "relay-service".to_string()
}

fn default_collector_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            reporter: Reporter::default(),
            collector_endpoint: default_collector_endpoint(),
            log_level: default_log_level(),
        }
    }
}
