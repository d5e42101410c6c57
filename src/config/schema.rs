//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder admin key; validation refuses it once the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Backend service the gateway authorizes against and relays to.
    pub backend: BackendConfig,

    /// Per-connection relay settings.
    pub relay: RelayConfig,

    /// Timeout configuration for plain HTTP requests.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

impl GatewayConfig {
    /// Apply command-line overrides on top of file/default values.
    pub fn with_overrides(mut self, listen: Option<String>, url: Option<String>) -> Self {
        if let Some(listen) = listen {
            self.listener.listen = listen;
        }
        if let Some(url) = url {
            self.backend.url = url;
        }
        self
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// `host:port` to bind. An empty host (":4000") binds all interfaces.
    pub listen: String,

    /// Largest data-plane POST body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            listen: ":4000".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Backend service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; the connection address is appended verbatim.
    pub url: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Bound on a single authorization or relay call, body included.
    pub request_timeout_secs: u64,

    /// Largest backend response body read, in bytes.
    pub max_response_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000/".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            max_response_size: 2 * 1024 * 1024,
        }
    }
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Per-connection relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Capacity of each connection's inbound and outbound queues.
    pub queue_depth: usize,

    /// How long a data-plane POST waits for its frame to be written.
    pub send_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            send_timeout_secs: 10,
        }
    }
}

impl RelayConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

/// Timeout configuration for plain HTTP requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Upgraded sockets are not subject to it.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 60 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line_flags() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.listen, ":4000");
        assert_eq!(config.backend.url, "http://localhost:5000/");
        assert!(!config.admin.enabled);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [backend]
            url = "http://10.0.0.5:8000/hooks/"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "http://10.0.0.5:8000/hooks/");
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener.listen, ":4000");
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let config = GatewayConfig::default()
            .with_overrides(Some("127.0.0.1:9000".into()), None);
        assert_eq!(config.listener.listen, "127.0.0.1:9000");
        assert_eq!(config.backend.url, "http://localhost:5000/");
    }
}
