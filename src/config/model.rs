//! Serde data structures for the junction configuration file.
//!
//! Contains [`Config`] (the root) and its sections: [`ServerConfig`],
//! [`SecurityConfig`], [`PerformanceConfig`], [`RedisConfig`], and the
//! per-route [`RouteConfig`] / [`Backend`] pair. Unknown keys are
//! ignored so that deployment files can carry extra sections (TLS
//! material, websocket ports) read by other processes.

use serde::{Deserialize, Serialize};

const fn default_http_port() -> u16 {
    8080
}

const fn default_rate_limit() -> u32 {
    100
}

const fn default_rate_window() -> u64 {
    60
}

const fn default_true() -> bool {
    true
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

const fn default_redis_port() -> u16 {
    6379
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub cache: RedisConfig,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Config {
    #[must_use]
    pub fn total_backends(&self) -> usize {
        self.routes.iter().map(|r| r.backends.len()).sum()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub ssl_enabled: bool,

    #[serde(default)]
    pub jwt_auth_enabled: bool,

    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default)]
    pub cors: CorsConfig,

    /// Client IPs admitted by the allow-list gate. Empty means the gate
    /// is disabled; `"*"` or `"0.0.0.0"` admits any client.
    #[serde(default)]
    pub ip_whitelist: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerformanceConfig {
    /// Requests per client per window. Zero disables rate limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    #[serde(default = "default_rate_window")]
    pub rate_window_seconds: u64,

    #[serde(default = "default_true")]
    pub gzip_enabled: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            rate_window_seconds: default_rate_window(),
            gzip_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Empty host disables the store; the cache and rate limiter then
    /// degrade (miss / fail-open) instead of refusing requests.
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    #[serde(default)]
    pub redis_password: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            redis_password: String::new(),
        }
    }
}

impl RedisConfig {
    /// Connection URL for the redis client; credentials included only
    /// when a password is configured.
    #[must_use]
    pub fn url(&self) -> String {
        if self.redis_password.is_empty() {
            format!("redis://{}:{}/", self.redis_host, self.redis_port)
        } else {
            format!(
                "redis://:{}@{}:{}/",
                self.redis_password, self.redis_host, self.redis_port
            )
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix this route owns. Longest matching prefix wins; an
    /// empty prefix acts as a catch-all.
    pub path_prefix: String,

    #[serde(default)]
    pub cache_enabled: bool,

    #[serde(default)]
    pub cache_ttl_seconds: u64,

    #[serde(default)]
    pub websocket_enabled: bool,

    pub backends: Vec<Backend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Backend {
    /// Unique within the route; liveness is tracked under this name.
    pub name: String,
    pub host: String,
    pub port: u16,

    /// Relative share of traffic under weighted selection.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

const fn default_weight() -> u32 {
    1
}

impl Backend {
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn health_url(&self) -> String {
        format!("http://{}:{}/health", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.performance.rate_limit, 100);
        assert_eq!(config.performance.rate_window_seconds, 60);
        assert!(config.performance.gzip_enabled);
        assert_eq!(config.cache.redis_host, "localhost");
        assert_eq!(config.cache.redis_port, 6379);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let raw = r#"{
            "server": { "http_port": 9000, "websocket_port": 9001 },
            "security": { "ssl_enabled": true, "ssl_cert_path": "/etc/ssl/cert.pem" },
            "routes": []
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.server.http_port, 9000);
        assert!(config.security.ssl_enabled);
    }

    #[test]
    fn redis_url_omits_empty_password() {
        let redis = RedisConfig::default();
        assert_eq!(redis.url(), "redis://localhost:6379/");

        let redis = RedisConfig {
            redis_password: "hunter2".into(),
            ..RedisConfig::default()
        };
        assert_eq!(redis.url(), "redis://:hunter2@localhost:6379/");
    }

    #[test]
    fn backend_weight_defaults_to_one() {
        let raw = r#"{ "name": "api-1", "host": "10.0.0.5", "port": 8081 }"#;
        let backend: Backend = serde_json::from_str(raw).unwrap();
        assert_eq!(backend.weight, 1);
        assert_eq!(backend.base_url(), "http://10.0.0.5:8081");
        assert_eq!(backend.health_url(), "http://10.0.0.5:8081/health");
    }
}
