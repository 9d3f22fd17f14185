//! Configuration Module
//!
//! Loads service configuration from environment variables once at startup.
//! Nothing here is re-read afterwards.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::session::RetryPolicy;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// Name of the cache bucket sessions and cached values live in
    pub cache_name: String,
    /// Credential for the cache bucket. Loaded for remote gateways; the
    /// in-process [`crate::cache::MemoryGateway`] does not authenticate.
    pub cache_password: String,
    /// Hosting site name, part of every session key
    pub site_name: String,
    /// Application virtual path, part of every session key
    pub app_path: String,
    /// Maximum number of entries the in-process gateway holds
    pub max_entries: usize,
    /// Default TTL in seconds for values stored through the cache facade
    pub cache_timeout: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// CAS rounds an exclusive acquire may spend before giving up
    pub lock_max_attempts: u32,
    /// Backoff before the second CAS round, in milliseconds
    pub lock_backoff_ms: u64,
    /// Upper bound for the exponential backoff, in milliseconds
    pub lock_max_backoff_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAME` - Cache bucket name (default: "default")
    /// - `CACHE_NAME_PASSWORD` - Cache bucket credential (default: empty)
    /// - `SITE_NAME` - Hosting site name (default: empty)
    /// - `APP_PATH` - Application virtual path (default: "/")
    /// - `MAX_ENTRIES` - Maximum gateway entries (default: 10000)
    /// - `CACHE_TIMEOUT` - Facade TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    /// - `LOCK_MAX_ATTEMPTS` - CAS rounds per exclusive acquire (default: 50)
    /// - `LOCK_BACKOFF_MS` - Initial retry backoff (default: 5)
    /// - `LOCK_MAX_BACKOFF_MS` - Retry backoff cap (default: 200)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_name: env::var("CACHE_NAME").unwrap_or(defaults.cache_name),
            cache_password: env::var("CACHE_NAME_PASSWORD").unwrap_or(defaults.cache_password),
            site_name: env::var("SITE_NAME").unwrap_or(defaults.site_name),
            app_path: env::var("APP_PATH").unwrap_or(defaults.app_path),
            max_entries: parse_var("MAX_ENTRIES", defaults.max_entries),
            cache_timeout: parse_var("CACHE_TIMEOUT", defaults.cache_timeout),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL", defaults.cleanup_interval),
            lock_max_attempts: parse_var("LOCK_MAX_ATTEMPTS", defaults.lock_max_attempts),
            lock_backoff_ms: parse_var("LOCK_BACKOFF_MS", defaults.lock_backoff_ms),
            lock_max_backoff_ms: parse_var("LOCK_MAX_BACKOFF_MS", defaults.lock_max_backoff_ms),
        }
    }

    /// Retry policy for exclusive session acquisition.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.lock_max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.lock_backoff_ms),
            max_backoff: Duration::from_millis(self.lock_max_backoff_ms),
        }
    }

    /// Default TTL for the cache facade.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_timeout)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_name: "default".to_string(),
            cache_password: String::new(),
            site_name: String::new(),
            app_path: "/".to_string(),
            max_entries: 10_000,
            cache_timeout: 300,
            server_port: 3000,
            cleanup_interval: 1,
            lock_max_attempts: 50,
            lock_backoff_ms: 5,
            lock_max_backoff_ms: 200,
        }
    }
}

// Keeps the credential out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("cache_name", &self.cache_name)
            .field("cache_password", &"<redacted>")
            .field("site_name", &self.site_name)
            .field("app_path", &self.app_path)
            .field("max_entries", &self.max_entries)
            .field("cache_timeout", &self.cache_timeout)
            .field("server_port", &self.server_port)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("lock_max_attempts", &self.lock_max_attempts)
            .field("lock_backoff_ms", &self.lock_backoff_ms)
            .field("lock_max_backoff_ms", &self.lock_max_backoff_ms)
            .finish()
    }
}
