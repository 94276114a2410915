//! Environment-driven service configuration.
//!
//! Read once at startup by [`load_from_env`] and rejected before anything
//! binds or connects if a value is out of range.
//!
//! The database is addressed by `DATABASE_URL`, or else assembled from
//! `DB_USER`, `DB_PASSWORD` and `DB_NAME` plus optional `DB_HOST`
//! (`localhost`) and `DB_PORT` (`5432`). Credentials are percent-encoded.
//!
//! | Variable | Default |
//! |---|---|
//! | `LISTEN` | `0.0.0.0:8080` |
//! | `BASE_URL` | request `Host` header |
//! | `RUST_LOG` | `info` |
//! | `LOG_FORMAT` | `text` (or `json`) |
//! | `BEHIND_PROXY` | `false` |
//! | `CLICK_WORKER_ENABLED` | `true` |
//! | `CLICK_QUEUE_CAPACITY` | `8192` |
//! | `CLICK_BATCH_SIZE` | `400` |
//! | `CLICK_FLUSH_INTERVAL_MS` | `250` |
//! | `DB_MAX_CONNECTIONS` | `1` |
//! | `DB_CONNECT_TIMEOUT` | `30` (seconds) |

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::domain::click_worker::WorkerSettings;
use crate::infrastructure::persistence::MAX_BATCH_SLUGS;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    /// Public base URL for short links. When unset, short URLs are built
    /// from the request `Host` header.
    pub base_url: Option<String>,
    pub log_level: String,
    pub log_format: String,
    /// When true, rate limiting reads client IP from X-Forwarded-For / X-Real-IP headers.
    /// Enable only when the service is behind a trusted reverse proxy.
    pub behind_proxy: bool,

    // ── Click aggregation ───────────────────────────────────────────────────
    /// When false, every click is written synchronously.
    pub click_worker_enabled: bool,
    pub click_queue_capacity: usize,
    pub click_batch_size: usize,
    pub click_flush_interval_ms: u64,

    // ── PgPool settings ─────────────────────────────────────────────────────
    /// Maximum number of connections in the pool (`DB_MAX_CONNECTIONS`, default: 1).
    pub db_max_connections: u32,
    /// Timeout for acquiring a connection from the pool in seconds
    /// (`DB_CONNECT_TIMEOUT`, default: 30).
    pub db_connect_timeout: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required database configuration is missing or a
    /// numeric or boolean variable does not parse.
    pub fn from_env() -> Result<Self> {
        let database_url =
            Self::load_database_url().context("Failed to load database configuration")?;

        let listen_addr = env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let base_url = env::var("BASE_URL").ok().filter(|v| !v.trim().is_empty());
        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        Ok(Self {
            database_url,
            listen_addr,
            base_url,
            log_level,
            log_format,
            behind_proxy: env_flag("BEHIND_PROXY", false)?,
            click_worker_enabled: env_flag("CLICK_WORKER_ENABLED", true)?,
            click_queue_capacity: env_parse("CLICK_QUEUE_CAPACITY", 8192)?,
            click_batch_size: env_parse("CLICK_BATCH_SIZE", 400)?,
            click_flush_interval_ms: env_parse("CLICK_FLUSH_INTERVAL_MS", 250)?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 1)?,
            db_connect_timeout: env_parse("DB_CONNECT_TIMEOUT", 30)?,
        })
    }

    /// `DATABASE_URL` if set, otherwise a URL built from the `DB_*` parts.
    fn load_database_url() -> Result<String> {
        if let Ok(url) = env::var("DATABASE_URL") {
            return Ok(url);
        }

        let required = |key: &str| {
            env::var(key).with_context(|| format!("{key} is required without DATABASE_URL"))
        };
        let user = required("DB_USER")?;
        let password = required("DB_PASSWORD")?;
        let name = required("DB_NAME")?;
        let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port: u16 = env_parse("DB_PORT", 5432)?;

        let mut url = Url::parse(&format!("postgres://{host}"))
            .with_context(|| format!("DB_HOST is not a valid host: '{host}'"))?;
        url.set_path(&format!("/{name}"));
        url.set_port(Some(port))
            .and_then(|_| url.set_username(&user))
            .and_then(|_| url.set_password(Some(&password)))
            .map_err(|_| anyhow::anyhow!("DB_HOST cannot carry credentials: '{host}'"))?;

        Ok(url.to_string())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `click_queue_capacity` is outside `1..=1_000_000`
    /// - `click_batch_size` is zero or larger than one batch statement can carry
    /// - `click_flush_interval_ms` is below 10
    /// - `log_format` is not `text` or `json`
    /// - `listen_addr` or `base_url` is malformed
    pub fn validate(&self) -> Result<()> {
        if self.click_queue_capacity == 0 {
            anyhow::bail!("CLICK_QUEUE_CAPACITY must be at least 1");
        }

        if self.click_queue_capacity > 1_000_000 {
            anyhow::bail!(
                "CLICK_QUEUE_CAPACITY is too large (max: 1000000), got {}",
                self.click_queue_capacity
            );
        }

        if self.click_batch_size == 0 {
            anyhow::bail!("CLICK_BATCH_SIZE must be at least 1");
        }

        if self.click_batch_size > MAX_BATCH_SLUGS {
            anyhow::bail!(
                "CLICK_BATCH_SIZE is too large (max: {}), got {}",
                MAX_BATCH_SLUGS,
                self.click_batch_size
            );
        }

        if self.click_flush_interval_ms < 10 {
            anyhow::bail!(
                "CLICK_FLUSH_INTERVAL_MS must be at least 10, got {}",
                self.click_flush_interval_ms
            );
        }

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            anyhow::bail!(
                "DATABASE_URL must start with 'postgres://' or 'postgresql://', got '{}'",
                mask_connection_string(&self.database_url)
            );
        }

        if let Some(ref base_url) = self.base_url {
            let parsed = Url::parse(base_url)
                .with_context(|| format!("BASE_URL is not a valid URL: '{}'", base_url))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("BASE_URL must use http or https, got '{}'", base_url);
            }
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.db_connect_timeout == 0 {
            anyhow::bail!("DB_CONNECT_TIMEOUT must be greater than 0");
        }

        Ok(())
    }

    /// Aggregation worker tuning derived from the click settings.
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            batch_size: self.click_batch_size,
            flush_interval: Duration::from_millis(self.click_flush_interval_ms),
            queue_capacity: self.click_queue_capacity,
        }
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Database: {}", mask_connection_string(&self.database_url));
        tracing::info!(
            "  Database pool: {} connection(s), {}s acquire timeout",
            self.db_max_connections,
            self.db_connect_timeout
        );
        match &self.base_url {
            Some(base_url) => tracing::info!("  Base URL: {}", base_url),
            None => tracing::info!("  Base URL: from request Host header"),
        }
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!("  Behind proxy: {}", self.behind_proxy);

        if self.click_worker_enabled {
            tracing::info!(
                "  Click aggregation: enabled (queue {}, batch {}, interval {}ms)",
                self.click_queue_capacity,
                self.click_batch_size,
                self.click_flush_interval_ms
            );
        } else {
            tracing::info!("  Click aggregation: disabled (synchronous writes)");
        }
    }
}

/// Parses `key` when set, `default` otherwise.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

/// Accepts `true`/`false`/`1`/`0`, case-insensitively.
fn env_flag(key: &str, default: bool) -> Result<bool> {
    let Ok(raw) = env::var(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => anyhow::bail!("{key} must be 'true' or 'false', got '{raw}'"),
    }
}

/// Hides the password of a connection URL, for logs and error messages.
fn mask_connection_string(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

/// Reads the process environment into a validated [`Config`].
///
/// `.env` loading is left to the binary.
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
