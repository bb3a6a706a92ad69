use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Read `var`, falling back to `default` when unset, and parse it.
pub(crate) fn env_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Upload staging configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory where multipart files are written before gateway upload.
    pub tmp_dir: PathBuf,
    /// Deadline for a single gateway upload or delete.
    pub timeout: Duration,
    /// Largest accepted single file, in bytes.
    pub max_file_bytes: u64,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`, long enough for uploads).
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests after a shutdown signal (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Whether session cookies carry the `Secure` attribute (default: `true`).
    pub cookie_secure: bool,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Upload staging (temp dir, gateway timeout, size cap).
    pub upload: UploadConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                      |
    /// |------------------------|------------------------------|
    /// | `HOST`                 | `0.0.0.0`                    |
    /// | `PORT`                 | `8000`                       |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`      |
    /// | `REQUEST_TIMEOUT_SECS` | `300`                        |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                         |
    /// | `COOKIE_SECURE`        | `true`                       |
    /// | `UPLOAD_TMP_DIR`       | `<system temp>/vidshare`     |
    /// | `UPLOAD_TIMEOUT_SECS`  | `120`                        |
    /// | `MAX_UPLOAD_BYTES`     | `524288000` (500 MiB)        |
    ///
    /// JWT variables are documented on [`JwtConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 8000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 300)?;
        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", 30)?;
        let cookie_secure: bool = env_or("COOKIE_SECURE", true)?;

        let tmp_dir = std::env::var("UPLOAD_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("vidshare"));
        let upload_timeout_secs: u64 = env_or("UPLOAD_TIMEOUT_SECS", 120)?;
        let max_file_bytes: u64 = env_or("MAX_UPLOAD_BYTES", 500 * 1024 * 1024)?;

        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            cookie_secure,
            jwt,
            upload: UploadConfig {
                tmp_dir,
                timeout: Duration::from_secs(upload_timeout_secs),
                max_file_bytes,
            },
        })
    }
}
