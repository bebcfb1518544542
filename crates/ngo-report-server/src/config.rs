//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/ngo_reports";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Default delay between queue polls when the queue is empty.
pub const DEFAULT_WORKER_POLL_INTERVAL_MS: u64 = 500;

/// Default lease on a dequeued batch before it becomes visible again.
pub const DEFAULT_WORKER_VISIBILITY_TIMEOUT_SECS: u64 = 300;

/// Default number of deliveries of one batch before the worker gives up on it.
pub const DEFAULT_WORKER_MAX_ATTEMPTS: i32 = 3;

/// Default delay before a failed batch is offered again; grows with each attempt.
pub const DEFAULT_WORKER_RETRY_BACKOFF_MS: u64 = 1_000;

/// Default number of rows between progress writes to the job record.
pub const DEFAULT_WORKER_PROGRESS_INTERVAL: usize = 100;

/// Default maximum accepted upload body (10 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub worker: WorkerConfig,
    pub upload: UploadConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Import worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Run the import worker inside the server process (`RUN_WORKER`)
    pub enabled: bool,
    pub poll_interval_ms: u64,
    pub visibility_timeout_secs: u64,
    pub progress_interval: usize,
    pub max_attempts: i32,
    pub retry_backoff_ms: u64,
}

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("NGO_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("NGO_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or("NGO_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_or("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            worker: WorkerConfig {
                enabled: env_or("RUN_WORKER", false),
                poll_interval_ms: env_or("WORKER_POLL_INTERVAL_MS", DEFAULT_WORKER_POLL_INTERVAL_MS),
                visibility_timeout_secs: env_or(
                    "WORKER_VISIBILITY_TIMEOUT_SECS",
                    DEFAULT_WORKER_VISIBILITY_TIMEOUT_SECS,
                ),
                progress_interval: env_or("WORKER_PROGRESS_INTERVAL", DEFAULT_WORKER_PROGRESS_INTERVAL),
                max_attempts: env_or("WORKER_MAX_ATTEMPTS", DEFAULT_WORKER_MAX_ATTEMPTS),
                retry_backoff_ms: env_or("WORKER_RETRY_BACKOFF_MS", DEFAULT_WORKER_RETRY_BACKOFF_MS),
            },
            upload: UploadConfig {
                max_bytes: env_or("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.worker.progress_interval == 0 {
            anyhow::bail!("Worker progress_interval must be greater than 0");
        }

        if self.worker.max_attempts < 1 {
            anyhow::bail!("Worker max_attempts must be at least 1");
        }

        if self.worker.visibility_timeout_secs == 0 {
            anyhow::bail!("Worker visibility_timeout_secs must be greater than 0");
        }

        if self.upload.max_bytes == 0 {
            anyhow::bail!("Upload max_bytes must be greater than 0");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            worker: WorkerConfig::default(),
            upload: UploadConfig {
                max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            },
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: DEFAULT_WORKER_POLL_INTERVAL_MS,
            visibility_timeout_secs: DEFAULT_WORKER_VISIBILITY_TIMEOUT_SECS,
            progress_interval: DEFAULT_WORKER_PROGRESS_INTERVAL,
            max_attempts: DEFAULT_WORKER_MAX_ATTEMPTS,
            retry_backoff_ms: DEFAULT_WORKER_RETRY_BACKOFF_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_connections_above_max_rejected() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let mut config = Config::default();
        config.worker.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_progress_interval_rejected() {
        let mut config = Config::default();
        config.worker.progress_interval = 0;
        assert!(config.validate().is_err());
    }
}
