use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let pipeline = PipelineConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// South African mobile prefixes accepted by default. The reserved gap at
/// 069 and the fixed-line lookalikes (070, 075, 077, 080) are excluded.
pub const DEFAULT_MOBILE_PREFIXES: &[&str] = &[
    "060", "061", "062", "063", "064", "065", "066", "067", "068", "071", "072", "073", "074",
    "076", "078", "079", "081", "082", "083", "084",
];

/// Tuning knobs for the upload pipeline: worker-pool width, the row-count
/// thresholds that place a job in a priority tier, and the mobile-prefix
/// allow-list. Passed by value into the queue and validator so tests can
/// vary them without touching the process environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of uploads allowed in the `Processing` state at once.
    pub workers: usize,
    /// Uploads with at most this many rows are scheduled as small.
    pub small_job_rows: u64,
    /// Uploads with at most this many rows are scheduled as medium;
    /// anything larger (or of unknown size) is scheduled as large.
    pub medium_job_rows: u64,
    /// Three-digit mobile prefixes accepted after normalization.
    pub mobile_prefixes: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            small_job_rows: 500,
            medium_job_rows: 5_000,
            mobile_prefixes: DEFAULT_MOBILE_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let workers = match env::var("APP_WORKERS") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidWorkerCount)?,
            Err(_) => defaults.workers,
        };

        let small_job_rows = parse_row_threshold("APP_SMALL_JOB_ROWS", defaults.small_job_rows)?;
        let medium_job_rows = parse_row_threshold("APP_MEDIUM_JOB_ROWS", defaults.medium_job_rows)?;
        if medium_job_rows < small_job_rows {
            return Err(ConfigError::InvalidRowThreshold {
                variable: "APP_MEDIUM_JOB_ROWS",
            });
        }

        let mobile_prefixes = match env::var("APP_MOBILE_PREFIXES") {
            Ok(raw) => {
                let prefixes: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|prefix| !prefix.is_empty())
                    .map(str::to_string)
                    .collect();
                if prefixes.is_empty()
                    || prefixes
                        .iter()
                        .any(|p| p.len() != 3 || !p.chars().all(|c| c.is_ascii_digit()))
                {
                    return Err(ConfigError::InvalidMobilePrefixes);
                }
                prefixes
            }
            Err(_) => defaults.mobile_prefixes,
        };

        Ok(Self {
            workers,
            small_job_rows,
            medium_job_rows,
            mobile_prefixes,
        })
    }
}

fn parse_row_threshold(variable: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|rows| *rows > 0)
            .ok_or(ConfigError::InvalidRowThreshold { variable }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWorkerCount,
    InvalidRowThreshold { variable: &'static str },
    InvalidMobilePrefixes,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWorkerCount => {
                write!(f, "APP_WORKERS must be a positive integer")
            }
            ConfigError::InvalidRowThreshold { variable } => {
                write!(
                    f,
                    "{variable} must be a positive integer no smaller than the lower tier"
                )
            }
            ConfigError::InvalidMobilePrefixes => {
                write!(
                    f,
                    "APP_MOBILE_PREFIXES must be a comma-separated list of 3-digit prefixes"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_WORKERS");
        env::remove_var("APP_SMALL_JOB_ROWS");
        env::remove_var("APP_MEDIUM_JOB_ROWS");
        env::remove_var("APP_MOBILE_PREFIXES");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.pipeline.small_job_rows, 500);
        assert!(config
            .pipeline
            .mobile_prefixes
            .iter()
            .any(|prefix| prefix == "082"));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn pipeline_env_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_WORKERS", "4");
        env::set_var("APP_SMALL_JOB_ROWS", "100");
        env::set_var("APP_MEDIUM_JOB_ROWS", "1000");
        env::set_var("APP_MOBILE_PREFIXES", "082, 083");
        let pipeline = PipelineConfig::from_env().expect("pipeline config loads");
        assert_eq!(pipeline.workers, 4);
        assert_eq!(pipeline.small_job_rows, 100);
        assert_eq!(pipeline.medium_job_rows, 1000);
        assert_eq!(pipeline.mobile_prefixes, vec!["082", "083"]);
        reset_env();
    }

    #[test]
    fn rejects_zero_workers_and_inverted_tiers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_WORKERS", "0");
        assert!(matches!(
            PipelineConfig::from_env(),
            Err(ConfigError::InvalidWorkerCount)
        ));
        reset_env();

        env::set_var("APP_SMALL_JOB_ROWS", "1000");
        env::set_var("APP_MEDIUM_JOB_ROWS", "10");
        assert!(matches!(
            PipelineConfig::from_env(),
            Err(ConfigError::InvalidRowThreshold { .. })
        ));
        reset_env();
    }
}
