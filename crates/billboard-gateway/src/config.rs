use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "BILLBOARD_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "BILLBOARD_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "BILLBOARD_MYSQL_DSN";
pub const SEED_FILE_ENV: &str = "BILLBOARD_SEED_FILE";
pub const REDIS_URL_ENV: &str = "BILLBOARD_REDIS_URL";
pub const TENANTS_FILE_ENV: &str = "BILLBOARD_TENANTS_FILE";
pub const RECENT_WINDOW_ENV: &str = "BILLBOARD_RECENT_WINDOW";
pub const RECENCY_TTL_ENV: &str = "BILLBOARD_RECENCY_TTL_SECS";
pub const REFRESH_INTERVAL_ENV: &str = "BILLBOARD_REFRESH_INTERVAL_SECS";
pub const SHORTLINK_TTL_ENV: &str = "BILLBOARD_SHORTLINK_TTL_SECS";
pub const SHORTLINK_MISSING_TTL_ENV: &str = "BILLBOARD_SHORTLINK_MISSING_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "BILLBOARD_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "billboard-gateway")]
pub struct Config {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// JSON seed for the in-memory backend.
    #[arg(long, env = SEED_FILE_ENV)]
    pub seed_file: Option<PathBuf>,

    /// Shared Redis for recency windows and the second shortlink tier.
    /// Without it both live in process.
    #[arg(long, env = REDIS_URL_ENV)]
    pub redis_url: Option<String>,

    #[arg(long, env = TENANTS_FILE_ENV)]
    pub tenants_file: Option<PathBuf>,

    #[arg(long, env = RECENT_WINDOW_ENV, default_value_t = 5)]
    pub recent_window: usize,

    #[arg(long, env = RECENCY_TTL_ENV, default_value_t = 6 * 60 * 60)]
    pub recency_ttl_secs: u64,

    #[arg(long, env = REFRESH_INTERVAL_ENV, default_value_t = 5 * 60)]
    pub refresh_interval_secs: u64,

    #[arg(long, env = SHORTLINK_TTL_ENV, default_value_t = 24 * 60 * 60)]
    pub shortlink_ttl_secs: u64,

    #[arg(long, env = SHORTLINK_MISSING_TTL_ENV, default_value_t = 4 * 60)]
    pub shortlink_missing_ttl_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn recency_ttl(&self) -> Duration {
        Duration::from_secs(self.recency_ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn shortlink_ttl(&self) -> Duration {
        Duration::from_secs(self.shortlink_ttl_secs)
    }

    pub fn shortlink_missing_ttl(&self) -> Duration {
        Duration::from_secs(self.shortlink_missing_ttl_secs)
    }
}
