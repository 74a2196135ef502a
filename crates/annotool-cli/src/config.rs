//! Operator configuration read from the environment.
//!
//! Environment variables:
//!   DATABASE_URL             - Postgres connection string (required)
//!   DB_MAX_CONNECTIONS       - pool size upper bound
//!   DB_MIN_CONNECTIONS       - idle connections kept open
//!   DB_CONNECT_TIMEOUT_SECS  - acquire timeout
//!   DB_IDLE_TIMEOUT_SECS     - idle connection timeout
//!   LOG_FORMAT               - "json" or "text" (default: "text")
//!   LOG_FILE                 - path to log file (optional, enables file logging)
//!   LOG_ANSI                 - "true"/"false" override ANSI colors
//!   ANNOTOOL_OPERATOR        - external id of the operator user (default: "admin")

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use annotool_core::{defaults, Error, Result};
use annotool_db::PoolConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::Config(format!(
                "LOG_FORMAT must be \"text\" or \"json\", got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    /// `None` means auto-detect on the console and no colors in files.
    pub ansi: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub pool: PoolConfig,
    pub log: LogConfig,
    pub operator_ext_id: String,
}

impl Config {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which returns the value of an
    /// environment variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url =
            var("DATABASE_URL").ok_or_else(|| Error::Config("DATABASE_URL is not set".into()))?;

        let mut pool = PoolConfig::new();
        if let Some(n) = parse_var::<u32>("DB_MAX_CONNECTIONS", var("DB_MAX_CONNECTIONS"))? {
            pool = pool.max_connections(n);
        }
        if let Some(n) = parse_var::<u32>("DB_MIN_CONNECTIONS", var("DB_MIN_CONNECTIONS"))? {
            pool = pool.min_connections(n);
        }
        if let Some(secs) =
            parse_var::<u64>("DB_CONNECT_TIMEOUT_SECS", var("DB_CONNECT_TIMEOUT_SECS"))?
        {
            pool = pool.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64>("DB_IDLE_TIMEOUT_SECS", var("DB_IDLE_TIMEOUT_SECS"))? {
            pool = pool.idle_timeout(Duration::from_secs(secs));
        }

        let format = match var("LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => LogFormat::default(),
        };
        let ansi = match var("LOG_ANSI") {
            Some(v) => Some(parse_bool("LOG_ANSI", &v)?),
            None => None,
        };

        Ok(Self {
            database_url,
            pool,
            log: LogConfig {
                format,
                file: var("LOG_FILE").map(PathBuf::from),
                ansi,
            },
            operator_ext_id: var("ANNOTOOL_OPERATOR")
                .unwrap_or_else(|| defaults::OPERATOR_EXT_ID.to_string()),
        })
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", key, v)))
        })
        .transpose()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be true or false, got {:?}",
            key, value
        ))),
    }
}
