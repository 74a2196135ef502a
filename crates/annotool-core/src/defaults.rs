//! Centralized default constants for annotool.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// DATABASE POOL
// =============================================================================

/// Default maximum number of connections in the pool.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Default minimum number of idle connections kept open.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Default connection acquire timeout in seconds.
pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default maximum connection lifetime in seconds (30 minutes).
pub const DB_MAX_LIFETIME_SECS: u64 = 1800;

// =============================================================================
// PAGINATION
// =============================================================================

/// Upper bound applied to any requested list limit.
pub const PAGE_LIMIT_MAX: i64 = 10_000;

// =============================================================================
// OPERATOR / LOGGING
// =============================================================================

/// External id of the user operator tooling acts as.
pub const OPERATOR_EXT_ID: &str = "admin";

/// Default `RUST_LOG` filter for the CLI.
pub const LOG_FILTER: &str = "annotool=info,annotool_engine=info,annotool_db=info";
