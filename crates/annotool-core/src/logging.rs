//! Structured logging vocabulary for annotool.
//!
//! Every crate logs with `tracing` using the same field names: `subsystem`,
//! `component`, `op`, `entity`, `entity_id`, `video_id`, `series_ext_id`,
//! `user_id`, `duration_ms`, `result_count`, `error`. The values for
//! `subsystem` and `component` come from the constants below so log queries
//! can rely on them.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed at the top level, requires operator attention |
//! | WARN  | Recoverable anomaly, processing continued |
//! | INFO  | Lifecycle events, completed multi-row operations |
//! | DEBUG | Decision points (link, skip, clone) and single-row writes |
//! | TRACE | Per-item iteration |

// ─── Subsystems ────────────────────────────────────────────────────────────

/// PostgreSQL persistence layer.
pub const SUBSYSTEM_DB: &str = "database";

/// Resource lifecycle and hierarchy engine.
pub const SUBSYSTEM_ENGINE: &str = "engine";

/// Operator command line.
pub const SUBSYSTEM_CLI: &str = "cli";

// ─── Components ────────────────────────────────────────────────────────────

/// Connection pool.
pub const COMPONENT_POOL: &str = "pool";

/// Audit-stamping CRUD.
pub const COMPONENT_RESOURCES: &str = "resources";

/// Cascading soft delete.
pub const COMPONENT_CASCADE: &str = "cascade";

/// Template cloning.
pub const COMPONENT_CLONER: &str = "cloner";

/// Series master reconciliation.
pub const COMPONENT_SERIES: &str = "series_sync";

/// Service façade and access guards.
pub const COMPONENT_SERVICE: &str = "service";

/// Operator commands.
pub const COMPONENT_COMMANDS: &str = "commands";
