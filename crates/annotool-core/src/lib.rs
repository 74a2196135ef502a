//! # annotool-core
//!
//! Core types, traits, and abstractions for the annotool annotation backend.
//!
//! This crate provides the resource envelope shared by every entity, the
//! entity models, the error taxonomy, tag filtering, the access gate, and the
//! repository traits that storage backends implement.

pub mod access;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod resource;
pub mod tags;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use access::{has_access, Capability};
pub use error::{Error, Result};
pub use models::*;
pub use resource::{Access, Entity, EntityKind, Resource, Tags};
pub use tags::{filter_by_tags, TagFilter, TagMatch};
pub use traits::*;
pub use uuid_utils::{is_v7, new_v7};
