//! # annotool-engine
//!
//! Resource lifecycle and hierarchy management for annotool.
//!
//! This crate provides:
//! - [`ResourceStore`]: CRUD that stamps the audit envelope
//! - [`HierarchyCascade`]: soft delete down the ownership tree
//! - [`TemplateCloner`]: video-local copies of template scales and categories
//! - [`SeriesSync`]: reconciliation of a video against a series' masters
//! - [`AnnotationService`]: the guarded façade callers use
//! - [`memory::MemoryStore`]: an in-memory [`annotool_core::Store`] for tests
//!
//! The engine only talks to the [`annotool_core::Store`] trait and never to a
//! concrete database.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use annotool_core::{Capability, FixedVideoInterface, Video};
//! use annotool_engine::{memory::MemoryStore, AnnotationService};
//!
//! let service = AnnotationService::new(
//!     MemoryStore::new(),
//!     Arc::new(FixedVideoInterface::new(Capability::Admin)),
//! );
//! let admin = service.resolve_user("admin", None, None).await?;
//! let video = service.create_video(&admin, Video::new("lecture1")).await?;
//! ```

pub mod cascade;
pub mod cloner;
pub mod memory;
pub mod resources;
pub mod series;
pub mod service;

pub use cascade::HierarchyCascade;
pub use cloner::TemplateCloner;
pub use resources::ResourceStore;
pub use series::{sufficiently_equal, SeriesSync, SyncReport};
pub use service::{AnnotationService, Stored};
