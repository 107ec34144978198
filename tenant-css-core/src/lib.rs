#![doc = "tenant-css-core: pipelines for per-tenant CSS publishing and resolution."]

//! This crate holds the business logic of the tenant stylesheet service:
//! publishing one artifact, republishing everything in the manifest,
//! resolving which artifact a tenant gets, and syncing the SASS tree with
//! source control.
//!
//! Object storage, the SASS compiler and source control are reached only
//! through the traits in [`contract`]. Network clients live in the
//! `tenant-css` binary crate.
//!
//! # Navigation
//! - Entrypoints: [`publish::publish`], [`republish::republish_all`],
//!   [`resolve::resolve`], [`sync::sync_and_republish`],
//!   [`sources::refresh_sources`]
//! - Shared state: [`context::PipelineContext`]

pub mod compiler;
pub mod config;
pub mod context;
pub mod contract;
pub mod descriptor;
pub mod error;
pub mod manifest;
pub mod publish;
pub mod republish;
pub mod resolve;
pub mod sources;
pub mod storage;
pub mod sync;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use descriptor::ArtifactDescriptor;
pub use error::{PipelineError, PipelineResult};
