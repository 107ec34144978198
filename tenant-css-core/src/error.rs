//! Error types for every seam and the pipelines built on top of them.
//!
//! Each collaborator trait in [`crate::contract`] returns its own error enum.
//! The pipelines fold those into [`PipelineError`] so callers can tell a
//! storage outage from a compiler failure or a corrupt manifest.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by a [`crate::contract::BlobStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("storage request for {bucket}/{key} failed with status {status}: {message}")]
    Status {
        bucket: String,
        key: String,
        status: u16,
        message: String,
    },

    #[error("storage transport error: {0}")]
    Transport(String),

    #[error("storage i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot presign {key}: {reason}")]
    Presign { key: String, reason: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Failure reported by a [`crate::contract::StyleCompiler`].
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("sass compilation failed for {entry}: {message}")]
    Sass { entry: PathBuf, message: String },

    #[error("compiler task aborted: {0}")]
    Aborted(String),
}

/// Failure reported by a [`crate::contract::SourceControl`] reader.
#[derive(Debug, Error)]
pub enum SourceControlError {
    #[error("source control returned status {status} for {path}@{reference}")]
    Status {
        path: String,
        reference: String,
        status: u16,
    },

    #[error("source control transport error: {0}")]
    Transport(String),

    #[error("unexpected directory listing for {path}: {message}")]
    Listing { path: String, message: String },
}

/// Unified result type of every pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    SourceControl(#[from] SourceControlError),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The manifest exists but cannot be parsed. Needs manual repair.
    #[error("manifest at {location} is malformed: {source}")]
    MalformedManifest {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    /// The artifact file name is not a single plain path segment.
    #[error("invalid artifact file name {name:?}: {reason}")]
    InvalidArtifactName { name: String, reason: &'static str },

    #[error("local i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether running the same operation again may succeed without
    /// operator intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Storage(e) => !e.is_not_found(),
            PipelineError::SourceControl(_) | PipelineError::Timeout { .. } => true,
            PipelineError::Compile(_)
            | PipelineError::MalformedManifest { .. }
            | PipelineError::InvalidArtifactName { .. }
            | PipelineError::Io { .. } => false,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
