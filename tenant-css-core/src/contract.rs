//! # contract: seams to the outside world
//!
//! The pipelines never talk to object storage, the SASS compiler or source
//! control directly. They go through the three traits defined here:
//!
//! - [`BlobStore`]: key/value object storage with `put`/`get`/`head`/`list`
//!   and presigned read URLs.
//! - [`StyleCompiler`]: turns a SASS source tree into one CSS blob.
//! - [`SourceControl`]: reads directory listings and file contents at a ref.
//!
//! ## Mocking & Testing
//! Every trait is annotated for `mockall`; the generated `Mock*` types are
//! exported when the `test-export-mocks` feature is enabled (the default) so
//! the binary crate's tests can use them too.
//!
//! ## Implementations
//! - [`crate::storage::LocalBlobStore`] and [`crate::compiler::GrassCompiler`]
//!   live in this crate.
//! - The S3 and GitHub clients live in the `tenant-css` binary crate.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{CompileError, SourceControlError, StoreError};

/// Object metadata applied on upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    /// Grant anonymous read access to the object.
    pub public_read: bool,
}

impl PutOptions {
    /// Options for a compiled stylesheet: served as CSS, never cached by the
    /// CDN, readable by anyone.
    pub fn public_css() -> Self {
        PutOptions {
            content_type: Some("text/css".to_string()),
            cache_control: Some("max-age=0".to_string()),
            public_read: true,
        }
    }
}

/// Key/value object storage spanning several buckets.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `body` at `bucket/key`, replacing any existing object.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        options: PutOptions,
    ) -> Result<(), StoreError>;

    /// Fetch an object. A missing object is [`StoreError::NotFound`].
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Whether an object exists at `bucket/key`.
    async fn head(&self, bucket: &str, key: &str) -> Result<bool, StoreError>;

    /// All keys in `bucket` starting with `prefix`.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// A time-limited URL granting read access to `bucket/key`.
    fn presign_get(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, StoreError>;
}

/// The two variables injected into every compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleVariables {
    /// Value of `$primary`, e.g. `#ffe600`.
    pub primary: String,
    /// Path used inside `$cardImage: url('...')`.
    pub card_image: String,
}

impl StyleVariables {
    /// Contents of the variables file. Exactly two declarations.
    pub fn render(&self) -> String {
        format!(
            "$primary: {};$cardImage: url('{}');",
            self.primary, self.card_image
        )
    }
}

/// One compile invocation. The variables file has already been written into
/// `source_dir` when the compiler sees this request.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub source_dir: &'a Path,
    /// File name of the entry stylesheet inside `source_dir`.
    pub entry: &'a str,
    pub variables: &'a StyleVariables,
}

/// Converts a SASS source tree into CSS text.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StyleCompiler: Send + Sync {
    async fn compile<'a>(&self, req: CompileRequest<'a>) -> Result<String, CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One element of a source-control directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>) -> Self {
        DirectoryEntry {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        DirectoryEntry {
            name: name.into(),
            kind: EntryKind::Dir,
        }
    }
}

/// Read-only access to a hosted repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Entries of the directory at `path` on `reference`.
    async fn list_directory(
        &self,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirectoryEntry>, SourceControlError>;

    /// Raw content of the file at `path` on `reference`.
    async fn read_file(&self, path: &str, reference: &str)
        -> Result<Vec<u8>, SourceControlError>;
}
