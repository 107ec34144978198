//! The explicit context every pipeline operation runs against.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::contract::{BlobStore, SourceControl, StyleCompiler};
use crate::error::{PipelineError, PipelineResult};

/// Collaborators plus configuration, built once at startup and shared by
/// every request.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub store: Arc<dyn BlobStore>,
    pub compiler: Arc<dyn StyleCompiler>,
    pub source_control: Arc<dyn SourceControl>,
    /// Held while the variables file is rewritten and compiled.
    pub(crate) compile_lock: Mutex<()>,
    /// Held across the manifest read-modify-write.
    pub(crate) manifest_lock: Mutex<()>,
}

impl PipelineContext {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn BlobStore>,
        compiler: Arc<dyn StyleCompiler>,
        source_control: Arc<dyn SourceControl>,
    ) -> Self {
        PipelineContext {
            config,
            store,
            compiler,
            source_control,
            compile_lock: Mutex::new(()),
            manifest_lock: Mutex::new(()),
        }
    }
}

/// Run `fut` for at most `after`, mapping the collaborator error into
/// [`PipelineError`] and an elapsed deadline into [`PipelineError::Timeout`].
pub(crate) async fn bounded<T, E, F>(
    operation: &'static str,
    after: Duration,
    fut: F,
) -> PipelineResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<PipelineError>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            warn!(operation, ?after, "External call timed out");
            Err(PipelineError::Timeout { operation, after })
        }
    }
}
