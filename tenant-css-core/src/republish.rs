//! Bulk republish: recompile every artifact recorded in the manifest.

use tracing::{error, info, warn};

use crate::context::PipelineContext;
use crate::descriptor::ArtifactDescriptor;
use crate::error::PipelineResult;
use crate::manifest::Manifest;
use crate::publish::publish;
use crate::sources::refresh_sources;

#[derive(Debug)]
pub struct RepublishFailure {
    pub descriptor: ArtifactDescriptor,
    pub error: crate::error::PipelineError,
}

#[derive(Debug, Default)]
pub struct RepublishReport {
    pub attempted: usize,
    pub published: usize,
    pub failures: Vec<RepublishFailure>,
}

impl RepublishReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Refresh the SASS tree for `domain`'s environment, then publish every
/// manifest entry one after another.
///
/// Entries run strictly in sequence: they share the variables file and the
/// manifest. A failing entry is recorded and the pass continues; only a
/// failed refresh or an unreadable manifest aborts.
pub async fn republish_all(ctx: &PipelineContext, domain: &str) -> PipelineResult<RepublishReport> {
    info!(domain, "[REPUBLISH] Starting bulk republish");
    refresh_sources(ctx, domain).await?;

    let manifest = Manifest::load(&ctx.config.manifest_path()).await?;
    // Publishing rewrites the manifest file, so walk a snapshot.
    let descriptors: Vec<ArtifactDescriptor> = manifest.descriptors().cloned().collect();
    info!(entries = descriptors.len(), "[REPUBLISH] Loaded manifest");

    let mut report = RepublishReport::default();
    for descriptor in descriptors {
        report.attempted += 1;
        match publish(ctx, &descriptor).await {
            Ok(outcome) => {
                report.published += 1;
                info!(artifact_key = %outcome.artifact_key, "[REPUBLISH] Republished");
            }
            Err(e) => {
                error!(
                    domain = %descriptor.domain,
                    model = %descriptor.model,
                    model_id = %descriptor.model_id,
                    error = %e,
                    "[REPUBLISH][ERROR] Entry failed, continuing"
                );
                report.failures.push(RepublishFailure {
                    descriptor,
                    error: e,
                });
            }
        }
    }

    if report.is_complete() {
        info!(published = report.published, "[REPUBLISH] Complete");
    } else {
        warn!(
            published = report.published,
            failed = report.failures.len(),
            "[REPUBLISH] Finished with failures"
        );
    }
    Ok(report)
}
