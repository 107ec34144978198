//! Sync-and-republish: replicate source-control stylesheet changes into the
//! SASS bucket and rebuild every artifact when anything drifted.
//!
//! Each file is compared on its own; one unreadable file is reported and
//! does not hide drift found in the others. A failed directory listing
//! aborts the whole check.

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::config::EnvironmentTarget;
use crate::context::{bounded, PipelineContext};
use crate::contract::{DirectoryEntry, EntryKind, PutOptions};
use crate::error::{PipelineError, PipelineResult};
use crate::republish::{republish_all, RepublishReport};

#[derive(Debug)]
pub struct FileSyncFailure {
    pub name: String,
    pub error: PipelineError,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    /// Files whose stored copy was replaced.
    pub changed: Vec<String>,
    pub unchanged: usize,
    pub failures: Vec<FileSyncFailure>,
    /// Present when drift triggered a bulk republish.
    pub republish: Option<RepublishReport>,
}

impl SyncReport {
    pub fn republished(&self) -> bool {
        self.republish.is_some()
    }
}

enum FileOutcome {
    Unchanged,
    Replaced,
}

/// Compare the stylesheet directory on `domain`'s branch with the stored
/// SASS tree, replace drifted files and, if any drifted, republish once.
pub async fn sync_and_republish(ctx: &PipelineContext, domain: &str) -> PipelineResult<SyncReport> {
    let cfg = &ctx.config;
    let target = cfg.environments.target_for(domain);
    info!(
        domain,
        branch = %target.branch,
        prefix = %target.sass_prefix,
        "[SYNC] Checking deployed SASS"
    );

    let listing = bounded(
        "source_control.list_directory",
        cfg.timeouts.source_control(),
        ctx.source_control
            .list_directory(&cfg.sync.directory_path, &target.branch),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Directory listing failed");
        e
    })?;

    let entries: Vec<DirectoryEntry> = listing
        .into_iter()
        .filter(|entry| {
            let excluded = cfg.sync.excluded_entries.iter().any(|x| x == &entry.name);
            if excluded || entry.kind == EntryKind::Dir {
                debug!(name = %entry.name, excluded, "[SYNC] Skipping entry");
                return false;
            }
            true
        })
        .collect();
    info!(files = entries.len(), "[SYNC] Comparing files");

    let comparisons = entries.iter().map(|entry| async move {
        let outcome = sync_file(ctx, target, &entry.name).await;
        (entry.name.clone(), outcome)
    });

    let mut report = SyncReport::default();
    for (name, outcome) in join_all(comparisons).await {
        match outcome {
            Ok(FileOutcome::Replaced) => report.changed.push(name),
            Ok(FileOutcome::Unchanged) => report.unchanged += 1,
            Err(error) => {
                error!(file = %name, error = %error, "[SYNC][ERROR] File comparison failed");
                report.failures.push(FileSyncFailure { name, error });
            }
        }
    }
    report.changed.sort();

    if report.changed.is_empty() {
        info!(unchanged = report.unchanged, "[SYNC] No drift detected");
        return Ok(report);
    }

    info!(changed = ?report.changed, "[SYNC] Drift detected, republishing");
    report.republish = Some(republish_all(ctx, domain).await?);
    Ok(report)
}

async fn sync_file(
    ctx: &PipelineContext,
    target: &EnvironmentTarget,
    name: &str,
) -> PipelineResult<FileOutcome> {
    let cfg = &ctx.config;
    let repo_path = format!("{}/{}", cfg.sync.directory_path.trim_end_matches('/'), name);
    let key = target.sass_key(name);

    let upstream = bounded(
        "source_control.read_file",
        cfg.timeouts.source_control(),
        ctx.source_control.read_file(&repo_path, &target.branch),
    )
    .await?;

    let stored = match bounded(
        "storage.get",
        cfg.timeouts.storage(),
        ctx.store.get(&cfg.sass_bucket, &key),
    )
    .await
    {
        Ok(bytes) => Some(bytes),
        Err(PipelineError::Storage(e)) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    if stored.as_deref() == Some(upstream.as_slice()) {
        return Ok(FileOutcome::Unchanged);
    }

    info!(file = name, key = %key, new = stored.is_none(), "[SYNC] File changed, replacing stored copy");
    bounded(
        "storage.put",
        cfg.timeouts.storage(),
        ctx.store
            .put(&cfg.sass_bucket, &key, upstream, PutOptions::default()),
    )
    .await?;
    Ok(FileOutcome::Replaced)
}
