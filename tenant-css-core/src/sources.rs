//! Pull an environment's SASS tree from the SASS bucket into the local work
//! directory so the compiler sees the latest partials.

use std::path::{Component, Path};

use tracing::{debug, info, warn};

use crate::config::StorageMode;
use crate::context::{bounded, PipelineContext};
use crate::error::{PipelineError, PipelineResult};

/// Download every object under the environment prefix of `domain` into
/// [`crate::config::PipelineConfig::scss_dir`]. Returns the number of files
/// written.
///
/// In local storage mode `config.json` is left alone so the local manifest
/// stays authoritative.
pub async fn refresh_sources(ctx: &PipelineContext, domain: &str) -> PipelineResult<usize> {
    let cfg = &ctx.config;
    let target = cfg.environments.target_for(domain);
    let prefix = format!("{}/", target.sass_prefix.trim_end_matches('/'));
    let scss_dir = cfg.scss_dir();

    info!(domain, environment = %target.name, prefix = %prefix, "[SOURCES] Refreshing SASS tree");
    tokio::fs::create_dir_all(&scss_dir)
        .await
        .map_err(|e| PipelineError::io(&scss_dir, e))?;

    let keys = bounded(
        "storage.list",
        cfg.timeouts.storage(),
        ctx.store.list(&cfg.sass_bucket, &prefix),
    )
    .await?;
    info!(keys = keys.len(), "[SOURCES] Listed SASS objects");

    let mut written = 0;
    for key in keys {
        let Some(relative) = key.strip_prefix(&prefix) else {
            continue;
        };
        if relative.is_empty() || relative.ends_with('/') {
            continue;
        }
        if !Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            warn!(key = %key, "[SOURCES] Skipping key outside the SASS tree");
            continue;
        }
        if cfg.storage_mode == StorageMode::Local && relative == "config.json" {
            debug!(key = %key, "[SOURCES] Keeping local manifest");
            continue;
        }

        // Held across get and write, like the manifest update in publish.
        let _manifest_guard = if relative == "config.json" {
            Some(ctx.manifest_lock.lock().await)
        } else {
            None
        };
        let body = bounded(
            "storage.get",
            cfg.timeouts.storage(),
            ctx.store.get(&cfg.sass_bucket, &key),
        )
        .await?;
        let path = scss_dir.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io(parent, e))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| PipelineError::io(&path, e))?;
        debug!(key = %key, path = %path.display(), "[SOURCES] Wrote SASS file");
        written += 1;
    }

    info!(written, "[SOURCES] SASS tree refreshed");
    Ok(written)
}
