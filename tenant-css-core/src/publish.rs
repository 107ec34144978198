//! Publish pipeline: variables → compile → (manifest ∥ upload) for one
//! descriptor.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::compiler::strip_special_comments;
use crate::context::{bounded, PipelineContext};
use crate::contract::{CompileRequest, PutOptions, StyleVariables};
use crate::descriptor::{check_file_name, ArtifactDescriptor};
use crate::error::{PipelineError, PipelineResult};
use crate::manifest::Manifest;

/// What one successful publish produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub file_name: String,
    /// Key of the artifact in the CSS bucket.
    pub artifact_key: String,
    pub bytes: usize,
}

/// The variables injected for `descriptor`.
pub fn style_variables(ctx: &PipelineContext, descriptor: &ArtifactDescriptor) -> StyleVariables {
    StyleVariables {
        primary: descriptor.color.clone(),
        card_image: format!("{}{}", ctx.config.backgrounds_path, descriptor.card),
    }
}

/// Compile and publish one artifact.
///
/// A compile failure returns before the manifest is touched. Once the CSS
/// exists, the manifest update and the upload run concurrently and both are
/// awaited; either failing fails the publish.
pub async fn publish(
    ctx: &PipelineContext,
    descriptor: &ArtifactDescriptor,
) -> PipelineResult<PublishOutcome> {
    let file_name = descriptor.artifact_file_name(ctx.config.legacy_override.as_ref());
    info!(
        domain = %descriptor.domain,
        model = %descriptor.model,
        model_id = %descriptor.model_id,
        file_name = %file_name,
        "[PUBLISH] Starting"
    );

    if let Err(e) = check_file_name(&file_name) {
        error!(file_name = %file_name, error = %e, "[PUBLISH][ERROR] Rejected artifact name");
        return Err(e);
    }

    let css_path = match compile_descriptor(ctx, descriptor, &file_name).await {
        Ok(path) => path,
        Err(e) => {
            error!(file_name = %file_name, error = %e, "[PUBLISH][ERROR] Compile step failed");
            return Err(e);
        }
    };

    let (recorded, uploaded) = futures::join!(
        record_in_manifest(ctx, descriptor),
        upload_artifact(ctx, &css_path, &file_name)
    );
    if let Err(e) = &recorded {
        error!(file_name = %file_name, error = %e, "[PUBLISH][ERROR] Manifest update failed");
    }
    let (artifact_key, bytes) = uploaded.map_err(|e| {
        error!(file_name = %file_name, error = %e, "[PUBLISH][ERROR] Upload failed");
        e
    })?;
    recorded?;

    info!(artifact_key = %artifact_key, bytes, "[PUBLISH] Done");
    Ok(PublishOutcome {
        file_name,
        artifact_key,
        bytes,
    })
}

/// Rewrite the variables file, compile, and write the CSS to the local
/// output directory. Returns the path of the compiled file.
async fn compile_descriptor(
    ctx: &PipelineContext,
    descriptor: &ArtifactDescriptor,
    file_name: &str,
) -> PipelineResult<PathBuf> {
    let cfg = &ctx.config;
    let scss_dir = cfg.scss_dir();
    let variables = style_variables(ctx, descriptor);

    let _guard = ctx.compile_lock.lock().await;

    create_dir(&scss_dir).await?;
    let variables_path = scss_dir.join(&cfg.variables_file);
    tokio::fs::write(&variables_path, variables.render())
        .await
        .map_err(|e| PipelineError::io(&variables_path, e))?;
    info!(path = %variables_path.display(), "[PUBLISH] Wrote custom variables");

    let css = bounded(
        "compiler.compile",
        cfg.timeouts.compiler(),
        ctx.compiler.compile(CompileRequest {
            source_dir: &scss_dir,
            entry: &cfg.entry_stylesheet,
            variables: &variables,
        }),
    )
    .await?;
    let css = strip_special_comments(&css);

    let out_dir = cfg.css_output_dir();
    create_dir(&out_dir).await?;
    let css_path = out_dir.join(file_name);
    tokio::fs::write(&css_path, css.as_bytes())
        .await
        .map_err(|e| PipelineError::io(&css_path, e))?;
    info!(path = %css_path.display(), bytes = css.len(), "[PUBLISH] Compiled");
    Ok(css_path)
}

/// Store `descriptor` in the manifest, persist it locally and mirror the full
/// document to the SASS bucket of the descriptor's environment.
async fn record_in_manifest(
    ctx: &PipelineContext,
    descriptor: &ArtifactDescriptor,
) -> PipelineResult<()> {
    let cfg = &ctx.config;
    let path = cfg.manifest_path();

    let _guard = ctx.manifest_lock.lock().await;
    let mut manifest = Manifest::load(&path).await?;
    manifest.insert(descriptor.clone());
    manifest.save(&path).await?;

    let key = cfg.environments.target_for(&descriptor.domain).manifest_key();
    info!(key = %key, entries = manifest.len(), "[PUBLISH] Uploading manifest");
    bounded(
        "storage.put",
        cfg.timeouts.storage(),
        ctx.store.put(
            &cfg.sass_bucket,
            &key,
            manifest.to_vec(),
            PutOptions {
                content_type: Some("application/json".to_string()),
                ..PutOptions::default()
            },
        ),
    )
    .await
}

/// Read back the compiled file and upload it to the CSS bucket.
async fn upload_artifact(
    ctx: &PipelineContext,
    css_path: &Path,
    file_name: &str,
) -> PipelineResult<(String, usize)> {
    let cfg = &ctx.config;
    let body = tokio::fs::read(css_path)
        .await
        .map_err(|e| PipelineError::io(css_path, e))?;
    let bytes = body.len();
    let key = cfg.artifact_key(file_name);

    info!(bucket = %cfg.css_bucket, key = %key, bytes, "[PUBLISH] Uploading artifact");
    bounded(
        "storage.put",
        cfg.timeouts.storage(),
        ctx.store
            .put(&cfg.css_bucket, &key, body, PutOptions::public_css()),
    )
    .await?;
    Ok((key, bytes))
}

async fn create_dir(dir: &Path) -> PipelineResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::io(dir, e))
}
