//! Resolution lookup: which stylesheet a tenant gets.
//!
//! Precedence is program → experience → domain default; the first candidate
//! present in the CSS bucket wins.

use tracing::{debug, info};

use crate::context::{bounded, PipelineContext};
use crate::descriptor::normalize_domain;
use crate::error::PipelineResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub domain: String,
    pub program_id: String,
    pub experience_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found { key: String, url: String },
    NotFound,
}

/// Candidate file names in precedence order. A domain without a configured
/// default yields only two candidates.
pub fn candidate_file_names(ctx: &PipelineContext, request: &ResolutionRequest) -> Vec<String> {
    let domain = normalize_domain(&request.domain);
    let mut candidates = vec![
        format!("{domain}-program-{}.css", request.program_id),
        format!("{domain}-experience-{}.css", request.experience_id),
    ];
    if let Some(default) = ctx.config.default_file_for(&request.domain) {
        candidates.push(default.to_string());
    }
    candidates
}

/// URL handed out for the artifact at `key`: presigned or public, per
/// [`crate::config::UrlConfig`].
pub fn artifact_url(ctx: &PipelineContext, key: &str) -> PipelineResult<String> {
    let cfg = &ctx.config;
    if cfg.urls.use_signed_url {
        Ok(ctx
            .store
            .presign_get(&cfg.css_bucket, key, cfg.urls.signed_url_ttl())?)
    } else {
        Ok(format!(
            "{}/{}",
            cfg.urls.public_base_url.trim_end_matches('/'),
            key
        ))
    }
}

pub async fn resolve(ctx: &PipelineContext, request: &ResolutionRequest) -> PipelineResult<Resolution> {
    let cfg = &ctx.config;

    for file_name in candidate_file_names(ctx, request) {
        let key = cfg.artifact_key(&file_name);
        let exists = bounded(
            "storage.head",
            cfg.timeouts.storage(),
            ctx.store.head(&cfg.css_bucket, &key),
        )
        .await?;
        if !exists {
            debug!(key = %key, "[RESOLVE] Candidate missing");
            continue;
        }

        let url = artifact_url(ctx, &key)?;
        info!(domain = %request.domain, key = %key, "[RESOLVE] Resolved stylesheet");
        return Ok(Resolution::Found { key, url });
    }

    info!(
        domain = %request.domain,
        program_id = %request.program_id,
        experience_id = %request.experience_id,
        "[RESOLVE] No stylesheet found"
    );
    Ok(Resolution::NotFound)
}
