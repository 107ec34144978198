//! HTTP surface: a single `/` route answering resolution lookups, deploy
//! checks, publish and republish requests.
//!
//! Responses keep the 200-with-`success` contract the frontends rely on;
//! only malformed requests get a 401. Every pipeline call is awaited before
//! the response is sent.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tenant_css_core::descriptor::check_file_name;
use tenant_css_core::publish::publish;
use tenant_css_core::republish::republish_all;
use tenant_css_core::resolve::{artifact_url, resolve, Resolution, ResolutionRequest};
use tenant_css_core::sources::refresh_sources;
use tenant_css_core::sync::sync_and_republish;
use tenant_css_core::{ArtifactDescriptor, PipelineContext, PipelineError};
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const ALLOWED_METHODS: &str = "POST,GET,OPTIONS";
pub const ALLOWED_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,appkey";

type AppState = Arc<PipelineContext>;

pub fn router(ctx: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handle_get).post(handle_post).options(|| async { StatusCode::OK }),
        )
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
}

/// Bind `0.0.0.0:{port}` and serve until ctrl-c.
pub async fn serve(ctx: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, %addr, "Failed to bind");
        anyhow::anyhow!("Failed to bind to {addr}: {e}")
    })?;
    info!(%addr, "tenant-css listening");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))
}

fn missing_parameters() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": "error", "msg": "missing parameters"})),
    )
        .into_response()
}

fn invalid_post_data() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "err": "invalid post data"})),
    )
        .into_response()
}

fn failure(error: &PipelineError) -> Response {
    (
        StatusCode::OK,
        Json(json!({"success": false, "error": error.to_string()})),
    )
        .into_response()
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

async fn handle_get(
    State(ctx): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.contains_key("deployCheck") {
        return match param(&params, "domain") {
            Some(domain) => deploy_check(&ctx, domain).await,
            None => missing_parameters(),
        };
    }

    let (Some(domain), Some(program_id), Some(experience_id)) = (
        param(&params, "domain"),
        param(&params, "program_id"),
        param(&params, "experience_id"),
    ) else {
        return missing_parameters();
    };
    let request = ResolutionRequest {
        domain: domain.to_string(),
        program_id: program_id.to_string(),
        experience_id: experience_id.to_string(),
    };

    match resolve(&ctx, &request).await {
        Ok(Resolution::Found { url, .. }) => {
            (StatusCode::OK, Json(json!({"success": true, "url": url}))).into_response()
        }
        Ok(Resolution::NotFound) => (
            StatusCode::OK,
            Json(json!({"success": false, "error": "no css file found"})),
        )
            .into_response(),
        Err(e) => {
            error!(domain, error = %e, "[RESOLVE][ERROR] Lookup failed");
            failure(&e)
        }
    }
}

async fn deploy_check(ctx: &PipelineContext, domain: &str) -> Response {
    let report = match sync_and_republish(ctx, domain).await {
        Ok(report) => report,
        Err(e) => {
            error!(domain, error = %e, "[SYNC][ERROR] Deploy check failed");
            return failure(&e);
        }
    };

    let failed: Vec<String> = report
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.name, f.error))
        .collect();
    let republish_failures = report
        .republish
        .as_ref()
        .map_or(0, |r| r.failures.len());
    let mut body = json!({
        "success": failed.is_empty() && republish_failures == 0,
        "republished": report.republished(),
        "changed": report.changed,
    });
    if !failed.is_empty() || republish_failures > 0 {
        body["error"] = json!(format!(
            "{} file(s) could not be compared, {} artifact(s) failed to republish",
            failed.len(),
            republish_failures
        ));
        body["failures"] = json!(failed);
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// A field counts as present when it is a non-empty string or a number.
fn field(body: &Value, name: &str) -> Option<String> {
    match body.get(name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn descriptor_from(body: &Value) -> Option<ArtifactDescriptor> {
    Some(ArtifactDescriptor {
        domain: field(body, "domain")?,
        model: field(body, "model")?,
        model_id: field(body, "model_id")?,
        color: field(body, "color")?,
        card: field(body, "card")?,
        file_name: field(body, "file_name"),
    })
}

async fn handle_post(State(ctx): State<AppState>, body: Bytes) -> Response {
    let Ok(body) = serde_json::from_slice::<Value>(&body) else {
        warn!("Rejected POST with unparsable body");
        return invalid_post_data();
    };

    if let Some(descriptor) = descriptor_from(&body) {
        return publish_one(&ctx, descriptor).await;
    }
    match field(&body, "domain") {
        Some(domain) => republish(&ctx, &domain).await,
        None => {
            warn!("Rejected POST without domain");
            invalid_post_data()
        }
    }
}

async fn publish_one(ctx: &PipelineContext, descriptor: ArtifactDescriptor) -> Response {
    let file_name = descriptor.artifact_file_name(ctx.config.legacy_override.as_ref());
    if let Err(e) = check_file_name(&file_name) {
        warn!(error = %e, "Rejected POST with invalid artifact name");
        return invalid_post_data();
    }
    if let Err(e) = refresh_sources(ctx, &descriptor.domain).await {
        error!(domain = %descriptor.domain, error = %e, "[SOURCES][ERROR] Refresh failed");
        return failure(&e);
    }
    let outcome = match publish(ctx, &descriptor).await {
        Ok(outcome) => outcome,
        Err(PipelineError::InvalidArtifactName { .. }) => return invalid_post_data(),
        Err(e) => return failure(&e),
    };
    match artifact_url(ctx, &outcome.artifact_key) {
        Ok(url) => (
            StatusCode::OK,
            Json(json!({"success": true, "file": outcome.file_name, "url": url})),
        )
            .into_response(),
        Err(e) => failure(&e),
    }
}

async fn republish(ctx: &PipelineContext, domain: &str) -> Response {
    let report = match republish_all(ctx, domain).await {
        Ok(report) => report,
        Err(e) => {
            error!(domain, error = %e, "[REPUBLISH][ERROR] Aborted");
            return failure(&e);
        }
    };

    if report.is_complete() {
        return (
            StatusCode::OK,
            Json(json!({"success": true, "count": report.published})),
        )
            .into_response();
    }
    let failures: Vec<String> = report
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.descriptor.derived_file_name(), f.error))
        .collect();
    (
        StatusCode::OK,
        Json(json!({
            "success": false,
            "count": report.published,
            "error": format!("{} of {} artifacts failed to republish", failures.len(), report.attempted),
            "failures": failures,
        })),
    )
        .into_response()
}
