//! CLI for tenant-css: run the HTTP service or invoke a single pipeline.
//!
//! All pipeline logic lives in `tenant-css-core`; this module only parses
//! arguments, wires collaborators from [`ServiceConfig`], and reports.
//! [`run`] is the testable entry point used by `main` and integration tests.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tenant_css_core::compiler::GrassCompiler;
use tenant_css_core::config::StorageMode;
use tenant_css_core::contract::{BlobStore, SourceControl, StyleCompiler};
use tenant_css_core::publish::publish;
use tenant_css_core::republish::republish_all;
use tenant_css_core::resolve::{resolve, Resolution, ResolutionRequest};
use tenant_css_core::sources::refresh_sources;
use tenant_css_core::storage::LocalBlobStore;
use tenant_css_core::sync::sync_and_republish;
use tenant_css_core::{ArtifactDescriptor, PipelineContext};

use crate::github::GitHubReader;
use crate::load_config::{load_config, ServiceConfig};
use crate::s3::{S3BlobStore, S3Credentials};
use crate::server;

#[derive(Parser)]
#[clap(
    name = "tenant-css",
    version,
    about = "Compile, publish and resolve per-tenant stylesheets"
)]
pub struct Cli {
    /// Optional YAML config file overlaid on the built-in defaults
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API on PORT (default 8888)
    Serve,
    /// Refresh sources, compile one stylesheet and upload it
    Publish {
        #[clap(long)]
        domain: String,
        /// Program or Experience
        #[clap(long)]
        model: String,
        #[clap(long)]
        model_id: String,
        /// Primary color, e.g. "#ffe600"
        #[clap(long)]
        color: String,
        /// Card background image name
        #[clap(long)]
        card: String,
        #[clap(long)]
        file_name: Option<String>,
    },
    /// Recompile every stylesheet recorded in the environment's manifest
    Republish {
        #[clap(long)]
        domain: String,
    },
    /// Print the stylesheet URL a tenant would receive
    Resolve {
        #[clap(long)]
        domain: String,
        #[clap(long)]
        program_id: String,
        #[clap(long)]
        experience_id: String,
    },
    /// Copy drifted stylesheet sources from GitHub and republish if needed
    Sync {
        #[clap(long)]
        domain: String,
    },
}

/// Wire the collaborators selected by the storage mode into a context.
pub fn build_context(config: &ServiceConfig) -> Result<PipelineContext> {
    let pipeline = config.pipeline.clone();
    let store: Arc<dyn BlobStore> = match pipeline.storage_mode {
        StorageMode::Local => {
            let root = pipeline.local_bucket_root();
            tracing::info!(root = %root.display(), "[LOCAL] Using directory-backed buckets");
            Arc::new(LocalBlobStore::new(root))
        }
        StorageMode::Cloud => {
            let credentials =
                S3Credentials::from_env().context("AWS credentials are required in cloud mode")?;
            Arc::new(S3BlobStore::new(
                &config.s3.region,
                config.s3.endpoint.as_deref(),
                credentials,
            )?)
        }
    };
    let compiler: Arc<dyn StyleCompiler> = Arc::new(GrassCompiler::new());
    let source_control: Arc<dyn SourceControl> = Arc::new(GitHubReader::new(
        config.github.api_base.as_deref(),
        config.github_token.clone(),
    ));

    Ok(PipelineContext::new(pipeline, store, compiler, source_control))
}

fn print_json(value: serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let config = load_config(cli.config.as_deref())?;
    let ctx = build_context(&config)?;

    match cli.command {
        Commands::Serve => {
            if let Some(distribution) = &config.distribution_id {
                tracing::info!(distribution_id = %distribution, "CDN distribution configured; no invalidation is issued");
            }
            server::serve(Arc::new(ctx), config.port).await
        }
        Commands::Publish {
            domain,
            model,
            model_id,
            color,
            card,
            file_name,
        } => {
            let descriptor = ArtifactDescriptor {
                domain,
                model,
                model_id,
                color,
                card,
                file_name,
            };
            tracing::info!(command = "publish", domain = %descriptor.domain, "Starting publish");
            refresh_sources(&ctx, &descriptor.domain).await?;
            let outcome = publish(&ctx, &descriptor).await?;
            print_json(json!({
                "success": true,
                "file": outcome.file_name,
                "key": outcome.artifact_key,
                "bytes": outcome.bytes,
            }))
        }
        Commands::Republish { domain } => {
            tracing::info!(command = "republish", %domain, "Starting bulk republish");
            let report = republish_all(&ctx, &domain).await?;
            for failure in &report.failures {
                tracing::error!(
                    file = %failure.descriptor.derived_file_name(),
                    error = %failure.error,
                    "Artifact failed to republish"
                );
            }
            print_json(json!({
                "success": report.is_complete(),
                "attempted": report.attempted,
                "count": report.published,
            }))?;
            if report.is_complete() {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "{} of {} artifacts failed to republish",
                    report.failures.len(),
                    report.attempted
                ))
            }
        }
        Commands::Resolve {
            domain,
            program_id,
            experience_id,
        } => {
            let request = ResolutionRequest {
                domain,
                program_id,
                experience_id,
            };
            match resolve(&ctx, &request).await? {
                Resolution::Found { url, .. } => print_json(json!({"success": true, "url": url})),
                Resolution::NotFound => {
                    print_json(json!({"success": false, "error": "no css file found"}))
                }
            }
        }
        Commands::Sync { domain } => {
            tracing::info!(command = "sync", %domain, "Starting deploy check");
            let report = sync_and_republish(&ctx, &domain).await?;
            for failure in &report.failures {
                tracing::error!(file = %failure.name, error = %failure.error, "File could not be compared");
            }
            print_json(json!({
                "success": report.failures.is_empty(),
                "changed": report.changed,
                "unchanged": report.unchanged,
                "republished": report.republished(),
            }))
        }
    }
}
