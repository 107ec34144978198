/// `load_config` module: builds the [`ServiceConfig`] the server and CLI run with.
///
/// Layers, applied in order:
/// 1. Built-in defaults ([`PipelineConfig::default`], port 8888, region `ap-southeast-2`).
/// 2. An optional YAML file (no secrets) with `pipeline`, `port`, `s3` and `github` sections.
/// 3. Environment variables (`.env` is loaded by `main`): `APP_ENV`, `PORT`,
///    `GITHUB_TOKEN`, `DISTRIBUTION_ID`, `AWS_REGION`.
///
/// AWS credentials are not part of this config; the S3 client reads them
/// itself when cloud mode is selected.
///
/// # Errors
/// All errors use `anyhow::Error` and surface at the CLI boundary.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tenant_css_core::config::StorageMode;
use tenant_css_core::PipelineConfig;
use tracing::{error, info, warn};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_REGION: &str = "ap-southeast-2";
/// Work directory used in local mode unless configured otherwise.
pub const LOCAL_WORK_DIR: &str = "./tmp";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct S3Section {
    pub region: String,
    /// Overrides `https://s3.{region}.amazonaws.com`.
    pub endpoint: Option<String>,
}

impl Default for S3Section {
    fn default() -> Self {
        S3Section {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    pub api_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub pipeline: PipelineConfig,
    pub port: u16,
    pub s3: S3Section,
    pub github: GitHubSection,
    pub github_token: Option<String>,
    /// CDN distribution in front of the CSS bucket. Logged only.
    pub distribution_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    pipeline: Option<serde_yaml::Mapping>,
    port: Option<u16>,
    s3: S3Section,
    github: GitHubSection,
}

/// Loads defaults, overlays `path` when given, then the environment.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let raw = match path {
        Some(path) => read_yaml(path)?,
        None => {
            info!("No config file given, using built-in defaults");
            RawConfig::default()
        }
    };

    let work_dir_configured = raw
        .pipeline
        .as_ref()
        .is_some_and(|m| m.contains_key("work_dir"));
    let pipeline: PipelineConfig = match raw.pipeline {
        Some(mapping) => serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
            .map_err(|e| {
                error!(error = ?e, "Failed to parse pipeline section");
                anyhow::anyhow!("Failed to parse pipeline section: {e}")
            })?,
        None => PipelineConfig::default(),
    };

    let mut config = ServiceConfig {
        pipeline,
        port: raw.port.unwrap_or(DEFAULT_PORT),
        s3: raw.s3,
        github: raw.github,
        github_token: None,
        distribution_id: None,
    };
    apply_env(&mut config, work_dir_configured)?;

    config.pipeline.trace_loaded();
    info!(
        port = config.port,
        region = %config.s3.region,
        github_token_set = config.github_token.is_some(),
        distribution_id = ?config.distribution_id,
        "Service configuration ready"
    );
    Ok(config)
}

fn read_yaml(path: &Path) -> Result<RawConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path, e)
    })?;

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    let raw: RawConfig = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(raw)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn apply_env(config: &mut ServiceConfig, work_dir_configured: bool) -> Result<()> {
    if let Some(flag) = non_empty_var("APP_ENV") {
        config.pipeline.storage_mode = StorageMode::from_env_flag(&flag);
        info!(app_env = %flag, storage_mode = ?config.pipeline.storage_mode, "Storage mode from APP_ENV");
    }
    if config.pipeline.storage_mode == StorageMode::Local && !work_dir_configured {
        config.pipeline.work_dir = PathBuf::from(LOCAL_WORK_DIR);
    }

    if let Some(port) = non_empty_var("PORT") {
        config.port = port
            .parse()
            .with_context(|| format!("PORT must be a port number, got {port:?}"))?;
    }
    if let Some(region) = non_empty_var("AWS_REGION") {
        config.s3.region = region;
    }

    config.github_token = non_empty_var("GITHUB_TOKEN");
    if config.github_token.is_none() {
        warn!("GITHUB_TOKEN not set; sync will use anonymous GitHub access");
    }
    config.distribution_id = non_empty_var("DISTRIBUTION_ID");
    Ok(())
}
