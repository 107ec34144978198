//! Pipeline configuration.
//!
//! One [`PipelineConfig`] parameterizes every pipeline. The defaults
//! reproduce the production deployment; the binary overlays a YAML file and
//! environment variables on top.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where the pipeline keeps its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Buckets are directories below the work directory.
    Local,
    /// Buckets are remote object storage.
    Cloud,
}

impl StorageMode {
    /// `local` selects [`StorageMode::Local`]; any other value is cloud.
    pub fn from_env_flag(flag: &str) -> Self {
        if flag.eq_ignore_ascii_case("local") {
            StorageMode::Local
        } else {
            StorageMode::Cloud
        }
    }
}

/// How resolved artifacts are handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    pub use_signed_url: bool,
    pub signed_url_ttl_seconds: u64,
    /// Prefix of public artifact URLs; the object key is appended.
    pub public_base_url: String,
}

impl Default for UrlConfig {
    fn default() -> Self {
        UrlConfig {
            use_signed_url: false,
            signed_url_ttl_seconds: 3600 * 24 * 7,
            public_base_url: "https://css.practera.app".to_string(),
        }
    }
}

impl UrlConfig {
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_seconds)
    }
}

/// Forces a fixed artifact name for one domain.
///
/// Kept for domains still pointing at a pre-tenant stylesheet. Any
/// descriptor for `domain` overwrites `file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyOverride {
    pub domain: String,
    pub file_name: String,
}

/// Branch and bucket prefix for one deployment environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentTarget {
    pub name: String,
    /// Source-control ref holding this environment's stylesheets.
    pub branch: String,
    /// Prefix of this environment's SASS tree in the SASS bucket.
    pub sass_prefix: String,
}

impl EnvironmentTarget {
    /// Key of `file` inside this environment's SASS tree.
    pub fn sass_key(&self, file: &str) -> String {
        format!("{}/{}", self.sass_prefix.trim_end_matches('/'), file)
    }

    pub fn manifest_key(&self) -> String {
        self.sass_key("config.json")
    }
}

/// Two-environment mapping: listed domains are "develop", all others "live".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentMapping {
    pub develop_domains: Vec<String>,
    pub develop: EnvironmentTarget,
    pub live: EnvironmentTarget,
}

impl Default for EnvironmentMapping {
    fn default() -> Self {
        EnvironmentMapping {
            develop_domains: vec!["appdev.practera.com".to_string()],
            develop: EnvironmentTarget {
                name: "develop".to_string(),
                branch: "develop".to_string(),
                sass_prefix: "appv1/develop".to_string(),
            },
            live: EnvironmentTarget {
                name: "live".to_string(),
                branch: "release/V1".to_string(),
                sass_prefix: "appv1/live".to_string(),
            },
        }
    }
}

impl EnvironmentMapping {
    pub fn target_for(&self, domain: &str) -> &EnvironmentTarget {
        if self.develop_domains.iter().any(|d| d == domain) {
            &self.develop
        } else {
            &self.live
        }
    }
}

/// Drift check settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Repository path of the stylesheet directory.
    pub directory_path: String,
    /// Entry names never synced (vendored icon fonts).
    pub excluded_entries: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            directory_path: "/repos/jazzmind/practera-app/contents/scss".to_string(),
            excluded_entries: vec!["ionic".to_string()],
        }
    }
}

/// Upper bounds for calls to each collaborator, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub storage_secs: u64,
    pub compiler_secs: u64,
    pub source_control_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            storage_secs: 30,
            compiler_secs: 120,
            source_control_secs: 30,
        }
    }
}

impl Timeouts {
    pub fn storage(&self) -> Duration {
        Duration::from_secs(self.storage_secs)
    }

    pub fn compiler(&self) -> Duration {
        Duration::from_secs(self.compiler_secs)
    }

    pub fn source_control(&self) -> Duration {
        Duration::from_secs(self.source_control_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage_mode: StorageMode,
    /// Root of the local SASS tree, compiled output and local buckets.
    pub work_dir: PathBuf,
    pub sass_bucket: String,
    pub css_bucket: String,
    /// Prefix of compiled artifacts in the CSS bucket.
    pub css_prefix: String,
    pub entry_stylesheet: String,
    pub variables_file: String,
    /// Prepended to the card name in `$cardImage`.
    pub backgrounds_path: String,
    pub urls: UrlConfig,
    pub legacy_override: Option<LegacyOverride>,
    /// Domain → default artifact file name.
    pub default_files: BTreeMap<String, String>,
    pub environments: EnvironmentMapping,
    pub sync: SyncConfig,
    pub timeouts: Timeouts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let default_files = [
            ("app.practera.com", "practera.css"),
            ("appdev.practera.com", "practera-v1.4.css"),
            ("app-dev.practera.com", "practera-v1.4.css"),
            ("practera.app", "practera-v1.4.css"),
        ]
        .into_iter()
        .map(|(d, f)| (d.to_string(), f.to_string()))
        .collect();

        PipelineConfig {
            storage_mode: StorageMode::Cloud,
            work_dir: PathBuf::from("/tmp"),
            sass_bucket: "sass.practera.com".to_string(),
            css_bucket: "css.practera.com".to_string(),
            css_prefix: "appv1/css".to_string(),
            entry_stylesheet: "practera.scss".to_string(),
            variables_file: "custom-variables.scss".to_string(),
            backgrounds_path: "../img/backgrounds/".to_string(),
            urls: UrlConfig::default(),
            legacy_override: None,
            default_files,
            environments: EnvironmentMapping::default(),
            sync: SyncConfig::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl PipelineConfig {
    /// Local SASS source tree.
    pub fn scss_dir(&self) -> PathBuf {
        self.work_dir.join("source").join("scss")
    }

    /// Directory compiled stylesheets are written to before upload.
    pub fn css_output_dir(&self) -> PathBuf {
        self.work_dir.join("www").join("css")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.scss_dir().join("config.json")
    }

    /// Root directory of the buckets in local storage mode.
    pub fn local_bucket_root(&self) -> PathBuf {
        self.work_dir.join("buckets")
    }

    /// Key of a compiled artifact in the CSS bucket.
    pub fn artifact_key(&self, file_name: &str) -> String {
        format!("{}/{}", self.css_prefix.trim_end_matches('/'), file_name)
    }

    pub fn default_file_for(&self, domain: &str) -> Option<&str> {
        self.default_files.get(domain).map(String::as_str)
    }

    pub fn trace_loaded(&self) {
        info!(
            storage_mode = ?self.storage_mode,
            work_dir = %self.work_dir.display(),
            sass_bucket = %self.sass_bucket,
            css_bucket = %self.css_bucket,
            signed_urls = self.urls.use_signed_url,
            "Loaded PipelineConfig"
        );
        debug!(?self, "PipelineConfig loaded (full debug)");
    }
}
