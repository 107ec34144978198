use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tenant_css::load_config::{load_config, DEFAULT_PORT, DEFAULT_REGION, LOCAL_WORK_DIR};
use tenant_css_core::config::StorageMode;

const VARS: [&str; 5] = ["APP_ENV", "PORT", "GITHUB_TOKEN", "DISTRIBUTION_ID", "AWS_REGION"];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

fn yaml_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), content).unwrap();
    file
}

/// Without a file or environment the production defaults apply.
#[test]
#[serial]
fn test_defaults_without_file() {
    clear_env();

    let config = load_config(None).expect("defaults should load");

    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.s3.region, DEFAULT_REGION);
    assert_eq!(config.pipeline.storage_mode, StorageMode::Cloud);
    assert_eq!(config.pipeline.work_dir, PathBuf::from("/tmp"));
    assert_eq!(config.pipeline.css_bucket, "css.practera.com");
    assert!(config.github_token.is_none());
    assert!(config.distribution_id.is_none());
}

/// YAML values override defaults; untouched fields keep their defaults.
#[test]
#[serial]
fn test_yaml_overlays_defaults() {
    clear_env();
    let file = yaml_file(
        r#"
port: 9000
s3:
  region: us-east-1
  endpoint: http://localhost:9090
github:
  api_base: https://github.example/api/v3
pipeline:
  css_bucket: css.staging.example
  urls:
    use_signed_url: true
  legacy_override:
    domain: app.practera.com
    file_name: practera.css
"#,
    );

    let config = load_config(Some(file.path())).expect("config should load");

    assert_eq!(config.port, 9000);
    assert_eq!(config.s3.region, "us-east-1");
    assert_eq!(config.s3.endpoint.as_deref(), Some("http://localhost:9090"));
    assert_eq!(
        config.github.api_base.as_deref(),
        Some("https://github.example/api/v3")
    );
    assert_eq!(config.pipeline.css_bucket, "css.staging.example");
    assert_eq!(config.pipeline.sass_bucket, "sass.practera.com");
    assert!(config.pipeline.urls.use_signed_url);
    assert_eq!(config.pipeline.urls.signed_url_ttl_seconds, 604800);
    assert_eq!(
        config.pipeline.legacy_override.as_ref().map(|l| l.file_name.as_str()),
        Some("practera.css")
    );
}

/// Environment variables are applied last and win over the file.
#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let file = yaml_file("port: 9000\ns3:\n  region: us-east-1\n");
    env::set_var("PORT", "7777");
    env::set_var("AWS_REGION", "eu-west-1");
    env::set_var("GITHUB_TOKEN", "ghp_secret");
    env::set_var("DISTRIBUTION_ID", "E123ABC");

    let config = load_config(Some(file.path())).expect("config should load");
    clear_env();

    assert_eq!(config.port, 7777);
    assert_eq!(config.s3.region, "eu-west-1");
    assert_eq!(config.github_token.as_deref(), Some("ghp_secret"));
    assert_eq!(config.distribution_id.as_deref(), Some("E123ABC"));
}

/// `APP_ENV=local` selects local storage under `./tmp` unless a work dir is configured.
#[test]
#[serial]
fn test_local_app_env_switches_storage_mode() {
    clear_env();
    env::set_var("APP_ENV", "local");

    let config = load_config(None).expect("config should load");
    assert_eq!(config.pipeline.storage_mode, StorageMode::Local);
    assert_eq!(config.pipeline.work_dir, PathBuf::from(LOCAL_WORK_DIR));

    let file = yaml_file("pipeline:\n  work_dir: /var/lib/tenant-css\n");
    let config = load_config(Some(file.path())).expect("config should load");
    clear_env();
    assert_eq!(config.pipeline.storage_mode, StorageMode::Local);
    assert_eq!(config.pipeline.work_dir, PathBuf::from("/var/lib/tenant-css"));
}

#[test]
#[serial]
fn test_invalid_port_is_an_error() {
    clear_env();
    env::set_var("PORT", "eighty");

    let err = load_config(None).unwrap_err();
    clear_env();
    assert!(err.to_string().contains("PORT"), "got: {err}");
}

/// Unparsable YAML reports a parse error.
#[test]
#[serial]
fn test_invalid_yaml_is_reported() {
    clear_env();
    let file = yaml_file("not-yaml: [:::");

    let err = load_config(Some(file.path())).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
#[serial]
fn test_missing_file_is_reported() {
    clear_env();
    let err = load_config(Some(std::path::Path::new("/nonexistent/tenant-css.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
