use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

/// Local-mode config rooted at `work_dir`.
fn local_config(work_dir: &Path) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    fs::write(
        config.path(),
        format!("pipeline:\n  work_dir: {}\n", work_dir.display()),
    )
    .expect("Writing temp config failed");
    config
}

fn tenant_css(config: &NamedTempFile) -> Command {
    let mut cmd = Command::cargo_bin("tenant-css").expect("Binary exists");
    cmd.arg("--config")
        .arg(config.path())
        .env("APP_ENV", "local")
        .env_remove("PORT")
        .env_remove("AWS_REGION")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn help_lists_every_subcommand() {
    let mut cmd = Command::cargo_bin("tenant-css").expect("Binary exists");
    cmd.arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("publish"))
            .and(predicate::str::contains("republish"))
            .and(predicate::str::contains("resolve"))
            .and(predicate::str::contains("sync")),
    );
}

#[test]
fn publish_requires_descriptor_arguments() {
    let mut cmd = Command::cargo_bin("tenant-css").expect("Binary exists");
    cmd.args(["publish", "--domain", "app.practera.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--model"));
}

#[test]
fn resolve_without_artifacts_prints_not_found() {
    let work = tempdir().unwrap();
    let config = local_config(work.path());

    tenant_css(&config)
        .args([
            "resolve",
            "--domain",
            "unknown.example.org",
            "--program-id",
            "1",
            "--experience-id",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("no css file found"));
}

#[test]
fn publish_then_resolve_in_local_mode() {
    let work = tempdir().unwrap();
    let sass = work.path().join("buckets/sass.practera.com/appv1/live");
    fs::create_dir_all(&sass).unwrap();
    fs::write(
        sass.join("practera.scss"),
        "@import 'custom-variables';\n.card { color: $primary; }\n",
    )
    .unwrap();
    let config = local_config(work.path());

    tenant_css(&config)
        .args([
            "publish",
            "--domain",
            "app.practera.com",
            "--model",
            "Program",
            "--model-id",
            "4",
            "--color",
            "#ffe600",
            "--card",
            "memphis-light.png",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("app_practera_com-program-4.css"));

    let css = fs::read_to_string(
        work.path()
            .join("buckets/css.practera.com/appv1/css/app_practera_com-program-4.css"),
    )
    .unwrap();
    assert!(css.contains("#ffe600"), "compiled css: {css}");

    tenant_css(&config)
        .args([
            "resolve",
            "--domain",
            "app.practera.com",
            "--program-id",
            "4",
            "--experience-id",
            "99",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "https://css.practera.app/appv1/css/app_practera_com-program-4.css",
        ));
}
