use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tenant_css::server::{router, ALLOWED_HEADERS, ALLOWED_METHODS};
use tenant_css_core::config::{PipelineConfig, StorageMode};
use tenant_css_core::contract::{
    BlobStore, CompileRequest, DirectoryEntry, MockSourceControl, MockStyleCompiler, PutOptions,
};
use tenant_css_core::manifest::Manifest;
use tenant_css_core::storage::LocalBlobStore;
use tenant_css_core::{ArtifactDescriptor, PipelineContext};
use tower::ServiceExt;

struct Harness {
    _work: TempDir,
    config: PipelineConfig,
    store: LocalBlobStore,
}

impl Harness {
    fn new() -> Self {
        let work = tempdir().unwrap();
        let config = PipelineConfig {
            storage_mode: StorageMode::Local,
            work_dir: work.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let store = LocalBlobStore::new(config.local_bucket_root());
        Harness {
            _work: work,
            config,
            store,
        }
    }

    fn app(&self, compiler: MockStyleCompiler, source_control: MockSourceControl) -> axum::Router {
        router(Arc::new(PipelineContext::new(
            self.config.clone(),
            Arc::new(self.store.clone()),
            Arc::new(compiler),
            Arc::new(source_control),
        )))
    }

    fn idle_app(&self) -> axum::Router {
        let mut compiler = MockStyleCompiler::new();
        compiler.expect_compile().never();
        let mut source_control = MockSourceControl::new();
        source_control.expect_list_directory().never();
        self.app(compiler, source_control)
    }
}

fn echo_compiler() -> MockStyleCompiler {
    let mut compiler = MockStyleCompiler::new();
    compiler
        .expect_compile()
        .returning(|req: CompileRequest<'_>| Ok(format!(".card{{color:{}}}", req.variables.primary)));
    compiler
}

async fn send(app: axum::Router, method: Method, uri: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_get_without_all_parameters_is_rejected() {
    let harness = Harness::new();
    let response = send(
        harness.idle_app(),
        Method::GET,
        "/?domain=practera.app&program_id=7",
        "",
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await,
        json!({"status": "error", "msg": "missing parameters"})
    );
}

#[tokio::test]
async fn test_get_without_artifacts_reports_not_found() {
    let harness = Harness::new();
    let response = send(
        harness.idle_app(),
        Method::GET,
        "/?domain=unknown.example.org&program_id=1&experience_id=2",
        "",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"success": false, "error": "no css file found"})
    );
}

#[tokio::test]
async fn test_get_returns_public_url_of_experience_artifact() {
    let harness = Harness::new();
    harness
        .store
        .put(
            "css.practera.com",
            "appv1/css/practera_app-experience-3.css",
            b".card{}".to_vec(),
            PutOptions::public_css(),
        )
        .await
        .unwrap();

    let response = send(
        harness.idle_app(),
        Method::GET,
        "/?domain=practera.app&program_id=7&experience_id=3",
        "",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "success": true,
            "url": "https://css.practera.app/appv1/css/practera_app-experience-3.css"
        })
    );
}

#[tokio::test]
async fn test_every_response_carries_cors_headers() {
    let harness = Harness::new();
    for (method, uri) in [(Method::OPTIONS, "/"), (Method::GET, "/"), (Method::POST, "/")] {
        let response = send(harness.idle_app(), method.clone(), uri, "not json").await;
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*", "{method}");
        assert_eq!(headers["access-control-allow-methods"], ALLOWED_METHODS);
        assert_eq!(headers["access-control-allow-headers"], ALLOWED_HEADERS);
    }
}

#[tokio::test]
async fn test_options_preflight_succeeds() {
    let harness = Harness::new();
    let response = send(harness.idle_app(), Method::OPTIONS, "/", "").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_post_with_invalid_payloads_is_rejected() {
    let harness = Harness::new();
    for body in ["not json", "{}", r#"{"model": "Program", "model_id": 4}"#, r#"{"domain": ""}"#] {
        let response = send(harness.idle_app(), Method::POST, "/", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{body}");
        assert_eq!(
            json_body(response).await,
            json!({"success": false, "err": "invalid post data"})
        );
    }
}

#[tokio::test]
async fn test_post_with_path_like_file_name_is_rejected() {
    let harness = Harness::new();
    for body in [
        r##"{"domain":"app.practera.com","model":"Program","model_id":4,"color":"#fff","card":"c.png","file_name":"../../evil.css"}"##,
        r##"{"domain":"app.practera.com","model":"Program","model_id":"../../../escaped","color":"#fff","card":"c.png"}"##,
    ] {
        let response = send(harness.idle_app(), Method::POST, "/", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{body}");
        assert_eq!(
            json_body(response).await,
            json!({"success": false, "err": "invalid post data"})
        );
    }
    assert!(!harness.config.manifest_path().exists());
    assert!(!harness.config.work_dir.join("evil.css").exists());
}

#[tokio::test]
async fn test_post_descriptor_publishes_and_records_artifact() {
    let harness = Harness::new();
    let app = harness.app(echo_compiler(), MockSourceControl::new());

    let response = send(
        app,
        Method::POST,
        "/",
        r##"{"domain":"app.practera.com","model":"Program","model_id":4,"color":"#ffe600","card":"memphis-light.png"}"##,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "success": true,
            "file": "app_practera_com-program-4.css",
            "url": "https://css.practera.app/appv1/css/app_practera_com-program-4.css"
        })
    );

    let css = harness
        .store
        .get("css.practera.com", "appv1/css/app_practera_com-program-4.css")
        .await
        .unwrap();
    assert_eq!(css, b".card{color:#ffe600}");

    let manifest = Manifest::load(&harness.config.manifest_path()).await.unwrap();
    let recorded: Vec<&ArtifactDescriptor> = manifest.descriptors().collect();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].model_id, "4");
}

#[tokio::test]
async fn test_post_domain_only_republishes_manifest() {
    let harness = Harness::new();
    let mut manifest = Manifest::new();
    for id in ["1", "2"] {
        manifest.insert(ArtifactDescriptor {
            domain: "practera.app".to_string(),
            model: "Program".to_string(),
            model_id: id.to_string(),
            color: "#000000".to_string(),
            card: "dark.png".to_string(),
            file_name: None,
        });
    }
    manifest.save(&harness.config.manifest_path()).await.unwrap();

    let response = send(
        harness.app(echo_compiler(), MockSourceControl::new()),
        Method::POST,
        "/",
        r#"{"domain":"practera.app"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"success": true, "count": 2}));
}

#[tokio::test]
async fn test_deploy_check_without_drift_does_not_republish() {
    let harness = Harness::new();
    harness
        .store
        .put(
            "sass.practera.com",
            "appv1/live/practera.scss",
            b".a{}".to_vec(),
            PutOptions::default(),
        )
        .await
        .unwrap();

    let mut source_control = MockSourceControl::new();
    source_control
        .expect_list_directory()
        .times(1)
        .returning(|_path: &str, _reference: &str| Ok(vec![DirectoryEntry::file("practera.scss")]));
    source_control
        .expect_read_file()
        .times(1)
        .returning(|_path: &str, _reference: &str| Ok(b".a{}".to_vec()));
    let mut compiler = MockStyleCompiler::new();
    compiler.expect_compile().never();

    let response = send(
        harness.app(compiler, source_control),
        Method::GET,
        "/?deployCheck=1&domain=app.practera.com",
        "",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"success": true, "republished": false, "changed": []})
    );
}

#[tokio::test]
async fn test_deploy_check_requires_domain() {
    let harness = Harness::new();
    let response = send(harness.idle_app(), Method::GET, "/?deployCheck=1", "").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
