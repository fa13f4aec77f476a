//! End-to-end tests for the JSON API, driven through the router.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use testdesk_kernel::{KernelConfig, RunnerConfig, WorkspaceConfig};
use testdesk_server::{AppState, ExternalOpener, router};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingOpener {
    opened: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl ExternalOpener for RecordingOpener {
    async fn open(&self, path: &Path) -> io::Result<()> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

struct Harness {
    app: Router,
    state: AppState,
    opener: Arc<RecordingOpener>,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("Tests")).unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();

        let config = KernelConfig {
            workspace: WorkspaceConfig {
                root: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            runner: RunnerConfig::new("sh"),
        };
        let opener = Arc::new(RecordingOpener::default());
        let state = AppState::new(&config, opener.clone()).unwrap();
        Self {
            app: router(state.clone()),
            state,
            opener,
            dir,
        }
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        self.call(req).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(post_request(uri, body)).await
    }
}

fn post_request(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_list_roots_in_configured_order() {
    let h = Harness::new();
    let (status, body) = h.get("/api/files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "name": "Tests", "path": "Tests", "type": "dir" },
            { "name": "src", "path": "src", "type": "dir" },
        ])
    );
}

#[tokio::test]
async fn test_list_directory_sorted() {
    let h = Harness::new();
    h.write("Tests/b.py", "");
    h.write("Tests/A.py", "");
    h.write("Tests/zeta/x.py", "");

    let (status, body) = h.get("/api/files?path=Tests").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "name": "zeta", "path": "Tests/zeta", "type": "dir" },
            { "name": "A.py", "path": "Tests/A.py", "type": "file" },
            { "name": "b.py", "path": "Tests/b.py", "type": "file" },
        ])
    );
}

#[tokio::test]
async fn test_list_outside_root_is_empty() {
    let h = Harness::new();
    let (status, body) = h.get("/api/files?path=..%2F..").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = h.get("/api/files?path=missing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_search_accepts_both_parameter_names() {
    let h = Harness::new();
    h.write("Tests/power/Voltage_Check.py", "");
    h.write("src/notes.txt", "voltage");

    let expected = json!([
        { "name": "Voltage_Check.py", "path": "Tests/power/Voltage_Check.py", "type": "file" },
    ]);
    assert_eq!(h.get("/api/search?q=voltage").await.1, expected);
    assert_eq!(h.get("/api/search?query=VOLT").await.1, expected);
    assert_eq!(h.get("/api/search?q=v").await.1, json!([]));
    assert_eq!(h.get("/api/search").await.1, json!([]));
}

#[tokio::test]
async fn test_read_errors_map_to_status() {
    let h = Harness::new();

    let (status, body) = h.get("/api/read?path=Tests/missing.py").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Tests/missing.py"));

    let (status, body) = h.get("/api/read?path=../../etc/passwd").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let h = Harness::new();

    let (status, body) = h.get("/api/read").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("path"));

    let (status, body) = h.post("/api/unlock", json!({})).await;
    assert!(status.is_client_error());
    assert!(body["error"].as_str().unwrap().contains("path"));

    let req = Request::post("/api/stop-test")
        .body(Body::from(r#"{"testId":"t1"}"#))
        .unwrap();
    let (status, body) = h.call(req).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_save_then_read() {
    let h = Harness::new();

    let (status, body) = h
        .post(
            "/api/save",
            json!({ "path": "Tests/new.py", "content": "print('hi')\n" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));

    let (status, body) = h.get("/api/read?path=Tests/new.py").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "content": "print('hi')\n", "locked": false }));
}

#[tokio::test]
async fn test_save_outside_root_is_forbidden() {
    let h = Harness::new();
    let (status, _) = h
        .post("/api/save", json!({ "path": "../escape.txt", "content": "x" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!h.dir.path().parent().unwrap().join("escape.txt").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unlock_restores_owner_write() {
    use std::os::unix::fs::PermissionsExt;

    let h = Harness::new();
    h.write("Tests/ro.py", "x");
    let file = h.dir.path().join("Tests/ro.py");
    std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o444)).unwrap();

    let (status, body) = h.post("/api/unlock", json!({ "path": "Tests/ro.py" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "unlocked" }));

    let mode = std::fs::metadata(&file).unwrap().permissions().mode();
    assert_eq!(mode & 0o200, 0o200);
    assert_eq!(h.get("/api/read?path=Tests/ro.py").await.1["locked"], json!(false));
}

#[tokio::test]
async fn test_unlock_missing_file() {
    let h = Harness::new();
    let (status, _) = h.post("/api/unlock", json!({ "path": "Tests/none.py" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn test_run_test_returns_output() {
    let h = Harness::new();
    h.write("Tests/ok.sh", "echo pass\necho warn 1>&2\n");

    let (status, body) = h
        .post("/api/run-test", json!({ "target": "Tests/ok.sh", "testId": "t1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], json!("pass\n\nwarn\n"));
    assert_eq!(body["outcome"], json!({ "kind": "completed", "exit_code": 0 }));
    assert_eq!(h.get("/api/runs").await.1, json!({ "active": [] }));
}

#[tokio::test]
async fn test_run_test_missing_target() {
    let h = Harness::new();
    let (status, _) = h
        .post("/api/run-test", json!({ "target": "Tests/none.py" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[cfg(unix)]
#[tokio::test]
async fn test_stop_test_kills_running_request() {
    let h = Harness::new();
    h.write("Tests/slow.sh", "echo begin\nsleep 30\n");

    let run = {
        let app = h.app.clone();
        let req = post_request(
            "/api/run-test",
            json!({ "target": "Tests/slow.sh", "testId": "bench-1" }),
        );
        tokio::spawn(async move { app.oneshot(req).await.unwrap() })
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while !h.state.registry.is_running("bench-1") {
        assert!(Instant::now() < deadline, "run never registered");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.get("/api/runs").await.1, json!({ "active": ["bench-1"] }));

    let (status, _) = h
        .post("/api/run-test", json!({ "target": "Tests/slow.sh", "testId": "bench-1" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = h.post("/api/stop-test", json!({ "testId": "bench-1" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "stopped", "message": "[Test stopped by user]" })
    );

    let resp = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let output = body["output"].as_str().unwrap();
    assert!(output.starts_with("begin\n"));
    assert!(output.ends_with("[Test stopped by user]"));
}

#[tokio::test]
async fn test_stop_unknown_test_is_not_found() {
    let h = Harness::new();
    let (status, body) = h.post("/api/stop-test", json!({ "testId": "ghost" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "no running test with id: ghost" }));
}

#[tokio::test]
async fn test_open_external_uses_resolved_path() {
    let h = Harness::new();
    h.write("Tests/plot.csv", "1,2\n");

    let (status, body) = h
        .post("/api/open-external", json!({ "path": "Tests/plot.csv" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "opened" }));

    let opened = h.opener.opened.lock().unwrap().clone();
    assert_eq!(opened, vec![h.state.workspace.root().join("Tests/plot.csv")]);
}

#[tokio::test]
async fn test_open_external_rejects_bad_paths() {
    let h = Harness::new();

    let (status, _) = h
        .post("/api/open-external", json!({ "path": "Tests/none.csv" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h
        .post("/api/open-external", json!({ "path": "../../etc/hosts" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(h.opener.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let h = Harness::new();
    let req = Request::get("/api/files")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
