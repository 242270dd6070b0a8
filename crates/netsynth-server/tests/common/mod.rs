//! Shared helpers for the netsynth HTTP tests.
//!
//! The server is driven through `tower::ServiceExt::oneshot` against a fake
//! `yosys` shell script, so the suite needs neither a network listener nor a
//! real synthesis tool.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use netsynth_server::config::ServerConfig;
use netsynth_server::router::build_router;
use netsynth_server::state::AppState;

/// Netlist emitted by the fake tool: a single inverter `y = ~a`.
pub const INVERTER_NETLIST: &str = r#"{"creator":"fake","modules":{"inv":{"ports":{"a":{"direction":"input","bits":[2]},"y":{"direction":"output","bits":[3]}},"cells":{"u0":{"type":"$_NOT_","port_directions":{"A":"input","Y":"output"},"connections":{"A":[2],"Y":[3]}}}}}}"#;

pub const INVERTER: &str = "module inv(input a, output y);\n  assign y = ~a;\nendmodule\n";

/// Path to an executable fake `yosys` reacting to markers in `input.v`:
///
/// - `FAIL`: syntax error on stderr, exit 2
/// - `HANG`: sleeps far past any test timeout
/// - `SLOW`: sleeps one second, then succeeds
/// - `NOOUT`: exits 0 without writing a netlist
///
/// Written once per test binary so no test execs a file another thread is
/// still writing.
pub fn fake_yosys() -> PathBuf {
    static TOOLS: OnceLock<tempfile::TempDir> = OnceLock::new();
    let dir = TOOLS.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yosys");
        let script = format!(
            "#!/bin/sh\n\
             [ \"$1\" = \"-s\" ] || exit 64\n\
             case \"$(cat input.v)\" in\n\
               *FAIL*) echo 'ERROR: syntax error, unexpected endmodule' >&2; exit 2;;\n\
               *HANG*) sleep 30;;\n\
               *SLOW*) sleep 1;;\n\
               *NOOUT*) echo 'nothing to do'; exit 0;;\n\
             esac\n\
             echo 'End of script.'\n\
             cat > out.json <<'EOF'\n{INVERTER_NETLIST}\nEOF\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("yosys")
}

/// Router plus the scratch directory its workspaces live in.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub scratch: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Builds an app from the test defaults after applying `tweak`.
    pub fn with_config(tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let mut config = ServerConfig {
            yosys_bin: fake_yosys(),
            scratch_dir: scratch.path().to_path_buf(),
            timeout: Duration::from_secs(10),
            ..ServerConfig::default()
        };
        tweak(&mut config);

        let state = AppState::new(config);
        TestApp {
            router: build_router(state.clone()),
            state,
            scratch,
        }
    }

    /// Number of workspace directories left behind in the scratch root.
    pub fn leftover_workspaces(&self) -> usize {
        leftover_entries(self.scratch.path())
    }
}

pub fn leftover_entries(dir: &Path) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Sends a request and returns (status, headers, json). Non-JSON bodies come
/// back as a JSON string.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)));
    (status, headers, json)
}

/// Sends a POST request with a JSON body and returns (status, json).
pub async fn post_json(
    router: &Router,
    path: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let (status, _, json) = send(router, request).await;
    (status, json)
}

/// Sends a POST request with a raw Verilog body and returns (status, json).
pub async fn post_text(router: &Router, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _, json) = send(router, request).await;
    (status, json)
}

/// Sends a GET request and returns (status, json).
pub async fn get_json(router: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let (status, _, json) = send(router, request).await;
    (status, json)
}

/// Convenience wrapper: synthesizes `verilog` with default settings.
pub async fn synthesize(router: &Router, verilog: &str) -> (StatusCode, serde_json::Value) {
    post_json(router, "/synthesize", json!({ "verilog": verilog })).await
}
