//! In-process fake of the model backend for tests.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

#[derive(Clone, Default)]
struct Script {
    lines: Vec<String>,
    /// Send as soon as a client connects instead of after a run is posted.
    on_connect: bool,
}

struct FakeState {
    runs: Mutex<Vec<Value>>,
    script: Mutex<Script>,
    tutorial_error: Mutex<Option<String>>,
    reject_runs: AtomicBool,
    catalog_requests: AtomicUsize,
    run_counter: watch::Sender<u64>,
}

pub(crate) struct FakeBackend {
    addr: std::net::SocketAddr,
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub(crate) async fn spawn() -> Self {
        let (run_counter, _) = watch::channel(0u64);
        let state = Arc::new(FakeState {
            runs: Mutex::new(Vec::new()),
            script: Mutex::new(Script::default()),
            tutorial_error: Mutex::new(None),
            reject_runs: AtomicBool::new(false),
            catalog_requests: AtomicUsize::new(0),
            run_counter,
        });
        let app = Router::new()
            .route("/health", get(|| async { Json(json!({"status": "ok"})) }))
            .route("/api/config", get(|| async { Json(json!({"explorer_port": 8001})) }))
            .route("/api/solvers", get(solvers))
            .route("/api/files", get(list_files))
            .route("/api/download_tutorial", post(download_tutorial))
            .route("/api/run", post(start_run))
            .route("/api/results/:run_id", get(results))
            .route("/results/:run_id/:file", get(artifact))
            .route("/ws/logs", get(logs))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state }
    }

    pub(crate) fn api_base(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub(crate) fn ws_base(&self) -> String {
        format!("ws://{}/", self.addr)
    }

    /// Lines pushed to every log client right after it connects.
    pub(crate) async fn script_logs(&self, lines: &[&str]) {
        *self.state.script.lock().await = Script {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            on_connect: true,
        };
    }

    /// Lines pushed to connected log clients once a run is posted.
    pub(crate) async fn script_run(&self, lines: &[&str]) {
        *self.state.script.lock().await = Script {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            on_connect: false,
        };
    }

    pub(crate) async fn reject_runs(&self) {
        self.state.reject_runs.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn fail_tutorial(&self, detail: &str) {
        *self.state.tutorial_error.lock().await = Some(detail.to_string());
    }

    /// Number of `/api/solvers` requests served so far.
    pub(crate) fn catalog_requests(&self) -> usize {
        self.state.catalog_requests.load(Ordering::SeqCst)
    }

    pub(crate) async fn posted_runs(&self) -> Vec<Value> {
        self.state.runs.lock().await.clone()
    }
}

async fn solvers(State(state): State<Arc<FakeState>>) -> Json<Value> {
    state.catalog_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!(["appsi_highs", "cbc"]))
}

async fn list_files(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let base = q.get("path").cloned().unwrap_or_else(|| ".".into());
    Json(json!([
        {"name": "assets", "is_dir": true, "path": format!("{base}/assets"), "extension": ""},
        {"name": "utopia.sqlite", "is_dir": false, "path": format!("{base}/utopia.sqlite"), "extension": ".sqlite"},
    ]))
}

async fn download_tutorial(State(state): State<Arc<FakeState>>) -> Response {
    match state.tutorial_error.lock().await.clone() {
        Some(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": detail})),
        )
            .into_response(),
        None => Json(json!({"status": "ok", "path": "assets/tutorial_database.sqlite"}))
            .into_response(),
    }
}

async fn start_run(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    if state.reject_runs.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Failed to start run"})),
        )
            .into_response();
    }
    state.runs.lock().await.push(body);
    state.run_counter.send_modify(|n| *n += 1);
    Json(json!({"message": "Run started", "status_url": "/ws/logs"})).into_response()
}

async fn results(Path(run_id): Path<String>) -> Response {
    if run_id != "run-7" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Run not found"}))).into_response();
    }
    Json(json!([
        {"name": "Network_Graph_2030.html", "label": "Network Map 2030", "type": "html",
         "url": "/results/run-7/Network_Graph_2030.html"},
        {"name": "out.xlsx", "label": "Export: out.xlsx", "type": "xlsx",
         "url": "/results/run-7/out.xlsx"},
    ]))
    .into_response()
}

async fn artifact(Path((_run_id, file)): Path<(String, String)>) -> Response {
    match file.as_str() {
        "out.xlsx" => "xlsx-bytes".into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn logs(ws: WebSocketUpgrade, State(state): State<Arc<FakeState>>) -> impl IntoResponse {
    // Subscribe before the handshake completes so a run posted right after connecting is seen.
    let runs = state.run_counter.subscribe();
    let script = state.script.lock().await.clone();
    ws.on_upgrade(move |socket| push_script(socket, runs, script))
}

async fn push_script(mut socket: WebSocket, mut runs: watch::Receiver<u64>, script: Script) {
    if !script.on_connect && runs.changed().await.is_err() {
        return;
    }
    for line in script.lines {
        if socket.send(Message::Text(line)).await.is_err() {
            return;
        }
    }
    let _ = socket.send(Message::Close(None)).await;
}
