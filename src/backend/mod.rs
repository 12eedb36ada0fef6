//! HTTP client for the model backend.
//!
//! Every call returns `anyhow::Result`; callers decide whether a failure is
//! surfaced to the user or degraded to a default value.

pub(crate) mod stream;

use crate::model::{BackendDefaults, BackendStatus, FileEntry, ResultFile, RunConfiguration};
use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use reqwest::{Response, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    api_base: Url,
    ws_base: Url,
}

#[derive(Deserialize)]
struct TutorialResponse {
    path: String,
}

#[derive(Deserialize)]
struct ErrorDetail {
    detail: String,
}

impl BackendClient {
    /// Build a client for `api_base`. The websocket base defaults to the API base
    /// with its scheme switched to `ws`/`wss`.
    pub fn new(api_base: &str, ws_base: Option<&str>) -> Result<Self> {
        let api_base = parse_base(api_base).context("invalid API base URL")?;
        let ws_base = match ws_base {
            Some(s) => parse_base(s).context("invalid websocket base URL")?,
            None => derive_ws_base(&api_base)?,
        };
        let http = reqwest::Client::builder()
            .user_agent(format!("temoa-console/{}", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            api_base,
            ws_base,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("join {path} onto {}", self.api_base))
    }

    /// URL of the log channel.
    pub fn logs_url(&self) -> Result<Url> {
        self.ws_base
            .join("ws/logs")
            .context("build log channel URL")
    }

    /// Absolute URL for a manifest entry (manifest URLs are server-relative).
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match self.endpoint(url) {
            Ok(u) => u.to_string(),
            Err(_) => format!("{}{}", self.api_base.as_str().trim_end_matches('/'), url),
        }
    }

    /// URL of the embedded data explorer: same host as the API, different port.
    pub fn explorer_url(&self, port: u16) -> String {
        let host = self.api_base.host_str().unwrap_or("localhost");
        format!("{}://{}:{}", self.api_base.scheme(), host, port)
    }

    /// Liveness check. Never fails: transport errors map to `Disconnected`.
    pub async fn health(&self) -> BackendStatus {
        let url = match self.endpoint("/health") {
            Ok(u) => u,
            Err(_) => return BackendStatus::Error,
        };
        match self.http.get(url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(resp) if resp.status().is_success() => BackendStatus::Connected,
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), "health check returned non-success");
                BackendStatus::Error
            }
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                BackendStatus::Disconnected
            }
        }
    }

    pub async fn defaults(&self) -> Result<BackendDefaults> {
        let resp = self.get("/api/config").await?;
        resp.json().await.context("decode /api/config")
    }

    pub async fn solvers(&self) -> Result<Vec<String>> {
        let resp = self.get("/api/solvers").await?;
        resp.json().await.context("decode /api/solvers")
    }

    pub async fn list_files(&self, path: &str) -> Result<Vec<FileEntry>> {
        let mut url = self.endpoint("/api/files")?;
        url.query_pairs_mut().append_pair("path", path);
        let resp = self.http.get(url).send().await.context("GET /api/files")?;
        let resp = ensure_success(resp, "GET /api/files").await?;
        resp.json().await.context("decode /api/files")
    }

    /// Ask the backend to materialize the tutorial dataset; returns its path.
    pub async fn download_tutorial(&self) -> Result<String> {
        let url = self.endpoint("/api/download_tutorial")?;
        let resp = self
            .http
            .post(url)
            .send()
            .await
            .context("POST /api/download_tutorial")?;
        let resp = ensure_success(resp, "POST /api/download_tutorial").await?;
        let body: TutorialResponse = resp.json().await.context("decode tutorial response")?;
        Ok(body.path)
    }

    pub async fn start_run(&self, cfg: &RunConfiguration) -> Result<()> {
        let url = self.endpoint("/api/run")?;
        let resp = self
            .http
            .post(url)
            .json(cfg)
            .send()
            .await
            .context("POST /api/run")?;
        ensure_success(resp, "Failed to start run").await?;
        Ok(())
    }

    pub async fn fetch_manifest(&self, run_id: &str) -> Result<Vec<ResultFile>> {
        let mut url = self.endpoint("/api/results")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base cannot be a base URL"))?
            .pop_if_empty()
            .push(run_id);
        let resp = self.http.get(url).send().await.context("GET /api/results")?;
        let resp = ensure_success(resp, "GET /api/results").await?;
        resp.json().await.context("decode result manifest")
    }

    /// Stream a result artifact into `dest_dir`, returning the written path.
    pub async fn download(&self, file: &ResultFile, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.resolve(&file.url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let resp = ensure_success(resp, "download").await?;

        let path = dest_dir.join(file.file_name());
        let mut out = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("create {}", path.display()))?;
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.context("read download body")?;
            out.write_all(&chunk)
                .await
                .with_context(|| format!("write {}", path.display()))?;
        }
        out.flush().await?;
        Ok(path)
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let url = self.endpoint(path)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        ensure_success(resp, &format!("GET {path}")).await
    }
}

/// Turn a non-2xx response into an error carrying the backend's `detail` when present.
async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorDetail>(&body) {
        Ok(e) => Err(anyhow!("{what}: {} ({status})", e.detail)),
        Err(_) => Err(anyhow!("{what} ({status})")),
    }
}

fn parse_base(s: &str) -> Result<Url> {
    let mut url = Url::parse(s.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn derive_ws_base(api_base: &Url) -> Result<Url> {
    let scheme = match api_base.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(anyhow!("unsupported API scheme: {other}")),
    };
    let rest = &api_base.as_str()[api_base.scheme().len()..];
    Url::parse(&format!("{scheme}{rest}")).context("derive websocket base URL")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResultKind;

    #[test]
    fn websocket_base_follows_api_scheme() {
        let c = BackendClient::new("http://localhost:8000", None).unwrap();
        assert_eq!(c.logs_url().unwrap().as_str(), "ws://localhost:8000/ws/logs");

        let c = BackendClient::new("https://models.example.org/temoa", None).unwrap();
        assert_eq!(
            c.logs_url().unwrap().as_str(),
            "wss://models.example.org/temoa/ws/logs"
        );

        let c = BackendClient::new("http://localhost:8000", Some("ws://127.0.0.1:9000")).unwrap();
        assert_eq!(c.logs_url().unwrap().as_str(), "ws://127.0.0.1:9000/ws/logs");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(BackendClient::new("ftp://localhost", None).is_err());
        assert!(BackendClient::new("not a url", None).is_err());
    }

    #[test]
    fn resolves_server_relative_urls_against_api_base() {
        let c = BackendClient::new("http://localhost:8000", None).unwrap();
        assert_eq!(
            c.resolve("/results/run-7/graph.html"),
            "http://localhost:8000/results/run-7/graph.html"
        );
        assert_eq!(c.resolve("https://cdn/x.svg"), "https://cdn/x.svg");
        assert_eq!(c.explorer_url(8001), "http://localhost:8001");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let c = BackendClient::new("http://host/prefix", None).unwrap();
        assert_eq!(
            c.endpoint("/api/run").unwrap().as_str(),
            "http://host/prefix/api/run"
        );
    }

    #[tokio::test]
    async fn manifest_and_start_run_against_fake_backend() {
        let backend = crate::test_support::FakeBackend::spawn().await;
        let client = BackendClient::new(&backend.api_base(), None).unwrap();

        assert_eq!(client.health().await, BackendStatus::Connected);
        assert_eq!(client.solvers().await.unwrap(), vec!["appsi_highs", "cbc"]);
        assert_eq!(client.defaults().await.unwrap().explorer_port, Some(8001));

        client.start_run(&RunConfiguration::default()).await.unwrap();
        let posted = backend.posted_runs().await;
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["solver_name"], "appsi_highs");

        let files = client.fetch_manifest("run-7").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].kind, ResultKind::Html);
        assert!(client.fetch_manifest("missing").await.is_err());
    }

    #[tokio::test]
    async fn error_detail_is_carried_into_the_error() {
        let backend = crate::test_support::FakeBackend::spawn().await;
        backend.fail_tutorial("Download failed: Network error").await;
        let client = BackendClient::new(&backend.api_base(), None).unwrap();
        let err = client.download_tutorial().await.unwrap_err();
        assert!(format!("{err:#}").contains("Download failed: Network error"));
    }

    #[tokio::test]
    async fn health_reports_disconnected_when_nothing_listens() {
        let client = BackendClient::new("http://127.0.0.1:9", None).unwrap();
        assert_eq!(client.health().await, BackendStatus::Disconnected);
    }

    #[tokio::test]
    async fn download_writes_artifact_into_directory() {
        let backend = crate::test_support::FakeBackend::spawn().await;
        let client = BackendClient::new(&backend.api_base(), None).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let file = ResultFile {
            label: "Export: out.xlsx".into(),
            url: "/results/run-7/out.xlsx".into(),
            kind: ResultKind::Xlsx,
            name: None,
        };
        let path = client.download(&file, dir.path()).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "out.xlsx");
        assert_eq!(std::fs::read(&path).unwrap(), b"xlsx-bytes");
    }
}
