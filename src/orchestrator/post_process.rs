//! Non-critical backend reads.
//!
//! These calls never surface an error to the user: failures are logged and replaced
//! by an empty or default value.

use crate::backend::BackendClient;
use crate::model::{BackendDefaults, FileEntry, ResultFile, FALLBACK_SOLVERS};

/// Manifest of a finished run, or an empty list when it cannot be fetched.
pub(crate) async fn fetch_manifest_or_empty(client: &BackendClient, run_id: &str) -> Vec<ResultFile> {
    match client.fetch_manifest(run_id).await {
        Ok(files) => {
            tracing::info!(run_id, count = files.len(), "fetched result manifest");
            files
        }
        Err(e) => {
            tracing::warn!(run_id, error = %format!("{e:#}"), "failed to fetch results");
            Vec::new()
        }
    }
}

pub(crate) async fn solvers_or_fallback(client: &BackendClient) -> Vec<String> {
    match client.solvers().await {
        Ok(list) if !list.is_empty() => list,
        Ok(_) => fallback_solvers(),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "solver catalog unavailable, using fallback");
            fallback_solvers()
        }
    }
}

pub(crate) async fn defaults_if_available(client: &BackendClient) -> Option<BackendDefaults> {
    match client.defaults().await {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "backend defaults unavailable");
            None
        }
    }
}

pub(crate) async fn list_files_or_empty(client: &BackendClient, path: &str) -> Vec<FileEntry> {
    match client.list_files(path).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path, error = %format!("{e:#}"), "directory listing failed");
            Vec::new()
        }
    }
}

fn fallback_solvers() -> Vec<String> {
    FALLBACK_SOLVERS.iter().map(|s| s.to_string()).collect()
}
