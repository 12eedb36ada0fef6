//! Run lifecycle controller.
//!
//! Owns the single log channel, the backend health poll, and every request to the
//! backend. Presentation layers send `UiCommand`s and receive `ConsoleEvent`s.

use super::post_process;
use crate::backend::stream::LogStream;
use crate::backend::BackendClient;
use crate::model::{ConsoleEvent, ResultFile, RunConfiguration, StreamEnd};
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    StartRun(RunConfiguration),
    FetchManifest(String),
    RefreshCatalog,
    ListFiles(String),
    DownloadTutorial,
    DownloadArtifact { file: ResultFile, dest_dir: PathBuf },
    Quit,
}

/// Internal handle for the active run's channel task.
struct RunCtx {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Events from a run task, tagged with the generation of the run that produced them.
type RunUpdate = (u64, ConsoleEvent);

/// Open the log channel, post the run, then forward frames until the channel ends.
fn start_run(
    client: &BackendClient,
    cfg: RunConfiguration,
    generation: u64,
    run_tx: UnboundedSender<RunUpdate>,
) -> RunCtx {
    let client = client.clone();
    let handle = tokio::spawn(async move {
        let send = |ev: ConsoleEvent| {
            let _ = run_tx.send((generation, ev));
        };

        let stream = match client.logs_url() {
            Ok(url) => LogStream::connect(&url).await,
            Err(e) => Err(e),
        };
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(generation, error = %format!("{e:#}"), "log channel unavailable");
                send(ConsoleEvent::StreamEnded(StreamEnd::Error(format!("{e:#}"))));
                return;
            }
        };

        tracing::info!(generation, solver = %cfg.solver_name, input = %cfg.input_database, "starting run");
        if let Err(e) = client.start_run(&cfg).await {
            tracing::warn!(generation, error = %format!("{e:#}"), "run start rejected");
            send(ConsoleEvent::RunStartFailed {
                reason: format!("{e:#}"),
            });
            return;
        }

        let end = stream
            .pump(|msg| send(ConsoleEvent::StreamMessage(msg)))
            .await;
        send(ConsoleEvent::StreamEnded(end));
    });
    RunCtx { generation, handle }
}

/// Serve UI commands and the health poll until `Quit` or until the command channel closes.
pub(crate) async fn run_controller(
    client: BackendClient,
    health_interval: Duration,
    event_tx: UnboundedSender<ConsoleEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let (run_tx, mut run_rx) = mpsc::unbounded_channel::<RunUpdate>();
    let mut run_ctx: Option<RunCtx> = None;
    let mut generation = 0u64;

    let mut health = tokio::time::interval(health_interval);
    health.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::StartRun(cfg)) => {
                        // One channel at a time: release the old one before opening the next.
                        if let Some(ctx) = run_ctx.take() {
                            tracing::info!(generation = ctx.generation, "abandoning previous run channel");
                            ctx.handle.abort();
                        }
                        generation += 1;
                        run_ctx = Some(start_run(&client, cfg, generation, run_tx.clone()));
                    }
                    Some(UiCommand::FetchManifest(run_id)) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let files = post_process::fetch_manifest_or_empty(&client, &run_id).await;
                            let _ = tx.send(ConsoleEvent::Manifest { run_id, files });
                        });
                    }
                    Some(UiCommand::RefreshCatalog) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let solvers = post_process::solvers_or_fallback(&client).await;
                            let _ = tx.send(ConsoleEvent::Solvers(solvers));
                            if let Some(defaults) = post_process::defaults_if_available(&client).await {
                                let _ = tx.send(ConsoleEvent::Defaults(defaults));
                            }
                        });
                    }
                    Some(UiCommand::ListFiles(path)) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let entries = post_process::list_files_or_empty(&client, &path).await;
                            let _ = tx.send(ConsoleEvent::Directory { path, entries });
                        });
                    }
                    Some(UiCommand::DownloadTutorial) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        let _ = event_tx.send(ConsoleEvent::Info("Downloading tutorial data…".into()));
                        tokio::spawn(async move {
                            let ev = match client.download_tutorial().await {
                                Ok(path) => ConsoleEvent::TutorialReady { path },
                                Err(e) => ConsoleEvent::Info(format!("Tutorial download failed: {e:#}")),
                            };
                            let _ = tx.send(ev);
                        });
                    }
                    Some(UiCommand::DownloadArtifact { file, dest_dir }) => {
                        let client = client.clone();
                        let tx = event_tx.clone();
                        tokio::spawn(async move {
                            let msg = match client.download(&file, &dest_dir).await {
                                Ok(p) => format!("Saved: {}", p.display()),
                                Err(e) => format!("Download of {} failed: {e:#}", file.label),
                            };
                            let _ = tx.send(ConsoleEvent::Info(msg));
                        });
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some((run_gen, ev)) = run_rx.recv() => {
                // Frames from a replaced channel may still be queued; they belong to no one.
                if run_gen != generation {
                    continue;
                }
                if matches!(ev, ConsoleEvent::StreamEnded(_) | ConsoleEvent::RunStartFailed { .. }) {
                    run_ctx = None;
                }
                let _ = event_tx.send(ev);
            }
            _ = health.tick() => {
                let client = client.clone();
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(ConsoleEvent::BackendStatus(client.health().await));
                });
            }
        }
    }

    if let Some(ctx) = run_ctx.take() {
        ctx.handle.abort();
    }
    Ok(())
}
