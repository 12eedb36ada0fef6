use crate::backend::BackendClient;
use crate::console::{CompletionPolicy, FollowUp, RunConsole, RunPhase};
use crate::model::{
    BackendStatus, ConsoleEvent, ResultFile, RunConfiguration, ScenarioMode, TimeSequencing,
};
use crate::orchestrator::{self, UiCommand};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "temoa-console",
    version,
    about = "Launch Temoa model runs on a backend and stream their logs"
)]
pub struct Cli {
    /// Base URL of the model backend HTTP API
    #[arg(long, default_value = "http://localhost:8000")]
    pub api_base: String,

    /// Base URL for the log websocket (derived from --api-base when omitted)
    #[arg(long)]
    pub ws_base: Option<String>,

    /// Input source on the backend host (.sqlite or .toml)
    #[arg(long, default_value = "assets/tutorial_database.sqlite")]
    pub input: String,

    /// Scenario mode
    #[arg(long, value_enum, default_value = "perfect_foresight")]
    pub scenario_mode: ScenarioMode,

    /// Solver identifier (must be known to the backend)
    #[arg(long, default_value = "appsi_highs")]
    pub solver: String,

    /// Time sequencing mode
    #[arg(long, value_enum, default_value = "seasonal_timeslices")]
    pub time_sequencing: TimeSequencing,

    /// Output directory on the backend host
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Port of the data explorer served next to the backend
    #[arg(long, default_value_t = crate::model::DEFAULT_EXPLORER_PORT)]
    pub explorer_port: u16,

    /// Interval between backend health checks
    #[arg(long, default_value = "5s")]
    pub health_interval: humantime::Duration,

    /// How the end of a run is detected on the log stream
    #[arg(long, value_enum, default_value = "signal-or-marker")]
    pub completion: CompletionPolicy,

    /// Start a run, stream logs to stderr, print the result manifest and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Start a run and print the result manifest as JSON (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Write diagnostics to this file instead of the default log location
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.text && args.json {
        return Err(anyhow!("--text and --json are mutually exclusive"));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, false).await;
        }
    }

    let json = args.json;
    run_headless(args, json).await
}

/// Build the initial configuration draft from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfiguration {
    RunConfiguration {
        input_database: args.input.clone(),
        scenario_mode: args.scenario_mode,
        solver_name: args.solver.clone(),
        time_sequencing: args.time_sequencing,
        output_dir: args.output_dir.clone(),
        explorer_port: args.explorer_port,
    }
}

pub fn build_client(args: &Cli) -> Result<BackendClient> {
    BackendClient::new(&args.api_base, args.ws_base.as_deref())
}

/// Final state of a headless run.
pub(crate) struct HeadlessOutcome {
    pub run_id: Option<String>,
    pub files: Vec<ResultFile>,
}

/// Drive one run to completion without a UI: wait for the backend, start the run,
/// pass every log line to `on_line`, and return once the manifest is known.
pub(crate) async fn drive_headless<F>(
    client: BackendClient,
    config: RunConfiguration,
    completion: CompletionPolicy,
    health_interval: Duration,
    mut on_line: F,
) -> Result<HeadlessOutcome>
where
    F: FnMut(&str),
{
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ConsoleEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let api_base = client.api_base().to_string();
    let controller = tokio::spawn(orchestrator::run_controller(
        client,
        health_interval,
        event_tx,
        cmd_rx,
    ));

    let mut console = RunConsole::new(config, completion);
    let mut started = false;

    let outcome = loop {
        let Some(ev) = event_rx.recv().await else {
            break Err(anyhow!("controller stopped unexpectedly"));
        };
        let manifest_for = match &ev {
            ConsoleEvent::Manifest { run_id, .. } => Some(run_id.clone()),
            _ => None,
        };
        let stream_ended = matches!(ev, ConsoleEvent::StreamEnded(_));

        let before = console.logs.len();
        let follow = console.apply_event(ev);
        for line in &console.logs[before..] {
            on_line(line.as_str());
        }
        match follow {
            Some(FollowUp::FetchManifest(id)) => {
                let _ = cmd_tx.send(UiCommand::FetchManifest(id));
            }
            Some(FollowUp::RefreshCatalog) => {
                let _ = cmd_tx.send(UiCommand::RefreshCatalog);
            }
            None => {}
        }

        if !started {
            match console.backend_status {
                BackendStatus::Checking => {}
                BackendStatus::Connected => match console.start_run() {
                    Some(cfg) => {
                        tracing::info!(api_base = %api_base, "backend connected, starting run");
                        let _ = cmd_tx.send(UiCommand::StartRun(cfg));
                        started = true;
                    }
                    None => break Err(anyhow!("input source is empty")),
                },
                other => {
                    break Err(anyhow!("backend at {api_base} is {}", other.label()));
                }
            }
            continue;
        }

        if manifest_for.is_some() && manifest_for == console.run_id {
            break Ok(HeadlessOutcome {
                run_id: console.run_id.clone(),
                files: console.results.clone(),
            });
        }
        match console.phase {
            RunPhase::Failed => break Err(anyhow!("run failed")),
            RunPhase::Idle => {
                break Err(anyhow!("log stream ended before the run reported results"))
            }
            RunPhase::Completed if stream_ended && console.run_id.is_none() => {
                // Completed by marker and the channel closed without a terminal signal.
                break Ok(HeadlessOutcome {
                    run_id: None,
                    files: Vec::new(),
                });
            }
            _ => {}
        }
    };

    let _ = cmd_tx.send(UiCommand::Quit);
    controller
        .await
        .context("controller task failed")?
        .context("controller failed")?;
    outcome
}

async fn run_headless(args: Cli, json: bool) -> Result<()> {
    let client = build_client(&args)?;
    let config = build_config(&args);
    let (out_tx, out_handle) = spawn_output_writer();

    let line_tx = out_tx.clone();
    let result = drive_headless(
        client.clone(),
        config,
        args.completion,
        Duration::from(args.health_interval),
        |line| {
            if !json {
                let _ = line_tx.send(OutputLine::Stderr(line.to_string()));
            }
        },
    )
    .await;
    drop(line_tx);

    let res = match result {
        Ok(outcome) => {
            if json {
                let out = serde_json::to_string_pretty(&serde_json::json!({
                    "run_id": outcome.run_id,
                    "files": outcome.files,
                }))?;
                let _ = out_tx.send(OutputLine::Stdout(out));
            } else {
                let summary = crate::text_summary::build_text_summary(
                    outcome.run_id.as_deref(),
                    &outcome.files,
                    &client,
                );
                for line in summary.lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            Ok(())
        }
        Err(e) => Err(e),
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBackend;

    #[test]
    fn config_is_seeded_from_flags() {
        let args = Cli::parse_from([
            "temoa-console",
            "--input",
            "data/us9r.toml",
            "--scenario-mode",
            "MGA",
            "--solver",
            "cbc",
            "--time-sequencing",
            "consecutive_days",
        ]);
        let cfg = build_config(&args);
        assert_eq!(cfg.input_database, "data/us9r.toml");
        assert_eq!(cfg.scenario_mode, ScenarioMode::Mga);
        assert_eq!(cfg.solver_name, "cbc");
        assert_eq!(cfg.time_sequencing, TimeSequencing::ConsecutiveDays);
        assert_eq!(args.completion, CompletionPolicy::SignalOrMarker);
        assert_eq!(Duration::from(args.health_interval), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn headless_run_returns_manifest() {
        let backend = FakeBackend::spawn().await;
        backend
            .script_run(&[
                "--- Starting Run ID: run-7 ---",
                "Building model...",
                "✅ Run run-7 completed successfully.",
                "RESULTS_READY:run-7",
            ])
            .await;
        let client = BackendClient::new(&backend.api_base(), None).unwrap();
        let mut lines = Vec::new();
        let outcome = drive_headless(
            client,
            RunConfiguration::default(),
            CompletionPolicy::SignalOrMarker,
            Duration::from_secs(60),
            |l| lines.push(l.to_string()),
        )
        .await
        .unwrap();

        assert_eq!(outcome.run_id.as_deref(), Some("run-7"));
        assert_eq!(outcome.files.len(), 2);
        // the catalog request is issued when the backend first reports connected
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while backend.catalog_requests() == 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(backend.catalog_requests(), 1);
        assert_eq!(
            lines,
            vec![
                "--- Starting Run ID: run-7 ---",
                "Building model...",
                "✅ Run run-7 completed successfully.",
            ]
        );
    }

    #[tokio::test]
    async fn headless_run_reports_rejected_start() {
        let backend = FakeBackend::spawn().await;
        backend.reject_runs().await;
        let client = BackendClient::new(&backend.api_base(), None).unwrap();
        let mut lines = Vec::new();
        let err = drive_headless(
            client,
            RunConfiguration::default(),
            CompletionPolicy::SignalOnly,
            Duration::from_secs(60),
            |l| lines.push(l.to_string()),
        )
        .await
        .err()
        .expect("run must fail");
        assert_eq!(err.to_string(), "run failed");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("❌ ERROR: Failed to start run"));
    }

    #[tokio::test]
    async fn headless_run_fails_when_stream_closes_early() {
        let backend = FakeBackend::spawn().await;
        backend.script_run(&["Building model..."]).await;
        let client = BackendClient::new(&backend.api_base(), None).unwrap();
        let err = drive_headless(
            client,
            RunConfiguration::default(),
            CompletionPolicy::SignalOnly,
            Duration::from_secs(60),
            |_| {},
        )
        .await
        .err()
        .expect("run must fail");
        assert!(err.to_string().contains("log stream ended"));
    }

    #[tokio::test]
    async fn headless_run_needs_reachable_backend() {
        let client = BackendClient::new("http://127.0.0.1:9", None).unwrap();
        let err = drive_headless(
            client,
            RunConfiguration::default(),
            CompletionPolicy::SignalOnly,
            Duration::from_secs(60),
            |_| {},
        )
        .await
        .err()
        .expect("backend is down");
        assert!(err.to_string().contains("disconnected"));
    }
}
