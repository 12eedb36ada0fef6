//! Run console state.
//!
//! Holds the configuration draft, the log of the current run, its manifest and the
//! run lifecycle. All updates go through the methods here; presentation layers only
//! read the fields. Nothing in this module performs I/O: methods return the
//! follow-up the orchestrator has to carry out.

pub(crate) mod browser;

use crate::backend::stream::StreamMessage;
use crate::model::{
    BackendDefaults, BackendStatus, ConsoleEvent, ResultFile, ResultKind, RunConfiguration,
    StreamEnd, FALLBACK_SOLVERS,
};
use browser::{BrowserOutcome, FileBrowser};

/// Glyph the backend prints when a run succeeds.
pub const SUCCESS_MARKER: char = '✅';
/// Glyph the backend prints when a run fails.
pub const FAILURE_MARKER: char = '❌';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

/// How the end of a run is detected from the log channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CompletionPolicy {
    /// Only `RESULTS_READY:<id>` ends a run.
    SignalOnly,
    /// Marker glyphs in plain log lines also end a run (without a manifest).
    SignalOrMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Logs,
    Results,
    Explorer,
    Help,
}

impl View {
    pub const TABS: [View; 5] = [
        View::Dashboard,
        View::Logs,
        View::Results,
        View::Explorer,
        View::Help,
    ];

    pub fn title(self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Logs => "Live Logs",
            View::Results => "Network Visualizer",
            View::Explorer => "Data Explorer",
            View::Help => "Help",
        }
    }

    pub fn index(self) -> usize {
        Self::TABS.iter().position(|v| *v == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::TABS[(self.index() + 1) % Self::TABS.len()]
    }
}

/// Work the orchestrator must perform after a state update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    FetchManifest(String),
    /// Backend just became reachable: refresh solver catalog and defaults.
    RefreshCatalog,
}

pub struct RunConsole {
    pub config: RunConfiguration,
    pub logs: Vec<String>,
    pub results: Vec<ResultFile>,
    pub run_id: Option<String>,
    pub phase: RunPhase,
    pub backend_status: BackendStatus,
    pub solvers: Vec<String>,
    pub view: View,
    /// URL of the document currently displayed on the results view.
    pub selected_document: Option<String>,
    pub completion: CompletionPolicy,
    pub browser: FileBrowser,
    pub info: String,
}

impl RunConsole {
    pub fn new(config: RunConfiguration, completion: CompletionPolicy) -> Self {
        Self {
            config,
            logs: Vec::new(),
            results: Vec::new(),
            run_id: None,
            phase: RunPhase::Idle,
            backend_status: BackendStatus::Checking,
            solvers: FALLBACK_SOLVERS.iter().map(|s| s.to_string()).collect(),
            view: View::Dashboard,
            selected_document: None,
            completion,
            browser: FileBrowser::default(),
            info: String::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    /// A run can start only with a reachable backend and a non-empty input source.
    pub fn can_start(&self) -> bool {
        self.backend_status == BackendStatus::Connected
            && !self.config.input_database.trim().is_empty()
    }

    /// Begin a new run. Returns the configuration to post, or `None` (no-op) when
    /// the preconditions do not hold. Prior logs and results are discarded first.
    pub fn start_run(&mut self) -> Option<RunConfiguration> {
        if !self.can_start() {
            return None;
        }
        self.logs.clear();
        self.results.clear();
        self.run_id = None;
        self.selected_document = None;
        self.phase = RunPhase::Running;
        self.view = View::Logs;
        self.info = "Run requested".into();
        Some(self.config.clone())
    }

    pub fn on_start_failed(&mut self, reason: &str) {
        self.logs.push(format!("{FAILURE_MARKER} ERROR: {reason}"));
        self.phase = RunPhase::Failed;
        self.info = "Run could not be started".into();
    }

    /// Handle one frame from the log channel.
    pub fn on_stream_message(&mut self, raw: &str) -> Option<FollowUp> {
        match StreamMessage::parse(raw) {
            StreamMessage::ResultsReady(id) => {
                tracing::info!(run_id = %id, "results ready");
                self.run_id = Some(id.clone());
                self.phase = RunPhase::Completed;
                self.view = View::Results;
                self.info = format!("Run {id} finished");
                Some(FollowUp::FetchManifest(id))
            }
            StreamMessage::Line(line) => {
                if self.completion == CompletionPolicy::SignalOrMarker && self.is_running() {
                    if line.contains(FAILURE_MARKER) {
                        self.phase = RunPhase::Failed;
                    } else if line.contains(SUCCESS_MARKER) {
                        self.phase = RunPhase::Completed;
                    }
                }
                self.logs.push(line);
                None
            }
        }
    }

    /// Install the manifest for `run_id`. Manifests of earlier runs are dropped.
    /// The first html entry is selected; without one, the first document.
    pub fn on_manifest(&mut self, run_id: &str, files: Vec<ResultFile>) {
        if self.run_id.as_deref() != Some(run_id) {
            tracing::debug!(run_id, "dropping manifest for a stale run");
            return;
        }
        self.selected_document = files
            .iter()
            .find(|f| f.kind == ResultKind::Html)
            .or_else(|| files.iter().find(|f| f.kind.is_document()))
            .map(|f| f.url.clone());
        self.results = files;
    }

    /// The channel ended. Without a prior terminal signal this is an abnormal end.
    pub fn on_stream_closed(&mut self, end: &StreamEnd) {
        if !self.is_running() {
            return;
        }
        self.phase = RunPhase::Idle;
        match end {
            StreamEnd::Closed => {
                self.info = "Log stream closed before the run reported results".into();
            }
            StreamEnd::Error(e) => {
                self.logs.push(format!("{FAILURE_MARKER} Log stream error: {e}"));
                self.info = "Log stream failed".into();
            }
        }
    }

    /// Returns `true` when the backend just became reachable.
    pub fn set_backend_status(&mut self, status: BackendStatus) -> bool {
        let became_connected =
            status == BackendStatus::Connected && self.backend_status != BackendStatus::Connected;
        self.backend_status = status;
        became_connected
    }

    /// Install the solver catalog; keeps the draft solver valid for it.
    pub fn apply_solvers(&mut self, solvers: Vec<String>) {
        let solvers = if solvers.is_empty() {
            FALLBACK_SOLVERS.iter().map(|s| s.to_string()).collect()
        } else {
            solvers
        };
        if !solvers.contains(&self.config.solver_name) {
            self.config.solver_name = solvers[0].clone();
        }
        self.solvers = solvers;
    }

    pub fn apply_defaults(&mut self, defaults: &BackendDefaults) {
        if let Some(port) = defaults.explorer_port {
            self.config.explorer_port = port;
        }
    }

    pub fn cycle_solver(&mut self, forward: bool) {
        if self.solvers.is_empty() {
            return;
        }
        let n = self.solvers.len();
        let idx = self
            .solvers
            .iter()
            .position(|s| *s == self.config.solver_name)
            .unwrap_or(0);
        let next = if forward { (idx + 1) % n } else { (idx + n - 1) % n };
        self.config.solver_name = self.solvers[next].clone();
    }

    /// Open the file browser; returns the directory to list.
    pub fn open_browser(&mut self, path: &str) -> String {
        self.browser.open_at(path)
    }

    /// Act on the highlighted browser entry. Returns a directory to list, if any.
    pub fn browser_select(&mut self) -> Option<String> {
        match self.browser.select_current() {
            BrowserOutcome::Relist(path) => Some(path),
            BrowserOutcome::Picked(path) => {
                self.info = format!("Input source: {path}");
                self.config.input_database = path;
                None
            }
            BrowserOutcome::Nothing => None,
        }
    }

    pub fn documents(&self) -> impl Iterator<Item = &ResultFile> {
        self.results.iter().filter(|f| f.kind.is_document())
    }

    pub fn downloads(&self) -> impl Iterator<Item = &ResultFile> {
        self.results.iter().filter(|f| f.kind.is_download())
    }

    pub fn select_document(&mut self, forward: bool) {
        let docs: Vec<&str> = self.documents().map(|f| f.url.as_str()).collect();
        if docs.is_empty() {
            return;
        }
        let n = docs.len();
        let next = match self
            .selected_document
            .as_deref()
            .and_then(|cur| docs.iter().position(|u| *u == cur))
        {
            Some(i) if forward => (i + 1) % n,
            Some(i) => (i + n - 1) % n,
            None => 0,
        };
        self.selected_document = Some(docs[next].to_string());
    }

    /// Fold an orchestrator event into the state.
    pub fn apply_event(&mut self, ev: ConsoleEvent) -> Option<FollowUp> {
        match ev {
            ConsoleEvent::BackendStatus(status) => {
                if self.set_backend_status(status) {
                    return Some(FollowUp::RefreshCatalog);
                }
            }
            ConsoleEvent::Solvers(list) => self.apply_solvers(list),
            ConsoleEvent::Defaults(d) => self.apply_defaults(&d),
            ConsoleEvent::RunStartFailed { reason } => self.on_start_failed(&reason),
            ConsoleEvent::StreamMessage(raw) => return self.on_stream_message(&raw),
            ConsoleEvent::StreamEnded(end) => self.on_stream_closed(&end),
            ConsoleEvent::Manifest { run_id, files } => self.on_manifest(&run_id, files),
            ConsoleEvent::Directory { path, entries } => self.browser.on_listing(&path, entries),
            ConsoleEvent::TutorialReady { path } => {
                self.info = format!("Tutorial data ready: {path}");
                self.config.input_database = path;
            }
            ConsoleEvent::Info(msg) => self.info = msg,
        }
        None
    }
}
