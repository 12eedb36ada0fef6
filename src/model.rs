use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration draft sent verbatim as the body of `POST /api/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub input_database: String,
    pub scenario_mode: ScenarioMode,
    pub solver_name: String,
    pub time_sequencing: TimeSequencing,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    pub explorer_port: u16,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            input_database: "assets/tutorial_database.sqlite".into(),
            scenario_mode: ScenarioMode::PerfectForesight,
            solver_name: "appsi_highs".into(),
            time_sequencing: TimeSequencing::SeasonalTimeslices,
            output_dir: None,
            explorer_port: DEFAULT_EXPLORER_PORT,
        }
    }
}

pub const DEFAULT_EXPLORER_PORT: u16 = 8001;

/// Solvers assumed present when the backend cannot enumerate its own.
pub const FALLBACK_SOLVERS: [&str; 2] = ["appsi_highs", "cbc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ScenarioMode {
    #[serde(rename = "perfect_foresight")]
    #[value(name = "perfect_foresight")]
    PerfectForesight,
    #[serde(rename = "MGA")]
    #[value(name = "MGA")]
    Mga,
    #[serde(rename = "myopic")]
    #[value(name = "myopic")]
    Myopic,
    #[serde(rename = "monte_carlo")]
    #[value(name = "monte_carlo")]
    MonteCarlo,
    #[serde(rename = "build_only")]
    #[value(name = "build_only")]
    BuildOnly,
}

impl ScenarioMode {
    pub const ALL: [ScenarioMode; 5] = [
        ScenarioMode::PerfectForesight,
        ScenarioMode::Mga,
        ScenarioMode::Myopic,
        ScenarioMode::MonteCarlo,
        ScenarioMode::BuildOnly,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScenarioMode::PerfectForesight => "Perfect Foresight",
            ScenarioMode::Mga => "MGA",
            ScenarioMode::Myopic => "Myopic",
            ScenarioMode::MonteCarlo => "Monte Carlo",
            ScenarioMode::BuildOnly => "Build Only",
        }
    }

    /// Cycle to the neighbouring mode, wrapping at both ends.
    pub fn cycle(self, forward: bool) -> Self {
        cycle_in(&Self::ALL, self, forward)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TimeSequencing {
    SeasonalTimeslices,
    ConsecutiveDays,
    RepresentativePeriods,
}

impl TimeSequencing {
    pub const ALL: [TimeSequencing; 3] = [
        TimeSequencing::SeasonalTimeslices,
        TimeSequencing::ConsecutiveDays,
        TimeSequencing::RepresentativePeriods,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TimeSequencing::SeasonalTimeslices => "Seasonal Timeslices",
            TimeSequencing::ConsecutiveDays => "Consecutive Days",
            TimeSequencing::RepresentativePeriods => "Representative Periods",
        }
    }

    pub fn cycle(self, forward: bool) -> Self {
        cycle_in(&Self::ALL, self, forward)
    }
}

fn cycle_in<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    let n = all.len();
    let next = if forward { (idx + 1) % n } else { (idx + n - 1) % n };
    all[next]
}

/// Kind of artifact listed in a result manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultKind {
    Html,
    Svg,
    Xlsx,
    Sqlite,
    Other(String),
}

impl ResultKind {
    /// Known kinds match case-insensitively; unknown ones keep the backend's spelling.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => ResultKind::Html,
            "svg" => ResultKind::Svg,
            "xlsx" => ResultKind::Xlsx,
            "sqlite" => ResultKind::Sqlite,
            _ => ResultKind::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResultKind::Html => "html",
            ResultKind::Svg => "svg",
            ResultKind::Xlsx => "xlsx",
            ResultKind::Sqlite => "sqlite",
            ResultKind::Other(s) => s,
        }
    }

    /// Rendered by the backend and meant to be viewed (network diagrams).
    pub fn is_document(&self) -> bool {
        matches!(self, ResultKind::Html | ResultKind::Svg)
    }

    /// Offered as a download link.
    pub fn is_download(&self) -> bool {
        matches!(self, ResultKind::Xlsx | ResultKind::Sqlite)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ResultKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResultKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ResultKind::parse(&s))
    }
}

/// One backend-produced artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFile {
    pub label: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResultFile {
    /// File name to use when saving locally: the backend name, else the last URL segment.
    pub fn file_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        self.url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("result.{}", self.kind))
    }
}

/// Backend-side directory entry returned by `/api/files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    #[serde(default)]
    pub extension: Option<String>,
}

/// Defaults advertised by the backend through `/api/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDefaults {
    #[serde(default)]
    pub explorer_port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendStatus {
    Checking,
    Connected,
    Disconnected,
    Error,
}

impl BackendStatus {
    pub fn label(self) -> &'static str {
        match self {
            BackendStatus::Checking => "checking",
            BackendStatus::Connected => "connected",
            BackendStatus::Disconnected => "disconnected",
            BackendStatus::Error => "error",
        }
    }
}

/// Why a log stream ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEnd {
    /// The server closed the channel.
    Closed,
    /// Connecting or reading failed.
    Error(String),
}

/// Events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConsoleEvent {
    BackendStatus(BackendStatus),
    Solvers(Vec<String>),
    Defaults(BackendDefaults),
    /// A start request was rejected or could not be sent.
    RunStartFailed { reason: String },
    /// Raw text frame received on the log channel.
    StreamMessage(String),
    StreamEnded(StreamEnd),
    Manifest { run_id: String, files: Vec<ResultFile> },
    Directory { path: String, entries: Vec<FileEntry> },
    TutorialReady { path: String },
    Info(String),
}
