use crate::backend::BackendClient;
use crate::console::RunConsole;
use crate::model::ResultFile;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::path::PathBuf;

/// Editable fields of the configuration form, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Input,
    ScenarioMode,
    Solver,
    TimeSequencing,
    OutputDir,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Input,
        Field::ScenarioMode,
        Field::Solver,
        Field::TimeSequencing,
        Field::OutputDir,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Input => "Input Source (.sqlite or .toml)",
            Field::ScenarioMode => "Scenario Mode",
            Field::Solver => "Solver",
            Field::TimeSequencing => "Time Sequencing",
            Field::OutputDir => "Output Directory",
        }
    }

    /// Free-text fields are edited through a buffer; the others cycle through choices.
    pub fn is_text(self) -> bool {
        matches!(self, Field::Input | Field::OutputDir)
    }
}

pub struct UiState {
    pub console: RunConsole,
    pub client: BackendClient,
    pub focus: Field,
    /// Edit buffer while a text field is being edited.
    pub edit: Option<String>,
    /// Lines scrolled back from the tail of the log; 0 follows new lines.
    pub log_back: usize,
    pub download_selected: usize,
    pub last_saved_log: Option<PathBuf>,
}

impl UiState {
    pub fn new(console: RunConsole, client: BackendClient) -> Self {
        Self {
            console,
            client,
            focus: Field::Input,
            edit: None,
            log_back: 0,
            download_selected: 0,
            last_saved_log: None,
        }
    }

    pub fn move_focus(&mut self, forward: bool) {
        let n = Field::ALL.len();
        let idx = Field::ALL.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward { (idx + 1) % n } else { (idx + n - 1) % n };
        self.focus = Field::ALL[next];
    }

    /// Cycle the focused choice field.
    pub fn cycle_focused(&mut self, forward: bool) {
        let cfg = &mut self.console.config;
        match self.focus {
            Field::ScenarioMode => cfg.scenario_mode = cfg.scenario_mode.cycle(forward),
            Field::TimeSequencing => cfg.time_sequencing = cfg.time_sequencing.cycle(forward),
            Field::Solver => self.console.cycle_solver(forward),
            Field::Input | Field::OutputDir => {}
        }
    }

    pub fn begin_edit(&mut self) {
        let cfg = &self.console.config;
        self.edit = match self.focus {
            Field::Input => Some(cfg.input_database.clone()),
            Field::OutputDir => Some(cfg.output_dir.clone().unwrap_or_default()),
            _ => None,
        };
    }

    pub fn commit_edit(&mut self) {
        let Some(buf) = self.edit.take() else {
            return;
        };
        let cfg = &mut self.console.config;
        match self.focus {
            Field::Input => cfg.input_database = buf,
            Field::OutputDir => {
                let trimmed = buf.trim();
                cfg.output_dir = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            _ => {}
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    pub fn scroll_logs(&mut self, up: bool, lines: usize) {
        let max = self.console.logs.len().saturating_sub(1);
        self.log_back = if up {
            (self.log_back + lines).min(max)
        } else {
            self.log_back.saturating_sub(lines)
        };
    }

    pub fn downloads(&self) -> Vec<&ResultFile> {
        self.console.downloads().collect()
    }

    pub fn select_download(&mut self, forward: bool) {
        let n = self.downloads().len();
        if n == 0 {
            return;
        }
        self.download_selected = if forward {
            (self.download_selected + 1) % n
        } else {
            (self.download_selected + n - 1) % n
        };
    }

    pub fn selected_download(&self) -> Option<ResultFile> {
        self.downloads()
            .get(self.download_selected)
            .map(|f| (*f).clone())
    }

    /// Absolute URL of the document selected on the results view.
    pub fn document_url(&self) -> Option<String> {
        self.console
            .selected_document
            .as_deref()
            .map(|u| self.client.resolve(u))
    }

    pub fn explorer_url(&self) -> String {
        self.client.explorer_url(self.console.config.explorer_port)
    }
}

/// Push `label: value`, wrapping long values onto indented continuation lines.
pub fn push_wrapped_kv(out: &mut Vec<Line<'static>>, label: &str, value: &str, width: u16) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };
        let take = (remaining.len() as u16).min(line_width) as usize;
        let (chunk, rest) = remaining.split_at(take);
        let chunk: String = chunk.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(chunk),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(chunk)]));
        }
        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CompletionPolicy;
    use crate::model::{ResultKind, RunConfiguration, ScenarioMode};

    fn state() -> UiState {
        let console = RunConsole::new(RunConfiguration::default(), CompletionPolicy::SignalOnly);
        let client = BackendClient::new("http://localhost:8000", None).unwrap();
        UiState::new(console, client)
    }

    #[test]
    fn focus_wraps_and_choice_fields_cycle() {
        let mut s = state();
        s.move_focus(false);
        assert_eq!(s.focus, Field::OutputDir);
        s.move_focus(true);
        s.move_focus(true);
        assert_eq!(s.focus, Field::ScenarioMode);
        s.cycle_focused(true);
        assert_eq!(s.console.config.scenario_mode, ScenarioMode::Mga);
    }

    #[test]
    fn edits_commit_or_cancel() {
        let mut s = state();
        s.begin_edit();
        s.edit.as_mut().unwrap().push_str(".bak");
        s.cancel_edit();
        assert_eq!(s.console.config.input_database, "assets/tutorial_database.sqlite");

        s.begin_edit();
        *s.edit.as_mut().unwrap() = "data/us9r.toml".into();
        s.commit_edit();
        assert_eq!(s.console.config.input_database, "data/us9r.toml");

        s.focus = Field::OutputDir;
        s.begin_edit();
        *s.edit.as_mut().unwrap() = "  ".into();
        s.commit_edit();
        assert_eq!(s.console.config.output_dir, None);
    }

    #[test]
    fn log_scroll_is_clamped() {
        let mut s = state();
        s.console.logs = (0..5).map(|i| format!("line {i}")).collect();
        s.scroll_logs(true, 10);
        assert_eq!(s.log_back, 4);
        s.scroll_logs(false, 1);
        assert_eq!(s.log_back, 3);
        s.scroll_logs(false, 10);
        assert_eq!(s.log_back, 0);
    }

    #[test]
    fn downloads_and_document_urls_resolve_against_backend() {
        let mut s = state();
        let file = |label: &str, kind| ResultFile {
            label: label.into(),
            url: format!("/results/r1/{label}"),
            kind,
            name: None,
        };
        s.console.results = vec![
            file("a.html", ResultKind::Html),
            file("out.xlsx", ResultKind::Xlsx),
            file("out.sqlite", ResultKind::Sqlite),
        ];
        s.console.selected_document = Some("/results/r1/a.html".into());
        assert_eq!(
            s.document_url().as_deref(),
            Some("http://localhost:8000/results/r1/a.html")
        );
        s.select_download(false);
        assert_eq!(s.selected_download().unwrap().label, "out.sqlite");
        assert_eq!(s.explorer_url(), "http://localhost:8001");
    }

    #[test]
    fn wrapped_kv_splits_long_values() {
        let mut out = Vec::new();
        push_wrapped_kv(&mut out, "Input", "abcdefghij", 14);
        // usable 10, first line 10 - 7 = 3 chars, then 8 per line
        assert_eq!(out.len(), 2);
        push_wrapped_kv(&mut out, "Empty", "   ", 40);
        assert_eq!(out.len(), 2);
    }
}
