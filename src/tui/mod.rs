mod export;
mod help;
mod setup;
mod state;

use crate::cli::Cli;
use crate::console::{FollowUp, RunConsole, RunPhase, View};
use crate::model::{BackendStatus, ConsoleEvent};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{push_wrapped_kv, Field, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let client = crate::cli::build_client(&args)?;
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ConsoleEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let console = RunConsole::new(crate::cli::build_config(&args), args.completion);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_client = client.clone();
    let ui_handle = std::thread::spawn(move || {
        run_threaded(UiState::new(console, ui_client), event_rx, cmd_tx)
    });

    let res = orchestrator::run_controller(
        client,
        Duration::from(args.health_interval),
        event_tx,
        cmd_rx,
    )
    .await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<ConsoleEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev, &cmd_tx);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k, &cmd_tx) == KeyOutcome::Quit {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, ev: ConsoleEvent, cmd_tx: &UnboundedSender<UiCommand>) {
    if matches!(ev, ConsoleEvent::Manifest { .. }) {
        state.download_selected = 0;
    }
    match state.console.apply_event(ev) {
        Some(FollowUp::FetchManifest(id)) => {
            let _ = cmd_tx.send(UiCommand::FetchManifest(id));
        }
        Some(FollowUp::RefreshCatalog) => {
            let _ = cmd_tx.send(UiCommand::RefreshCatalog);
        }
        None => {}
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> KeyOutcome {
    if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }

    // Modal input first: the text editor, then the file browser.
    if state.edit.is_some() {
        match k.code {
            KeyCode::Enter => state.commit_edit(),
            KeyCode::Esc => state.cancel_edit(),
            KeyCode::Backspace => {
                if let Some(buf) = state.edit.as_mut() {
                    buf.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(buf) = state.edit.as_mut() {
                    buf.push(c);
                }
            }
            _ => {}
        }
        return KeyOutcome::Continue;
    }
    if state.console.browser.open {
        match k.code {
            KeyCode::Esc => state.console.browser.close(),
            KeyCode::Up | KeyCode::Char('k') => state.console.browser.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => state.console.browser.move_selection(true),
            KeyCode::Enter => {
                if let Some(dir) = state.console.browser_select() {
                    let _ = cmd_tx.send(UiCommand::ListFiles(dir));
                }
            }
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match k.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Tab => state.console.view = state.console.view.next(),
        KeyCode::Char('?') => state.console.view = View::Help,
        _ => match state.console.view {
            View::Dashboard => dashboard_key(state, k.code, cmd_tx),
            View::Logs => logs_key(state, k.code),
            View::Results => results_key(state, k.code, cmd_tx),
            View::Explorer => {
                if k.code == KeyCode::Char('y') {
                    let url = state.explorer_url();
                    copy_with_info(state, &url);
                }
            }
            View::Help => {}
        },
    }
    KeyOutcome::Continue
}

fn dashboard_key(state: &mut UiState, code: KeyCode, cmd_tx: &UnboundedSender<UiCommand>) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => state.move_focus(false),
        KeyCode::Down | KeyCode::Char('j') => state.move_focus(true),
        KeyCode::Left | KeyCode::Char('h') => state.cycle_focused(false),
        KeyCode::Right | KeyCode::Char('l') => state.cycle_focused(true),
        KeyCode::Enter if state.focus.is_text() => state.begin_edit(),
        KeyCode::Char('r') => start_run(state, cmd_tx),
        KeyCode::Char('b') => {
            let dir = state.console.open_browser(".");
            let _ = cmd_tx.send(UiCommand::ListFiles(dir));
        }
        KeyCode::Char('t') => {
            let _ = cmd_tx.send(UiCommand::DownloadTutorial);
        }
        _ => {}
    }
}

fn start_run(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    match state.console.start_run() {
        Some(cfg) => {
            state.log_back = 0;
            state.download_selected = 0;
            let _ = cmd_tx.send(UiCommand::StartRun(cfg));
        }
        None if state.console.backend_status != BackendStatus::Connected => {
            state.console.info = format!(
                "Backend is {}; cannot start a run",
                state.console.backend_status.label()
            );
        }
        None => state.console.info = "Input source is empty".into(),
    }
}

fn logs_key(state: &mut UiState, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => state.scroll_logs(true, 1),
        KeyCode::Down | KeyCode::Char('j') => state.scroll_logs(false, 1),
        KeyCode::PageUp => state.scroll_logs(true, 20),
        KeyCode::PageDown => state.scroll_logs(false, 20),
        KeyCode::End => state.log_back = 0,
        KeyCode::Char('s') => {
            let res = export::output_dir().and_then(|d| export::save_log(&state.console.logs, &d));
            match res {
                Ok(p) => {
                    state.console.info = format!("Saved log: {}", p.display());
                    state.last_saved_log = Some(p);
                }
                Err(e) => state.console.info = format!("Save failed: {e:#}"),
            }
        }
        KeyCode::Char('y') => {
            if let Some(p) = state.last_saved_log.clone() {
                copy_with_info(state, &p.to_string_lossy());
            } else {
                state.console.info = "No saved log path to copy. Save the log first (s)".into();
            }
        }
        _ => {}
    }
}

fn results_key(state: &mut UiState, code: KeyCode, cmd_tx: &UnboundedSender<UiCommand>) {
    match code {
        KeyCode::Left | KeyCode::Char('h') => state.console.select_document(false),
        KeyCode::Right | KeyCode::Char('l') => state.console.select_document(true),
        KeyCode::Up | KeyCode::Char('k') => state.select_download(false),
        KeyCode::Down | KeyCode::Char('j') => state.select_download(true),
        KeyCode::Char('y') => match state.document_url() {
            Some(url) => copy_with_info(state, &url),
            None => state.console.info = "No document selected".into(),
        },
        KeyCode::Char('d') => match (state.selected_download(), export::output_dir()) {
            (Some(file), Ok(dest_dir)) => {
                state.console.info = format!("Downloading {}…", file.label);
                let _ = cmd_tx.send(UiCommand::DownloadArtifact { file, dest_dir });
            }
            (None, _) => state.console.info = "No downloadable file for this run".into(),
            (_, Err(e)) => state.console.info = format!("Download failed: {e:#}"),
        },
        _ => {}
    }
}

fn copy_with_info(state: &mut UiState, text: &str) {
    state.console.info = match export::copy_to_clipboard(text) {
        Ok(()) => {
            let shown = if text.chars().count() > 60 {
                format!("{}...", text.chars().take(57).collect::<String>())
            } else {
                text.to_string()
            };
            format!("✓ Copied to clipboard: {shown}")
        }
        Err(e) => format!("Clipboard copy failed: {e:#}"),
    };
}

fn status_color(status: BackendStatus) -> Color {
    match status {
        BackendStatus::Connected => Color::Green,
        BackendStatus::Checking => Color::Yellow,
        BackendStatus::Disconnected | BackendStatus::Error => Color::Red,
    }
}

fn phase_label(phase: RunPhase) -> (&'static str, Color) {
    match phase {
        RunPhase::Idle => ("idle", Color::Gray),
        RunPhase::Running => ("running", Color::Yellow),
        RunPhase::Completed => ("completed", Color::Green),
        RunPhase::Failed => ("failed", Color::Red),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(
        View::TABS
            .iter()
            .map(|v| Line::from(v.title()))
            .collect::<Vec<_>>(),
    )
    .select(state.console.view.index())
    .block(Block::default().borders(Borders::ALL).title("temoa-console"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.console.view {
        View::Dashboard => draw_dashboard(chunks[1], f, state),
        View::Logs => draw_logs(chunks[1], f, state),
        View::Results => draw_results(chunks[1], f, state),
        View::Explorer => draw_explorer(chunks[1], f, state),
        View::Help => help::draw_help(chunks[1], f),
    }
    draw_status(chunks[2], f, state);

    if state.console.browser.open {
        draw_browser(area, f, state);
    }
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let status = state.console.backend_status;
    let (phase, phase_color) = phase_label(state.console.phase);
    let line = Line::from(vec![
        Span::styled("Backend: ", Style::default().fg(Color::Gray)),
        Span::styled(status.label(), Style::default().fg(status_color(status))),
        Span::raw("  "),
        Span::styled("Run: ", Style::default().fg(Color::Gray)),
        Span::styled(phase, Style::default().fg(phase_color)),
        Span::raw("  "),
        Span::raw(state.console.info.clone()),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn field_value(state: &UiState, field: Field) -> String {
    let cfg = &state.console.config;
    if field == state.focus {
        if let Some(buf) = state.edit.as_deref() {
            return format!("{buf}▏");
        }
    }
    match field {
        Field::Input => cfg.input_database.clone(),
        Field::ScenarioMode => cfg.scenario_mode.label().to_string(),
        Field::Solver => cfg.solver_name.clone(),
        Field::TimeSequencing => cfg.time_sequencing.label().to_string(),
        Field::OutputDir => cfg
            .output_dir
            .clone()
            .unwrap_or_else(|| "(backend default)".into()),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(area);

    let mut lines = Vec::new();
    for field in Field::ALL {
        let focused = field == state.focus;
        let marker = if focused { "▶ " } else { "  " };
        let label_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, label_style),
            Span::styled(field.label(), label_style),
        ]));
        let value = field_value(state, field);
        let value = if field.is_text() || !focused {
            value
        } else {
            format!("◀ {value} ▶")
        };
        lines.push(Line::from(vec![Span::raw("    "), Span::raw(value)]));
        lines.push(Line::from(""));
    }

    let button = if state.console.is_running() {
        Span::styled("Running Model...", Style::default().fg(Color::Yellow))
    } else if state.console.can_start() {
        Span::styled(
            "[r] Start Simulation",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled("[r] Start Simulation", Style::default().fg(Color::DarkGray))
    };
    lines.push(Line::from(button));
    lines.push(Line::from(vec![
        Span::styled("[b]", Style::default().fg(Color::Magenta)),
        Span::raw(" browse files  "),
        Span::styled("[t]", Style::default().fg(Color::Magenta)),
        Span::raw(" tutorial data"),
    ]));

    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Configuration"),
    );
    f.render_widget(form, cols[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(7)].as_ref())
        .split(cols[1]);

    let setup = Paragraph::new(setup::setup_lines(state.client.api_base().as_str()))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Setup"));
    f.render_widget(setup, right[0]);

    let mut run_lines = Vec::new();
    let width = right[1].width;
    push_wrapped_kv(
        &mut run_lines,
        "Run",
        state.console.run_id.as_deref().unwrap_or("-"),
        width,
    );
    push_wrapped_kv(
        &mut run_lines,
        "Solvers",
        &state.console.solvers.join(", "),
        width,
    );
    push_wrapped_kv(
        &mut run_lines,
        "Log lines",
        &state.console.logs.len().to_string(),
        width,
    );
    let run = Paragraph::new(run_lines).block(Block::default().borders(Borders::ALL).title("Run"));
    f.render_widget(run, right[1]);
}

fn log_line_style(line: &str) -> Style {
    if line.contains(crate::console::FAILURE_MARKER) {
        Style::default().fg(Color::Red)
    } else if line.contains(crate::console::SUCCESS_MARKER) {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    }
}

/// The last `rows` screen rows of `logs[..end]`, each line hard-wrapped at `width`
/// characters. Rows carry the index of the log line they belong to.
fn tail_rows(logs: &[String], end: usize, rows: usize, width: usize) -> Vec<(usize, String)> {
    let width = width.max(1);
    let mut out = Vec::new();
    for (idx, line) in logs[..end.min(logs.len())].iter().enumerate().rev() {
        if out.len() >= rows {
            break;
        }
        let chars: Vec<char> = line.chars().collect();
        let mut chunks: Vec<String> = if chars.is_empty() {
            vec![String::new()]
        } else {
            chars.chunks(width).map(|c| c.iter().collect()).collect()
        };
        while let Some(chunk) = chunks.pop() {
            if out.len() >= rows {
                break;
            }
            out.push((idx, chunk));
        }
    }
    out.reverse();
    out
}

fn draw_logs(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let logs = &state.console.logs;
    let rows = area.height.saturating_sub(2) as usize;
    let title = if state.log_back > 0 {
        format!("Execution Logs ({} lines, scrolled)", logs.len())
    } else {
        format!("Execution Logs ({} lines)", logs.len())
    };

    let lines: Vec<Line> = if logs.is_empty() {
        vec![Line::from(Span::styled(
            "Waiting for logs...",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let end = logs.len().saturating_sub(state.log_back);
        let width = area.width.saturating_sub(2) as usize;
        tail_rows(logs, end, rows, width)
            .into_iter()
            .map(|(idx, row)| Line::from(Span::styled(row, log_line_style(&logs[idx]))))
            .collect()
    };

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_results(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let title = format!(
        "Network Visualizer: {}",
        state.console.run_id.as_deref().unwrap_or("No run selected")
    );
    let mut lines = Vec::new();

    let docs: Vec<_> = state.console.documents().collect();
    if docs.is_empty() {
        lines.push(Line::from(Span::styled(
            "No visualization files found for this run.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        let mut spans = Vec::new();
        for doc in &docs {
            let selected = state.console.selected_document.as_deref() == Some(doc.url.as_str());
            let style = if selected {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Cyan)
            };
            spans.push(Span::styled(format!(" {} ", doc.label), style));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
        if let Some(url) = state.document_url() {
            lines.push(Line::from(""));
            push_wrapped_kv(&mut lines, "Open", &url, area.width);
        }
    }

    let downloads = state.downloads();
    if !downloads.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Downloads:"));
        for (i, file) in downloads.iter().enumerate() {
            let selected = i == state.download_selected;
            let marker = if selected { "▶ " } else { "  " };
            let style = if selected {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{marker}Download {}", file.label), style),
                Span::styled(format!("  [{}]", file.kind), Style::default().fg(Color::Gray)),
            ]));
        }
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_explorer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = Vec::new();
    push_wrapped_kv(&mut lines, "Explorer", &state.explorer_url(), area.width);
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Open this address in a browser to explore the model database. Press y to copy it.",
        Style::default().fg(Color::Gray),
    )));
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Data Explorer"));
    f.render_widget(p, area);
}

/// Centered rectangle taking `pct_x`/`pct_y` percent of `area`.
fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - pct_y) / 2),
            Constraint::Percentage(pct_y),
            Constraint::Percentage((100 - pct_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - pct_x) / 2),
            Constraint::Percentage(pct_x),
            Constraint::Percentage((100 - pct_x) / 2),
        ])
        .split(vert[1])[1]
}

fn draw_browser(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let browser = &state.console.browser;
    let popup = centered(area, 70, 70);
    f.render_widget(Clear, popup);

    let title = if browser.loading {
        format!("Select input: {} (loading…)", browser.path)
    } else {
        format!("Select input: {}", browser.path)
    };
    let items: Vec<ListItem> = browser
        .entries
        .iter()
        .map(|e| {
            if e.is_dir {
                ListItem::new(Span::styled(
                    format!("{}/", e.name),
                    Style::default().fg(Color::Cyan),
                ))
            } else {
                ListItem::new(e.name.clone())
            }
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    let mut list_state = ListState::default();
    if !browser.entries.is_empty() {
        list_state.select(Some(browser.selected));
    }
    f.render_stateful_widget(list, popup, &mut list_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendClient;
    use crate::console::CompletionPolicy;
    use crate::model::RunConfiguration;

    fn state() -> UiState {
        let console = RunConsole::new(RunConfiguration::default(), CompletionPolicy::SignalOnly);
        let client = BackendClient::new("http://localhost:8000", None).unwrap();
        UiState::new(console, client)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn run_key_needs_connected_backend() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = state();
        handle_key(&mut s, press(KeyCode::Char('r')), &tx);
        assert!(rx.try_recv().is_err());
        assert!(s.console.info.contains("checking"));

        apply_event(&mut s, ConsoleEvent::BackendStatus(BackendStatus::Connected), &tx);
        assert!(matches!(rx.try_recv(), Ok(UiCommand::RefreshCatalog)));

        handle_key(&mut s, press(KeyCode::Char('r')), &tx);
        assert!(matches!(rx.try_recv(), Ok(UiCommand::StartRun(_))));
        assert_eq!(s.console.view, View::Logs);
    }

    #[test]
    fn results_signal_requests_manifest() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = state();
        s.console.set_backend_status(BackendStatus::Connected);
        s.console.start_run();
        apply_event(&mut s, ConsoleEvent::StreamMessage("RESULTS_READY:run-7".into()), &tx);
        match rx.try_recv() {
            Ok(UiCommand::FetchManifest(id)) => assert_eq!(id, "run-7"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn editing_captures_q_instead_of_quitting() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut s = state();
        handle_key(&mut s, press(KeyCode::Enter), &tx);
        assert!(s.edit.is_some());
        assert_eq!(
            handle_key(&mut s, press(KeyCode::Char('q')), &tx),
            KeyOutcome::Continue
        );
        handle_key(&mut s, press(KeyCode::Enter), &tx);
        assert_eq!(
            s.console.config.input_database,
            "assets/tutorial_database.sqliteq"
        );
        assert_eq!(
            handle_key(&mut s, press(KeyCode::Char('q')), &tx),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn browser_key_lists_directory() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = state();
        handle_key(&mut s, press(KeyCode::Char('b')), &tx);
        assert!(s.console.browser.open);
        match rx.try_recv() {
            Ok(UiCommand::ListFiles(p)) => assert_eq!(p, "."),
            other => panic!("unexpected {other:?}"),
        }
        handle_key(&mut s, press(KeyCode::Esc), &tx);
        assert!(!s.console.browser.open);
    }

    #[test]
    fn long_log_lines_wrap_and_keep_the_tail_visible() {
        let logs: Vec<String> = vec!["abcdefgh".into(), "".into(), "xy".into()];
        let rows = tail_rows(&logs, logs.len(), 3, 3);
        assert_eq!(
            rows,
            vec![(0, "gh".to_string()), (1, String::new()), (2, "xy".to_string())]
        );

        // scrolled back past the last line
        let rows = tail_rows(&logs, 1, 10, 3);
        assert_eq!(
            rows,
            vec![
                (0, "abc".to_string()),
                (0, "def".to_string()),
                (0, "gh".to_string())
            ]
        );
    }

    #[test]
    fn tab_cycles_views() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut s = state();
        for expected in [View::Logs, View::Results, View::Explorer, View::Help, View::Dashboard] {
            handle_key(&mut s, press(KeyCode::Tab), &tx);
            assert_eq!(s.console.view, expected);
        }
    }
}
