use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key(k: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(k, Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:width$}{what}", "", width = pad)),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key("q / Ctrl-C", 2, "Quit"),
        key("tab", 9, "Switch tabs"),
        key("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Dashboard:"),
        key("↑/↓", 9, "Select field"),
        key("←/→", 9, "Change mode / solver / sequencing"),
        key("enter", 7, "Edit input source or output dir"),
        key("r", 11, "Start run"),
        key("b", 11, "Browse backend files"),
        key("t", 11, "Download tutorial data"),
        Line::from(""),
        Line::from("Live Logs:"),
        key("↑/↓ PgUp/PgDn", 1, "Scroll"),
        key("end", 9, "Follow new lines"),
        key("s", 11, "Save log to a file"),
        key("y", 11, "Copy saved log path to clipboard"),
        Line::from(""),
        Line::from("Network Visualizer:"),
        key("←/→", 9, "Select document"),
        key("↑/↓", 9, "Select download"),
        key("y", 11, "Copy document URL to clipboard"),
        key("d", 11, "Download selected file"),
        Line::from(""),
        Line::from("Data Explorer:"),
        key("y", 11, "Copy explorer URL to clipboard"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
