use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

/// Steps shown on the dashboard for bringing up the backend on this machine.
const STEPS: [(&str, &str); 4] = [
    ("Install uv", "curl -LsSf https://astral.sh/uv/install.sh | sh"),
    ("Install dependencies", "uv sync"),
    (
        "Start the backend",
        "uv run uvicorn backend.main:app --port 8000",
    ),
    (
        "Start the data explorer (optional)",
        "uv run datasette serve assets/ --port 8001",
    ),
];

pub fn setup_lines(api_base: &str) -> Vec<Line<'static>> {
    let mut out = vec![
        Line::from(Span::styled(
            "Client Setup Instructions",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (i, (title, cmd)) in STEPS.iter().enumerate() {
        out.push(Line::from(format!("{}. {title}", i + 1)));
        out.push(Line::from(vec![
            Span::raw("   "),
            Span::styled(*cmd, Style::default().fg(Color::Cyan)),
        ]));
    }
    out.push(Line::from(""));
    out.push(Line::from(vec![
        Span::styled("Backend: ", Style::default().fg(Color::Gray)),
        Span::raw(api_base.to_string()),
    ]));
    out
}
