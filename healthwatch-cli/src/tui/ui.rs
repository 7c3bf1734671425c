//! Dashboard layout: a summary header, a per-service status list, and a
//! detail pane for the selected service. Any rendered service URL is
//! redacted before it reaches the terminal.

use crate::tui::app::{App, RunState};
use healthwatch::{redact_url_credentials, Status};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(frame.area());

    draw_header(frame, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    draw_service_list(frame, body[0], app);
    draw_detail_pane(frame, body[1], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let (status_label, color) = match app.latest.as_ref().map(|a| a.status) {
        Some(Status::Ok) => ("OK", Color::Green),
        Some(Status::Degraded) => ("DEGRADED", Color::Yellow),
        Some(Status::Down) => ("DOWN", Color::Red),
        None => ("WAITING", Color::Gray),
    };
    let state_label = match app.state {
        RunState::Running => "running",
        RunState::Paused => "paused",
    };
    let latency = app.latest.as_ref().and_then(|a| a.latency.p50).map(|v| format!("{v:.0}ms p50")).unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(format!(" {status_label} "), Style::default().fg(Color::Black).bg(color)),
        Span::raw(format!("  [{state_label}]  {latency}  (q quit, p pause/resume, ↑/↓ select)")),
    ]);
    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("healthwatch"));
    frame.render_widget(header, area);
}

fn draw_service_list(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .latest
        .as_ref()
        .map(|aggregate| {
            aggregate
                .results
                .iter()
                .enumerate()
                .map(|(idx, snapshot)| {
                    let obs = &snapshot.observation;
                    let (marker, color) = match obs.status {
                        Status::Ok => ("●", Color::Green),
                        Status::Degraded => ("●", Color::Yellow),
                        Status::Down => ("●", Color::Red),
                    };
                    let latency = obs.latency_ms.map(|v| format!("{v:.0}ms")).unwrap_or_else(|| "-".to_string());
                    let line = format!(" {marker} {:<24} {:>8}  age {}ms", obs.service_name, latency, snapshot.age_ms);
                    let style = if idx == app.selected {
                        Style::default().add_modifier(Modifier::REVERSED)
                    } else {
                        Style::default().fg(color)
                    };
                    ListItem::new(line).style(style)
                })
                .collect()
        })
        .unwrap_or_default();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("services"));
    frame.render_widget(list, area);
}

fn draw_detail_pane(frame: &mut Frame, area: Rect, app: &App) {
    let body = match app.selected_snapshot() {
        None => "no service selected".to_string(),
        Some(snapshot) => {
            let obs = &snapshot.observation;
            let url = obs.url.as_deref().map(redact_url_credentials).unwrap_or_else(|| "-".to_string());
            let mut lines = vec![
                format!("name:      {}", obs.service_name),
                format!("status:    {}", obs.status),
                format!("url:       {url}"),
                format!("http:      {}", obs.http_status.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())),
                format!("latency:   {}", obs.latency_ms.map(|v| format!("{v:.1}ms")).unwrap_or_else(|| "-".to_string())),
                format!("age:       {}ms", snapshot.age_ms),
            ];
            if let Some(version) = &obs.version {
                lines.push(format!("version:   {version}"));
            }
            if let Some(region) = &obs.region {
                lines.push(format!("region:    {region}"));
            }
            if let Some(error) = &obs.error {
                lines.push(format!("error:     {error}"));
            }
            lines.join("\n")
        }
    };
    let pane = Paragraph::new(body).block(Block::default().borders(Borders::ALL).title("detail"));
    frame.render_widget(pane, area);
}
