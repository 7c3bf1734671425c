//! `run`: the long-lived terminal dashboard. Subscribes to the
//! orchestrator's aggregate stream, renders with `ratatui`, and maps key
//! presses onto pause/resume/quit/navigate.

use crate::cli::ProbeArgs;
use crate::error::CliError;
use crate::signals::shutdown_signal;
use crate::tui::{ui, App};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::stdout;
use std::time::Duration;

pub async fn run(args: ProbeArgs) -> Result<i32, CliError> {
    let (loaded, env) = super::load_and_override(&args.common)?;
    let orchestrator = super::build_orchestrator(loaded, env)?;

    let mut aggregates = orchestrator.subscribe();
    orchestrator.start();

    enable_raw_mode().map_err(|e| CliError::Internal(format!("failed to enable raw mode: {e}")))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| CliError::Internal(format!("failed to enter alternate screen: {e}")))?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))
        .map_err(|e| CliError::Internal(format!("failed to initialize terminal: {e}")))?;

    let mut app = App::new();
    let mut events = spawn_event_reader();

    let result = event_loop(&mut terminal, &mut app, &mut aggregates, &mut events, &orchestrator).await;

    orchestrator.shutdown();
    disable_raw_mode().ok();
    stdout().execute(LeaveAlternateScreen).ok();

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
    aggregates: &mut tokio::sync::broadcast::Receiver<healthwatch::AggregateResult>,
    events: &mut tokio::sync::mpsc::UnboundedReceiver<Event>,
    orchestrator: &healthwatch::Orchestrator,
) -> Result<i32, CliError> {
    loop {
        terminal
            .draw(|frame| ui::draw(frame, app))
            .map_err(|e| CliError::Internal(format!("failed to draw frame: {e}")))?;

        tokio::select! {
            () = shutdown_signal() => {
                app.quit();
            }
            aggregate = aggregates.recv() => {
                if let Ok(aggregate) = aggregate {
                    app.apply_aggregate(aggregate);
                }
            }
            event = events.recv() => {
                if let Some(event) = event {
                    handle_event(app, orchestrator, event);
                }
            }
        }

        if app.should_quit {
            return Ok(0);
        }
    }
}

fn handle_event(app: &mut App, orchestrator: &healthwatch::Orchestrator, event: Event) {
    let Event::Key(key) = event else { return };
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('p') => {
            use crate::tui::app::RunState;
            match app.toggle_pause() {
                RunState::Paused => orchestrator.pause(),
                RunState::Running => orchestrator.resume(),
            }
        }
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        _ => {}
    }
}

/// Crossterm's event reader blocks the calling thread; bridge it onto a
/// background OS thread and forward events over an unbounded channel so
/// the async event loop above can `select!` over it alongside ticks and
/// shutdown signals.
fn spawn_event_reader() -> tokio::sync::mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    if tx.send(ev).is_err() {
                        return;
                    }
                }
                Err(_) => return,
            },
            Ok(false) => {}
            Err(_) => return,
        }
    });
    rx
}
