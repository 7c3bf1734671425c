//! TUI application state: the latest fleet snapshot, the selected service
//! for the detail pane, and the scheduler's pause/resume state as seen by
//! the dashboard.

use healthwatch::AggregateResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
}

pub struct App {
    pub latest: Option<AggregateResult>,
    pub selected: usize,
    pub state: RunState,
    pub should_quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self { latest: None, selected: 0, state: RunState::Running, should_quit: false }
    }

    pub fn apply_aggregate(&mut self, aggregate: AggregateResult) {
        let len = aggregate.results.len();
        self.latest = Some(aggregate);
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn select_next(&mut self) {
        let len = self.latest.as_ref().map(|a| a.results.len()).unwrap_or(0);
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn select_previous(&mut self) {
        let len = self.latest.as_ref().map(|a| a.results.len()).unwrap_or(0);
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    pub fn toggle_pause(&mut self) -> RunState {
        self.state = match self.state {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
        };
        self.state
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn selected_snapshot(&self) -> Option<&healthwatch::ServiceSnapshot> {
        self.latest.as_ref().and_then(|a| a.results.get(self.selected))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthwatch::{LatencySummary, Observation, ServiceSnapshot, Status};

    fn aggregate(names: &[&str]) -> AggregateResult {
        AggregateResult {
            status: Status::Ok,
            results: names
                .iter()
                .map(|name| ServiceSnapshot {
                    observation: Observation {
                        service_name: name.to_string(),
                        status: Status::Ok,
                        http_status: Some(200),
                        latency_ms: Some(1.0),
                        timings: None,
                        checked_at: 0,
                        payload: None,
                        error: None,
                        version: None,
                        region: None,
                        url: None,
                    },
                    age_ms: 0,
                })
                .collect(),
            started_at: 0,
            completed_at: 0,
            latency: LatencySummary::default(),
        }
    }

    #[test]
    fn selection_wraps_around_in_both_directions() {
        let mut app = App::new();
        app.apply_aggregate(aggregate(&["a", "b", "c"]));
        app.select_previous();
        assert_eq!(app.selected, 2);
        app.select_next();
        app.select_next();
        assert_eq!(app.selected, 1);
    }

    #[test]
    fn selection_clamped_when_fleet_shrinks() {
        let mut app = App::new();
        app.apply_aggregate(aggregate(&["a", "b", "c"]));
        app.selected = 2;
        app.apply_aggregate(aggregate(&["a"]));
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn toggle_pause_flips_state() {
        let mut app = App::new();
        assert_eq!(app.state, RunState::Running);
        assert_eq!(app.toggle_pause(), RunState::Paused);
        assert_eq!(app.toggle_pause(), RunState::Running);
    }

    #[test]
    fn empty_fleet_keeps_selection_at_zero() {
        let mut app = App::new();
        app.apply_aggregate(aggregate(&[]));
        app.select_next();
        assert_eq!(app.selected, 0);
    }
}
