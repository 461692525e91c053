use crate::model::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub action_index: usize,
    pub line: String,
}

fn escape_for_log(s: &str) -> String {
    s.escape_debug().to_string()
}

#[derive(Debug, Default)]
struct TracePlanner {
    buf: Vec<char>,
    run_start: Option<usize>,
    run: String,
    events: Vec<TraceEvent>,
}

impl TracePlanner {
    fn flush_run(&mut self) {
        let Some(action_index) = self.run_start.take() else {
            return;
        };
        let line = format!("Typing \"{}\"...", escape_for_log(&self.run));
        self.events.push(TraceEvent { action_index, line });
        self.run.clear();
    }

    fn observe_action(&mut self, action_index: usize, action: &Action) {
        match action {
            Action::EmitChar { ch } => {
                self.run_start.get_or_insert(action_index);
                self.run.push(*ch);
                self.buf.push(*ch);
            }
            Action::Backspace { count } => {
                self.flush_run();
                let keep = self.buf.len().saturating_sub(*count);
                let erased: String = self.buf.drain(keep..).collect();
                self.events.push(TraceEvent {
                    action_index,
                    line: format!("Erase \"{}\"...", escape_for_log(&erased)),
                });
            }
            // Pauses fall inside a typing run.
            Action::Pause(_) => {}
        }
    }
}

/// Precompute console trace events so each line can be printed when playback
/// reaches the first action it describes.
pub fn plan_console_trace(actions: &[Action]) -> Vec<TraceEvent> {
    let mut planner = TracePlanner::default();
    for (action_index, action) in actions.iter().enumerate() {
        planner.observe_action(action_index, action);
    }
    planner.flush_run();
    planner.events
}
