use thiserror::Error;

use crate::model::{Action, Plan};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanStats {
    pub actions: usize,
    /// Individual key presses, counting each backspace separately.
    pub key_presses: usize,
    /// Backspace actions, i.e. corrected typos.
    pub corrections: usize,
    pub pauses: usize,
    /// Sum of pause midpoints, in seconds.
    pub expected_pause_secs: f64,
}

pub fn stats(actions: &[Action]) -> PlanStats {
    let mut out = PlanStats {
        actions: actions.len(),
        ..Default::default()
    };

    for a in actions {
        match a {
            Action::EmitChar { .. } => out.key_presses += 1,
            Action::Backspace { count } => {
                out.key_presses += count;
                out.corrections += 1;
            }
            Action::Pause(range) => {
                out.pauses += 1;
                out.expected_pause_secs += range.midpoint();
            }
        }
    }

    out
}

pub fn plan_stats(plan: &Plan) -> PlanStats {
    stats(&plan.actions)
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("action {action_index} backspaces {count} chars but only {available} are typed")]
pub struct ReplayError {
    pub action_index: usize,
    pub count: usize,
    pub available: usize,
}

/// Replay actions against an empty buffer: append on `EmitChar`, drop the last
/// `count` chars on `Backspace`. Pauses are ignored.
///
/// Intended for tests and plan inspection.
pub fn replay(actions: &[Action]) -> Result<String, ReplayError> {
    let mut buf: Vec<char> = Vec::new();

    for (action_index, action) in actions.iter().enumerate() {
        match action {
            Action::EmitChar { ch } => buf.push(*ch),
            Action::Backspace { count } => {
                if *count > buf.len() {
                    return Err(ReplayError {
                        action_index,
                        count: *count,
                        available: buf.len(),
                    });
                }
                buf.truncate(buf.len() - count);
            }
            Action::Pause(_) => {}
        }
    }

    Ok(buf.into_iter().collect())
}
