use serde::{Deserialize, Serialize};

use crate::config::TypingConfig;

pub const PLAN_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub version: u32,
    pub config: TypingConfig,
    pub actions: Vec<Action>,
}

/// Inclusive range of seconds a pause may last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PauseRange {
    pub min: f64,
    pub max: f64,
}

impl PauseRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    EmitChar { ch: char },
    Backspace { count: usize },
    Pause(PauseRange),
}
