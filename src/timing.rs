//! Per-key delay model.
//!
//! Every key gets its own speed draw so the pace drifts over a run instead of
//! locking onto a single WPM figure.

use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::config::TypingConfig;
use crate::error::ConfigError;
use crate::model::PauseRange;

pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Floor for any per-key delay.
pub const MIN_KEY_DELAY: Duration = Duration::from_millis(5);

/// Seconds to a `Duration`, clamped to `0..=Duration::MAX`.
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone)]
pub struct TimingModel {
    wpm: Uniform<f64>,
    /// Unit draw, scaled by `jitter_fraction` so huge fractions cannot
    /// overflow the sampler's range.
    jitter: Uniform<f64>,
    jitter_fraction: f64,
    chars_per_word: f64,
}

impl TimingModel {
    pub fn new(cfg: &TypingConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self {
            wpm: Uniform::new_inclusive(cfg.wpm_min, cfg.wpm_max),
            jitter: Uniform::new_inclusive(-1.0, 1.0),
            jitter_fraction: cfg.jitter_fraction,
            chars_per_word: cfg.chars_per_word,
        })
    }

    pub fn key_delay(&self, rng: &mut impl Rng) -> Duration {
        let wpm = self.wpm.sample(rng);
        let base = SECONDS_PER_MINUTE / (wpm * self.chars_per_word);
        let jittered = base * (1.0 + self.jitter_fraction * self.jitter.sample(rng));
        saturating_secs(jittered.max(MIN_KEY_DELAY.as_secs_f64()))
    }
}

pub fn pause_delay(range: PauseRange, rng: &mut impl Rng) -> Duration {
    let min = range.min.max(0.0);
    let secs = if range.max > min {
        rng.gen_range(min..=range.max)
    } else {
        min
    };
    saturating_secs(secs)
}

/// Smallest and largest delay [`TimingModel::key_delay`] can produce for `cfg`.
pub fn key_delay_bounds(cfg: &TypingConfig) -> (Duration, Duration) {
    let floor = MIN_KEY_DELAY.as_secs_f64();
    let fastest = SECONDS_PER_MINUTE / (cfg.wpm_max * cfg.chars_per_word);
    let slowest = SECONDS_PER_MINUTE / (cfg.wpm_min * cfg.chars_per_word);
    let lo = (fastest * (1.0 - cfg.jitter_fraction)).max(floor);
    let hi = (slowest * (1.0 + cfg.jitter_fraction)).max(floor);
    (saturating_secs(lo), saturating_secs(hi))
}
