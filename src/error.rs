//! Error types for the typing engine.
//!
//! Configuration problems are caught before a single key is sent; dispatch
//! failures carry enough progress information for the caller to decide what to
//! do with the partially typed text. Cancellation is not an error, see
//! [`crate::dispatch::DispatchOutcome`].

use thiserror::Error;

use crate::keyboard::Key;

/// A [`crate::config::TypingConfig`] value that violates one of its invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be finite")]
    NotFinite { field: &'static str },

    #[error("{field} must be > 0 (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("wpm_min must be <= wpm_max (got {min} > {max})")]
    WpmRange { min: f64, max: f64 },

    #[error("jitter_fraction must be >= 0 (got {0})")]
    NegativeJitter(f64),

    #[error("{field} must be between 0.0 and 1.0 (got {value})")]
    Probability { field: &'static str, value: f64 },

    #[error("typo weight for {kind} must be >= 0 (got {value})")]
    NegativeWeight { kind: &'static str, value: f64 },

    #[error("at least one typo kind weight must be > 0")]
    NoTypoKinds,

    #[error("long_word_pause_threshold must be >= 1")]
    ZeroThreshold,

    #[error("{field} must satisfy 0 <= min <= max (got {min}..{max})")]
    PauseRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
}

/// Failure reported by a key sink for a single key.
#[derive(Error, Debug)]
pub enum KeyInjectionError {
    #[error("no keystroke for {0} on this backend")]
    Unsupported(Key),

    #[error("backend rejected the key: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The key sink failed part-way through a run. Keys already sent stay sent.
#[derive(Error, Debug)]
#[error("failed to send {key} at action {action_index} ({keys_sent} keys already sent)")]
pub struct DispatchError {
    pub key: Key,
    pub action_index: usize,
    pub keys_sent: usize,
    #[source]
    pub source: KeyInjectionError,
}

#[derive(Error, Debug)]
pub enum TypistError {
    #[error("invalid typing profile: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
