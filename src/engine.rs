use rand::Rng;
use tracing::info;

use crate::config::TypingConfig;
use crate::dispatch::{DispatchOutcome, Dispatcher, KeySink, Pacer};
use crate::error::TypistError;
use crate::planner::plan;
use crate::sim::stats;

/// Plan `text` and type it through `dispatcher`.
///
/// A bad profile fails before any key is sent. Cancelling through the
/// dispatcher's token is reported as [`DispatchOutcome::Cancelled`], not as an
/// error.
pub fn run<S: KeySink, P: Pacer>(
    text: &str,
    cfg: &TypingConfig,
    dispatcher: &mut Dispatcher<S, P>,
    rng: &mut impl Rng,
) -> Result<DispatchOutcome, TypistError> {
    let actions = plan(text, cfg, rng)?;

    let s = stats(&actions);
    info!(
        "Planned: {} actions, {} key presses, {} corrections, ~{:.1}s of pauses",
        s.actions, s.key_presses, s.corrections, s.expected_pause_secs
    );

    dispatcher.dispatch(actions, cfg, rng)
}
