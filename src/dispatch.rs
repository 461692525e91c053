use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::TypingConfig;
use crate::error::{DispatchError, KeyInjectionError, TypistError};
use crate::keyboard::Key;
use crate::model::Action;
use crate::timing::{pause_delay, TimingModel};
use crate::trace::plan_console_trace;

/// Stop signal shared between a running dispatch and whoever wants to stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The host's key-injection primitive: press and release one key.
pub trait KeySink {
    fn send_key(&mut self, key: Key) -> Result<(), KeyInjectionError>;
}

impl<S: KeySink + ?Sized> KeySink for Box<S> {
    fn send_key(&mut self, key: Key) -> Result<(), KeyInjectionError> {
        (**self).send_key(key)
    }
}

/// Blocks between actions. Implementations should return early once `cancel`
/// is signalled.
pub trait Pacer {
    fn wait(&mut self, delay: Duration, cancel: &CancelToken);
}

/// Sleeps on the current thread in short slices so a cancel lands quickly.
#[derive(Debug, Clone, Copy)]
pub struct ThreadPacer {
    pub slice: Duration,
}

impl Default for ThreadPacer {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(50),
        }
    }
}

impl Pacer for ThreadPacer {
    fn wait(&mut self, delay: Duration, cancel: &CancelToken) {
        let mut remaining = delay;
        while !remaining.is_zero() {
            if cancel.is_cancelled() {
                return;
            }
            let step = remaining.min(self.slice);
            std::thread::sleep(step);
            remaining -= step;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchProgress {
    /// Actions fully carried out.
    pub actions_done: usize,
    pub keys_sent: usize,
    /// Total delay requested from the pacer.
    pub waited: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed(DispatchProgress),
    /// Stopped through the [`CancelToken`]; whatever was typed stays typed.
    Cancelled(DispatchProgress),
}

impl DispatchOutcome {
    pub fn progress(&self) -> DispatchProgress {
        match self {
            DispatchOutcome::Completed(p) | DispatchOutcome::Cancelled(p) => *p,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchOutcome::Cancelled(_))
    }
}

pub struct Dispatcher<S, P = ThreadPacer> {
    sink: S,
    pacer: P,
    cancel: CancelToken,
    trace: bool,
}

impl<S: KeySink> Dispatcher<S, ThreadPacer> {
    pub fn new(sink: S, cancel: CancelToken) -> Self {
        Self {
            sink,
            pacer: ThreadPacer::default(),
            cancel,
            trace: false,
        }
    }
}

impl<S: KeySink, P: Pacer> Dispatcher<S, P> {
    pub fn with_pacer<Q: Pacer>(self, pacer: Q) -> Dispatcher<S, Q> {
        Dispatcher {
            sink: self.sink,
            pacer,
            cancel: self.cancel,
            trace: self.trace,
        }
    }

    /// Log "Typing ..." / "Erase ..." lines as playback reaches them.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn press(
        &mut self,
        key: Key,
        action_index: usize,
        delay: Duration,
        progress: &mut DispatchProgress,
    ) -> Result<(), DispatchError> {
        self.sink
            .send_key(key)
            .map_err(|source| DispatchError {
                key,
                action_index,
                keys_sent: progress.keys_sent,
                source,
            })?;
        progress.keys_sent += 1;
        self.pause(delay, progress);
        Ok(())
    }

    fn pause(&mut self, delay: Duration, progress: &mut DispatchProgress) {
        self.pacer.wait(delay, &self.cancel);
        progress.waited = progress.waited.saturating_add(delay);
    }

    /// Play `actions` in order, one blocking delay after each key or pause.
    ///
    /// `cfg` is validated before the first key. The cancel token is checked
    /// before every action; an action that has started always sends all of
    /// its keys.
    pub fn dispatch(
        &mut self,
        actions: Vec<Action>,
        cfg: &TypingConfig,
        rng: &mut impl Rng,
    ) -> Result<DispatchOutcome, TypistError> {
        let timing = TimingModel::new(cfg)?;
        let trace_events = if self.trace {
            plan_console_trace(&actions)
        } else {
            Vec::new()
        };
        let mut next_trace_event = 0usize;
        let mut progress = DispatchProgress::default();

        debug!(actions = actions.len(), "dispatch started");

        for (action_index, action) in actions.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    actions_done = progress.actions_done,
                    keys_sent = progress.keys_sent,
                    "typing cancelled"
                );
                return Ok(DispatchOutcome::Cancelled(progress));
            }

            while let Some(event) = trace_events
                .get(next_trace_event)
                .filter(|e| e.action_index == action_index)
            {
                info!("{}", event.line);
                next_trace_event += 1;
            }

            match action {
                Action::EmitChar { ch } => {
                    let delay = timing.key_delay(rng);
                    self.press(Key::Char(ch), action_index, delay, &mut progress)?;
                }
                Action::Backspace { count } => {
                    // After a cancel the pacer stops waiting, so the rest of
                    // the run goes out back to back.
                    for _ in 0..count {
                        let delay = timing.key_delay(rng);
                        self.press(Key::Backspace, action_index, delay, &mut progress)?;
                    }
                }
                Action::Pause(range) => {
                    let delay = pause_delay(range, rng);
                    self.pause(delay, &mut progress);
                }
            }
            progress.actions_done += 1;
        }

        debug!(
            keys_sent = progress.keys_sent,
            waited_ms = progress.waited.as_millis() as u64,
            "dispatch finished"
        );
        Ok(DispatchOutcome::Completed(progress))
    }
}
