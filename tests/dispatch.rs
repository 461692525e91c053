use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::config::{Preset, TypingConfig};
use typist::dispatch::{CancelToken, DispatchOutcome, Dispatcher, KeySink, Pacer};
use typist::engine::run;
use typist::error::{KeyInjectionError, TypistError};
use typist::keyboard::Key;
use typist::model::{Action, PauseRange};
use typist::timing::key_delay_bounds;

/// Records every key and, optionally, pulls the plug after a number of sends.
#[derive(Debug, Default)]
struct RecordingSink {
    keys: Vec<Key>,
    cancel_after: Option<(usize, CancelToken)>,
    fail_at: Option<usize>,
}

impl KeySink for RecordingSink {
    fn send_key(&mut self, key: Key) -> Result<(), KeyInjectionError> {
        if self.fail_at == Some(self.keys.len()) {
            return Err(KeyInjectionError::Backend("device went away".to_string()));
        }
        self.keys.push(key);
        if let Some((n, token)) = &self.cancel_after {
            if self.keys.len() == *n {
                token.cancel();
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingPacer {
    waits: Vec<Duration>,
}

impl Pacer for RecordingPacer {
    fn wait(&mut self, delay: Duration, _cancel: &CancelToken) {
        self.waits.push(delay);
    }
}

fn dispatcher(
    sink: RecordingSink,
    cancel: CancelToken,
) -> Dispatcher<RecordingSink, RecordingPacer> {
    Dispatcher::new(sink, cancel).with_pacer(RecordingPacer::default())
}

fn chars(text: &str) -> Vec<Action> {
    text.chars().map(|ch| Action::EmitChar { ch }).collect()
}

fn within(d: Duration, lo: Duration, hi: Duration) -> bool {
    let eps = Duration::from_micros(1);
    d + eps >= lo && d <= hi + eps
}

#[test]
fn empty_plan_sends_nothing() {
    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    let outcome = d
        .dispatch(Vec::new(), &TypingConfig::default(), &mut StdRng::seed_from_u64(0))
        .expect("nothing to fail");

    assert_eq!(outcome.progress().keys_sent, 0);
    assert!(!outcome.is_cancelled());
    assert!(d.sink().keys.is_empty());
    assert!(d.pacer().waits.is_empty());
}

#[test]
fn backspace_count_becomes_that_many_keys() {
    let mut actions = chars("abc");
    actions.push(Action::Backspace { count: 3 });

    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    let outcome = d
        .dispatch(actions, &TypingConfig::default(), &mut StdRng::seed_from_u64(1))
        .expect("sink never fails");

    assert_eq!(outcome.progress().keys_sent, 6);
    assert_eq!(outcome.progress().actions_done, 4);
    assert_eq!(
        d.sink().keys,
        vec![
            Key::Char('a'),
            Key::Char('b'),
            Key::Char('c'),
            Key::Backspace,
            Key::Backspace,
            Key::Backspace,
        ]
    );
    // Every key press is followed by its own delay.
    assert_eq!(d.pacer().waits.len(), 6);
}

#[test]
fn cancel_stops_before_the_next_action() {
    let cancel = CancelToken::new();
    let sink = RecordingSink {
        cancel_after: Some((4, cancel.clone())),
        ..Default::default()
    };

    let mut d = dispatcher(sink, cancel);
    let outcome = d
        .dispatch(chars("abcdefghij"), &TypingConfig::default(), &mut StdRng::seed_from_u64(2))
        .expect("cancel is not an error");

    match outcome {
        DispatchOutcome::Cancelled(progress) => {
            assert_eq!(progress.keys_sent, 4);
            assert_eq!(progress.actions_done, 4);
        }
        other => panic!("expected a cancelled outcome, got {other:?}"),
    }
    assert_eq!(d.sink().keys.len(), 4);
}

#[test]
fn multi_key_action_finishes_after_cancel() {
    let cancel = CancelToken::new();
    let sink = RecordingSink {
        cancel_after: Some((3, cancel.clone())),
        ..Default::default()
    };
    let mut actions = chars("ab");
    actions.push(Action::Backspace { count: 2 });
    actions.extend(chars("cd"));

    let mut d = dispatcher(sink, cancel);
    let outcome = d
        .dispatch(actions, &TypingConfig::default(), &mut StdRng::seed_from_u64(3))
        .expect("cancel is not an error");

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.progress().keys_sent, 4);
    assert_eq!(outcome.progress().actions_done, 3);
}

#[test]
fn sink_failure_reports_progress() {
    let sink = RecordingSink {
        fail_at: Some(2),
        ..Default::default()
    };

    let mut d = dispatcher(sink, CancelToken::new());
    let err = d
        .dispatch(chars("xyz"), &TypingConfig::default(), &mut StdRng::seed_from_u64(4))
        .unwrap_err();
    let TypistError::Dispatch(err) = err else {
        panic!("expected a sink failure, got {err:?}");
    };

    assert_eq!(err.key, Key::Char('z'));
    assert_eq!(err.action_index, 2);
    assert_eq!(err.keys_sent, 2);
    assert!(err.to_string().contains("2 keys already sent"));
}

#[test]
fn key_delays_stay_within_bounds() {
    let cfg = TypingConfig {
        wpm_min: 40.0,
        wpm_max: 90.0,
        chars_per_word: 1.0,
        jitter_fraction: 0.3,
        ..Default::default()
    };
    let (lo, hi) = key_delay_bounds(&cfg);

    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    d.dispatch(chars(&"k".repeat(2_000)), &cfg, &mut StdRng::seed_from_u64(5))
        .expect("sink never fails");

    let expected_lo = Duration::from_secs_f64(60.0 / 90.0 * 0.7);
    let expected_hi = Duration::from_secs_f64(60.0 / 40.0 * 1.3);
    assert!(within(lo, expected_lo, expected_lo), "lower bound {lo:?}");
    assert!(within(hi, expected_hi, expected_hi), "upper bound {hi:?}");
    for &delay in &d.pacer().waits {
        assert!(within(delay, lo, hi), "{delay:?} outside {lo:?}..={hi:?}");
    }
}

#[test]
fn pause_delay_comes_from_its_range() {
    let range = PauseRange::new(0.2, 0.4);
    let actions = vec![Action::Pause(range); 200];

    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    let outcome = d
        .dispatch(actions, &TypingConfig::default(), &mut StdRng::seed_from_u64(6))
        .expect("no keys to fail");

    assert_eq!(outcome.progress().keys_sent, 0);
    let lo = Duration::from_secs_f64(range.min);
    let hi = Duration::from_secs_f64(range.max);
    for &delay in &d.pacer().waits {
        assert!(within(delay, lo, hi), "{delay:?} outside {lo:?}..={hi:?}");
    }
}

#[test]
fn run_types_the_text() {
    let text = "The quick brown fox, jumping.";
    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    let outcome = run(
        text,
        &Preset::FastButMessy.config(),
        &mut d,
        &mut StdRng::seed_from_u64(7),
    )
    .expect("valid profile");
    assert!(!outcome.is_cancelled());

    let mut screen = String::new();
    for key in &d.sink().keys {
        match key {
            Key::Char(c) => screen.push(*c),
            Key::Backspace => {
                screen.pop();
            }
        }
    }
    assert_eq!(screen, text);
}

#[test]
fn run_rejects_bad_profile_without_typing() {
    let cfg = TypingConfig {
        typo_rate: 1.5,
        ..Default::default()
    };
    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    let err = run("abc", &cfg, &mut d, &mut StdRng::seed_from_u64(8)).unwrap_err();

    assert!(matches!(err, TypistError::Config(_)));
    assert!(d.sink().keys.is_empty());
}

#[test]
fn dispatch_rejects_bad_profile_without_typing() {
    let cfg = TypingConfig {
        wpm_min: 90.0,
        wpm_max: 40.0,
        ..Default::default()
    };
    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    let err = d
        .dispatch(chars("abc"), &cfg, &mut StdRng::seed_from_u64(9))
        .unwrap_err();

    assert!(matches!(err, TypistError::Config(_)));
    assert!(d.sink().keys.is_empty());
}

#[test]
fn huge_pause_saturates_instead_of_panicking() {
    let cfg = TypingConfig {
        typo_rate: 0.0,
        punctuation_mistake_rate: 0.0,
        think_pause_rate: 1.0,
        think_pause_range: PauseRange::new(1e300, 1e300),
        ..Default::default()
    };
    assert!(cfg.validate().is_ok());

    let mut d = dispatcher(RecordingSink::default(), CancelToken::new());
    let outcome = run("hi there", &cfg, &mut d, &mut StdRng::seed_from_u64(10))
        .expect("valid profile");

    assert_eq!(outcome.progress().keys_sent, 8);
    assert!(d.pacer().waits.contains(&Duration::MAX));
    assert_eq!(outcome.progress().waited, Duration::MAX);
}

#[test]
fn cancelled_backspace_run_finishes_without_waiting() {
    let cfg = TypingConfig {
        wpm_min: 1.0,
        wpm_max: 1.0,
        jitter_fraction: 0.0,
        ..Default::default()
    };
    let cancel = CancelToken::new();
    let sink = RecordingSink {
        cancel_after: Some((1, cancel.clone())),
        ..Default::default()
    };

    // Real sleeps here: each key would otherwise wait 12 seconds.
    let mut d = Dispatcher::new(sink, cancel);
    let started = Instant::now();
    let outcome = d
        .dispatch(
            vec![Action::Backspace { count: 3 }, Action::EmitChar { ch: 'x' }],
            &cfg,
            &mut StdRng::seed_from_u64(11),
        )
        .expect("cancel is not an error");

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.progress().keys_sent, 3);
    assert_eq!(d.sink().keys, vec![Key::Backspace; 3]);
}
