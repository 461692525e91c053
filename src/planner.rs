use rand::distributions::WeightedIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::Distribution;
use tracing::{debug, trace};

use crate::config::{TypingConfig, TypoKind};
use crate::error::ConfigError;
use crate::keyboard::qwerty_adjacent_char;
use crate::model::{Action, PauseRange, Plan, PLAN_VERSION};

/// Punctuation marks that can be mistyped (and are always fixed).
pub const PUNCTUATION_MARKS: [char; 6] = [',', '.', '!', '?', ';', ':'];

const LONG_WORD_PAUSE: PauseRange = PauseRange::new(0.08, 0.22);
const SENTENCE_END_PAUSE: PauseRange = PauseRange::new(0.25, 0.65);
const CLAUSE_PAUSE: PauseRange = PauseRange::new(0.08, 0.25);

const MAX_OMISSION_LOOKAHEAD: usize = 2;

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '_'
}

pub fn is_punctuation_mark(c: char) -> bool {
    PUNCTUATION_MARKS.contains(&c)
}

fn punctuation_pause(c: char) -> Option<PauseRange> {
    match c {
        '.' | '!' | '?' => Some(SENTENCE_END_PAUSE),
        ',' | ';' | ':' => Some(CLAUSE_PAUSE),
        _ => None,
    }
}

/// Normalize CRLF and lone CR line endings to LF.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[derive(Debug, Clone, Default)]
struct ActionBuilder {
    actions: Vec<Action>,
}

impl ActionBuilder {
    fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    fn emit(&mut self, ch: char) {
        self.actions.push(Action::EmitChar { ch });
    }

    fn emit_all(&mut self, chars: &[char]) {
        for &ch in chars {
            self.emit(ch);
        }
    }

    fn backspace(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.actions.push(Action::Backspace { count });
    }

    fn pause(&mut self, range: PauseRange) {
        self.actions.push(Action::Pause(range));
    }

    fn hesitate(&mut self, range: Option<PauseRange>) {
        if let Some(range) = range {
            self.pause(range);
        }
    }
}

/// What a single typo did while planning one word.
#[derive(Debug, Clone, Copy)]
struct TypoEvent {
    kind: TypoKind,
    index: usize,
    /// Source characters resolved by the typo and its correction.
    consumed: usize,
}

fn random_letter_other_than(c: char, rng: &mut impl Rng) -> char {
    let lower = c.to_ascii_lowercase();
    loop {
        let candidate = rng.gen_range(b'a'..=b'z') as char;
        if candidate != lower {
            return if c.is_uppercase() {
                candidate.to_ascii_uppercase()
            } else {
                candidate
            };
        }
    }
}

/// A plausible wrong key for `c`.
fn wrong_char_for(c: char, rng: &mut impl Rng) -> char {
    if is_punctuation_mark(c) {
        let others: Vec<char> = PUNCTUATION_MARKS
            .iter()
            .copied()
            .filter(|&p| p != c)
            .collect();
        if let Some(&p) = others.choose(rng) {
            return p;
        }
    }
    qwerty_adjacent_char(c, rng).unwrap_or_else(|| random_letter_other_than(c, rng))
}

struct TypoPlanner<'a> {
    chars: &'a [char],
    correction_pause: Option<PauseRange>,
}

impl TypoPlanner<'_> {
    fn substitution(&self, b: &mut ActionBuilder, i: usize, rng: &mut impl Rng) -> TypoEvent {
        let c = self.chars[i];
        b.emit(wrong_char_for(c, rng));
        b.hesitate(self.correction_pause);
        b.backspace(1);
        b.emit(c);
        TypoEvent {
            kind: TypoKind::Substitution,
            index: i,
            consumed: 1,
        }
    }

    fn transposition(&self, b: &mut ActionBuilder, i: usize, rng: &mut impl Rng) -> TypoEvent {
        let c = self.chars[i];
        let next = match self.chars.get(i + 1) {
            Some(&n) if is_word_char(n) && n != c => n,
            _ => return self.substitution(b, i, rng),
        };
        b.emit(next);
        b.emit(c);
        b.hesitate(self.correction_pause);
        b.backspace(2);
        b.emit(c);
        b.emit(next);
        TypoEvent {
            kind: TypoKind::Transposition,
            index: i,
            consumed: 2,
        }
    }

    fn duplication(&self, b: &mut ActionBuilder, i: usize) -> TypoEvent {
        let c = self.chars[i];
        b.emit(c);
        b.emit(c);
        b.hesitate(self.correction_pause);
        b.backspace(1);
        TypoEvent {
            kind: TypoKind::Duplication,
            index: i,
            consumed: 1,
        }
    }

    fn omission(&self, b: &mut ActionBuilder, i: usize, rng: &mut impl Rng) -> TypoEvent {
        let available = self.chars[i + 1..]
            .iter()
            .take(MAX_OMISSION_LOOKAHEAD)
            .take_while(|&&n| is_word_char(n))
            .count();
        if available == 0 {
            return self.substitution(b, i, rng);
        }

        let skipped = rng.gen_range(1..=available);
        let ahead = &self.chars[i + 1..=i + skipped];
        b.emit_all(ahead);
        b.hesitate(self.correction_pause);
        b.backspace(skipped);
        b.emit(self.chars[i]);
        b.emit_all(ahead);
        TypoEvent {
            kind: TypoKind::Omission,
            index: i,
            consumed: skipped + 1,
        }
    }

    fn apply(
        &self,
        b: &mut ActionBuilder,
        kind: TypoKind,
        i: usize,
        rng: &mut impl Rng,
    ) -> TypoEvent {
        // Swapping or skipping across a word boundary would move the boundary.
        let kind = match kind {
            TypoKind::Transposition | TypoKind::Omission if !is_word_char(self.chars[i]) => {
                TypoKind::Substitution
            }
            kind => kind,
        };
        match kind {
            TypoKind::Substitution => self.substitution(b, i, rng),
            TypoKind::Transposition => self.transposition(b, i, rng),
            TypoKind::Duplication => self.duplication(b, i),
            TypoKind::Omission => self.omission(b, i, rng),
        }
    }
}

/// Plan the keystrokes that type `text` the way a person would, typos included.
///
/// The sequence always replays to exactly `text`: every typo is followed by the
/// backspaces and re-typed characters that undo it.
pub fn plan(
    text: &str,
    cfg: &TypingConfig,
    rng: &mut impl Rng,
) -> Result<Vec<Action>, ConfigError> {
    cfg.validate()?;

    let kinds = cfg.typo_kind_weights.enabled();
    let kind_index = WeightedIndex::new(kinds.iter().map(|(_, w)| *w))
        .map_err(|_| ConfigError::NoTypoKinds)?;

    let chars: Vec<char> = text.chars().collect();
    let typos = TypoPlanner {
        chars: &chars,
        correction_pause: cfg.correction_pause,
    };

    let mut builder = ActionBuilder::default();
    let mut word_len = 0usize;
    let mut typo_count = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];

        if is_punctuation_mark(c) {
            if rng.gen_bool(cfg.punctuation_mistake_rate) {
                typos.substitution(&mut builder, i, rng);
                typo_count += 1;
            } else {
                builder.emit(c);
            }
            i += 1;
        } else {
            let consumed = if rng.gen_bool(cfg.typo_rate) {
                let kind = kinds[kind_index.sample(rng)].0;
                let event = typos.apply(&mut builder, kind, i, rng);
                trace!(kind = event.kind.name(), index = event.index, "planned typo");
                typo_count += 1;
                event.consumed
            } else {
                builder.emit(c);
                1
            };
            i += consumed;
            if is_word_char(c) {
                word_len += consumed;
                continue;
            }
        }

        if cfg.micro_pauses {
            if word_len >= cfg.long_word_pause_threshold {
                builder.pause(LONG_WORD_PAUSE);
            }
            if let Some(range) = punctuation_pause(c) {
                builder.pause(range);
            }
            if word_len > 0 && rng.gen_bool(cfg.think_pause_rate) {
                builder.pause(cfg.think_pause_range);
            }
        }
        word_len = 0;
    }

    let actions = builder.into_actions();
    debug!(
        chars = chars.len(),
        actions = actions.len(),
        typos = typo_count,
        "planned typing run"
    );
    debug_assert_eq!(
        crate::sim::replay(&actions).ok().as_deref(),
        Some(text),
        "planned actions must replay to the input text"
    );

    Ok(actions)
}

pub fn generate_plan(
    text: &str,
    cfg: TypingConfig,
    rng: &mut impl Rng,
) -> Result<Plan, ConfigError> {
    let actions = plan(text, &cfg, rng)?;
    Ok(Plan {
        version: PLAN_VERSION,
        config: cfg,
        actions,
    })
}
