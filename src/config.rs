use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::PauseRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypoKind {
    Substitution,
    Transposition,
    Duplication,
    Omission,
}

impl TypoKind {
    pub const ALL: [TypoKind; 4] = [
        TypoKind::Substitution,
        TypoKind::Transposition,
        TypoKind::Duplication,
        TypoKind::Omission,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TypoKind::Substitution => "substitution",
            TypoKind::Transposition => "transposition",
            TypoKind::Duplication => "duplication",
            TypoKind::Omission => "omission",
        }
    }
}

/// Relative weights used when picking which kind of typo to make.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypoKindWeights {
    pub substitution: f64,
    pub transposition: f64,
    pub duplication: f64,
    pub omission: f64,
}

impl TypoKindWeights {
    /// All weight on a single kind.
    pub fn only(kind: TypoKind) -> Self {
        let mut weights = Self {
            substitution: 0.0,
            transposition: 0.0,
            duplication: 0.0,
            omission: 0.0,
        };
        *weights.get_mut(kind) = 1.0;
        weights
    }

    pub fn get(&self, kind: TypoKind) -> f64 {
        match kind {
            TypoKind::Substitution => self.substitution,
            TypoKind::Transposition => self.transposition,
            TypoKind::Duplication => self.duplication,
            TypoKind::Omission => self.omission,
        }
    }

    fn get_mut(&mut self, kind: TypoKind) -> &mut f64 {
        match kind {
            TypoKind::Substitution => &mut self.substitution,
            TypoKind::Transposition => &mut self.transposition,
            TypoKind::Duplication => &mut self.duplication,
            TypoKind::Omission => &mut self.omission,
        }
    }

    /// Kinds with a positive weight, in declaration order.
    pub fn enabled(&self) -> Vec<(TypoKind, f64)> {
        TypoKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .filter(|(_, w)| *w > 0.0)
            .collect()
    }
}

impl Default for TypoKindWeights {
    fn default() -> Self {
        Self {
            substitution: 0.45,
            transposition: 0.25,
            duplication: 0.20,
            omission: 0.10,
        }
    }
}

/// A typing profile. Presets are just named values of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub wpm_min: f64,
    pub wpm_max: f64,
    /// Characters counted as one "word" when converting WPM to a per-key delay.
    pub chars_per_word: f64,
    pub jitter_fraction: f64,
    pub typo_rate: f64,
    pub typo_kind_weights: TypoKindWeights,
    pub punctuation_mistake_rate: f64,
    pub long_word_pause_threshold: usize,
    pub think_pause_rate: f64,
    pub think_pause_range: PauseRange,
    /// Master switch for long-word, punctuation and think pauses.
    pub micro_pauses: bool,
    /// Hesitation between making a typo and starting to fix it.
    pub correction_pause: Option<PauseRange>,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Preset::Balanced.config()
    }
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field })
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { field, value })
    }
}

fn check_pause_range(field: &'static str, range: PauseRange) -> Result<(), ConfigError> {
    check_finite(field, range.min)?;
    check_finite(field, range.max)?;
    if range.min < 0.0 || range.min > range.max {
        return Err(ConfigError::PauseRange {
            field,
            min: range.min,
            max: range.max,
        });
    }
    Ok(())
}

impl TypingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("wpm_min", self.wpm_min)?;
        check_finite("wpm_max", self.wpm_max)?;
        check_finite("chars_per_word", self.chars_per_word)?;
        check_finite("jitter_fraction", self.jitter_fraction)?;

        for (field, value) in [
            ("wpm_min", self.wpm_min),
            ("wpm_max", self.wpm_max),
            ("chars_per_word", self.chars_per_word),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.wpm_min > self.wpm_max {
            return Err(ConfigError::WpmRange {
                min: self.wpm_min,
                max: self.wpm_max,
            });
        }
        if self.jitter_fraction < 0.0 {
            return Err(ConfigError::NegativeJitter(self.jitter_fraction));
        }

        check_probability("typo_rate", self.typo_rate)?;
        check_probability("punctuation_mistake_rate", self.punctuation_mistake_rate)?;
        check_probability("think_pause_rate", self.think_pause_rate)?;

        for kind in TypoKind::ALL {
            let value = self.typo_kind_weights.get(kind);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeWeight {
                    kind: kind.name(),
                    value,
                });
            }
        }
        if self.typo_kind_weights.enabled().is_empty() {
            return Err(ConfigError::NoTypoKinds);
        }

        if self.long_word_pause_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        check_pause_range("think_pause_range", self.think_pause_range)?;
        if let Some(range) = self.correction_pause {
            check_pause_range("correction_pause", range)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Balanced,
    FastButMessy,
    SlowAndCareful,
}

impl Preset {
    pub const ALL: [Preset; 3] = [
        Preset::Balanced,
        Preset::FastButMessy,
        Preset::SlowAndCareful,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Balanced => "Balanced",
            Preset::FastButMessy => "FastButMessy",
            Preset::SlowAndCareful => "SlowAndCareful",
        }
    }

    pub fn config(self) -> TypingConfig {
        let (wpm_min, wpm_max, typo_rate, punctuation_mistake_rate, think_pause_rate, jitter) =
            match self {
                Preset::Balanced => (45.0, 70.0, 0.03, 0.02, 0.08, 0.25),
                Preset::FastButMessy => (70.0, 110.0, 0.06, 0.04, 0.05, 0.28),
                Preset::SlowAndCareful => (30.0, 45.0, 0.015, 0.01, 0.12, 0.18),
            };

        TypingConfig {
            wpm_min,
            wpm_max,
            chars_per_word: 5.0,
            jitter_fraction: jitter,
            typo_rate,
            typo_kind_weights: TypoKindWeights::default(),
            punctuation_mistake_rate,
            long_word_pause_threshold: 8,
            think_pause_rate,
            think_pause_range: PauseRange::new(0.25, 0.9),
            micro_pauses: true,
            correction_pause: Some(PauseRange::new(0.15, 0.55)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for preset in Preset::ALL {
            preset
                .config()
                .validate()
                .unwrap_or_else(|err| panic!("{} is invalid: {err}", preset.name()));
        }
    }

    #[test]
    fn rejects_inverted_wpm_range() {
        let cfg = TypingConfig {
            wpm_min: 90.0,
            wpm_max: 40.0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::WpmRange {
                min: 90.0,
                max: 40.0
            })
        );
    }

    #[test]
    fn rejects_rates_outside_unit_interval() {
        let cfg = TypingConfig {
            punctuation_mistake_rate: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Probability {
                field: "punctuation_mistake_rate",
                ..
            })
        ));

        let cfg = TypingConfig {
            think_pause_rate: 1.01,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_all_zero_weights() {
        let cfg = TypingConfig {
            typo_kind_weights: TypoKindWeights {
                substitution: 0.0,
                transposition: 0.0,
                duplication: 0.0,
                omission: 0.0,
            },
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoTypoKinds));
    }

    #[test]
    fn rejects_bad_pause_ranges() {
        let cfg = TypingConfig {
            think_pause_range: PauseRange::new(1.0, 0.5),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::PauseRange {
                field: "think_pause_range",
                ..
            })
        ));

        let cfg = TypingConfig {
            correction_pause: Some(PauseRange::new(-0.1, 0.5)),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn only_weights_single_kind() {
        let weights = TypoKindWeights::only(TypoKind::Omission);
        assert_eq!(weights.enabled(), vec![(TypoKind::Omission, 1.0)]);
    }

    #[test]
    fn partial_json_fills_from_balanced() {
        let cfg: TypingConfig =
            serde_json::from_str(r#"{ "wpm_min": 20, "wpm_max": 30, "micro_pauses": false }"#)
                .expect("partial profile should parse");
        assert_eq!(cfg.wpm_min, 20.0);
        assert!(!cfg.micro_pauses);
        assert_eq!(cfg.typo_rate, Preset::Balanced.config().typo_rate);
    }
}
