//! Per-character delays for the typing animation.
//!
//! Answers are revealed one character at a time. Punctuation pauses longer
//! than letters so the output reads like someone typing.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// Delay table for the typing scheduler, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypingCadence {
    /// Delay after a space.
    #[serde(default = "TypingCadence::default_space")]
    pub space_ms: u64,

    /// Delay after a newline.
    #[serde(default = "TypingCadence::default_newline")]
    pub newline_ms: u64,

    /// Delay after `.`, `!` or `?`.
    #[serde(default = "TypingCadence::default_sentence_end")]
    pub sentence_end_ms: u64,

    /// Delay after `,`, `;` or `:`.
    #[serde(default = "TypingCadence::default_clause_break")]
    pub clause_break_ms: u64,

    /// Base delay after any other character.
    #[serde(default = "TypingCadence::default_base")]
    pub base_ms: u64,

    /// Upper bound (inclusive) of the random extra added to `base_ms`.
    #[serde(default = "TypingCadence::default_jitter")]
    pub jitter_ms: u64,
}

impl TypingCadence {
    const fn default_space() -> u64 {
        14
    }

    const fn default_newline() -> u64 {
        75
    }

    const fn default_sentence_end() -> u64 {
        200
    }

    const fn default_clause_break() -> u64 {
        130
    }

    const fn default_base() -> u64 {
        18
    }

    const fn default_jitter() -> u64 {
        12
    }

    /// A cadence with no delays at all.
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            space_ms: 0,
            newline_ms: 0,
            sentence_end_ms: 0,
            clause_break_ms: 0,
            base_ms: 0,
            jitter_ms: 0,
        }
    }

    /// Delay for `ch` with a freshly drawn jitter.
    #[must_use]
    pub fn delay_for(&self, ch: char) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.jitter_ms)
        };
        self.delay_with_jitter(ch, jitter)
    }

    /// Delay for `ch` with a caller-chosen jitter.
    ///
    /// `jitter` only applies to ordinary characters and is clamped to
    /// `jitter_ms`.
    #[must_use]
    pub fn delay_with_jitter(&self, ch: char, jitter: u64) -> Duration {
        let millis = match ch {
            ' ' => self.space_ms,
            '\n' => self.newline_ms,
            '.' | '!' | '?' => self.sentence_end_ms,
            ',' | ';' | ':' => self.clause_break_ms,
            _ => self.base_ms + jitter.min(self.jitter_ms),
        };
        Duration::from_millis(millis)
    }
}

impl Default for TypingCadence {
    fn default() -> Self {
        Self {
            space_ms: Self::default_space(),
            newline_ms: Self::default_newline(),
            sentence_end_ms: Self::default_sentence_end(),
            clause_break_ms: Self::default_clause_break(),
            base_ms: Self::default_base(),
            jitter_ms: Self::default_jitter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_delays() {
        let cadence = TypingCadence::default();
        assert_eq!(cadence.delay_for(' '), Duration::from_millis(14));
        assert_eq!(cadence.delay_for('\n'), Duration::from_millis(75));
        for ch in ['.', '!', '?'] {
            assert_eq!(cadence.delay_for(ch), Duration::from_millis(200));
        }
        for ch in [',', ';', ':'] {
            assert_eq!(cadence.delay_for(ch), Duration::from_millis(130));
        }
    }

    #[test]
    fn ordinary_characters_jitter_within_bounds() {
        let cadence = TypingCadence::default();
        for ch in "abcXYZ019-é".chars() {
            for _ in 0..50 {
                let delay = cadence.delay_for(ch);
                assert!(delay >= Duration::from_millis(18), "{ch}: {delay:?}");
                assert!(delay <= Duration::from_millis(30), "{ch}: {delay:?}");
            }
        }
    }

    #[test]
    fn explicit_jitter_is_clamped() {
        let cadence = TypingCadence::default();
        assert_eq!(cadence.delay_with_jitter('a', 0), Duration::from_millis(18));
        assert_eq!(cadence.delay_with_jitter('a', 12), Duration::from_millis(30));
        assert_eq!(cadence.delay_with_jitter('a', 99), Duration::from_millis(30));
        assert_eq!(cadence.delay_with_jitter(' ', 12), Duration::from_millis(14));
    }

    #[test]
    fn instant_has_no_delay() {
        let cadence = TypingCadence::instant();
        assert_eq!(cadence.delay_for('x'), Duration::ZERO);
        assert_eq!(cadence.delay_for('.'), Duration::ZERO);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cadence: TypingCadence =
            serde_json::from_str(r#"{"sentence_end_ms": 50, "jitter_ms": 0}"#).unwrap();
        assert_eq!(cadence.sentence_end_ms, 50);
        assert_eq!(cadence.jitter_ms, 0);
        assert_eq!(cadence.space_ms, 14);
        assert_eq!(cadence.delay_for('a'), Duration::from_millis(18));
    }
}
