//! Match scoring
//!
//! A book suits a student when it is readable (high known fraction), still
//! teaches new vocabulary (non-trivial new-word count), and sits near the
//! student's reading level. Three sub-scores are combined by weighted sum,
//! an extremity penalty is subtracted for books far too easy or too hard,
//! and the result is clamped to [0, 1].
//!
//! ```text
//! score = 0.4 * known_score + 0.4 * new_words_score + 0.2 * reading_level_score - penalty
//! ```

use serde::Serialize;

pub const KNOWN_WEIGHT: f64 = 0.4;
pub const NEW_WORDS_WEIGHT: f64 = 0.4;
pub const READING_LEVEL_WEIGHT: f64 = 0.2;

/// Known fraction band outside which the extremity penalty applies
pub const COMFORT_BAND: (f64, f64) = (0.40, 0.85);

/// Penalty per unit of distance outside the comfort band
pub const PENALTY_SLOPE: f64 = 3.0;

/// Sub-scores of a single match, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub known_score: f64,
    pub new_words_score: f64,
    pub reading_level_score: f64,
    pub penalty: f64,
    pub total: f64,
}

/// Comprehension reward for a known fraction
///
/// Peak 1.0 at 0.625, 0.85 at 0.50 and 0.75, 0.70 at 0.40. Just above 0.75
/// the score restarts at 1.0 and falls to 0.80 at 0.85. Outside [0.40, 0.85]
/// the neighbouring segment is extended; the penalty term does the real
/// suppression there.
pub fn known_score(known_percent: f64) -> f64 {
    let p = clamp_unit(known_percent);

    let score = if p < 0.50 {
        // 0.70 at 0.40 rising to 0.85 at 0.50
        0.70 + 0.15 * (p - 0.40) / 0.10
    } else if p <= 0.75 {
        1.0 - 0.15 * (p - 0.625).abs() / 0.125
    } else {
        // 1.0 just above 0.75 falling to 0.80 at 0.85
        1.0 - 0.20 * (p - 0.75) / 0.10
    };

    score.max(0.0)
}

/// Growth reward: saturating piecewise-linear in the raw new-word count
pub fn new_words_score(new_words_count: i64) -> f64 {
    let n = new_words_count.max(0) as f64;

    if n < 5.0 {
        0.4 * n / 5.0
    } else if n < 10.0 {
        0.4 + 0.3 * (n - 5.0) / 5.0
    } else if n < 20.0 {
        0.7 + 0.15 * (n - 10.0) / 10.0
    } else if n < 40.0 {
        0.85 + 0.15 * (n - 20.0) / 20.0
    } else {
        1.0
    }
}

/// Reading level proximity; neutral 0.5 when either level is unknown
pub fn reading_level_score(book_level: Option<f64>, student_level: f64) -> f64 {
    match book_level {
        Some(book) if book.is_finite() && student_level.is_finite() => {
            (1.0 - (book - student_level).abs() / 2.0).max(0.0)
        }
        _ => 0.5,
    }
}

/// Linear penalty for known fractions outside the comfort band
pub fn extremity_penalty(known_percent: f64) -> f64 {
    let p = clamp_unit(known_percent);
    let (low, high) = COMFORT_BAND;

    if p > high {
        PENALTY_SLOPE * (p - high)
    } else if p < low {
        PENALTY_SLOPE * (low - p)
    } else {
        0.0
    }
}

/// Full breakdown of a match score
pub fn score_breakdown(
    known_percent: f64,
    new_words_count: i64,
    book_level: Option<f64>,
    student_level: f64,
) -> ScoreBreakdown {
    let known = known_score(known_percent);
    let new_words = new_words_score(new_words_count);
    let level = reading_level_score(book_level, student_level);
    let penalty = extremity_penalty(known_percent);

    let raw = KNOWN_WEIGHT * known + NEW_WORDS_WEIGHT * new_words + READING_LEVEL_WEIGHT * level - penalty;

    ScoreBreakdown {
        known_score: known,
        new_words_score: new_words,
        reading_level_score: level,
        penalty,
        total: clamp_unit(raw),
    }
}

/// Match score in [0, 1] for a (student, book) pair
pub fn match_score(
    known_percent: f64,
    new_words_count: i64,
    book_level: Option<f64>,
    student_level: f64,
) -> f64 {
    score_breakdown(known_percent, new_words_count, book_level, student_level).total
}

/// Clamp into [0, 1]; NaN becomes 0
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
