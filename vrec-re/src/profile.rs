//! Vocabulary profile builder
//!
//! A student's known vocabulary is the union of two sources:
//! - **Direct evidence**: usage records with `correct_usage_count > 0`,
//!   weighted by that count.
//! - **Inferred baseline**: words the student is assumed to know from their
//!   reading level. Membership is decided per (student, word) by a stable
//!   hash, so repeated runs always produce the same baseline.
//!
//! The same known set feeds both recommendation scoring and mastery
//! reporting.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use vrec_common::db::{Student, StudentVocabulary, VocabularyWord};

/// Baseline share of prerequisite (lower-grade) vocabulary
pub const PREREQUISITE_BASELINE_PERCENT: f64 = 0.95;

/// Baseline share of own-grade vocabulary for reading levels outside 5..=8
pub const DEFAULT_BASELINE_PERCENT: f64 = 0.60;

/// Weight given to words known only through the baseline
const BASELINE_WEIGHT: i64 = 1;

/// word_id -> evidence weight
pub type KnownWords = HashMap<i64, i64>;

/// Own-grade baseline percent for a reading level
///
/// Step function of the rounded level. Non-finite levels fall back to the
/// default.
pub fn grade_baseline_percent(reading_level: f64) -> f64 {
    if !reading_level.is_finite() {
        return DEFAULT_BASELINE_PERCENT;
    }

    match reading_level.round() as i64 {
        5 => 0.40,
        6 => 0.55,
        7 => 0.75,
        8 => 0.85,
        _ => DEFAULT_BASELINE_PERCENT,
    }
}

/// Baseline percent for a word at `word_grade`, or `None` when the word is
/// above the student's assigned grade and never part of the baseline.
pub fn baseline_percent_for_word(word_grade: i64, assigned_grade: i64, reading_level: f64) -> Option<f64> {
    use std::cmp::Ordering;

    match word_grade.cmp(&assigned_grade) {
        Ordering::Less => Some(PREREQUISITE_BASELINE_PERCENT),
        Ordering::Equal => Some(grade_baseline_percent(reading_level)),
        Ordering::Greater => None,
    }
}

/// Stable 64-bit hash of a (student, word) pair
///
/// First eight bytes (big-endian) of SHA-256 over `"{student_id}:{word_id}"`.
/// Independent of process, platform, and call order.
pub fn stable_pair_hash(student_id: i64, word_id: i64) -> u64 {
    let digest = Sha256::digest(format!("{}:{}", student_id, word_id).as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Bucket in `[0, 100)` for a (student, word) pair
pub fn baseline_bucket(student_id: i64, word_id: i64) -> u64 {
    stable_pair_hash(student_id, word_id) % 100
}

/// Whether the baseline credits `student_id` with knowing `word_id`
pub fn is_baseline_known(student_id: i64, word_id: i64, baseline_percent: f64) -> bool {
    let percent = if baseline_percent.is_finite() {
        baseline_percent.clamp(0.0, 1.0)
    } else {
        0.0
    };
    // Rounded: 0.55 * 100.0 lands slightly above 55 and must still mean 55 buckets
    let threshold = (percent * 100.0).round() as u64;
    baseline_bucket(student_id, word_id) < threshold
}

/// Build the known-word map for one student
///
/// `candidate_words` is the vocabulary of every grade up to the assigned
/// grade; words above the assigned grade are ignored for the baseline.
/// `usage` holds the student's usage records.
pub fn build_known_words(
    student: &Student,
    candidate_words: &[VocabularyWord],
    usage: &[StudentVocabulary],
) -> KnownWords {
    let mut known = KnownWords::new();

    for word in candidate_words {
        let Some(percent) =
            baseline_percent_for_word(word.grade_level, student.assigned_grade, student.actual_reading_level)
        else {
            continue;
        };

        if is_baseline_known(student.id, word.id, percent) {
            known.insert(word.id, BASELINE_WEIGHT);
        }
    }

    // Direct evidence replaces the placeholder baseline weight
    for record in usage.iter().filter(|r| r.student_id == student.id && r.is_known()) {
        known.insert(record.word_id, record.correct_usage_count);
    }

    known
}

/// Mastery percent: `100 * known_grade_words / grade_word_count`, capped at 100
///
/// `known_count` must only count words at the assigned grade. Zero grade
/// words yields 0.0.
pub fn mastery_percent(known_count: usize, grade_word_count: usize) -> f64 {
    if grade_word_count == 0 {
        return 0.0;
    }
    (known_count as f64 / grade_word_count as f64 * 100.0).min(100.0)
}
