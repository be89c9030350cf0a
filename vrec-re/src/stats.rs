//! Mastery and class statistics
//!
//! Built on the same known-word set as recommendation scoring
//! ([`crate::profile::build_known_words`]), so a student's mastery always
//! agrees with what the ranking assumed they know. Dismissed misuse records
//! are hidden from misuse listings only; they still count as evidence.

use crate::profile::{build_known_words, mastery_percent};
use crate::types::{ClassStats, MasteryReport, MisusedWord, WordCount};
use std::collections::{BTreeMap, HashMap};
use vrec_common::db::{Student, StudentVocabulary, VocabularyWord};

/// Mastery report for one student
///
/// `vocabulary` may contain every grade. Mastery counts only known words at
/// the assigned grade; other grades name misused words.
pub fn student_mastery(
    student: &Student,
    vocabulary: &[VocabularyWord],
    usage: &[StudentVocabulary],
) -> MasteryReport {
    let known = build_known_words(student, vocabulary, usage);

    let grade_words: Vec<&VocabularyWord> = vocabulary
        .iter()
        .filter(|w| w.grade_level == student.assigned_grade)
        .collect();

    let (known_grade_words, missing): (Vec<&VocabularyWord>, Vec<&VocabularyWord>) =
        grade_words.iter().copied().partition(|w| known.contains_key(&w.id));

    let mut missing_words: Vec<String> = missing.iter().map(|w| w.word.clone()).collect();
    missing_words.sort();

    let word_text: HashMap<i64, &str> = vocabulary.iter().map(|w| (w.id, w.word.as_str())).collect();

    let mut misused_words: Vec<MisusedWord> = usage
        .iter()
        .filter(|r| r.student_id == student.id && r.has_active_misuse())
        .filter_map(|r| {
            word_text.get(&r.word_id).map(|word| MisusedWord {
                word_id: r.word_id,
                word: word.to_string(),
                correct_count: r.correct_usage_count,
                incorrect_count: r.incorrect_usage_count(),
                examples: r.misuse_examples.clone(),
            })
        })
        .collect();
    misused_words.sort_by(|a, b| a.word.cmp(&b.word));

    MasteryReport {
        student_id: student.id,
        assigned_grade: student.assigned_grade,
        total_grade_level_words: grade_words.len(),
        words_known: known_grade_words.len(),
        mastery_percent: mastery_percent(known_grade_words.len(), grade_words.len()),
        missing_words,
        misused_words,
    }
}

/// Class-wide statistics
///
/// `students` pairs every student with their usage records.
pub fn class_stats(
    students: &[(Student, Vec<StudentVocabulary>)],
    vocabulary: &[VocabularyWord],
    top_words_limit: usize,
) -> ClassStats {
    if students.is_empty() {
        return ClassStats {
            total_students: 0,
            avg_vocab_mastery_percent: 0.0,
            reading_level_distribution: BTreeMap::new(),
            top_missing_words: Vec::new(),
            commonly_misused_words: Vec::new(),
        };
    }

    let mut mastery_sum = 0.0;
    let mut reading_levels: BTreeMap<i64, usize> = BTreeMap::new();
    let mut missing: HashMap<String, usize> = HashMap::new();
    let mut misused: HashMap<String, usize> = HashMap::new();

    for (student, usage) in students {
        let report = student_mastery(student, vocabulary, usage);
        mastery_sum += report.mastery_percent;

        if student.actual_reading_level.is_finite() {
            *reading_levels
                .entry(student.actual_reading_level.round() as i64)
                .or_default() += 1;
        }

        for word in report.missing_words {
            *missing.entry(word).or_default() += 1;
        }
        for misuse in report.misused_words {
            *misused.entry(misuse.word).or_default() += 1;
        }
    }

    ClassStats {
        total_students: students.len(),
        avg_vocab_mastery_percent: mastery_sum / students.len() as f64,
        reading_level_distribution: reading_levels,
        top_missing_words: top_words(missing, top_words_limit),
        commonly_misused_words: top_words(misused, top_words_limit),
    }
}

/// Highest counts first, ties alphabetical
fn top_words(counts: HashMap<String, usize>, limit: usize) -> Vec<WordCount> {
    let mut words: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, students)| WordCount { word, students })
        .collect();
    words.sort_by(|a, b| b.students.cmp(&a.students).then_with(|| a.word.cmp(&b.word)));
    words.truncate(limit);
    words
}
