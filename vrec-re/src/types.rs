//! Engine result types shared by the store, pipeline, and read queries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Scoring / selection
// ============================================================================

/// One scored (student, book) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMatch {
    pub book_id: i64,
    pub match_score: f64,
    pub known_words_percent: f64,
    pub new_words_count: i64,
}

/// Aggregated class-wide standing of one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPick {
    pub book_id: i64,
    pub average_match_score: f64,
    pub students_recommended_count: i64,
}

/// Row counts from a replace-set write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    pub inserted: usize,
    pub updated: usize,
    /// Rows removed because their book fell out of the selection
    pub pruned: usize,
}

impl WriteSummary {
    /// Rows present for the key after the write
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn absorb(&mut self, other: WriteSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.pruned += other.pruned;
    }
}

// ============================================================================
// Read views
// ============================================================================

/// One row of the student list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub name: String,
    pub reading_level: f64,
    pub assigned_grade: i64,
    pub vocab_mastery_percent: f64,
}

/// A persisted student recommendation joined with its book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecommendationView {
    pub book_id: i64,
    pub title: String,
    pub author: Option<String>,
    pub reading_level: Option<f64>,
    pub match_score: f64,
    pub known_words_percent: f64,
    pub new_words_count: i64,
}

/// A persisted class recommendation joined with its book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecommendationView {
    pub book_id: i64,
    pub title: String,
    pub author: Option<String>,
    pub reading_level: Option<f64>,
    pub avg_match_score: f64,
    pub students_recommended_count: i64,
}

/// A word with non-dismissed misuse evidence for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MisusedWord {
    pub word_id: i64,
    pub word: String,
    pub correct_count: i64,
    pub incorrect_count: i64,
    pub examples: Vec<String>,
}

/// Vocabulary mastery of one student against their assigned grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryReport {
    pub student_id: i64,
    pub assigned_grade: i64,
    pub total_grade_level_words: usize,
    pub words_known: usize,
    pub mastery_percent: f64,
    pub missing_words: Vec<String>,
    pub misused_words: Vec<MisusedWord>,
}

/// A word and how many students it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub students: usize,
}

/// Class-wide descriptive statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub total_students: usize,
    pub avg_vocab_mastery_percent: f64,
    /// Rounded reading level -> number of students
    pub reading_level_distribution: BTreeMap<i64, usize>,
    pub top_missing_words: Vec<WordCount>,
    pub commonly_misused_words: Vec<WordCount>,
}
