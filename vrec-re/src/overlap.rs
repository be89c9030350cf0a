//! Overlap between a student's known words and a book's vocabulary
//!
//! Presence only: occurrence counts and usage weights do not affect the
//! partition or the known fraction.

use std::collections::{BTreeSet, HashMap};

/// Known/new partition of a book's vocabulary for one student
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlap {
    pub known_words: BTreeSet<i64>,
    pub new_words: BTreeSet<i64>,
    /// `|known_words| / |book words|`, 0.0 for a book without vocabulary
    pub known_percent: f64,
}

impl Overlap {
    pub fn new_words_count(&self) -> i64 {
        self.new_words.len() as i64
    }
}

/// Partition `book_words` into words the student knows and new words
pub fn compute_overlap(known: &HashMap<i64, i64>, book_words: &HashMap<i64, i64>) -> Overlap {
    let (known_words, new_words): (BTreeSet<i64>, BTreeSet<i64>) =
        book_words.keys().copied().partition(|word_id| known.contains_key(word_id));

    let known_percent = if book_words.is_empty() {
        0.0
    } else {
        known_words.len() as f64 / book_words.len() as f64
    };

    Overlap {
        known_words,
        new_words,
        known_percent,
    }
}
