//! Reference data and usage import
//!
//! Loads students, vocabulary, books with their word counts, and usage
//! evidence from a JSON document produced by the upstream corpus and text
//! analysis tooling. The whole document is validated before anything is
//! written, and all rows are written in a single transaction.

use crate::store::{
    write_book, write_book_vocabulary, write_student, write_usage, write_vocabulary_word, SqliteStore,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use vrec_common::db::{Book, BookVocabulary, Student, StudentVocabulary, VocabularyWord};
use vrec_common::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedWordCount {
    pub word_id: i64,
    pub occurrence_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedBook {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub reading_level: Option<f64>,
    #[serde(default)]
    pub total_words: Option<i64>,
    #[serde(default)]
    pub vocabulary: Vec<SeedWordCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedUsage {
    pub student_id: i64,
    pub word_id: i64,
    pub usage_count: i64,
    pub correct_usage_count: i64,
    #[serde(default)]
    pub misuse_examples: Vec<String>,
}

impl SeedUsage {
    fn to_record(&self) -> StudentVocabulary {
        let mut record = StudentVocabulary::new(
            self.student_id,
            self.word_id,
            self.usage_count,
            self.correct_usage_count,
        );
        record.misuse_examples = self.misuse_examples.clone();
        record
    }
}

/// Import document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeedData {
    pub students: Vec<Student>,
    pub vocabulary: Vec<VocabularyWord>,
    pub books: Vec<SeedBook>,
    pub usage: Vec<SeedUsage>,
}

/// Row counts written by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub students: usize,
    pub vocabulary_words: usize,
    pub books: usize,
    pub book_vocabulary: usize,
    pub usage_records: usize,
}

impl SeedData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check invariants and references across the whole document
    pub fn validate(&self) -> Result<()> {
        let student_ids: HashSet<i64> = self.students.iter().map(|s| s.id).collect();
        let word_ids: HashSet<i64> = self.vocabulary.iter().map(|w| w.id).collect();

        let mut texts = HashSet::new();
        for word in &self.vocabulary {
            if !texts.insert(word.word.as_str()) {
                return Err(Error::InvalidInput(format!("duplicate vocabulary word '{}'", word.word)));
            }
        }

        for book in &self.books {
            for entry in &book.vocabulary {
                if entry.occurrence_count < 0 {
                    return Err(Error::InvalidInput(format!(
                        "book {} word {}: negative occurrence_count",
                        book.id, entry.word_id
                    )));
                }
                if !word_ids.contains(&entry.word_id) {
                    return Err(Error::InvalidInput(format!(
                        "book {} references unknown word {}",
                        book.id, entry.word_id
                    )));
                }
            }
        }

        for usage in &self.usage {
            usage.to_record().validate()?;
            if !student_ids.contains(&usage.student_id) {
                return Err(Error::InvalidInput(format!(
                    "usage references unknown student {}",
                    usage.student_id
                )));
            }
            if !word_ids.contains(&usage.word_id) {
                return Err(Error::InvalidInput(format!(
                    "usage references unknown word {}",
                    usage.word_id
                )));
            }
        }

        Ok(())
    }
}

/// Validate and write a seed document in one transaction
pub async fn import_seed(store: &SqliteStore, data: &SeedData) -> Result<SeedSummary> {
    data.validate()?;

    let mut summary = SeedSummary::default();
    let mut tx = store.pool().begin().await?;

    for student in &data.students {
        write_student(&mut tx, student).await?;
        summary.students += 1;
    }

    for word in &data.vocabulary {
        write_vocabulary_word(&mut tx, word).await?;
        summary.vocabulary_words += 1;
    }

    for seed_book in &data.books {
        let book = Book {
            id: seed_book.id,
            title: seed_book.title.clone(),
            author: seed_book.author.clone(),
            reading_level: seed_book.reading_level,
            total_words: seed_book.total_words,
        };
        write_book(&mut tx, &book).await?;
        summary.books += 1;

        for entry in &seed_book.vocabulary {
            let row = BookVocabulary {
                book_id: book.id,
                word_id: entry.word_id,
                occurrence_count: entry.occurrence_count,
            };
            write_book_vocabulary(&mut tx, &row).await?;
            summary.book_vocabulary += 1;
        }
    }

    for usage in &data.usage {
        write_usage(&mut tx, &usage.to_record()).await?;
        summary.usage_records += 1;
    }

    tx.commit().await?;

    info!(
        students = summary.students,
        vocabulary_words = summary.vocabulary_words,
        books = summary.books,
        book_vocabulary = summary.book_vocabulary,
        usage_records = summary.usage_records,
        "Seed data imported"
    );

    Ok(summary)
}
