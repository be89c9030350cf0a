//! Shared fixtures for vrec-re integration tests

#![allow(dead_code)]

use vrec_common::db::{connect_in_memory, Book, BookVocabulary, Student, StudentVocabulary, VocabularyWord};
use vrec_re::SqliteStore;

pub const GRADE_SIX_WORDS: std::ops::RangeInclusive<i64> = 1..=60;
pub const GRADE_SEVEN_WORDS: std::ops::RangeInclusive<i64> = 61..=120;

/// Empty in-memory store with the full schema
pub async fn empty_store() -> SqliteStore {
    SqliteStore::new(connect_in_memory().await.expect("in-memory database"))
}

pub fn student(id: i64, level: f64, grade: i64) -> Student {
    Student {
        id,
        name: format!("Student {}", id),
        actual_reading_level: level,
        assigned_grade: grade,
    }
}

pub fn word_text(id: i64) -> String {
    format!("word{:03}", id)
}

/// Store with 60 grade-6 words, 60 grade-7 words, three students, and five
/// books of differing vocabulary
pub async fn seeded_store() -> SqliteStore {
    let store = empty_store().await;

    for id in GRADE_SIX_WORDS {
        store
            .upsert_vocabulary_word(&VocabularyWord { id, word: word_text(id), grade_level: 6 })
            .await
            .unwrap();
    }
    for id in GRADE_SEVEN_WORDS {
        store
            .upsert_vocabulary_word(&VocabularyWord { id, word: word_text(id), grade_level: 7 })
            .await
            .unwrap();
    }

    for s in [student(1, 6.0, 6), student(2, 7.2, 7), student(3, 5.4, 6)] {
        store.upsert_student(&s).await.unwrap();
    }

    let books: [(i64, Option<f64>, std::ops::RangeInclusive<i64>); 6] = [
        (1, Some(6.0), 1..=40),
        (2, Some(7.0), 41..=100),
        (3, Some(6.5), 20..=80),
        (4, None, 90..=120),
        (5, Some(8.0), 1..=120),
        // No vocabulary rows: never scored
        (6, Some(6.0), 1..=0),
    ];
    for (id, level, words) in books {
        store
            .upsert_book(&Book {
                id,
                title: format!("Book {}", id),
                author: Some(format!("Author {}", id)),
                reading_level: level,
                total_words: Some(50_000),
            })
            .await
            .unwrap();
        for word_id in words {
            store
                .upsert_book_vocabulary(&BookVocabulary { book_id: id, word_id, occurrence_count: 2 })
                .await
                .unwrap();
        }
    }

    let mut misuse = StudentVocabulary::new(1, 5, 4, 1);
    misuse.misuse_examples = vec![format!("{} was used as a verb", word_text(5))];
    store.record_usage(&misuse).await.unwrap();
    store.record_usage(&StudentVocabulary::new(1, 100, 3, 3)).await.unwrap();

    let mut misuse = StudentVocabulary::new(2, 5, 2, 0);
    misuse.misuse_examples = vec!["misused again".to_string()];
    store.record_usage(&misuse).await.unwrap();

    store
}
