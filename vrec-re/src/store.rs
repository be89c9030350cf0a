//! Data access for the recommendation engine
//!
//! The engine reaches persistent state only through [`RecommendationStore`],
//! keeping scoring and ranking independent of the database. [`SqliteStore`]
//! is the production implementation over the shared SQLite schema.

use crate::types::{BookRecommendationView, ClassRecommendationView, WriteSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::{HashMap, HashSet};
use vrec_common::db::{
    Book, BookVocabulary, ClassRecommendation, DismissReason, Student, StudentRecommendation,
    StudentVocabulary, VocabularyWord,
};
use vrec_common::{Error, Result};

/// Capabilities the engine needs from persistence
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// All students, ordered by id
    async fn load_students(&self) -> Result<Vec<Student>>;

    async fn load_student(&self, student_id: i64) -> Result<Option<Student>>;

    /// Vocabulary words with `grade_level <= max_grade`
    async fn load_vocabulary_words(&self, max_grade: i64) -> Result<Vec<VocabularyWord>>;

    /// Every usage record of one student
    async fn load_student_usage(&self, student_id: i64) -> Result<Vec<StudentVocabulary>>;

    /// All books, ordered by id
    async fn load_books(&self) -> Result<Vec<Book>>;

    /// word_id -> occurrence_count for one book
    async fn load_book_vocabulary(&self, book_id: i64) -> Result<HashMap<i64, i64>>;

    /// Make `recommendations` the student's complete recommendation set
    ///
    /// Rows for other books are removed. All-or-nothing.
    async fn replace_student_recommendations(
        &self,
        student_id: i64,
        recommendations: &[StudentRecommendation],
    ) -> Result<WriteSummary>;

    /// Every persisted student recommendation
    async fn load_student_recommendations(&self) -> Result<Vec<StudentRecommendation>>;

    /// Make `recommendations` the complete class recommendation set
    async fn replace_class_recommendations(
        &self,
        recommendations: &[ClassRecommendation],
    ) -> Result<WriteSummary>;

    /// Best `limit` recommendations of a student joined with book details
    async fn student_recommendation_views(
        &self,
        student_id: i64,
        limit: usize,
    ) -> Result<Vec<BookRecommendationView>>;

    /// Best `limit` class recommendations joined with book details
    async fn class_recommendation_views(&self, limit: usize) -> Result<Vec<ClassRecommendationView>>;

    /// Mark a student's misuse record for a word as dismissed
    ///
    /// Returns the dismissal timestamp. `Error::NotFound` when no usage
    /// record exists for the pair.
    async fn dismiss_misuse(
        &self,
        student_id: i64,
        word_id: i64,
        reason: DismissReason,
    ) -> Result<DateTime<Utc>>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================================================================
    // Reference data and usage ingestion
    // ========================================================================

    pub async fn upsert_student(&self, student: &Student) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_student(&mut tx, student).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn upsert_vocabulary_word(&self, word: &VocabularyWord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_vocabulary_word(&mut tx, word).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn upsert_book(&self, book: &Book) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_book(&mut tx, book).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn upsert_book_vocabulary(&self, entry: &BookVocabulary) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_book_vocabulary(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Record usage evidence for a (student, word) pair
    ///
    /// Overwrites counts and misuse examples; dismissal metadata is kept.
    pub async fn record_usage(&self, record: &StudentVocabulary) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_usage(&mut tx, record).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Resolve a vocabulary word by its text
    pub async fn find_word(&self, word: &str) -> Result<Option<VocabularyWord>> {
        let row = sqlx::query("SELECT id, word, grade_level FROM vocabulary_words WHERE word = ?")
            .bind(word)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| word_from_row(&row)))
    }

    pub async fn count_student_recommendations(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM student_recommendations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_class_recommendations(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM class_recommendations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ============================================================================
// Transactional writers shared by the single-row upserts and bulk import
// ============================================================================

pub(crate) async fn write_student(tx: &mut Transaction<'_, Sqlite>, student: &Student) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO students (id, name, actual_reading_level, assigned_grade)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            actual_reading_level = excluded.actual_reading_level,
            assigned_grade = excluded.assigned_grade
        "#,
    )
    .bind(student.id)
    .bind(&student.name)
    .bind(student.actual_reading_level)
    .bind(student.assigned_grade)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn write_vocabulary_word(
    tx: &mut Transaction<'_, Sqlite>,
    word: &VocabularyWord,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO vocabulary_words (id, word, grade_level)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            word = excluded.word,
            grade_level = excluded.grade_level
        "#,
    )
    .bind(word.id)
    .bind(&word.word)
    .bind(word.grade_level)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn write_book(tx: &mut Transaction<'_, Sqlite>, book: &Book) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO books (id, title, author, reading_level, total_words)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            author = excluded.author,
            reading_level = excluded.reading_level,
            total_words = excluded.total_words
        "#,
    )
    .bind(book.id)
    .bind(&book.title)
    .bind(&book.author)
    .bind(book.reading_level)
    .bind(book.total_words)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn write_book_vocabulary(
    tx: &mut Transaction<'_, Sqlite>,
    entry: &BookVocabulary,
) -> Result<()> {
    if entry.occurrence_count < 0 {
        return Err(Error::InvalidInput(format!(
            "book {} word {}: negative occurrence_count {}",
            entry.book_id, entry.word_id, entry.occurrence_count
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO book_vocabulary (book_id, word_id, occurrence_count)
        VALUES (?, ?, ?)
        ON CONFLICT(book_id, word_id) DO UPDATE SET
            occurrence_count = excluded.occurrence_count
        "#,
    )
    .bind(entry.book_id)
    .bind(entry.word_id)
    .bind(entry.occurrence_count)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn write_usage(
    tx: &mut Transaction<'_, Sqlite>,
    record: &StudentVocabulary,
) -> Result<()> {
    record.validate()?;
    let examples = serde_json::to_string(&record.misuse_examples)?;

    sqlx::query(
        r#"
        INSERT INTO student_vocabulary (
            student_id, word_id, usage_count, correct_usage_count, misuse_examples,
            last_analyzed_at
        ) VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(student_id, word_id) DO UPDATE SET
            usage_count = excluded.usage_count,
            correct_usage_count = excluded.correct_usage_count,
            misuse_examples = excluded.misuse_examples,
            last_analyzed_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(record.student_id)
    .bind(record.word_id)
    .bind(record.usage_count)
    .bind(record.correct_usage_count)
    .bind(examples)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn student_from_row(row: &SqliteRow) -> Student {
    Student {
        id: row.get("id"),
        name: row.get("name"),
        actual_reading_level: row.get("actual_reading_level"),
        assigned_grade: row.get("assigned_grade"),
    }
}

fn word_from_row(row: &SqliteRow) -> VocabularyWord {
    VocabularyWord {
        id: row.get("id"),
        word: row.get("word"),
        grade_level: row.get("grade_level"),
    }
}

fn usage_from_row(row: &SqliteRow) -> Result<StudentVocabulary> {
    let examples: String = row.get("misuse_examples");
    let reason: Option<String> = row.get("dismissed_reason");

    Ok(StudentVocabulary {
        student_id: row.get("student_id"),
        word_id: row.get("word_id"),
        usage_count: row.get("usage_count"),
        correct_usage_count: row.get("correct_usage_count"),
        misuse_examples: serde_json::from_str(&examples)?,
        dismissed: row.get("dismissed"),
        dismissed_reason: reason.map(|r| r.parse::<DismissReason>()).transpose()?,
        dismissed_at: row.get("dismissed_at"),
    })
}

/// Book ids currently stored for a key inside a transaction
async fn existing_book_ids(
    tx: &mut Transaction<'_, Sqlite>,
    sql: &str,
    student_id: Option<i64>,
) -> Result<HashSet<i64>> {
    let mut query = sqlx::query_scalar::<_, i64>(sql);
    if let Some(id) = student_id {
        query = query.bind(id);
    }
    let ids = query.fetch_all(&mut **tx).await?;
    Ok(ids.into_iter().collect())
}

#[async_trait]
impl RecommendationStore for SqliteStore {
    async fn load_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query(
            "SELECT id, name, actual_reading_level, assigned_grade FROM students ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(student_from_row).collect())
    }

    async fn load_student(&self, student_id: i64) -> Result<Option<Student>> {
        let row = sqlx::query(
            "SELECT id, name, actual_reading_level, assigned_grade FROM students WHERE id = ?",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(student_from_row))
    }

    async fn load_vocabulary_words(&self, max_grade: i64) -> Result<Vec<VocabularyWord>> {
        let rows = sqlx::query(
            "SELECT id, word, grade_level FROM vocabulary_words WHERE grade_level <= ? ORDER BY id",
        )
        .bind(max_grade)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(word_from_row).collect())
    }

    async fn load_student_usage(&self, student_id: i64) -> Result<Vec<StudentVocabulary>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, word_id, usage_count, correct_usage_count, misuse_examples,
                   dismissed, dismissed_reason, dismissed_at
            FROM student_vocabulary
            WHERE student_id = ?
            ORDER BY word_id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(usage_from_row).collect()
    }

    async fn load_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            "SELECT id, title, author, reading_level, total_words FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Book {
                id: row.get("id"),
                title: row.get("title"),
                author: row.get("author"),
                reading_level: row.get("reading_level"),
                total_words: row.get("total_words"),
            })
            .collect())
    }

    async fn load_book_vocabulary(&self, book_id: i64) -> Result<HashMap<i64, i64>> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT word_id, occurrence_count FROM book_vocabulary WHERE book_id = ?",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn replace_student_recommendations(
        &self,
        student_id: i64,
        recommendations: &[StudentRecommendation],
    ) -> Result<WriteSummary> {
        if let Some(foreign) = recommendations.iter().find(|r| r.student_id != student_id) {
            return Err(Error::InvalidInput(format!(
                "recommendation for student {} passed while replacing student {}",
                foreign.student_id, student_id
            )));
        }

        let mut tx = self.pool.begin().await?;
        let existing = existing_book_ids(
            &mut tx,
            "SELECT book_id FROM student_recommendations WHERE student_id = ?",
            Some(student_id),
        )
        .await?;

        let keep: HashSet<i64> = recommendations.iter().map(|r| r.book_id).collect();
        let mut summary = WriteSummary::default();

        for book_id in existing.difference(&keep) {
            sqlx::query("DELETE FROM student_recommendations WHERE student_id = ? AND book_id = ?")
                .bind(student_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
            summary.pruned += 1;
        }

        for rec in recommendations {
            if existing.contains(&rec.book_id) {
                sqlx::query(
                    r#"
                    UPDATE student_recommendations
                    SET match_score = ?, known_words_percent = ?, new_words_count = ?,
                        updated_at = CURRENT_TIMESTAMP
                    WHERE student_id = ? AND book_id = ?
                    "#,
                )
                .bind(rec.match_score)
                .bind(rec.known_words_percent)
                .bind(rec.new_words_count)
                .bind(student_id)
                .bind(rec.book_id)
                .execute(&mut *tx)
                .await?;
                summary.updated += 1;
            } else {
                sqlx::query(
                    r#"
                    INSERT INTO student_recommendations (
                        student_id, book_id, match_score, known_words_percent, new_words_count
                    ) VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(student_id)
                .bind(rec.book_id)
                .bind(rec.match_score)
                .bind(rec.known_words_percent)
                .bind(rec.new_words_count)
                .execute(&mut *tx)
                .await?;
                summary.inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(summary)
    }

    async fn load_student_recommendations(&self) -> Result<Vec<StudentRecommendation>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, book_id, match_score, known_words_percent, new_words_count
            FROM student_recommendations
            ORDER BY student_id, match_score DESC, book_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StudentRecommendation {
                student_id: row.get("student_id"),
                book_id: row.get("book_id"),
                match_score: row.get("match_score"),
                known_words_percent: row.get("known_words_percent"),
                new_words_count: row.get("new_words_count"),
            })
            .collect())
    }

    async fn replace_class_recommendations(
        &self,
        recommendations: &[ClassRecommendation],
    ) -> Result<WriteSummary> {
        let mut tx = self.pool.begin().await?;
        let existing =
            existing_book_ids(&mut tx, "SELECT book_id FROM class_recommendations", None).await?;

        let keep: HashSet<i64> = recommendations.iter().map(|r| r.book_id).collect();
        let mut summary = WriteSummary::default();

        for book_id in existing.difference(&keep) {
            sqlx::query("DELETE FROM class_recommendations WHERE book_id = ?")
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
            summary.pruned += 1;
        }

        for rec in recommendations {
            sqlx::query(
                r#"
                INSERT INTO class_recommendations (book_id, match_score, students_recommended_count)
                VALUES (?, ?, ?)
                ON CONFLICT(book_id) DO UPDATE SET
                    match_score = excluded.match_score,
                    students_recommended_count = excluded.students_recommended_count,
                    updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(rec.book_id)
            .bind(rec.match_score)
            .bind(rec.students_recommended_count)
            .execute(&mut *tx)
            .await?;

            if existing.contains(&rec.book_id) {
                summary.updated += 1;
            } else {
                summary.inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(summary)
    }

    async fn student_recommendation_views(
        &self,
        student_id: i64,
        limit: usize,
    ) -> Result<Vec<BookRecommendationView>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id AS book_id, b.title, b.author, b.reading_level,
                   r.match_score, r.known_words_percent, r.new_words_count
            FROM student_recommendations r
            JOIN books b ON b.id = r.book_id
            WHERE r.student_id = ?
            ORDER BY r.match_score DESC, r.book_id ASC
            LIMIT ?
            "#,
        )
        .bind(student_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| BookRecommendationView {
                book_id: row.get("book_id"),
                title: row.get("title"),
                author: row.get("author"),
                reading_level: row.get("reading_level"),
                match_score: row.get("match_score"),
                known_words_percent: row.get("known_words_percent"),
                new_words_count: row.get("new_words_count"),
            })
            .collect())
    }

    async fn class_recommendation_views(&self, limit: usize) -> Result<Vec<ClassRecommendationView>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id AS book_id, b.title, b.author, b.reading_level,
                   c.match_score, c.students_recommended_count
            FROM class_recommendations c
            JOIN books b ON b.id = c.book_id
            ORDER BY c.students_recommended_count DESC, c.match_score DESC, c.book_id ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ClassRecommendationView {
                book_id: row.get("book_id"),
                title: row.get("title"),
                author: row.get("author"),
                reading_level: row.get("reading_level"),
                avg_match_score: row.get("match_score"),
                students_recommended_count: row.get("students_recommended_count"),
            })
            .collect())
    }

    async fn dismiss_misuse(
        &self,
        student_id: i64,
        word_id: i64,
        reason: DismissReason,
    ) -> Result<DateTime<Utc>> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE student_vocabulary
            SET dismissed = 1, dismissed_reason = ?, dismissed_at = ?
            WHERE student_id = ? AND word_id = ?
            "#,
        )
        .bind(reason.as_str())
        .bind(now)
        .bind(student_id)
        .bind(word_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "No vocabulary usage record for student {} and word {}",
                student_id, word_id
            )));
        }

        Ok(now)
    }
}
