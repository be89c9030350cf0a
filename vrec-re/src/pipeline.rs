//! Batch recommendation pipeline
//!
//! Phase 1 scores every student against every scoreable book and writes the
//! student's top N as one transaction. A failing student is logged, recorded
//! in the summary, and skipped; the batch continues.
//!
//! Phase 2 runs only after phase 1 has finished for every student: it
//! aggregates the persisted student recommendations into the class-wide top
//! picks.
//!
//! Reference tables are only read. Running two batches concurrently against
//! the same database is the caller's responsibility to avoid.

use crate::book_vocab::{load_book_profiles, scoreable_only, BookProfile};
use crate::profile::build_known_words;
use crate::ranking::{aggregate_class, recommend_for_student};
use crate::store::RecommendationStore;
use crate::types::{BookMatch, WriteSummary};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use vrec_common::config::EngineSettings;
use vrec_common::db::{ClassRecommendation, Student, StudentRecommendation, VocabularyWord};
use vrec_common::Result;

/// A student whose recommendations could not be written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentFailure {
    pub student_id: i64,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub students_total: usize,
    pub students_processed: usize,
    pub books_total: usize,
    pub books_scoreable: usize,
    /// Rows a fully successful run would leave in `student_recommendations`
    pub expected_student_rows: usize,
    /// Rows actually present after phase 1
    pub actual_student_rows: usize,
    pub student_writes: WriteSummary,
    pub class_rows: usize,
    pub class_writes: WriteSummary,
    pub score_min: Option<f64>,
    pub score_max: Option<f64>,
    pub failures: Vec<StudentFailure>,
}

impl BatchSummary {
    /// True when every student was written and the row counts agree
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.expected_student_rows == self.actual_student_rows
    }

    fn observe_scores(&mut self, matches: &[BookMatch]) {
        for m in matches {
            self.score_min = Some(self.score_min.map_or(m.match_score, |s| s.min(m.match_score)));
            self.score_max = Some(self.score_max.map_or(m.match_score, |s| s.max(m.match_score)));
        }
    }
}

/// Compute and persist one student's recommendation set
pub async fn recommend_student<S>(
    store: &S,
    student: &Student,
    vocabulary: &[VocabularyWord],
    books: &[BookProfile],
    top_n: usize,
) -> Result<(Vec<BookMatch>, WriteSummary)>
where
    S: RecommendationStore + ?Sized,
{
    let usage = store.load_student_usage(student.id).await?;
    let known = build_known_words(student, vocabulary, &usage);
    let matches = recommend_for_student(student, &known, books, top_n);

    let rows: Vec<StudentRecommendation> = matches
        .iter()
        .map(|m| StudentRecommendation {
            student_id: student.id,
            book_id: m.book_id,
            match_score: m.match_score,
            known_words_percent: m.known_words_percent,
            new_words_count: m.new_words_count,
        })
        .collect();

    let writes = store.replace_student_recommendations(student.id, &rows).await?;

    debug!(
        student_id = student.id,
        known_words = known.len(),
        recommended = matches.len(),
        inserted = writes.inserted,
        updated = writes.updated,
        pruned = writes.pruned,
        "Stored student recommendations"
    );

    Ok((matches, writes))
}

/// Aggregate persisted student recommendations into the class top N
pub async fn recommend_class<S>(store: &S, top_n: usize) -> Result<(Vec<ClassRecommendation>, usize, WriteSummary)>
where
    S: RecommendationStore + ?Sized,
{
    let student_rows = store.load_student_recommendations().await?;
    let picks = aggregate_class(&student_rows, top_n);

    let rows: Vec<ClassRecommendation> = picks
        .iter()
        .map(|p| ClassRecommendation {
            book_id: p.book_id,
            match_score: p.average_match_score,
            students_recommended_count: p.students_recommended_count,
        })
        .collect();

    let writes = store.replace_class_recommendations(&rows).await?;
    Ok((rows, student_rows.len(), writes))
}

/// Run both phases for every student
pub async fn run<S>(store: &S, settings: &EngineSettings) -> Result<BatchSummary>
where
    S: RecommendationStore + ?Sized,
{
    settings.validate()?;

    let mut summary = BatchSummary::default();

    let students = store.load_students().await?;
    summary.students_total = students.len();
    if students.is_empty() {
        warn!("No students found; nothing to recommend");
    }

    let all_books = load_book_profiles(store).await?;
    summary.books_total = all_books.len();
    let books = scoreable_only(all_books);
    summary.books_scoreable = books.len();
    if books.is_empty() {
        warn!("No books with vocabulary data; every student gets an empty recommendation set");
    }

    let max_grade = students.iter().map(|s| s.assigned_grade).max().unwrap_or(0);
    let vocabulary = store.load_vocabulary_words(max_grade).await?;

    info!(
        students = students.len(),
        books = books.len(),
        vocabulary_words = vocabulary.len(),
        "Phase 1: scoring students against books"
    );

    for (index, student) in students.iter().enumerate() {
        debug!("[{}/{}] Processing student {}", index + 1, students.len(), student.id);

        match recommend_student(store, student, &vocabulary, &books, settings.student_top_n).await {
            Ok((matches, writes)) => {
                summary.students_processed += 1;
                summary.expected_student_rows += matches.len();
                summary.student_writes.absorb(writes);
                summary.observe_scores(&matches);
            }
            Err(e) => {
                error!(student_id = student.id, "Failed to store recommendations: {}", e);
                summary.expected_student_rows += settings.student_top_n.min(books.len());
                summary.failures.push(StudentFailure {
                    student_id: student.id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        processed = summary.students_processed,
        failed = summary.failures.len(),
        written = summary.student_writes.written(),
        inserted = summary.student_writes.inserted,
        updated = summary.student_writes.updated,
        pruned = summary.student_writes.pruned,
        "Phase 1 complete"
    );

    info!("Phase 2: aggregating class-wide recommendations");
    let (class_rows, student_rows, class_writes) = recommend_class(store, settings.class_top_n).await?;
    summary.actual_student_rows = student_rows;
    summary.class_rows = class_rows.len();
    summary.class_writes = class_writes;
    debug!(
        written = class_writes.written(),
        pruned = class_writes.pruned,
        "Stored class recommendations"
    );

    for (rank, rec) in class_rows.iter().enumerate() {
        info!(
            rank = rank + 1,
            book_id = rec.book_id,
            students = rec.students_recommended_count,
            avg_score = rec.match_score,
            "Class recommendation"
        );
    }

    if summary.is_complete() {
        info!(
            student_rows = summary.actual_student_rows,
            class_rows = summary.class_rows,
            "Recommendation run complete"
        );
    } else {
        warn!(
            expected = summary.expected_student_rows,
            actual = summary.actual_student_rows,
            failures = summary.failures.len(),
            "Recommendation run finished with missing rows"
        );
    }

    Ok(summary)
}
