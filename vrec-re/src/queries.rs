//! Read-side calls for the presentation layer
//!
//! Recommendation reads always re-query by score with a limit instead of
//! trusting that lower-ranked rows were pruned.

use crate::stats::{class_stats as aggregate_class_stats, student_mastery as build_mastery};
use crate::store::RecommendationStore;
use crate::types::{
    BookRecommendationView, ClassRecommendationView, ClassStats, MasteryReport, StudentSummary,
};
use chrono::{DateTime, Utc};
use tracing::info;
use vrec_common::db::{Book, DismissReason};
use vrec_common::{Error, Result};

/// Every student with their vocabulary mastery, ordered by id
pub async fn list_students<S>(store: &S) -> Result<Vec<StudentSummary>>
where
    S: RecommendationStore + ?Sized,
{
    let students = store.load_students().await?;
    let vocabulary = store.load_vocabulary_words(i64::MAX).await?;

    let mut summaries = Vec::with_capacity(students.len());
    for student in students {
        let usage = store.load_student_usage(student.id).await?;
        let report = build_mastery(&student, &vocabulary, &usage);
        summaries.push(StudentSummary {
            id: student.id,
            name: student.name,
            reading_level: student.actual_reading_level,
            assigned_grade: student.assigned_grade,
            vocab_mastery_percent: report.mastery_percent,
        });
    }

    Ok(summaries)
}

/// Books ordered by id, optionally restricted to a reading level range
///
/// Bounds are inclusive. A book without a reading level only matches when
/// no bound is given.
pub async fn list_books<S>(
    store: &S,
    min_level: Option<f64>,
    max_level: Option<f64>,
) -> Result<Vec<Book>>
where
    S: RecommendationStore + ?Sized,
{
    for bound in [min_level, max_level].into_iter().flatten() {
        if !bound.is_finite() {
            return Err(Error::InvalidInput(format!("reading level bound {} is not finite", bound)));
        }
    }

    let books = store.load_books().await?;
    if min_level.is_none() && max_level.is_none() {
        return Ok(books);
    }

    Ok(books
        .into_iter()
        .filter(|book| match book.reading_level {
            Some(level) => {
                min_level.map_or(true, |min| level >= min) && max_level.map_or(true, |max| level <= max)
            }
            None => false,
        })
        .collect())
}

/// A student's current top recommendations, best first
pub async fn student_recommendations<S>(
    store: &S,
    student_id: i64,
    limit: usize,
) -> Result<Vec<BookRecommendationView>>
where
    S: RecommendationStore + ?Sized,
{
    store.student_recommendation_views(student_id, limit).await
}

/// Class-wide top recommendations, best first
pub async fn class_recommendations<S>(store: &S, limit: usize) -> Result<Vec<ClassRecommendationView>>
where
    S: RecommendationStore + ?Sized,
{
    store.class_recommendation_views(limit).await
}

/// Mastery report for one student
pub async fn student_mastery<S>(store: &S, student_id: i64) -> Result<MasteryReport>
where
    S: RecommendationStore + ?Sized,
{
    let student = store
        .load_student(student_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Student {} not found", student_id)))?;

    // All grades: misused words above the assigned grade still need names
    let vocabulary = store.load_vocabulary_words(i64::MAX).await?;
    let usage = store.load_student_usage(student.id).await?;

    Ok(build_mastery(&student, &vocabulary, &usage))
}

/// Class-wide statistics
pub async fn class_stats<S>(store: &S, top_words_limit: usize) -> Result<ClassStats>
where
    S: RecommendationStore + ?Sized,
{
    let students = store.load_students().await?;
    let vocabulary = store.load_vocabulary_words(i64::MAX).await?;

    let mut with_usage = Vec::with_capacity(students.len());
    for student in students {
        let usage = store.load_student_usage(student.id).await?;
        with_usage.push((student, usage));
    }

    Ok(aggregate_class_stats(&with_usage, &vocabulary, top_words_limit))
}

/// Dismiss a student's misuse record for a word
pub async fn dismiss_misuse<S>(
    store: &S,
    student_id: i64,
    word_id: i64,
    reason: DismissReason,
) -> Result<DateTime<Utc>>
where
    S: RecommendationStore + ?Sized,
{
    let dismissed_at = store.dismiss_misuse(student_id, word_id, reason).await?;
    info!(student_id, word_id, reason = %reason, "Dismissed misuse record");
    Ok(dismissed_at)
}
