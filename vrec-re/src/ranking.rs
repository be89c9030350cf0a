//! Ranking and selection
//!
//! Per student: score every scoreable book and keep the best N.
//! Per class: aggregate persisted student recommendations by book and keep
//! the books recommended to the most students.
//!
//! All orderings end with the book id so that equal scores always produce
//! the same selection.

use crate::book_vocab::BookProfile;
use crate::overlap::compute_overlap;
use crate::profile::KnownWords;
use crate::scoring::match_score;
use crate::types::{BookMatch, ClassPick};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;
use vrec_common::db::{Student, StudentRecommendation};

/// Score desc, then book id asc
fn by_score_then_book(a: &BookMatch, b: &BookMatch) -> Ordering {
    b.match_score
        .total_cmp(&a.match_score)
        .then_with(|| a.book_id.cmp(&b.book_id))
}

/// Score `student` against every scoreable book, best first
pub fn rank_books(student: &Student, known: &KnownWords, books: &[BookProfile]) -> Vec<BookMatch> {
    let mut matches: Vec<BookMatch> = books
        .iter()
        .filter(|profile| profile.is_scoreable())
        .map(|profile| {
            let overlap = compute_overlap(known, &profile.words);
            let new_words_count = overlap.new_words_count();
            let score = match_score(
                overlap.known_percent,
                new_words_count,
                profile.book.reading_level,
                student.actual_reading_level,
            );

            trace!(
                student_id = student.id,
                book_id = profile.book.id,
                known_percent = overlap.known_percent,
                new_words_count,
                score,
                "Scored book"
            );

            BookMatch {
                book_id: profile.book.id,
                match_score: score,
                known_words_percent: overlap.known_percent,
                new_words_count,
            }
        })
        .collect();

    matches.sort_by(by_score_then_book);
    matches
}

/// Top `n` recommendations for one student
pub fn recommend_for_student(
    student: &Student,
    known: &KnownWords,
    books: &[BookProfile],
    n: usize,
) -> Vec<BookMatch> {
    let mut ranked = rank_books(student, known, books);
    ranked.truncate(n);
    ranked
}

/// Class-wide top `n` books from all persisted student recommendations
///
/// Ordered by distinct students recommended (desc), then average score
/// (desc), then book id.
pub fn aggregate_class(recommendations: &[StudentRecommendation], n: usize) -> Vec<ClassPick> {
    struct Tally {
        students: BTreeSet<i64>,
        score_sum: f64,
        rows: usize,
    }

    let mut by_book: BTreeMap<i64, Tally> = BTreeMap::new();
    for rec in recommendations {
        let tally = by_book.entry(rec.book_id).or_insert_with(|| Tally {
            students: BTreeSet::new(),
            score_sum: 0.0,
            rows: 0,
        });
        tally.students.insert(rec.student_id);
        tally.score_sum += rec.match_score;
        tally.rows += 1;
    }

    let mut picks: Vec<ClassPick> = by_book
        .into_iter()
        .map(|(book_id, tally)| ClassPick {
            book_id,
            average_match_score: tally.score_sum / tally.rows as f64,
            students_recommended_count: tally.students.len() as i64,
        })
        .collect();

    picks.sort_by(|a, b| {
        b.students_recommended_count
            .cmp(&a.students_recommended_count)
            .then_with(|| b.average_match_score.total_cmp(&a.average_match_score))
            .then_with(|| a.book_id.cmp(&b.book_id))
    });
    picks.truncate(n);
    picks
}
