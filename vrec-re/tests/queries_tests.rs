//! Integration tests for the read-side calls and misuse dismissal

mod helpers;

use helpers::{empty_store, seeded_store, word_text, GRADE_SIX_WORDS, GRADE_SEVEN_WORDS};
use std::io::Write;
use tempfile::NamedTempFile;
use vrec_common::config::EngineSettings;
use vrec_common::db::DismissReason;
use vrec_common::Error;
use vrec_re::seed::{import_seed, SeedData};
use vrec_re::{queries, run, RecommendationStore};

// =============================================================================
// Recommendation views
// =============================================================================

#[tokio::test]
async fn test_student_views_respect_limit() {
    let store = seeded_store().await;
    run(&store, &EngineSettings::default()).await.unwrap();

    let one = queries::student_recommendations(&store, 2, 1).await.unwrap();
    let all = queries::student_recommendations(&store, 2, 10).await.unwrap();

    assert_eq!(one.len(), 1);
    assert_eq!(all.len(), 3);
    assert_eq!(one[0], all[0]);
}

#[tokio::test]
async fn test_unknown_student_has_no_recommendations() {
    let store = seeded_store().await;
    run(&store, &EngineSettings::default()).await.unwrap();

    assert!(queries::student_recommendations(&store, 999, 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_class_views_ordered_by_student_count() {
    let store = seeded_store().await;
    run(&store, &EngineSettings::default()).await.unwrap();

    let views = queries::class_recommendations(&store, 2).await.unwrap();

    assert!(!views.is_empty() && views.len() <= 2);
    for pair in views.windows(2) {
        assert!(
            pair[0].students_recommended_count > pair[1].students_recommended_count
                || (pair[0].students_recommended_count == pair[1].students_recommended_count
                    && pair[0].avg_match_score >= pair[1].avg_match_score)
        );
    }
    for view in &views {
        assert!(view.students_recommended_count >= 1 && view.students_recommended_count <= 3);
        assert!((0.0..=1.0).contains(&view.avg_match_score));
    }
}

// =============================================================================
// Mastery
// =============================================================================

#[tokio::test]
async fn test_mastery_for_unknown_student_is_not_found() {
    let store = seeded_store().await;

    let result = queries::student_mastery(&store, 42).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_mastery_report_contents() {
    let store = seeded_store().await;

    let report = queries::student_mastery(&store, 1).await.unwrap();

    assert_eq!(report.student_id, 1);
    assert_eq!(report.assigned_grade, 6);
    assert_eq!(report.total_grade_level_words, GRADE_SIX_WORDS.count());
    assert!((0.0..=100.0).contains(&report.mastery_percent));

    // Correct usage makes word 5 known despite the misuse
    assert!(!report.missing_words.contains(&word_text(5)));
    let mut sorted = report.missing_words.clone();
    sorted.sort();
    assert_eq!(report.missing_words, sorted);

    assert_eq!(report.misused_words.len(), 1);
    let misuse = &report.misused_words[0];
    assert_eq!(misuse.word, word_text(5));
    assert_eq!(misuse.correct_count, 1);
    assert_eq!(misuse.incorrect_count, 3);
    assert_eq!(misuse.examples.len(), 1);
}

#[tokio::test]
async fn test_mastery_counts_only_assigned_grade_words() {
    let store = seeded_store().await;

    // Student 2 is in grade 7; the 60 grade-6 words are prerequisites
    let report = queries::student_mastery(&store, 2).await.unwrap();

    assert_eq!(report.total_grade_level_words, 60);
    assert_eq!(report.words_known + report.missing_words.len(), 60);
    assert!(report.mastery_percent < 100.0);
    assert!((report.mastery_percent - 100.0 * report.words_known as f64 / 60.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_mastery_matches_scoring_known_set() {
    let store = seeded_store().await;

    let first = queries::student_mastery(&store, 2).await.unwrap();
    let second = queries::student_mastery(&store, 2).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_grade_level_words, GRADE_SEVEN_WORDS.count());
    // Zero correct uses leave word 5 to the baseline only
    assert_eq!(first.misused_words[0].correct_count, 0);
}

// =============================================================================
// Student and book lists
// =============================================================================

#[tokio::test]
async fn test_list_students_carries_mastery() {
    let store = seeded_store().await;

    let students = queries::list_students(&store).await.unwrap();

    let ids: Vec<i64> = students.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(students[1].name, "Student 2");
    assert_eq!(students[1].reading_level, 7.2);
    assert_eq!(students[1].assigned_grade, 7);

    for summary in &students {
        let report = queries::student_mastery(&store, summary.id).await.unwrap();
        assert_eq!(summary.vocab_mastery_percent, report.mastery_percent);
        assert!(summary.vocab_mastery_percent < 100.0);
    }
}

#[tokio::test]
async fn test_list_students_empty() {
    let store = empty_store().await;

    assert!(queries::list_students(&store).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_books_unfiltered_includes_unleveled() {
    let store = seeded_store().await;

    let books = queries::list_books(&store, None, None).await.unwrap();

    let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(books[3].reading_level, None);
    assert_eq!(books[0].total_words, Some(50_000));
}

#[tokio::test]
async fn test_list_books_by_reading_level() {
    let store = seeded_store().await;

    // Levels: 1=6.0, 2=7.0, 3=6.5, 4=none, 5=8.0, 6=6.0
    let ids = |books: Vec<vrec_common::db::Book>| books.iter().map(|b| b.id).collect::<Vec<_>>();

    let range = queries::list_books(&store, Some(6.5), Some(7.0)).await.unwrap();
    assert_eq!(ids(range), vec![2, 3]);

    let at_least = queries::list_books(&store, Some(7.0), None).await.unwrap();
    assert_eq!(ids(at_least), vec![2, 5]);

    let at_most = queries::list_books(&store, None, Some(6.0)).await.unwrap();
    assert_eq!(ids(at_most), vec![1, 6]);

    assert!(queries::list_books(&store, Some(9.0), Some(5.0)).await.unwrap().is_empty());
    assert!(matches!(
        queries::list_books(&store, Some(f64::NAN), None).await,
        Err(Error::InvalidInput(_))
    ));
}

// =============================================================================
// Dismissal
// =============================================================================

#[tokio::test]
async fn test_dismissal_hides_misuse_but_keeps_mastery() {
    let store = seeded_store().await;
    let before = queries::student_mastery(&store, 1).await.unwrap();

    queries::dismiss_misuse(&store, 1, 5, DismissReason::Addressed)
        .await
        .unwrap();

    let after = queries::student_mastery(&store, 1).await.unwrap();
    assert!(after.misused_words.is_empty());
    assert_eq!(after.words_known, before.words_known);
    assert_eq!(after.mastery_percent, before.mastery_percent);

    let usage = store.load_student_usage(1).await.unwrap();
    let record = usage.iter().find(|r| r.word_id == 5).unwrap();
    assert!(record.dismissed);
    assert_eq!(record.dismissed_reason, Some(DismissReason::Addressed));
    assert!(record.dismissed_at.is_some());
    assert_eq!(record.usage_count, 4);
    assert_eq!(record.correct_usage_count, 1);
}

#[tokio::test]
async fn test_dismissal_again_refreshes_timestamp_and_reason() {
    let store = seeded_store().await;

    let first = queries::dismiss_misuse(&store, 2, 5, DismissReason::Addressed)
        .await
        .unwrap();
    let second = queries::dismiss_misuse(&store, 2, 5, DismissReason::AiError)
        .await
        .unwrap();

    assert!(second >= first);
    let usage = store.load_student_usage(2).await.unwrap();
    assert_eq!(usage[0].dismissed_reason, Some(DismissReason::AiError));
    assert!(usage[0].dismissed);
}

#[tokio::test]
async fn test_dismissal_without_record_is_not_found() {
    let store = seeded_store().await;

    let result = queries::dismiss_misuse(&store, 3, 5, DismissReason::AiError).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(store.load_student_usage(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dismissal_survives_usage_refresh() {
    let store = seeded_store().await;
    queries::dismiss_misuse(&store, 2, 5, DismissReason::AiError)
        .await
        .unwrap();

    let mut refreshed = store.load_student_usage(2).await.unwrap().remove(0);
    refreshed.usage_count = 5;
    refreshed.correct_usage_count = 2;
    store.record_usage(&refreshed).await.unwrap();

    let record = store.load_student_usage(2).await.unwrap().remove(0);
    assert_eq!(record.usage_count, 5);
    assert!(record.dismissed);
}

// =============================================================================
// Class statistics
// =============================================================================

#[tokio::test]
async fn test_class_stats_on_seeded_class() {
    let store = seeded_store().await;

    let stats = queries::class_stats(&store, 10).await.unwrap();

    assert_eq!(stats.total_students, 3);
    assert!((0.0..=100.0).contains(&stats.avg_vocab_mastery_percent));
    // Reading levels 6.0, 7.2, 5.4 round to 6, 7, 5
    assert_eq!(stats.reading_level_distribution.get(&5), Some(&1));
    assert_eq!(stats.reading_level_distribution.get(&6), Some(&1));
    assert_eq!(stats.reading_level_distribution.get(&7), Some(&1));

    // Word 5 is misused by students 1 and 2
    assert_eq!(stats.commonly_misused_words.len(), 1);
    assert_eq!(stats.commonly_misused_words[0].word, word_text(5));
    assert_eq!(stats.commonly_misused_words[0].students, 2);

    assert!(stats.top_missing_words.len() <= 10);
    for pair in stats.top_missing_words.windows(2) {
        assert!(pair[0].students >= pair[1].students);
    }
}

#[tokio::test]
async fn test_class_stats_after_dismissal() {
    let store = seeded_store().await;
    queries::dismiss_misuse(&store, 1, 5, DismissReason::Addressed)
        .await
        .unwrap();

    let stats = queries::class_stats(&store, 10).await.unwrap();

    assert_eq!(stats.commonly_misused_words[0].students, 1);
}

#[tokio::test]
async fn test_class_stats_empty_class() {
    let store = empty_store().await;

    let stats = queries::class_stats(&store, 10).await.unwrap();

    assert_eq!(stats.total_students, 0);
    assert_eq!(stats.avg_vocab_mastery_percent, 0.0);
    assert!(stats.reading_level_distribution.is_empty());
    assert!(stats.top_missing_words.is_empty());
}

// =============================================================================
// Seed import
// =============================================================================

const SEED_DOCUMENT: &str = r#"{
    "students": [
        {"id": 1, "name": "Ada", "actual_reading_level": 6.5, "assigned_grade": 6},
        {"id": 2, "name": "Ben", "actual_reading_level": 5.0, "assigned_grade": 6}
    ],
    "vocabulary": [
        {"id": 1, "word": "candid", "grade_level": 6},
        {"id": 2, "word": "lucid", "grade_level": 6},
        {"id": 3, "word": "arduous", "grade_level": 6}
    ],
    "books": [
        {"id": 10, "title": "Kidnapped", "author": "R. L. Stevenson", "reading_level": 6.0,
         "vocabulary": [{"word_id": 1, "occurrence_count": 4}, {"word_id": 3, "occurrence_count": 1}]},
        {"id": 11, "title": "Untagged"}
    ],
    "usage": [
        {"student_id": 1, "word_id": 2, "usage_count": 3, "correct_usage_count": 1,
         "misuse_examples": ["The lucid dog barked."]}
    ]
}"#;

#[tokio::test]
async fn test_seed_file_import_then_generate() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SEED_DOCUMENT.as_bytes()).unwrap();

    let data = SeedData::from_file(file.path()).unwrap();
    let store = empty_store().await;
    let summary = import_seed(&store, &data).await.unwrap();

    assert_eq!(summary.students, 2);
    assert_eq!(summary.vocabulary_words, 3);
    assert_eq!(summary.books, 2);
    assert_eq!(summary.book_vocabulary, 2);
    assert_eq!(summary.usage_records, 1);

    assert_eq!(store.find_word("lucid").await.unwrap().map(|w| w.id), Some(2));
    assert!(store.find_word("verbose").await.unwrap().is_none());

    let batch = run(&store, &EngineSettings::default()).await.unwrap();
    assert_eq!(batch.books_scoreable, 1);
    assert_eq!(batch.actual_student_rows, 2);
    assert!(batch.is_complete());

    let views = queries::student_recommendations(&store, 1, 3).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].title, "Kidnapped");
    assert_eq!(views[0].author.as_deref(), Some("R. L. Stevenson"));
}

#[tokio::test]
async fn test_invalid_seed_writes_nothing() {
    let mut data: SeedData = serde_json::from_str(SEED_DOCUMENT).unwrap();
    data.usage[0].word_id = 77;
    let store = empty_store().await;

    let result = import_seed(&store, &data).await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(store.load_students().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_seed_write_rolls_back_import() {
    let data: SeedData = serde_json::from_str(SEED_DOCUMENT).unwrap();
    let store = empty_store().await;
    // Same text under another id: the document is valid on its own but the
    // vocabulary insert hits the unique word constraint
    store
        .upsert_vocabulary_word(&vrec_common::db::VocabularyWord {
            id: 99,
            word: "lucid".to_string(),
            grade_level: 6,
        })
        .await
        .unwrap();

    let result = import_seed(&store, &data).await;

    assert!(matches!(result, Err(Error::Database(_))));
    assert!(store.load_students().await.unwrap().is_empty());
    assert!(store.load_books().await.unwrap().is_empty());
    assert_eq!(store.load_vocabulary_words(i64::MAX).await.unwrap().len(), 1);
}
