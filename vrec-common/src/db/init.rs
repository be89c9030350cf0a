//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates every table with
//! `CREATE TABLE IF NOT EXISTS`, so initialization is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    configure_connection(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to one connection: every pooled connection to `sqlite::memory:`
/// would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    configure_connection(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;
    Ok(())
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Reference data
    create_students_table(pool).await?;
    create_vocabulary_words_table(pool).await?;
    create_books_table(pool).await?;
    create_book_vocabulary_table(pool).await?;

    // Usage evidence (written by the external analysis pipeline)
    create_student_vocabulary_table(pool).await?;

    // Derived recommendation tables
    create_student_recommendations_table(pool).await?;
    create_class_recommendations_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            actual_reading_level REAL NOT NULL,
            assigned_grade INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_vocabulary_words_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vocabulary_words (
            id INTEGER PRIMARY KEY,
            word TEXT NOT NULL UNIQUE,
            grade_level INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vocabulary_words_grade ON vocabulary_words(grade_level)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT,
            reading_level REAL,
            total_words INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_book_vocabulary_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_vocabulary (
            book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            word_id INTEGER NOT NULL REFERENCES vocabulary_words(id) ON DELETE CASCADE,
            occurrence_count INTEGER NOT NULL CHECK (occurrence_count >= 0),
            PRIMARY KEY (book_id, word_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_student_vocabulary_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS student_vocabulary (
            student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            word_id INTEGER NOT NULL REFERENCES vocabulary_words(id) ON DELETE CASCADE,
            usage_count INTEGER NOT NULL DEFAULT 0,
            correct_usage_count INTEGER NOT NULL DEFAULT 0,
            misuse_examples TEXT NOT NULL DEFAULT '[]',
            dismissed INTEGER NOT NULL DEFAULT 0,
            dismissed_reason TEXT CHECK (dismissed_reason IN ('addressed', 'ai_error')),
            dismissed_at TIMESTAMP,
            last_analyzed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (student_id, word_id),
            CHECK (correct_usage_count >= 0 AND usage_count >= correct_usage_count)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_student_recommendations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS student_recommendations (
            student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            match_score REAL NOT NULL,
            known_words_percent REAL NOT NULL,
            new_words_count INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (student_id, book_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_student_recs_score ON student_recommendations(student_id, match_score DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_class_recommendations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS class_recommendations (
            book_id INTEGER PRIMARY KEY REFERENCES books(id) ON DELETE CASCADE,
            match_score REAL NOT NULL,
            students_recommended_count INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
