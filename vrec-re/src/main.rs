//! vrec-re (Recommendation Engine) - batch job and read commands
//!
//! `generate` recomputes every student's recommendations and the class-wide
//! picks. The remaining subcommands import seed data, read results, or
//! dismiss misuse records. Results are printed as JSON on stdout; logs go to
//! stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vrec_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use vrec_common::db::{init_database, DismissReason};
use vrec_re::seed::{import_seed, SeedData};
use vrec_re::{queries, SqliteStore, MODULE_NAME};

#[derive(Parser, Debug)]
#[command(name = "vrec-re", version, about = "Vocabulary-based book recommendation engine")]
struct Cli {
    /// Root folder holding vrec.db (overrides environment and config file)
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (defaults to <config dir>/vrec/recommendation-engine.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute student and class recommendations
    Generate,
    /// Import students, vocabulary, books, and usage from a JSON file
    Import { file: PathBuf },
    /// List students with their vocabulary mastery
    Students,
    /// List books, optionally within a reading level range
    Books {
        #[arg(long)]
        min_level: Option<f64>,
        #[arg(long)]
        max_level: Option<f64>,
    },
    /// Show a student's current top recommendations
    Student { student_id: i64 },
    /// Show the class-wide top recommendations
    Class,
    /// Show a student's vocabulary mastery
    Mastery { student_id: i64 },
    /// Show class-wide vocabulary statistics
    Stats,
    /// Dismiss a student's misuse record for a word (id or text)
    Dismiss {
        student_id: i64,
        word: String,
        #[arg(long, value_enum)]
        reason: ReasonArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReasonArg {
    Addressed,
    #[value(name = "ai_error")]
    AiError,
}

impl From<ReasonArg> for DismissReason {
    fn from(arg: ReasonArg) -> Self {
        match arg {
            ReasonArg::Addressed => DismissReason::Addressed,
            ReasonArg::AiError => DismissReason::AiError,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TomlConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::load_or_default(MODULE_NAME),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting VREC Recommendation Engine (vrec-re) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(cli.root_folder.clone())
        .with_config(config.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    let store = SqliteStore::new(pool);
    let settings = &config.engine;

    match cli.command {
        Command::Generate => {
            let summary = vrec_re::run(&store, settings).await?;
            print_json(&summary)?;
            if !summary.is_complete() {
                anyhow::bail!(
                    "{} of {} students failed; {} of {} expected rows present",
                    summary.failures.len(),
                    summary.students_total,
                    summary.actual_student_rows,
                    summary.expected_student_rows
                );
            }
        }
        Command::Import { file } => {
            let data = SeedData::from_file(&file)
                .with_context(|| format!("Failed to read seed file {}", file.display()))?;
            let summary = import_seed(&store, &data).await?;
            print_json(&summary)?;
        }
        Command::Students => {
            let students = queries::list_students(&store).await?;
            print_json(&students)?;
        }
        Command::Books { min_level, max_level } => {
            let books = queries::list_books(&store, min_level, max_level).await?;
            print_json(&books)?;
        }
        Command::Student { student_id } => {
            let recs = queries::student_recommendations(&store, student_id, settings.student_top_n).await?;
            print_json(&recs)?;
        }
        Command::Class => {
            let recs = queries::class_recommendations(&store, settings.class_top_n).await?;
            print_json(&recs)?;
        }
        Command::Mastery { student_id } => {
            let report = queries::student_mastery(&store, student_id).await?;
            print_json(&report)?;
        }
        Command::Stats => {
            let stats = queries::class_stats(&store, settings.top_words_limit).await?;
            print_json(&stats)?;
        }
        Command::Dismiss {
            student_id,
            word,
            reason,
        } => {
            let word_id = match word.parse::<i64>() {
                Ok(id) => id,
                Err(_) => {
                    store
                        .find_word(&word)
                        .await?
                        .with_context(|| format!("Unknown vocabulary word '{}'", word))?
                        .id
                }
            };
            let dismissed_at =
                queries::dismiss_misuse(&store, student_id, word_id, reason.into()).await?;
            print_json(&serde_json::json!({
                "student_id": student_id,
                "word_id": word_id,
                "dismissed_at": dismissed_at,
            }))?;
        }
    }

    Ok(())
}
