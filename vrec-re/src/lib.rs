//! vrec-re library - Recommendation Engine
//!
//! Matches students to books by vocabulary:
//! - `profile`: known-word set from usage evidence plus an inferred baseline
//! - `book_vocab` / `overlap`: book vocabulary and known/new partitions
//! - `scoring`: the match score
//! - `ranking`: per-student top N and class-wide top picks
//! - `stats`: mastery and class statistics
//! - `pipeline`: the batch job tying it together
//!
//! Persistence is reached only through [`store::RecommendationStore`].

pub mod book_vocab;
pub mod overlap;
pub mod pipeline;
pub mod profile;
pub mod queries;
pub mod ranking;
pub mod scoring;
pub mod seed;
pub mod stats;
pub mod store;
pub mod types;

pub use pipeline::{run, BatchSummary};
pub use store::{RecommendationStore, SqliteStore};

/// Module name used for config file lookup and logging
pub const MODULE_NAME: &str = "recommendation-engine";
