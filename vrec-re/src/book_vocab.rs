//! Book vocabulary access
//!
//! Pass-through lookup of each book's word -> occurrence count table. Books
//! without any vocabulary rows cannot be scored and are left out of ranking.

use crate::store::RecommendationStore;
use std::collections::HashMap;
use tracing::debug;
use vrec_common::db::Book;
use vrec_common::Result;

/// A book together with its vocabulary profile
#[derive(Debug, Clone)]
pub struct BookProfile {
    pub book: Book,
    /// word_id -> occurrence_count
    pub words: HashMap<i64, i64>,
}

impl BookProfile {
    pub fn is_scoreable(&self) -> bool {
        !self.words.is_empty()
    }
}

/// Vocabulary map of one book
pub async fn book_vocabulary<S>(store: &S, book_id: i64) -> Result<HashMap<i64, i64>>
where
    S: RecommendationStore + ?Sized,
{
    store.load_book_vocabulary(book_id).await
}

/// Every book with its vocabulary, ordered by book id
pub async fn load_book_profiles<S>(store: &S) -> Result<Vec<BookProfile>>
where
    S: RecommendationStore + ?Sized,
{
    let mut profiles = Vec::new();

    for book in store.load_books().await? {
        let words = book_vocabulary(store, book.id).await?;
        profiles.push(BookProfile { book, words });
    }

    profiles.sort_by_key(|p| p.book.id);
    Ok(profiles)
}

/// Drop books that cannot be scored
pub fn scoreable_only(profiles: Vec<BookProfile>) -> Vec<BookProfile> {
    profiles
        .into_iter()
        .filter(|profile| {
            if !profile.is_scoreable() {
                debug!(book_id = profile.book.id, "Skipping book without vocabulary data");
            }
            profile.is_scoreable()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: i64, words: &[(i64, i64)]) -> BookProfile {
        BookProfile {
            book: Book {
                id,
                title: format!("Book {}", id),
                author: Some("Anon".to_string()),
                reading_level: Some(6.0),
                total_words: Some(1000),
            },
            words: words.iter().copied().collect(),
        }
    }

    #[test]
    fn test_empty_vocabulary_is_unscoreable() {
        assert!(!profile(1, &[]).is_scoreable());
        assert!(profile(2, &[(7, 3)]).is_scoreable());
    }

    #[test]
    fn test_scoreable_only_keeps_order() {
        let kept = scoreable_only(vec![
            profile(1, &[(1, 1)]),
            profile(2, &[]),
            profile(3, &[(2, 4)]),
        ]);

        let ids: Vec<i64> = kept.iter().map(|p| p.book.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
