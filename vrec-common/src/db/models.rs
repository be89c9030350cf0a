//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub actual_reading_level: f64,
    pub assigned_grade: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabularyWord {
    pub id: i64,
    pub word: String,
    pub grade_level: i64,
}

/// Why a misuse record was dismissed by a teacher
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    /// The misuse was discussed with the student
    Addressed,
    /// The correctness judgement was wrong
    AiError,
}

impl DismissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DismissReason::Addressed => "addressed",
            DismissReason::AiError => "ai_error",
        }
    }
}

impl fmt::Display for DismissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DismissReason {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "addressed" => Ok(DismissReason::Addressed),
            "ai_error" => Ok(DismissReason::AiError),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown dismiss reason '{}' (expected 'addressed' or 'ai_error')",
                other
            ))),
        }
    }
}

/// Per (student, word) usage evidence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentVocabulary {
    pub student_id: i64,
    pub word_id: i64,
    pub usage_count: i64,
    pub correct_usage_count: i64,
    pub misuse_examples: Vec<String>,
    pub dismissed: bool,
    pub dismissed_reason: Option<DismissReason>,
    pub dismissed_at: Option<DateTime<Utc>>,
}

impl StudentVocabulary {
    /// Usage record with no misuse evidence and no dismissal
    pub fn new(student_id: i64, word_id: i64, usage_count: i64, correct_usage_count: i64) -> Self {
        Self {
            student_id,
            word_id,
            usage_count,
            correct_usage_count,
            misuse_examples: Vec::new(),
            dismissed: false,
            dismissed_reason: None,
            dismissed_at: None,
        }
    }

    /// Enforce `usage_count >= correct_usage_count >= 0`
    pub fn validate(&self) -> crate::Result<()> {
        if self.correct_usage_count < 0 || self.usage_count < self.correct_usage_count {
            return Err(crate::Error::InvalidInput(format!(
                "student {} word {}: usage_count {} / correct_usage_count {} violate usage >= correct >= 0",
                self.student_id, self.word_id, self.usage_count, self.correct_usage_count
            )));
        }
        Ok(())
    }

    /// Known by direct evidence
    pub fn is_known(&self) -> bool {
        self.correct_usage_count > 0
    }

    /// Has misuse evidence that has not been dismissed
    pub fn has_active_misuse(&self) -> bool {
        !self.dismissed && !self.misuse_examples.is_empty()
    }

    pub fn incorrect_usage_count(&self) -> i64 {
        (self.usage_count - self.correct_usage_count).max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: Option<String>,
    pub reading_level: Option<f64>,
    pub total_words: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookVocabulary {
    pub book_id: i64,
    pub word_id: i64,
    pub occurrence_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudentRecommendation {
    pub student_id: i64,
    pub book_id: i64,
    pub match_score: f64,
    pub known_words_percent: f64,
    pub new_words_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassRecommendation {
    pub book_id: i64,
    pub match_score: f64,
    pub students_recommended_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dismiss_reason_round_trip_strings() {
        assert_eq!("addressed".parse::<DismissReason>().unwrap(), DismissReason::Addressed);
        assert_eq!("ai_error".parse::<DismissReason>().unwrap(), DismissReason::AiError);
        assert_eq!(DismissReason::AiError.to_string(), "ai_error");
        assert!("ignored".parse::<DismissReason>().is_err());
    }

    #[test]
    fn test_usage_invariant() {
        assert!(StudentVocabulary::new(1, 1, 3, 2).validate().is_ok());
        assert!(StudentVocabulary::new(1, 1, 0, 0).validate().is_ok());
        assert!(StudentVocabulary::new(1, 1, 1, 2).validate().is_err());
        assert!(StudentVocabulary::new(1, 1, 1, -1).validate().is_err());
    }

    #[test]
    fn test_dismissed_record_has_no_active_misuse() {
        let mut record = StudentVocabulary::new(1, 1, 3, 1);
        record.misuse_examples = vec!["He was very ambiguous to go.".to_string()];
        assert!(record.has_active_misuse());
        assert_eq!(record.incorrect_usage_count(), 2);

        record.dismissed = true;
        assert!(!record.has_active_misuse());
        // Dismissal does not change knowledge
        assert!(record.is_known());
    }
}
