//! Public HTTP DTOs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::Serialize;

/// Query for `/ai-powered-flashcards`.
///
/// `topics` is repeated (`?topics=a&topics=b`), which the plain struct
/// deserializer can't collect, so the handler extracts raw pairs and folds
/// them here.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FlashcardQuery {
    pub topics: Vec<String>,
    pub title: Option<String>,
}

impl FlashcardQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut q = FlashcardQuery::default();
        for (key, value) in pairs {
            match key.as_str() {
                "topics" => q.topics.push(value),
                // last one wins, like most query parsers
                "title" => q.title = Some(value),
                _ => {}
            }
        }
        q
    }
}

/// `{ "message": ... }` used by health, validation and origin rejections.
#[derive(Debug, Serialize)]
pub struct MessageOut {
    pub message: String,
}

/// Body for failures after validation.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub message: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn collects_repeated_topics_in_order() {
        let q = FlashcardQuery::from_pairs(pairs(&[
            ("topics", "Rust"),
            ("title", "Linguagens"),
            ("topics", "Go"),
            ("something", "ignored"),
        ]));
        assert_eq!(q.topics, vec!["Rust".to_string(), "Go".to_string()]);
        assert_eq!(q.title.as_deref(), Some("Linguagens"));
    }

    #[test]
    fn missing_keys_stay_empty() {
        let q = FlashcardQuery::from_pairs(Vec::new());
        assert!(q.topics.is_empty());
        assert!(q.title.is_none());
    }
}
