//! Deck, card and review records.
//!
//! Decks own their cards; cards reference a template by id and keep one
//! score per side. A side with no entry has never been reviewed and counts
//! as score zero.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Split a comma-separated tag list, trimming whitespace and dropping empties.
pub fn parse_tags(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Result of answering a card side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Wrong,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Correct => "correct",
            Outcome::Wrong => "wrong",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "correct" | "c" | "y" | "yes" => Ok(Outcome::Correct),
            "wrong" | "w" | "n" | "no" => Ok(Outcome::Wrong),
            other => Err(ValidationError::InvalidValue {
                field: "outcome".to_string(),
                message: format!("expected 'correct' or 'wrong', got '{other}'"),
            }),
        }
    }
}

/// Per-side scores of a single card.
///
/// Scores are non-negative by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewState {
    scores: BTreeMap<String, u32>,
}

impl ReviewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score of a side, zero when the side was never reviewed.
    pub fn score(&self, side: &str) -> u32 {
        self.scores.get(side).copied().unwrap_or(0)
    }

    /// Recorded score of a side, `None` when the side was never reviewed.
    pub fn recorded(&self, side: &str) -> Option<u32> {
        self.scores.get(side).copied()
    }

    pub fn set(&mut self, side: impl Into<String>, score: u32) {
        self.scores.insert(side.into(), score);
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.scores.iter().map(|(side, score)| (side.as_str(), *score))
    }
}

impl FromIterator<(String, u32)> for ReviewState {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// A unit of study content bound to a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    /// Id of the template that renders this card's sides.
    pub template: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub reviews: ReviewState,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(template: impl Into<String>, data: BTreeMap<String, String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            template: template.into(),
            data,
            tags: Vec::new(),
            reviews: ReviewState::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A named collection of cards plus its study configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Name of the scheduler used to study this deck.
    pub algorithm: String,
    #[serde(default)]
    pub cards: BTreeMap<String, Card>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deck {
    pub fn new(name: impl Into<String>, algorithm: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            algorithm: algorithm.into(),
            cards: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Insert a card, keyed by its id.
    pub fn insert_card(&mut self, card: Card) {
        self.cards.insert(card.id.clone(), card);
    }

    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.get(card_id)
    }

    pub fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.cards.get_mut(card_id)
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Check the fields a deck needs before it is stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.algorithm.trim().is_empty() {
            return Err(ValidationError::EmptyField("algorithm"));
        }
        Ok(())
    }
}

/// Deck summary without cards, as listed by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub algorithm: String,
    pub card_count: u64,
}

/// One timestamped answer, kept for statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: i64,
    pub deck_id: String,
    pub card_id: String,
    pub side: String,
    pub outcome: Outcome,
    pub reviewed_at: DateTime<Utc>,
}

/// Aggregate review statistics for a deck.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeckStats {
    pub cards: u64,
    pub reviewed_sides: u64,
    pub total_reviews: u64,
    pub correct: u64,
    pub wrong: u64,
    /// Mean score over reviewed sides, 0 when nothing was reviewed.
    pub mean_score: f64,
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_tags(" verbs, italian ,,verbs, "),
            vec!["verbs".to_string(), "italian".to_string()]
        );
        assert!(parse_tags("  ").is_empty());
    }

    #[test]
    fn outcome_parses_short_forms() {
        assert_eq!("C".parse::<Outcome>().unwrap(), Outcome::Correct);
        assert_eq!("wrong".parse::<Outcome>().unwrap(), Outcome::Wrong);
        assert!("maybe".parse::<Outcome>().is_err());
    }

    #[test]
    fn absent_side_scores_zero() {
        let mut state = ReviewState::new();
        assert_eq!(state.score("direct"), 0);
        assert_eq!(state.recorded("direct"), None);
        state.set("direct", 2);
        assert_eq!(state.score("direct"), 2);
        assert_eq!(state.recorded("direct"), Some(2));
    }

    #[test]
    fn deck_requires_name_and_algorithm() {
        assert!(Deck::new("", "Random").validate().is_err());
        assert!(Deck::new("Italian", " ").validate().is_err());
        assert!(Deck::new("Italian", "Random").validate().is_ok());
    }

    #[test]
    fn review_state_serializes_as_plain_map() {
        let mut state = ReviewState::new();
        state.set("reverse", 1);
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"reverse":1}"#);
    }
}
