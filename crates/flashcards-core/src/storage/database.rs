//! SQLite-backed store for templates, decks, cards and reviews.
//!
//! Provides persistent storage for:
//! - Card templates (shared, versioned)
//! - Decks and their cards
//! - Per-side review scores read and written by the schedulers
//! - A timestamped review log used for deck statistics

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::migrations;
use super::Config;
use crate::error::{CoreError, DatabaseError, Result};
use crate::model::{Card, Deck, DeckStats, DeckSummary, Outcome, ReviewRecord, ReviewState};
use crate::template::{Template, TemplateCatalog};

// === Helper Functions ===

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn outcome_column(row: &Row, idx: usize) -> rusqlite::Result<Outcome> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

const TEMPLATE_COLUMNS: &str = "id, name, description, version, preview, sides";
const DECK_COLUMNS: &str = "id, name, description, tags, algorithm, created_at, updated_at";
const CARD_COLUMNS: &str = "id, template_id, data, tags, created_at";
const REVIEW_LOG_COLUMNS: &str = "id, deck_id, card_id, side, outcome, reviewed_at";

fn row_to_review_record(row: &Row) -> rusqlite::Result<ReviewRecord> {
    Ok(ReviewRecord {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        card_id: row.get(2)?,
        side: row.get(3)?,
        outcome: outcome_column(row, 4)?,
        reviewed_at: timestamp_column(row, 5)?,
    })
}

fn row_to_template(row: &Row) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        version: row.get(3)?,
        preview: row.get(4)?,
        sides: json_column(row, 5)?,
    })
}

fn row_to_deck(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        tags: json_column(row, 3)?,
        algorithm: row.get(4)?,
        cards: BTreeMap::new(),
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

fn row_to_card(row: &Row) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get(0)?,
        template: row.get(1)?,
        data: json_column(row, 2)?,
        tags: json_column(row, 3)?,
        reviews: ReviewState::new(),
        created_at: timestamp_column(row, 4)?,
    })
}

/// A template together with the number of cards that use it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSummary {
    #[serde(flatten)]
    pub template: Template,
    pub usage: u64,
}

/// SQLite database holding all flashcard data.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database configured in `config`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let path = config.database_path()?;
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, committing on success and rolling
    /// back on error.
    ///
    /// The immediate lock serializes concurrent writers of the same database
    /// for the whole read-modify-write.
    ///
    /// Inside an open transaction this nests as a savepoint instead.
    pub fn with_immediate_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        if !self.conn.is_autocommit() {
            return self.with_savepoint(f);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(err)
            }
        }
    }

    fn with_savepoint<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("SAVEPOINT nested;")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("RELEASE nested;")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self
                    .conn
                    .execute_batch("ROLLBACK TO nested; RELEASE nested;");
                Err(err)
            }
        }
    }

    // === Template CRUD ===

    /// Store a new template. Names are unique.
    pub fn create_template(&self, template: &Template) -> Result<()> {
        if self.find_template_by_name(&template.name)?.is_some() {
            return Err(DatabaseError::Conflict {
                kind: "Template",
                name: template.name.clone(),
            }
            .into());
        }
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO templates
                (id, name, description, version, preview, sides, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                template.id,
                template.name,
                template.description,
                template.version,
                template.preview,
                serde_json::to_string(&template.sides)?,
                now,
            ],
        )?;
        tracing::info!(template = %template.id, name = %template.name, "template created");
        Ok(())
    }

    pub fn get_template(&self, id: &str) -> Result<Option<Template>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], row_to_template)
            .optional()?)
    }

    pub fn find_template_by_name(&self, name: &str) -> Result<Option<Template>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE name = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![name], row_to_template)
            .optional()?)
    }

    /// List all templates, ordered by name.
    pub fn list_templates(&self) -> Result<Vec<Template>> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates ORDER BY name");
        let mut stmt = self.conn.prepare(&sql)?;
        let templates = stmt
            .query_map([], row_to_template)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    /// List all templates with the number of cards referencing each.
    pub fn list_template_summaries(&self) -> Result<Vec<TemplateSummary>> {
        let mut usage: HashMap<String, u64> = HashMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT template_id, COUNT(*) FROM cards GROUP BY template_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?;
        for row in rows {
            let (id, count) = row?;
            usage.insert(id, count);
        }

        Ok(self
            .list_templates()?
            .into_iter()
            .map(|template| TemplateSummary {
                usage: usage.get(&template.id).copied().unwrap_or(0),
                template,
            })
            .collect())
    }

    /// Every stored template, keyed by id.
    pub fn template_catalog(&self) -> Result<TemplateCatalog> {
        Ok(self.list_templates()?.into_iter().collect())
    }

    /// Number of cards that reference a template.
    pub fn template_usage(&self, id: &str) -> Result<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE template_id = ?1",
            params![id],
            |row| row.get(0),
        )?)
    }

    /// Overwrite a template, bumping its version. Returns the new version.
    ///
    /// Scores of sides the template no longer defines are removed.
    pub fn update_template(&self, template: &Template) -> Result<u32> {
        self.with_immediate_transaction(|db| db.write_template(template))
    }

    fn write_template(&self, template: &Template) -> Result<u32> {
        if let Some(existing) = self.find_template_by_name(&template.name)? {
            if existing.id != template.id {
                return Err(DatabaseError::Conflict {
                    kind: "Template",
                    name: template.name.clone(),
                }
                .into());
            }
        }
        let current: u32 = self
            .conn
            .query_row(
                "SELECT version FROM templates WHERE id = ?1",
                params![template.id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("Template", &template.id))?;
        let version = current + 1;
        self.conn.execute(
            "UPDATE templates
             SET name = ?1, description = ?2, version = ?3, preview = ?4, sides = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                template.name,
                template.description,
                version,
                template.preview,
                serde_json::to_string(&template.sides)?,
                Utc::now().to_rfc3339(),
                template.id,
            ],
        )?;
        let pruned = self.conn.execute(
            "DELETE FROM reviews
             WHERE card_id IN (SELECT id FROM cards WHERE template_id = ?1)
               AND side NOT IN (SELECT key FROM json_each((SELECT sides FROM templates WHERE id = ?1)))",
            params![template.id],
        )?;
        tracing::info!(template = %template.id, version, pruned, "template updated");
        Ok(version)
    }

    /// Delete a template. Refused while any card still uses it.
    pub fn delete_template(&self, id: &str) -> Result<()> {
        let usage = self.template_usage(id)?;
        if usage > 0 {
            tracing::warn!(template = %id, usage, "refusing to delete template in use");
            return Err(DatabaseError::InUse {
                kind: "Template",
                id: id.to_string(),
                count: usage,
            }
            .into());
        }
        let deleted = self
            .conn
            .execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(CoreError::not_found("Template", id));
        }
        tracing::info!(template = %id, "template deleted");
        Ok(())
    }

    // === Deck CRUD ===

    /// Store a new deck together with any cards it already holds.
    ///
    /// All or nothing: a failing card leaves no deck behind.
    pub fn create_deck(&self, deck: &Deck) -> Result<()> {
        self.with_immediate_transaction(|db| db.insert_deck(deck))
    }

    fn insert_deck(&self, deck: &Deck) -> Result<()> {
        if self.find_deck_id_by_name(&deck.name)?.is_some() {
            return Err(DatabaseError::Conflict {
                kind: "Deck",
                name: deck.name.clone(),
            }
            .into());
        }
        self.conn.execute(
            "INSERT INTO decks (id, name, description, tags, algorithm, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                deck.id,
                deck.name,
                deck.description,
                serde_json::to_string(&deck.tags)?,
                deck.algorithm,
                deck.created_at.to_rfc3339(),
                deck.updated_at.to_rfc3339(),
            ],
        )?;
        for card in deck.cards.values() {
            self.add_card(&deck.id, card)?;
        }
        self.save_review_state(deck)?;
        tracing::info!(deck = %deck.id, name = %deck.name, "deck created");
        Ok(())
    }

    /// Load a deck with all its cards and review scores.
    pub fn get_deck(&self, id: &str) -> Result<Option<Deck>> {
        let sql = format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1");
        let Some(mut deck) = self
            .conn
            .query_row(&sql, params![id], row_to_deck)
            .optional()?
        else {
            return Ok(None);
        };

        deck.cards = self
            .list_cards(&deck.id)?
            .into_iter()
            .map(|card| (card.id.clone(), card))
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT r.card_id, r.side, r.score
             FROM reviews r JOIN cards c ON c.id = r.card_id
             WHERE c.deck_id = ?1",
        )?;
        let rows = stmt.query_map(params![deck.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;
        for row in rows {
            let (card_id, side, score) = row?;
            if let Some(card) = deck.cards.get_mut(&card_id) {
                card.reviews.set(side, score);
            }
        }

        Ok(Some(deck))
    }

    fn find_deck_id_by_name(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT id FROM decks WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Load a deck by id, falling back to a lookup by name.
    pub fn find_deck(&self, id_or_name: &str) -> Result<Option<Deck>> {
        if let Some(deck) = self.get_deck(id_or_name)? {
            return Ok(Some(deck));
        }
        match self.find_deck_id_by_name(id_or_name)? {
            Some(id) => self.get_deck(&id),
            None => Ok(None),
        }
    }

    /// List decks ordered by name, optionally only those carrying `tag`.
    pub fn list_decks(&self, tag: Option<&str>) -> Result<Vec<DeckSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, d.description, d.tags, d.algorithm,
                    (SELECT COUNT(*) FROM cards c WHERE c.deck_id = d.id)
             FROM decks d ORDER BY d.name",
        )?;
        let decks = stmt
            .query_map([], |row| {
                Ok(DeckSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    tags: json_column(row, 3)?,
                    algorithm: row.get(4)?,
                    card_count: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(match tag {
            Some(tag) => decks
                .into_iter()
                .filter(|d| d.tags.iter().any(|t| t == tag))
                .collect(),
            None => decks,
        })
    }

    /// Update a deck's own fields. Cards and scores are left untouched.
    pub fn update_deck(&self, deck: &Deck) -> Result<()> {
        if let Some(existing) = self.find_deck_id_by_name(&deck.name)? {
            if existing != deck.id {
                return Err(DatabaseError::Conflict {
                    kind: "Deck",
                    name: deck.name.clone(),
                }
                .into());
            }
        }
        let updated = self.conn.execute(
            "UPDATE decks SET name = ?1, description = ?2, tags = ?3, algorithm = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                deck.name,
                deck.description,
                serde_json::to_string(&deck.tags)?,
                deck.algorithm,
                Utc::now().to_rfc3339(),
                deck.id,
            ],
        )?;
        if updated == 0 {
            return Err(CoreError::not_found("Deck", &deck.id));
        }
        tracing::info!(deck = %deck.id, "deck updated");
        Ok(())
    }

    /// Delete a deck with its cards, scores and review log.
    pub fn delete_deck(&self, id: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(CoreError::not_found("Deck", id));
        }
        tracing::info!(deck = %id, "deck deleted");
        Ok(())
    }

    // === Card CRUD ===

    /// Store a card in a deck. Review scores are written separately.
    pub fn add_card(&self, deck_id: &str, card: &Card) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cards (id, deck_id, template_id, data, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                card.id,
                deck_id,
                card.template,
                serde_json::to_string(&card.data)?,
                serde_json::to_string(&card.tags)?,
                card.created_at.to_rfc3339(),
            ],
        )?;
        tracing::info!(deck = %deck_id, card = %card.id, "card added");
        Ok(())
    }

    /// Load a single card of a deck, with its scores.
    pub fn get_card(&self, deck_id: &str, card_id: &str) -> Result<Option<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 AND id = ?2");
        let Some(mut card) = self
            .conn
            .query_row(&sql, params![deck_id, card_id], row_to_card)
            .optional()?
        else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT side, score FROM reviews WHERE card_id = ?1")?;
        card.reviews = stmt
            .query_map(params![card.id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<ReviewState>>()?;
        Ok(Some(card))
    }

    fn list_cards(&self, deck_id: &str) -> Result<Vec<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY created_at, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let cards = stmt
            .query_map(params![deck_id], row_to_card)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Update a card's template reference, data and tags.
    ///
    /// Scores of sides the card's template does not define are removed.
    pub fn update_card(&self, deck_id: &str, card: &Card) -> Result<()> {
        self.with_immediate_transaction(|db| db.write_card(deck_id, card))
    }

    fn write_card(&self, deck_id: &str, card: &Card) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE cards SET template_id = ?1, data = ?2, tags = ?3 WHERE deck_id = ?4 AND id = ?5",
            params![
                card.template,
                serde_json::to_string(&card.data)?,
                serde_json::to_string(&card.tags)?,
                deck_id,
                card.id,
            ],
        )?;
        if updated == 0 {
            return Err(CoreError::not_found("Card", &card.id));
        }
        let pruned = self.conn.execute(
            "DELETE FROM reviews
             WHERE card_id = ?1
               AND side NOT IN (SELECT key FROM json_each((SELECT sides FROM templates WHERE id = ?2)))",
            params![card.id, card.template],
        )?;
        tracing::info!(deck = %deck_id, card = %card.id, pruned, "card updated");
        Ok(())
    }

    /// Delete a card with its scores and review log entries.
    pub fn delete_card(&self, deck_id: &str, card_id: &str) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM cards WHERE deck_id = ?1 AND id = ?2",
            params![deck_id, card_id],
        )?;
        if deleted == 0 {
            return Err(CoreError::not_found("Card", card_id));
        }
        tracing::info!(deck = %deck_id, card = %card_id, "card deleted");
        Ok(())
    }

    // === Reviews ===

    /// Write every recorded side score of the deck's cards.
    pub fn save_review_state(&self, deck: &Deck) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO reviews (card_id, side, score) VALUES (?1, ?2, ?3)
             ON CONFLICT(card_id, side) DO UPDATE SET score = excluded.score",
        )?;
        for card in deck.cards.values() {
            for (side, score) in card.reviews.iter() {
                stmt.execute(params![card.id, side, score])?;
            }
        }
        Ok(())
    }

    /// Append one answer to the review log. Returns the record id.
    pub fn append_review(
        &self,
        deck_id: &str,
        card_id: &str,
        side: &str,
        outcome: Outcome,
        reviewed_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO review_log (deck_id, card_id, side, outcome, reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![deck_id, card_id, side, outcome.as_str(), reviewed_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent review log entries of a deck, newest first.
    pub fn review_log(&self, deck_id: &str, limit: u32) -> Result<Vec<ReviewRecord>> {
        let sql = format!(
            "SELECT {REVIEW_LOG_COLUMNS} FROM review_log WHERE deck_id = ?1
             ORDER BY id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![deck_id, limit], row_to_review_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Most recent review log entries of one card, newest first.
    pub fn card_review_log(
        &self,
        deck_id: &str,
        card_id: &str,
        limit: u32,
    ) -> Result<Vec<ReviewRecord>> {
        let sql = format!(
            "SELECT {REVIEW_LOG_COLUMNS} FROM review_log WHERE deck_id = ?1 AND card_id = ?2
             ORDER BY id DESC LIMIT ?3"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![deck_id, card_id, limit], row_to_review_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Aggregate statistics of a deck.
    pub fn deck_stats(&self, deck_id: &str) -> Result<DeckStats> {
        let cards: u64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE deck_id = ?1",
            params![deck_id],
            |row| row.get(0),
        )?;

        let (reviewed_sides, mean_score): (u64, f64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(AVG(r.score), 0.0)
             FROM reviews r JOIN cards c ON c.id = r.card_id
             WHERE c.deck_id = ?1",
            params![deck_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (total_reviews, correct, last): (u64, u64, Option<String>) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN outcome = 'correct' THEN 1 ELSE 0 END), 0),
                    MAX(reviewed_at)
             FROM review_log WHERE deck_id = ?1",
            params![deck_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(DeckStats {
            cards,
            reviewed_sides,
            total_reviews,
            correct,
            wrong: total_reviews - correct,
            mean_score,
            last_reviewed_at: last
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}
