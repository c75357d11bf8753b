//! Database schema migrations for flashcards.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use chrono::Utc;
use indoc::indoc;
use rusqlite::{params, Connection, Result as SqliteResult};

use crate::template::builtin_templates;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: templates, decks, cards and per-side scores.
///
/// Also seeds the built-in templates.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS templates (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            version     INTEGER NOT NULL DEFAULT 1,
            preview     TEXT NOT NULL DEFAULT '',
            sides       TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS decks (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            tags        TEXT NOT NULL DEFAULT '[]',
            algorithm   TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            id          TEXT PRIMARY KEY,
            deck_id     TEXT NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
            template_id TEXT NOT NULL,
            data        TEXT NOT NULL DEFAULT '{}',
            tags        TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reviews (
            card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            side    TEXT NOT NULL,
            score   INTEGER NOT NULL DEFAULT 0 CHECK (score >= 0),
            PRIMARY KEY (card_id, side)
        );

        CREATE INDEX IF NOT EXISTS idx_cards_deck_id ON cards(deck_id);
        CREATE INDEX IF NOT EXISTS idx_cards_template_id ON cards(template_id);
    "})?;

    let now = Utc::now().to_rfc3339();
    for template in builtin_templates() {
        let sides = serde_json::to_string(&template.sides)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        tx.execute(
            "INSERT OR IGNORE INTO templates
                (id, name, description, version, preview, sides, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                template.id,
                template.name,
                template.description,
                template.version,
                template.preview,
                sides,
                now,
            ],
        )?;
    }

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: timestamped review log.
///
/// Every recorded outcome is appended here, independent of the deck's
/// algorithm. Schedulers never read it; it feeds deck statistics.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS review_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            deck_id     TEXT NOT NULL REFERENCES decks(id) ON DELETE CASCADE,
            card_id     TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            side        TEXT NOT NULL,
            outcome     TEXT NOT NULL CHECK (outcome IN ('correct', 'wrong')),
            reviewed_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_review_log_deck ON review_log(deck_id, reviewed_at);
    "})?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
