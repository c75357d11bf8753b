pub mod algorithms;
pub mod card;
pub mod config;
pub mod deck;
pub mod stats;
pub mod study;
pub mod template;

use std::collections::BTreeMap;

use flashcards_core::{Config, StudyService};

/// Open the configured database with the default schedulers.
pub fn open_service() -> Result<StudyService, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    Ok(StudyService::from_config(&config)?)
}

/// Parse `key=value` pairs into card data.
pub fn parse_fields(fields: &[String]) -> Result<BTreeMap<String, String>, String> {
    fields
        .iter()
        .map(|field| {
            field
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| format!("expected key=value, got '{field}'"))
        })
        .collect()
}
