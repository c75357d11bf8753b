use clap::Args;
use flashcards_core::{DeckStats, ReviewRecord};
use serde::Serialize;

use super::open_service;

#[derive(Args)]
pub struct StatsArgs {
    /// Deck ID or name
    deck: String,
    /// Also show the N most recent reviews
    #[arg(long, value_name = "N")]
    log: Option<u32>,
}

#[derive(Serialize)]
struct StatsReport {
    deck_id: String,
    name: String,
    #[serde(flatten)]
    stats: DeckStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    recent: Option<Vec<ReviewRecord>>,
}

pub fn run(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service()?;
    let deck = service.find_deck(&args.deck)?;
    let report = StatsReport {
        stats: service.db().deck_stats(&deck.id)?,
        recent: args
            .log
            .map(|limit| service.db().review_log(&deck.id, limit))
            .transpose()?,
        deck_id: deck.id,
        name: deck.name,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
