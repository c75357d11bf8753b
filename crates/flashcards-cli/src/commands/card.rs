//! Card management commands for CLI.

use clap::Subcommand;
use flashcards_core::template::QA_TEMPLATE_ID;
use flashcards_core::{parse_tags, Card, CoreError, ReviewRecord};
use serde::Serialize;

use super::{open_service, parse_fields};

#[derive(Subcommand)]
pub enum CardAction {
    /// Add a card to a deck
    Add {
        /// Deck ID or name
        deck: String,
        /// Card fields as key=value (e.g. question=Paris answer=France)
        #[arg(required = true)]
        fields: Vec<String>,
        /// Template ID or name
        #[arg(long, default_value = QA_TEMPLATE_ID)]
        template: String,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// List the cards of a deck with their previews
    List {
        /// Deck ID or name
        deck: String,
    },
    /// Show a card
    Show {
        /// Deck ID or name
        deck: String,
        /// Card ID
        card: String,
        /// Also show the N most recent reviews of this card
        #[arg(long, value_name = "N")]
        log: Option<u32>,
    },
    /// Update a card; given fields replace existing ones
    Update {
        /// Deck ID or name
        deck: String,
        /// Card ID
        card: String,
        /// Fields to set as key=value
        fields: Vec<String>,
        /// New template ID or name
        #[arg(long)]
        template: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
    },
    /// Delete a card
    Delete {
        /// Deck ID or name
        deck: String,
        /// Card ID
        card: String,
    },
}

#[derive(Serialize)]
struct CardListing<'a> {
    id: &'a str,
    template: &'a str,
    preview: String,
    tags: &'a [String],
}

#[derive(Serialize)]
struct CardReport {
    #[serde(flatten)]
    card: Card,
    #[serde(skip_serializing_if = "Option::is_none")]
    recent: Option<Vec<ReviewRecord>>,
}

pub fn run(action: CardAction) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service()?;

    // Templates may be referred to by name as well as id.
    let template_id = |key: String| -> Result<String, CoreError> {
        if service.db().get_template(&key)?.is_some() {
            return Ok(key);
        }
        Ok(service
            .db()
            .find_template_by_name(&key)?
            .map(|t| t.id)
            .unwrap_or(key))
    };

    match action {
        CardAction::Add {
            deck,
            fields,
            template,
            tags,
        } => {
            let deck = service.find_deck(&deck)?;
            let card = Card::new(template_id(template)?, parse_fields(&fields)?)
                .with_tags(tags.as_deref().map(parse_tags).unwrap_or_default());
            service.add_card(&deck.id, &card)?;
            println!("Card added: {}", card.id);
        }
        CardAction::List { deck } => {
            let deck = service.find_deck(&deck)?;
            let listing = deck
                .cards
                .values()
                .map(|card| {
                    Ok(CardListing {
                        id: &card.id,
                        template: &card.template,
                        preview: service.preview(card)?,
                        tags: &card.tags,
                    })
                })
                .collect::<Result<Vec<_>, CoreError>>()?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        CardAction::Show { deck, card, log } => {
            let deck = service.find_deck(&deck)?;
            let card = service
                .db()
                .get_card(&deck.id, &card)?
                .ok_or_else(|| CoreError::not_found("Card", &card))?;
            let report = CardReport {
                recent: log
                    .map(|limit| service.db().card_review_log(&deck.id, &card.id, limit))
                    .transpose()?,
                card,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        CardAction::Update {
            deck,
            card,
            fields,
            template,
            tags,
        } => {
            let deck = service.find_deck(&deck)?;
            let mut card = deck
                .card(&card)
                .cloned()
                .ok_or_else(|| CoreError::not_found("Card", &card))?;
            card.data.extend(parse_fields(&fields)?);
            if let Some(t) = template {
                card.template = template_id(t)?;
            }
            if let Some(t) = tags {
                card.tags = parse_tags(&t);
            }

            service.update_card(&deck.id, &card)?;
            println!("Card updated: {}", card.id);
        }
        CardAction::Delete { deck, card } => {
            let deck = service.find_deck(&deck)?;
            service.db().delete_card(&deck.id, &card)?;
            println!("Card deleted: {card}");
        }
    }
    Ok(())
}
