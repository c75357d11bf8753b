//! Deck management commands for CLI.

use clap::Subcommand;
use flashcards_core::{parse_tags, Config, Deck, StudyService};

#[derive(Subcommand)]
pub enum DeckAction {
    /// Create a new deck
    Create {
        /// Deck name
        name: String,
        /// Deck description
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Study algorithm (default: study.default_algorithm)
        #[arg(long)]
        algorithm: Option<String>,
    },
    /// List decks
    List {
        /// Only decks carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show a deck with its cards and scores
    Show {
        /// Deck ID or name
        deck: String,
    },
    /// Update a deck
    Update {
        /// Deck ID or name
        deck: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// New study algorithm
        #[arg(long)]
        algorithm: Option<String>,
    },
    /// Delete a deck with its cards and history
    Delete {
        /// Deck ID or name
        deck: String,
    },
}

pub fn run(action: DeckAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let service = StudyService::from_config(&config)?;

    match action {
        DeckAction::Create {
            name,
            description,
            tags,
            algorithm,
        } => {
            let algorithm = algorithm.unwrap_or_else(|| config.study.default_algorithm.clone());
            let deck = Deck::new(name, algorithm)
                .with_description(description.unwrap_or_default())
                .with_tags(tags.as_deref().map(parse_tags).unwrap_or_default());
            service.create_deck(&deck)?;
            println!("Deck created: {}", deck.id);
            println!("{}", serde_json::to_string_pretty(&deck)?);
        }
        DeckAction::List { tag } => {
            let decks = service.db().list_decks(tag.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&decks)?);
        }
        DeckAction::Show { deck } => {
            let deck = service.find_deck(&deck)?;
            println!("{}", serde_json::to_string_pretty(&deck)?);
        }
        DeckAction::Update {
            deck,
            name,
            description,
            tags,
            algorithm,
        } => {
            let mut deck = service.find_deck(&deck)?;
            if let Some(n) = name {
                deck.name = n;
            }
            if let Some(d) = description {
                deck.description = d;
            }
            if let Some(t) = tags {
                deck.tags = parse_tags(&t);
            }
            if let Some(a) = algorithm {
                deck.algorithm = a;
            }

            service.update_deck(&deck)?;
            println!("Deck updated: {}", deck.id);
        }
        DeckAction::Delete { deck } => {
            let deck = service.find_deck(&deck)?;
            service.db().delete_deck(&deck.id)?;
            println!("Deck deleted: {}", deck.id);
        }
    }
    Ok(())
}
