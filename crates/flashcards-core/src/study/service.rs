//! Deck study operations on top of the database.
//!
//! [`StudyService`] ties a [`Database`], a [`SchedulerRegistry`] and a
//! [`Render`] implementation together. Every write that depends on
//! scheduler or template rules goes through here so the stored data stays
//! consistent with what the schedulers expect.

use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use super::{SchedulerRegistry, Selection, StudyContext};
use crate::error::{CoreError, Result, StudyError, ValidationError};
use crate::model::{Card, Deck, Outcome};
use crate::storage::{Config, Database};
use crate::template::{Render, Template, TemplateRenderer};

pub struct StudyService {
    db: Database,
    registry: Arc<SchedulerRegistry>,
    renderer: Arc<dyn Render>,
    rng: Pcg64,
}

impl StudyService {
    pub fn new(db: Database, registry: Arc<SchedulerRegistry>, renderer: Arc<dyn Render>) -> Self {
        Self {
            db,
            registry,
            renderer,
            rng: Pcg64::from_entropy(),
        }
    }

    /// Use a fixed selection seed. `None` keeps the entropy-seeded RNG.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.rng = Pcg64::seed_from_u64(seed);
        }
        self
    }

    /// Open the configured database with the default schedulers and renderer.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(config)?;
        let registry = Arc::new(SchedulerRegistry::with_defaults(&config.study));
        Ok(Self::new(db, registry, Arc::new(TemplateRenderer::new())).with_seed(config.study.seed))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &SchedulerRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> &dyn Render {
        self.renderer.as_ref()
    }

    /// Load a deck by id or name.
    pub fn find_deck(&self, key: &str) -> Result<Deck> {
        self.db
            .find_deck(key)?
            .ok_or_else(|| CoreError::not_found("Deck", key))
    }

    // === Studying ===

    /// Pick the next card side of a deck with the deck's scheduler.
    pub fn next_card(&mut self, deck_id: &str) -> Result<Selection> {
        let deck = self.find_deck(deck_id)?;
        let scheduler = self.registry.resolve(&deck.algorithm)?;
        let catalog = self.db.template_catalog()?;
        let ctx = StudyContext::new(&catalog, self.renderer.as_ref());
        let selection = scheduler.select_next(&deck, &ctx, &mut self.rng)?;
        tracing::debug!(
            deck = %deck.id,
            card = %selection.card_id,
            side = %selection.side,
            algorithm = %deck.algorithm,
            "next card"
        );
        Ok(selection)
    }

    /// Record an answer: update the deck's review state and log the review.
    ///
    /// The whole read-modify-write runs in one immediate transaction.
    pub fn answer(&self, deck_id: &str, card_id: &str, side: &str, outcome: Outcome) -> Result<()> {
        self.db.with_immediate_transaction(|db| {
            let mut deck = db
                .find_deck(deck_id)?
                .ok_or_else(|| CoreError::not_found("Deck", deck_id))?;
            let scheduler = self.registry.resolve(&deck.algorithm)?;
            let catalog = db.template_catalog()?;
            let ctx = StudyContext::new(&catalog, self.renderer.as_ref());
            scheduler.record_outcome(&mut deck, &ctx, card_id, side, outcome)?;
            db.save_review_state(&deck)?;
            db.append_review(&deck.id, card_id, side, outcome, Utc::now())?;
            tracing::info!(deck = %deck.id, card = %card_id, side, %outcome, "answer recorded");
            Ok(())
        })
    }

    // === Decks ===

    pub fn create_deck(&self, deck: &Deck) -> Result<()> {
        deck.validate()?;
        self.registry.resolve(&deck.algorithm)?;
        for card in deck.cards.values() {
            self.ensure_template(&card.template)?;
        }
        self.db.create_deck(deck)
    }

    pub fn update_deck(&self, deck: &Deck) -> Result<()> {
        deck.validate()?;
        self.registry.resolve(&deck.algorithm)?;
        self.db.update_deck(deck)
    }

    // === Cards ===

    pub fn add_card(&self, deck_id: &str, card: &Card) -> Result<()> {
        self.find_deck(deck_id)?;
        self.check_card(card)?;
        self.db.add_card(deck_id, card)
    }

    pub fn update_card(&self, deck_id: &str, card: &Card) -> Result<()> {
        self.check_card(card)?;
        self.db.update_card(deck_id, card)
    }

    /// Render a card's preview line through its template.
    pub fn preview(&self, card: &Card) -> Result<String> {
        let template = self.ensure_template(&card.template)?;
        template
            .render_preview(self.renderer.as_ref(), &card.data)
            .map_err(|source| {
                StudyError::Render {
                    card_id: card.id.clone(),
                    source,
                }
                .into()
            })
    }

    fn check_card(&self, card: &Card) -> Result<()> {
        if card.data.is_empty() {
            return Err(ValidationError::EmptyField("data").into());
        }
        self.ensure_template(&card.template)?;
        Ok(())
    }

    fn ensure_template(&self, id: &str) -> Result<Template> {
        self.db
            .get_template(id)?
            .ok_or_else(|| StudyError::TemplateNotFound(id.to_string()).into())
    }

    // === Templates ===

    pub fn create_template(&self, template: &Template) -> Result<()> {
        template.validate(self.renderer.as_ref())?;
        self.db.create_template(template)
    }

    /// Validate and store a template change. Returns the new version.
    pub fn update_template(&self, template: &Template) -> Result<u32> {
        template.validate(self.renderer.as_ref())?;
        self.db.update_template(template)
    }
}
