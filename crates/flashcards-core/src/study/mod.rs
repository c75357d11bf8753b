//! Study scheduling.
//!
//! A [`Scheduler`] picks the next (card, side) of a deck and updates the
//! deck's review state from an answer. Schedulers hold no per-deck state:
//! everything they need is read from the [`Deck`] on each call, and every
//! change is written back into it for the caller to persist.
//!
//! Adding a strategy means adding a type that implements [`Scheduler`] and
//! registering it in [`SchedulerRegistry::with_defaults`].

mod random;
mod registry;
mod service;
mod weakest;

pub use random::UniformRandom;
pub use registry::{SchedulerRegistry, HARDEST_FIRST, RANDOM, WEAKEST_FIRST};
pub use service::StudyService;
pub use weakest::WeakestFirst;

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{StudyError, TemplateError};
use crate::model::{Card, Deck, Outcome};
use crate::template::{Render, Template, TemplateCatalog};

/// The card side chosen for review, rendered and ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub card_id: String,
    pub side: String,
    pub question: String,
    pub answer: String,
}

/// Templates and renderer a scheduler needs to turn a pick into text.
#[derive(Clone, Copy)]
pub struct StudyContext<'a> {
    pub templates: &'a TemplateCatalog,
    pub renderer: &'a dyn Render,
}

impl<'a> StudyContext<'a> {
    pub fn new(templates: &'a TemplateCatalog, renderer: &'a dyn Render) -> Self {
        Self {
            templates,
            renderer,
        }
    }

    /// The template a card is bound to.
    pub fn template_for(&self, card: &Card) -> Result<&'a Template, StudyError> {
        let templates: &'a TemplateCatalog = self.templates;
        templates
            .get(&card.template)
            .ok_or_else(|| StudyError::TemplateNotFound(card.template.clone()))
    }

    /// Render one side of a card.
    pub fn render(&self, card: &Card, side: &str) -> Result<Selection, StudyError> {
        let render_err = |source: TemplateError| StudyError::Render {
            card_id: card.id.clone(),
            source,
        };
        let template = self.template_for(card)?;
        let pattern = template.side(side).ok_or_else(|| StudyError::NotFound {
            card_id: card.id.clone(),
            side: side.to_string(),
        })?;
        Ok(Selection {
            card_id: card.id.clone(),
            side: side.to_string(),
            question: self
                .renderer
                .render(&pattern.question, &card.data)
                .map_err(render_err)?,
            answer: self
                .renderer
                .render(&pattern.answer, &card.data)
                .map_err(render_err)?,
        })
    }

    /// Fail with [`StudyError::NotFound`] unless the card is in the deck and
    /// its template defines `side`.
    pub fn ensure_side(&self, deck: &Deck, card_id: &str, side: &str) -> Result<(), StudyError> {
        let not_found = || StudyError::NotFound {
            card_id: card_id.to_string(),
            side: side.to_string(),
        };
        let card = deck.card(card_id).ok_or_else(not_found)?;
        if self.template_for(card)?.side(side).is_none() {
            return Err(not_found());
        }
        Ok(())
    }
}

impl fmt::Debug for StudyContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyContext")
            .field("templates", &self.templates.len())
            .finish_non_exhaustive()
    }
}

/// A study-scheduling strategy.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Pick the next card side to show. Never changes review state.
    ///
    /// # Errors
    /// [`StudyError::EmptyDeck`] when the deck has no cards.
    fn select_next(
        &self,
        deck: &Deck,
        ctx: &StudyContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Selection, StudyError>;

    /// Apply an answer to the deck's review state, in place.
    ///
    /// # Errors
    /// [`StudyError::NotFound`] when the card or side is not part of the deck.
    fn record_outcome(
        &self,
        deck: &mut Deck,
        ctx: &StudyContext<'_>,
        card_id: &str,
        side: &str,
        outcome: Outcome,
    ) -> Result<(), StudyError>;
}

fn empty_deck(deck: &Deck) -> StudyError {
    StudyError::EmptyDeck {
        deck_id: deck.id.clone(),
    }
}
