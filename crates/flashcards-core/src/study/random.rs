use rand::seq::IteratorRandom;
use rand::RngCore;

use super::{empty_deck, Scheduler, Selection, StudyContext};
use crate::error::{StudyError, TemplateError};
use crate::model::{Deck, Outcome};

/// Uniformly random card, then a uniformly random side of it.
///
/// Keeps no history: answers are validated and otherwise ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformRandom;

impl UniformRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for UniformRandom {
    fn select_next(
        &self,
        deck: &Deck,
        ctx: &StudyContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Selection, StudyError> {
        let card = deck
            .cards
            .values()
            .choose(&mut *rng)
            .ok_or_else(|| empty_deck(deck))?;
        let template = ctx.template_for(card)?;
        let side = template
            .side_names()
            .choose(&mut *rng)
            .ok_or_else(|| StudyError::Render {
                card_id: card.id.clone(),
                source: TemplateError::Invalid(format!(
                    "template '{}' defines no sides",
                    template.name
                )),
            })?;
        tracing::debug!(deck = %deck.id, card = %card.id, side, "random pick");
        ctx.render(card, side)
    }

    fn record_outcome(
        &self,
        deck: &mut Deck,
        ctx: &StudyContext<'_>,
        card_id: &str,
        side: &str,
        _outcome: Outcome,
    ) -> Result<(), StudyError> {
        ctx.ensure_side(deck, card_id, side)
    }
}
