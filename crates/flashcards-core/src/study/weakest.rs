use rand::seq::SliceRandom;
use rand::RngCore;

use super::{empty_deck, Scheduler, Selection, StudyContext};
use crate::error::StudyError;
use crate::model::{Card, Deck, Outcome};

/// Default width of the candidate band above the lowest score.
pub const DEFAULT_THRESHOLD: u32 = 3;

/// Favors the card sides with the lowest scores.
///
/// A correct answer raises a side's score by one. A wrong answer drops it to
/// one below the lowest score of every other reviewed side (never below zero),
/// which puts it back among the next candidates. Only sides the card's
/// template still defines take part, for selection and scoring alike.
#[derive(Debug, Clone, Copy)]
pub struct WeakestFirst {
    threshold: u32,
}

impl Default for WeakestFirst {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

struct Pair<'d, 'a> {
    card: &'d Card,
    side: &'a str,
    recorded: Option<u32>,
}

impl WeakestFirst {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn pairs<'d, 'a>(
        deck: &'d Deck,
        ctx: &StudyContext<'a>,
    ) -> Result<Vec<Pair<'d, 'a>>, StudyError> {
        let mut pairs = Vec::new();
        for card in deck.cards.values() {
            for side in ctx.template_for(card)?.side_names() {
                pairs.push(Pair {
                    card,
                    side,
                    recorded: card.reviews.recorded(side),
                });
            }
        }
        Ok(pairs)
    }
}

impl Scheduler for WeakestFirst {
    fn select_next(
        &self,
        deck: &Deck,
        ctx: &StudyContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Selection, StudyError> {
        let pairs = Self::pairs(deck, ctx)?;
        if pairs.is_empty() {
            return Err(empty_deck(deck));
        }

        // Never-reviewed sides score zero and always fall inside the band.
        let candidates: Vec<&Pair<'_, '_>> = match pairs.iter().filter_map(|p| p.recorded).min() {
            Some(min_score) => {
                let limit = min_score.saturating_add(self.threshold);
                pairs
                    .iter()
                    .filter(|p| p.recorded.unwrap_or(0) <= limit)
                    .collect()
            }
            None => pairs.iter().collect(),
        };

        let chosen = candidates
            .choose(&mut *rng)
            .ok_or_else(|| empty_deck(deck))?;
        tracing::debug!(
            deck = %deck.id,
            card = %chosen.card.id,
            side = chosen.side,
            candidates = candidates.len(),
            "weakest-first pick"
        );
        ctx.render(chosen.card, chosen.side)
    }

    fn record_outcome(
        &self,
        deck: &mut Deck,
        ctx: &StudyContext<'_>,
        card_id: &str,
        side: &str,
        outcome: Outcome,
    ) -> Result<(), StudyError> {
        ctx.ensure_side(deck, card_id, side)?;

        let score = match outcome {
            Outcome::Correct => deck
                .card(card_id)
                .map(|card| card.reviews.score(side))
                .unwrap_or(0)
                .saturating_add(1),
            Outcome::Wrong => Self::pairs(deck, ctx)?
                .iter()
                .filter(|p| !(p.card.id == card_id && p.side == side))
                .filter_map(|p| p.recorded)
                .min()
                .map_or(0, |min_other| min_other.saturating_sub(1)),
        };

        if let Some(card) = deck.card_mut(card_id) {
            card.reviews.set(side, score);
        }
        tracing::debug!(deck = %deck.id, card = card_id, side, %outcome, score, "score updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::study::fixtures::*;
    use crate::study::HARDEST_FIRST;
    use crate::template::TemplateRenderer;

    fn picks(deck: &Deck, scheduler: &WeakestFirst, rounds: usize) -> HashSet<String> {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let mut rng = Pcg64::seed_from_u64(11);
        (0..rounds)
            .map(|_| scheduler.select_next(deck, &ctx, &mut rng).unwrap().card_id)
            .collect()
    }

    fn score_of(deck: &Deck, card: &str, side: &str) -> Option<u32> {
        deck.card(card).and_then(|c| c.reviews.recorded(side))
    }

    #[test]
    fn sides_beyond_the_band_are_skipped() {
        let deck = deck(
            HARDEST_FIRST,
            vec![
                card("A", SINGLE, &[("card", 0)]),
                card("B", SINGLE, &[("card", 1)]),
                card("C", SINGLE, &[("card", 5)]),
            ],
        );
        let seen = picks(&deck, &WeakestFirst::new(3), 300);
        assert!(!seen.contains("C"));
        assert!(seen.contains("A"));
        assert!(seen.contains("B"));
    }

    #[test]
    fn unreviewed_sides_stay_candidates() {
        let deck = deck(
            HARDEST_FIRST,
            vec![
                card("fresh", SINGLE, &[]),
                card("good", SINGLE, &[("card", 10)]),
                card("strong", SINGLE, &[("card", 20)]),
            ],
        );
        let seen = picks(&deck, &WeakestFirst::new(3), 300);
        assert_eq!(
            seen,
            ["fresh", "good"].into_iter().map(String::from).collect()
        );
    }

    #[test]
    fn no_reviews_means_every_pair_is_a_candidate() {
        let deck = deck(
            HARDEST_FIRST,
            vec![card("x", PAIR, &[]), card("y", SINGLE, &[])],
        );
        let seen = picks(&deck, &WeakestFirst::default(), 200);
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn zero_threshold_only_offers_the_minimum() {
        let deck = deck(
            HARDEST_FIRST,
            vec![
                card("low", SINGLE, &[("card", 2)]),
                card("high", SINGLE, &[("card", 3)]),
            ],
        );
        let seen = picks(&deck, &WeakestFirst::new(0), 100);
        assert_eq!(seen, ["low"].into_iter().map(String::from).collect());
    }

    #[test]
    fn empty_deck_is_an_error() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let deck = deck(HARDEST_FIRST, vec![]);
        let mut rng = Pcg64::seed_from_u64(1);
        assert!(matches!(
            WeakestFirst::default().select_next(&deck, &ctx, &mut rng),
            Err(StudyError::EmptyDeck { .. })
        ));
    }

    #[test]
    fn selecting_does_not_touch_scores() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let deck = deck(
            HARDEST_FIRST,
            vec![card("a", PAIR, &[("direct", 4)]), card("b", SINGLE, &[])],
        );
        let before = deck.clone();
        let mut rng = Pcg64::seed_from_u64(3);
        for _ in 0..20 {
            WeakestFirst::default()
                .select_next(&deck, &ctx, &mut rng)
                .unwrap();
        }
        assert_eq!(deck, before);
    }

    #[test]
    fn correct_answers_count_up_from_zero() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let mut deck = deck(HARDEST_FIRST, vec![card("a", SINGLE, &[])]);
        let scheduler = WeakestFirst::default();

        scheduler
            .record_outcome(&mut deck, &ctx, "a", "card", Outcome::Correct)
            .unwrap();
        assert_eq!(score_of(&deck, "a", "card"), Some(1));
        scheduler
            .record_outcome(&mut deck, &ctx, "a", "card", Outcome::Correct)
            .unwrap();
        assert_eq!(score_of(&deck, "a", "card"), Some(2));
    }

    #[test]
    fn wrong_answer_drops_below_the_other_sides() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let mut deck = deck(
            HARDEST_FIRST,
            vec![card("a", PAIR, &[("direct", 2), ("reverse", 0)])],
        );
        WeakestFirst::default()
            .record_outcome(&mut deck, &ctx, "a", "direct", Outcome::Wrong)
            .unwrap();
        assert_eq!(score_of(&deck, "a", "direct"), Some(0));
        assert_eq!(score_of(&deck, "a", "reverse"), Some(0));
    }

    #[test]
    fn wrong_answer_ignores_its_own_score() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let mut deck = deck(
            HARDEST_FIRST,
            vec![
                card("a", SINGLE, &[("card", 1)]),
                card("b", SINGLE, &[("card", 6)]),
                card("c", PAIR, &[("direct", 4)]),
            ],
        );
        WeakestFirst::default()
            .record_outcome(&mut deck, &ctx, "a", "card", Outcome::Wrong)
            .unwrap();
        assert_eq!(score_of(&deck, "a", "card"), Some(3));
    }

    #[test]
    fn lone_wrong_answer_clamps_to_zero() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let mut deck = deck(HARDEST_FIRST, vec![card("a", SINGLE, &[("card", 5)])]);
        WeakestFirst::default()
            .record_outcome(&mut deck, &ctx, "a", "card", Outcome::Wrong)
            .unwrap();
        assert_eq!(score_of(&deck, "a", "card"), Some(0));
    }

    #[test]
    fn wrong_answer_ignores_sides_the_template_dropped() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        // "gone" is a leftover score the SINGLE template no longer defines.
        let mut deck = deck(
            HARDEST_FIRST,
            vec![
                card("a", SINGLE, &[("card", 6), ("gone", 0)]),
                card("b", SINGLE, &[("card", 5)]),
                card("c", SINGLE, &[("card", 4)]),
            ],
        );
        WeakestFirst::default()
            .record_outcome(&mut deck, &ctx, "b", "card", Outcome::Wrong)
            .unwrap();
        assert_eq!(score_of(&deck, "b", "card"), Some(3));
    }

    #[test]
    fn unknown_card_or_side_is_not_found() {
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let mut deck = deck(HARDEST_FIRST, vec![card("a", SINGLE, &[])]);
        let scheduler = WeakestFirst::default();
        assert!(matches!(
            scheduler.record_outcome(&mut deck, &ctx, "zzz", "card", Outcome::Correct),
            Err(StudyError::NotFound { .. })
        ));
        assert!(matches!(
            scheduler.record_outcome(&mut deck, &ctx, "a", "reverse", Outcome::Wrong),
            Err(StudyError::NotFound { .. })
        ));
        assert_eq!(score_of(&deck, "a", "reverse"), None);
    }

    proptest! {
        #[test]
        fn scores_never_go_negative_and_picks_stay_in_deck(
            answers in prop::collection::vec((0usize..3, 0usize..2, any::<bool>()), 0..60),
            seed in any::<u64>(),
        ) {
            let catalog = catalog();
            let renderer = TemplateRenderer::new();
            let ctx = StudyContext::new(&catalog, &renderer);
            let mut deck = deck(
                HARDEST_FIRST,
                vec![card("c0", PAIR, &[]), card("c1", PAIR, &[]), card("c2", PAIR, &[])],
            );
            let scheduler = WeakestFirst::default();
            let mut rng = Pcg64::seed_from_u64(seed);
            let sides = ["direct", "reverse"];

            for (card_idx, side_idx, correct) in answers {
                let card_id = format!("c{card_idx}");
                let outcome = if correct { Outcome::Correct } else { Outcome::Wrong };
                scheduler
                    .record_outcome(&mut deck, &ctx, &card_id, sides[side_idx], outcome)
                    .unwrap();

                let pick = scheduler.select_next(&deck, &ctx, &mut rng).unwrap();
                prop_assert!(deck.card(&pick.card_id).is_some());
                prop_assert!(sides.contains(&pick.side.as_str()));
            }

            // Scores are unsigned, so an underflow would surface as a huge value.
            for card in deck.cards.values() {
                for (_, score) in card.reviews.iter() {
                    prop_assert!(score <= 60);
                }
            }
        }
    }
}
