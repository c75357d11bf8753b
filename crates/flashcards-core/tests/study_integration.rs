//! Integration tests for studying decks end to end.
//!
//! These tests go through `StudyService` against real SQLite databases,
//! in memory and on disk.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use flashcards_core::storage::StudyConfig;
use flashcards_core::template::{QA_REVERSE_TEMPLATE_ID, QA_TEMPLATE_ID};
use flashcards_core::{
    Card, CoreError, Database, Deck, Outcome, SchedulerRegistry, StudyError,
    SidePattern, StudyService, Template, TemplateRenderer,
};

fn qa(question: &str, answer: &str) -> BTreeMap<String, String> {
    [
        ("question".to_string(), question.to_string()),
        ("answer".to_string(), answer.to_string()),
    ]
    .into_iter()
    .collect()
}

fn service(db: Database, seed: u64) -> StudyService {
    let registry = Arc::new(SchedulerRegistry::with_defaults(&StudyConfig::default()));
    StudyService::new(db, registry, Arc::new(TemplateRenderer::new())).with_seed(Some(seed))
}

#[test]
fn test_weakest_first_prefers_low_scores() {
    let mut svc = service(Database::open_memory().unwrap(), 3);
    let deck = Deck::new("Capitals", "WeakestFirst");
    svc.create_deck(&deck).unwrap();

    let weak = Card::new(QA_TEMPLATE_ID, qa("France", "Paris"));
    let mid = Card::new(QA_TEMPLATE_ID, qa("Italy", "Rome"));
    let strong = Card::new(QA_TEMPLATE_ID, qa("Spain", "Madrid"));
    for card in [&weak, &mid, &strong] {
        svc.add_card(&deck.id, card).unwrap();
    }
    // weak: 0, mid: 1, strong: 5
    svc.answer(&deck.id, &weak.id, "card", Outcome::Wrong).unwrap();
    svc.answer(&deck.id, &mid.id, "card", Outcome::Correct).unwrap();
    for _ in 0..5 {
        svc.answer(&deck.id, &strong.id, "card", Outcome::Correct).unwrap();
    }

    let mut seen = HashSet::new();
    for _ in 0..100 {
        seen.insert(svc.next_card(&deck.id).unwrap().card_id);
    }
    let expected: HashSet<String> = [weak.id.clone(), mid.id.clone()].into_iter().collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_wrong_answer_drops_below_other_sides() {
    let svc = service(Database::open_memory().unwrap(), 1);
    let deck = Deck::new("Capitals", "HardestFirst");
    svc.create_deck(&deck).unwrap();
    let card = Card::new(QA_REVERSE_TEMPLATE_ID, qa("France", "Paris"));
    svc.add_card(&deck.id, &card).unwrap();

    svc.answer(&deck.id, &card.id, "direct", Outcome::Correct).unwrap();
    svc.answer(&deck.id, &card.id, "direct", Outcome::Correct).unwrap();
    svc.answer(&deck.id, &card.id, "reverse", Outcome::Wrong).unwrap();
    assert_eq!(
        svc.db().get_card(&deck.id, &card.id).unwrap().unwrap().reviews.recorded("reverse"),
        Some(1)
    );

    // {direct: 2, reverse: 1}; wrong on direct goes to min(others) - 1.
    svc.answer(&deck.id, &card.id, "direct", Outcome::Wrong).unwrap();
    let stored = svc.db().get_card(&deck.id, &card.id).unwrap().unwrap();
    assert_eq!(stored.reviews.recorded("direct"), Some(0));
    assert_eq!(stored.reviews.recorded("reverse"), Some(1));

    let stats = svc.db().deck_stats(&deck.id).unwrap();
    assert_eq!(stats.total_reviews, 4);
    assert_eq!(stats.correct, 2);
    assert_eq!(stats.wrong, 2);
    assert_eq!(stats.reviewed_sides, 2);
}

#[test]
fn test_removed_template_side_no_longer_counts() {
    let svc = service(Database::open_memory().unwrap(), 2);
    let template = Template::new("Two")
        .with_side("direct", SidePattern::new("{{ question }}", "{{ answer }}"))
        .with_side("reverse", SidePattern::new("{{ answer }}", "{{ question }}"));
    svc.create_template(&template).unwrap();

    let mut deck = Deck::new("Capitals", "WeakestFirst");
    let mut a = Card::new(&template.id, qa("France", "Paris"));
    a.reviews.set("reverse", 0);
    a.reviews.set("direct", 6);
    let mut b = Card::new(QA_TEMPLATE_ID, qa("Italy", "Rome"));
    b.reviews.set("card", 5);
    let mut c = Card::new(QA_TEMPLATE_ID, qa("Spain", "Madrid"));
    c.reviews.set("card", 4);
    let (a_id, b_id) = (a.id.clone(), b.id.clone());
    for card in [a, b, c] {
        deck.insert_card(card);
    }
    svc.create_deck(&deck).unwrap();

    let mut edited = template.clone();
    edited.sides.remove("reverse");
    svc.update_template(&edited).unwrap();
    let stored = svc.db().get_card(&deck.id, &a_id).unwrap().unwrap();
    assert_eq!(stored.reviews.recorded("reverse"), None);

    // Others are {a/direct: 6, c/card: 4}, so wrong on b lands at 3.
    svc.answer(&deck.id, &b_id, "card", Outcome::Wrong).unwrap();
    let stored = svc.db().get_card(&deck.id, &b_id).unwrap().unwrap();
    assert_eq!(stored.reviews.recorded("card"), Some(3));
}

#[test]
fn test_card_review_log_lists_one_card() {
    let svc = service(Database::open_memory().unwrap(), 4);
    let deck = Deck::new("Capitals", "Random");
    svc.create_deck(&deck).unwrap();
    let france = Card::new(QA_TEMPLATE_ID, qa("France", "Paris"));
    let italy = Card::new(QA_TEMPLATE_ID, qa("Italy", "Rome"));
    svc.add_card(&deck.id, &france).unwrap();
    svc.add_card(&deck.id, &italy).unwrap();

    svc.answer(&deck.id, &france.id, "card", Outcome::Wrong).unwrap();
    svc.answer(&deck.id, &italy.id, "card", Outcome::Correct).unwrap();
    svc.answer(&deck.id, &france.id, "card", Outcome::Correct).unwrap();

    let log = svc.db().card_review_log(&deck.id, &france.id, 10).unwrap();
    let outcomes: Vec<Outcome> = log.iter().map(|r| r.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Correct, Outcome::Wrong]);
}

#[test]
fn test_next_card_leaves_scores_alone() {
    let mut svc = service(Database::open_memory().unwrap(), 9);
    let deck = Deck::new("Capitals", "WeakestFirst");
    svc.create_deck(&deck).unwrap();
    let card = Card::new(QA_REVERSE_TEMPLATE_ID, qa("France", "Paris"));
    svc.add_card(&deck.id, &card).unwrap();
    svc.answer(&deck.id, &card.id, "direct", Outcome::Correct).unwrap();

    let before = svc.find_deck(&deck.id).unwrap();
    for _ in 0..20 {
        svc.next_card(&deck.id).unwrap();
    }
    assert_eq!(svc.find_deck(&deck.id).unwrap().cards, before.cards);
}

#[test]
fn test_switching_algorithm_keeps_scores() {
    let mut svc = service(Database::open_memory().unwrap(), 5);
    let mut deck = Deck::new("Capitals", "HardestFirst");
    svc.create_deck(&deck).unwrap();
    let card = Card::new(QA_TEMPLATE_ID, qa("France", "Paris"));
    svc.add_card(&deck.id, &card).unwrap();
    svc.answer(&deck.id, &card.id, "card", Outcome::Correct).unwrap();

    deck.algorithm = "Random".into();
    svc.update_deck(&deck).unwrap();
    svc.next_card(&deck.id).unwrap();
    svc.answer(&deck.id, &card.id, "card", Outcome::Wrong).unwrap();

    let stored = svc.db().get_card(&deck.id, &card.id).unwrap().unwrap();
    assert_eq!(stored.reviews.recorded("card"), Some(1));

    deck.algorithm = "Nonexistent".into();
    assert!(matches!(
        svc.update_deck(&deck),
        Err(CoreError::Study(StudyError::UnknownAlgorithm(_)))
    ));
}

#[test]
fn test_unknown_deck_is_not_found() {
    let mut svc = service(Database::open_memory().unwrap(), 1);
    assert!(matches!(
        svc.next_card("missing"),
        Err(CoreError::NotFound { kind: "Deck", .. })
    ));
    assert!(matches!(
        svc.answer("missing", "c", "card", Outcome::Correct),
        Err(CoreError::NotFound { kind: "Deck", .. })
    ));
}

#[test]
fn test_concurrent_answers_are_serialized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flashcards.db");

    let svc = service(Database::open_at(&path).unwrap(), 1);
    let deck = Deck::new("Capitals", "WeakestFirst");
    svc.create_deck(&deck).unwrap();
    let card = Card::new(QA_TEMPLATE_ID, qa("France", "Paris"));
    svc.add_card(&deck.id, &card).unwrap();

    const PER_THREAD: u32 = 10;
    let handles: Vec<_> = (0..4)
        .map(|seed| {
            let path = path.clone();
            let deck_id = deck.id.clone();
            let card_id = card.id.clone();
            std::thread::spawn(move || {
                let svc = service(Database::open_at(&path).unwrap(), seed);
                for _ in 0..PER_THREAD {
                    svc.answer(&deck_id, &card_id, "card", Outcome::Correct).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = svc.db().get_card(&deck.id, &card.id).unwrap().unwrap();
    assert_eq!(stored.reviews.recorded("card"), Some(4 * PER_THREAD));
    assert_eq!(svc.db().deck_stats(&deck.id).unwrap().total_reviews, 40);
}

#[test]
fn test_deck_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flashcards.db");
    let deck = Deck::new("Capitals", "HardestFirst");
    let card = Card::new(QA_TEMPLATE_ID, qa("France", "Paris"));
    {
        let svc = service(Database::open_at(&path).unwrap(), 1);
        svc.create_deck(&deck).unwrap();
        svc.add_card(&deck.id, &card).unwrap();
        svc.answer(&deck.id, &card.id, "card", Outcome::Correct).unwrap();
    }

    let svc = service(Database::open_at(&path).unwrap(), 1);
    let reloaded = svc.find_deck("Capitals").unwrap();
    assert_eq!(reloaded.id, deck.id);
    assert_eq!(reloaded.card(&card.id).unwrap().reviews.recorded("card"), Some(1));
}
