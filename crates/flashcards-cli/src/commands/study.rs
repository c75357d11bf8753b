//! Study commands for CLI.

use std::io::{self, BufRead, Write};

use clap::Subcommand;
use flashcards_core::{Config, Outcome, StudyService};

#[derive(Subcommand)]
pub enum StudyAction {
    /// Pick the next card side to review
    Next {
        /// Deck ID or name
        deck: String,
    },
    /// Record the answer to a card side
    Answer {
        /// Deck ID or name
        deck: String,
        /// Card ID
        card: String,
        /// Side name
        side: String,
        /// correct or wrong
        outcome: Outcome,
    },
    /// Interactive review loop on stdin
    Session {
        /// Deck ID or name
        deck: String,
        /// Cards to review (default: study.session_rounds)
        #[arg(long)]
        rounds: Option<u32>,
    },
}

pub fn run(action: StudyAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut service = StudyService::from_config(&config)?;

    match action {
        StudyAction::Next { deck } => {
            let deck = service.find_deck(&deck)?;
            let selection = service.next_card(&deck.id)?;
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        StudyAction::Answer {
            deck,
            card,
            side,
            outcome,
        } => {
            let deck = service.find_deck(&deck)?;
            service.answer(&deck.id, &card, &side, outcome)?;
            println!("Recorded {outcome} for {card}/{side}");
        }
        StudyAction::Session { deck, rounds } => {
            let rounds = rounds.unwrap_or(config.study.session_rounds);
            let stdin = io::stdin();
            session(&mut service, &deck, rounds, &mut stdin.lock(), &mut io::stdout())?;
        }
    }
    Ok(())
}

/// Show up to `rounds` cards, reading answers from `input`.
///
/// Each round prints the question, waits for a line, prints the answer and
/// then reads the outcome (`y`/`n`, `q` to stop). End of input stops too.
fn session(
    service: &mut StudyService,
    deck: &str,
    rounds: u32,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let deck = service.find_deck(deck)?;
    let (mut correct, mut wrong) = (0u32, 0u32);
    let mut line = String::new();

    'rounds: for round in 1..=rounds {
        let pick = service.next_card(&deck.id)?;
        writeln!(out, "[{round}/{rounds}] {}", pick.question)?;
        write!(out, "(enter to reveal) ")?;
        out.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        writeln!(out, "{}", pick.answer)?;

        let outcome = loop {
            write!(out, "correct? [y/n/q] ")?;
            out.flush()?;
            line.clear();
            if input.read_line(&mut line)? == 0 {
                break 'rounds;
            }
            match line.trim() {
                "q" | "quit" => break 'rounds,
                answer => match answer.parse::<Outcome>() {
                    Ok(outcome) => break outcome,
                    Err(e) => writeln!(out, "{e}")?,
                },
            }
        };
        service.answer(&deck.id, &pick.card_id, &pick.side, outcome)?;
        match outcome {
            Outcome::Correct => correct += 1,
            Outcome::Wrong => wrong += 1,
        }
    }

    writeln!(out, "Session finished: {correct} correct, {wrong} wrong")?;
    Ok(())
}
