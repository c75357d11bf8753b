use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "flashcards", version, about = "Flashcards CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deck management
    Deck {
        #[command(subcommand)]
        action: commands::deck::DeckAction,
    },
    /// Card management
    Card {
        #[command(subcommand)]
        action: commands::card::CardAction,
    },
    /// Card template management
    Template {
        #[command(subcommand)]
        action: commands::template::TemplateAction,
    },
    /// Study a deck
    Study {
        #[command(subcommand)]
        action: commands::study::StudyAction,
    },
    /// List the available study algorithms
    Algorithms,
    /// Review statistics of a deck
    Stats(commands::stats::StatsArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    setup_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Deck { action } => commands::deck::run(action),
        Commands::Card { action } => commands::card::run(action),
        Commands::Template { action } => commands::template::run(action),
        Commands::Study { action } => commands::study::run(action),
        Commands::Algorithms => commands::algorithms::run(),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
