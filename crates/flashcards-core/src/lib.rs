//! # Flashcards Core Library
//!
//! This library provides the core logic for the `flashcards` spaced-study
//! tool. Every operation is available through the standalone CLI binary,
//! which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Study**: Pluggable schedulers that pick the next card side of a deck
//!   and turn answers into per-side scores
//! - **Templates**: Jinja-style patterns that render a card's data into
//!   question/answer pairs
//! - **Storage**: SQLite-based deck, score and review log storage plus
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Scheduler`]: Strategy trait implemented by [`UniformRandom`] and [`WeakestFirst`]
//! - [`SchedulerRegistry`]: Name to scheduler lookup, built once and shared
//! - [`StudyService`]: Deck study operations on top of the [`Database`]
//! - [`Config`]: Application configuration management

pub mod error;
pub mod model;
pub mod storage;
pub mod study;
pub mod template;

pub use error::{
    ConfigError, CoreError, DatabaseError, Result, StudyError, TemplateError, ValidationError,
};
pub use model::{parse_tags, Card, Deck, DeckStats, DeckSummary, Outcome, ReviewRecord, ReviewState};
pub use storage::{Config, Database, TemplateSummary};
pub use study::{
    Scheduler, SchedulerRegistry, Selection, StudyContext, StudyService, UniformRandom,
    WeakestFirst,
};
pub use template::{Render, SidePattern, Template, TemplateCatalog, TemplateRenderer};
