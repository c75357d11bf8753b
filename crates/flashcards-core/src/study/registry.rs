//! Name → scheduler table.
//!
//! Built once at startup and handed to whoever studies decks, usually
//! wrapped in an `Arc`. Nothing is registered after that, so shared reads
//! need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Scheduler, UniformRandom, WeakestFirst};
use crate::error::StudyError;
use crate::storage::StudyConfig;

/// Uniform random selection.
pub const RANDOM: &str = "Random";
/// Lowest-score-first selection.
pub const HARDEST_FIRST: &str = "HardestFirst";
/// Alias of [`HARDEST_FIRST`].
pub const WEAKEST_FIRST: &str = "WeakestFirst";

#[derive(Debug, Clone, Default)]
pub struct SchedulerRegistry {
    schedulers: HashMap<String, Arc<dyn Scheduler>>,
}

impl SchedulerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in schedulers, configured from `config`.
    pub fn with_defaults(config: &StudyConfig) -> Self {
        let mut registry = Self::new();
        let weakest: Arc<dyn Scheduler> =
            Arc::new(WeakestFirst::new(config.weakest_first_threshold));
        registry.register(RANDOM, Arc::new(UniformRandom::new()));
        registry.register(HARDEST_FIRST, Arc::clone(&weakest));
        registry.register(WEAKEST_FIRST, weakest);
        registry
    }

    /// Bind `name` to `scheduler`, replacing and returning any previous binding.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Option<Arc<dyn Scheduler>> {
        self.schedulers.insert(name.into(), scheduler)
    }

    /// Look up the scheduler bound to `name`.
    ///
    /// # Errors
    /// [`StudyError::UnknownAlgorithm`] when nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Scheduler>, StudyError> {
        self.schedulers
            .get(name)
            .cloned()
            .ok_or_else(|| StudyError::UnknownAlgorithm(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schedulers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schedulers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::model::Outcome;
    use crate::study::fixtures::*;
    use crate::study::StudyContext;
    use crate::template::TemplateRenderer;

    #[test]
    fn defaults_cover_the_builtin_names() {
        let registry = SchedulerRegistry::with_defaults(&StudyConfig::default());
        assert_eq!(registry.names(), vec![HARDEST_FIRST, RANDOM, WEAKEST_FIRST]);
        for name in [RANDOM, HARDEST_FIRST, WEAKEST_FIRST] {
            assert!(registry.resolve(name).is_ok());
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registry = SchedulerRegistry::with_defaults(&StudyConfig::default());
        match registry.resolve("Nonexistent") {
            Err(StudyError::UnknownAlgorithm(name)) => assert_eq!(name, "Nonexistent"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!registry.contains("Nonexistent"));
    }

    #[test]
    fn reregistering_replaces_the_binding() {
        let mut registry = SchedulerRegistry::with_defaults(&StudyConfig::default());
        let previous = registry.register(RANDOM, Arc::new(WeakestFirst::new(0)));
        assert!(previous.is_some());
        assert_eq!(registry.names().len(), 3);

        // "Random" now keeps score, which UniformRandom never does.
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let mut deck = deck(RANDOM, vec![card("a", SINGLE, &[])]);
        registry
            .resolve(RANDOM)
            .unwrap()
            .record_outcome(&mut deck, &ctx, "a", "card", Outcome::Correct)
            .unwrap();
        assert_eq!(deck.card("a").unwrap().reviews.recorded("card"), Some(1));
    }

    #[test]
    fn threshold_comes_from_config() {
        let config = StudyConfig {
            weakest_first_threshold: 0,
            ..StudyConfig::default()
        };
        let registry = SchedulerRegistry::with_defaults(&config);
        let catalog = catalog();
        let renderer = TemplateRenderer::new();
        let ctx = StudyContext::new(&catalog, &renderer);
        let deck = deck(
            HARDEST_FIRST,
            vec![
                card("low", SINGLE, &[("card", 1)]),
                card("high", SINGLE, &[("card", 2)]),
            ],
        );
        let scheduler = registry.resolve(HARDEST_FIRST).unwrap();
        let mut rng = Pcg64::seed_from_u64(5);
        for _ in 0..50 {
            let pick = scheduler.select_next(&deck, &ctx, &mut rng).unwrap();
            assert_eq!(pick.card_id, "low");
        }
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        let registry = Arc::new(SchedulerRegistry::with_defaults(&StudyConfig::default()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve(HARDEST_FIRST).is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
