//! Jinja2-style rendering of template patterns.
//!
//! Patterns use `{{ field }}` interpolation over a card's data. Filters and
//! conditionals work as in minijinja; unknown fields render as empty strings.

use std::collections::BTreeMap;

use minijinja::Environment;

use crate::error::TemplateError;

/// Renders a pattern against a card's field data.
pub trait Render: Send + Sync {
    fn render(&self, pattern: &str, data: &BTreeMap<String, String>)
        -> Result<String, TemplateError>;

    /// Check that a pattern parses without rendering it.
    fn check(&self, pattern: &str) -> Result<(), TemplateError>;
}

/// minijinja-backed renderer.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }
}

impl Render for TemplateRenderer {
    fn render(
        &self,
        pattern: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError> {
        Ok(self.env.render_str(pattern, data)?)
    }

    fn check(&self, pattern: &str) -> Result<(), TemplateError> {
        self.env.template_from_str(pattern)?;
        Ok(())
    }
}
