//! Card templates (schemas).
//!
//! A template turns one card's field data into one or more sides, each a
//! question/answer pair. Templates are shared configuration: cards point at
//! them by id and never embed them.

mod builtin;
mod render;

pub use builtin::{builtin_templates, QA_REVERSE_TEMPLATE_ID, QA_TEMPLATE_ID};
pub use render::{Render, TemplateRenderer};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// Question and answer patterns of one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePattern {
    pub question: String,
    pub answer: String,
}

impl SidePattern {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Named, versioned rendering rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: u32,
    /// One-line summary of a card, e.g. `{{ question }} -> {{ answer }}`.
    #[serde(default)]
    pub preview: String,
    pub sides: BTreeMap<String, SidePattern>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_version() -> u32 {
    1
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: String::new(),
            version: default_version(),
            preview: String::new(),
            sides: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = preview.into();
        self
    }

    pub fn with_side(mut self, side: impl Into<String>, pattern: SidePattern) -> Self {
        self.sides.insert(side.into(), pattern);
        self
    }

    pub fn side(&self, side: &str) -> Option<&SidePattern> {
        self.sides.get(side)
    }

    pub fn side_names(&self) -> impl Iterator<Item = &str> {
        self.sides.keys().map(String::as_str)
    }

    /// Copy under a fresh id named `Clone of <name>`, restarting at version 1.
    pub fn clone_as_new(&self) -> Self {
        Self {
            id: new_id(),
            name: format!("Clone of {}", self.name),
            version: default_version(),
            ..self.clone()
        }
    }

    /// Check that the template is usable: named, at least one side, and
    /// every pattern parses.
    pub fn validate(&self, renderer: &dyn Render) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::Invalid("name must not be empty".into()));
        }
        if self.sides.is_empty() {
            return Err(TemplateError::Invalid(format!(
                "template '{}' defines no sides",
                self.name
            )));
        }
        renderer.check(&self.preview)?;
        for (name, side) in &self.sides {
            if name.trim().is_empty() {
                return Err(TemplateError::Invalid("side names must not be empty".into()));
            }
            renderer.check(&side.question)?;
            renderer.check(&side.answer)?;
        }
        Ok(())
    }

    /// Render the preview line for a card's data.
    pub fn render_preview(
        &self,
        renderer: &dyn Render,
        data: &BTreeMap<String, String>,
    ) -> Result<String, TemplateError> {
        renderer.render(&self.preview, data)
    }
}

/// Templates keyed by id, as handed to the schedulers.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Template>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl FromIterator<Template> for TemplateCatalog {
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for template in iter {
            catalog.insert(template);
        }
        catalog
    }
}
