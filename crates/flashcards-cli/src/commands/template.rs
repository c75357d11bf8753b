//! Card template management commands for CLI.

use clap::Subcommand;
use flashcards_core::{CoreError, StudyService, Template};

use super::open_service;

#[derive(Subcommand)]
pub enum TemplateAction {
    /// List templates with the number of cards using each
    List,
    /// Show a template
    Show {
        /// Template ID or name
        template: String,
    },
    /// Create a template from JSON
    Create {
        /// Template as JSON, e.g. {"name":"Vocab","sides":{"card":{"question":"{{ word }}","answer":"{{ meaning }}"}}}
        json: String,
    },
    /// Replace a template's name, preview and sides from JSON
    Update {
        /// Template ID or name
        template: String,
        /// Template as JSON
        json: String,
    },
    /// Copy a template under a new id
    Clone {
        /// Template ID or name
        template: String,
        /// Name of the copy (default: "Clone of <name>")
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a template that no card uses
    Delete {
        /// Template ID or name
        template: String,
    },
}

fn find_template(service: &StudyService, key: &str) -> Result<Template, CoreError> {
    if let Some(template) = service.db().get_template(key)? {
        return Ok(template);
    }
    service
        .db()
        .find_template_by_name(key)?
        .ok_or_else(|| CoreError::not_found("Template", key))
}

pub fn run(action: TemplateAction) -> Result<(), Box<dyn std::error::Error>> {
    let service = open_service()?;

    match action {
        TemplateAction::List => {
            let templates = service.db().list_template_summaries()?;
            println!("{}", serde_json::to_string_pretty(&templates)?);
        }
        TemplateAction::Show { template } => {
            let template = find_template(&service, &template)?;
            println!("{}", serde_json::to_string_pretty(&template)?);
        }
        TemplateAction::Create { json } => {
            let template: Template = serde_json::from_str(&json)?;
            service.create_template(&template)?;
            println!("Template created: {}", template.id);
        }
        TemplateAction::Update { template, json } => {
            let existing = find_template(&service, &template)?;
            let parsed: Template = serde_json::from_str(&json)?;
            let template = Template {
                id: existing.id,
                version: existing.version,
                ..parsed
            };
            let version = service.update_template(&template)?;
            println!("Template updated: {} (version {version})", template.id);
        }
        TemplateAction::Clone { template, name } => {
            let mut copy = find_template(&service, &template)?.clone_as_new();
            if let Some(n) = name {
                copy.name = n;
            }
            service.create_template(&copy)?;
            println!("Template created: {}", copy.id);
        }
        TemplateAction::Delete { template } => {
            let template = find_template(&service, &template)?;
            service.db().delete_template(&template.id)?;
            println!("Template deleted: {}", template.id);
        }
    }
    Ok(())
}
