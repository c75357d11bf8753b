//! Templates seeded into a fresh database.

use super::{SidePattern, Template};

/// Stable id of the single-sided question/answer template.
pub const QA_TEMPLATE_ID: &str = "builtin-qa";
/// Stable id of the question/answer template with a reverse side.
pub const QA_REVERSE_TEMPLATE_ID: &str = "builtin-qa-reverse";

/// The templates every new database starts with.
pub fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            id: QA_TEMPLATE_ID.to_string(),
            ..Template::new("Q/A")
                .with_description("Generates one card: question -> answer")
                .with_preview("{{ question }} -> {{ answer }}")
                .with_side("card", SidePattern::new("{{ question }}", "{{ answer }}"))
        },
        Template {
            id: QA_REVERSE_TEMPLATE_ID.to_string(),
            ..Template::new("Q/A with reverse")
                .with_description(
                    "Generates two cards: question -> answer and answer -> question",
                )
                .with_preview("{{ question }} <-> {{ answer }}")
                .with_side("direct", SidePattern::new("{{ question }}", "{{ answer }}"))
                .with_side("reverse", SidePattern::new("{{ answer }}", "{{ question }}"))
        },
    ]
}
