//! Plain-text rendering for the terminal front end
//!
//! These functions return strings without color so they can be tested;
//! emphasis is added by the caller when printing.

use serde_json::Value;

use crate::domain::{ContentDocument, DayChange, PlanDraft, Resource};
use crate::session::SessionSummary;

/// A draft as "Day N: Title" lines
pub fn render_draft(draft: &PlanDraft) -> String {
    draft.outline()
}

/// Differences between consecutive drafts
pub fn render_changes(changes: &[DayChange]) -> String {
    if changes.is_empty() {
        return "(no changes)".to_string();
    }
    changes
        .iter()
        .map(|change| match change {
            DayChange::Retitled {
                day_number,
                before,
                after,
            } => format!("~ Day {}: {} -> {}", day_number, before, after),
            DayChange::Added(entry) => format!("+ Day {}: {}", entry.day_number, entry.title),
            DayChange::Removed(entry) => format!("- Day {}: {}", entry.day_number, entry.title),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Readable text for a model-supplied value
///
/// Objects become "key:" headed sections, arrays one item per line.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(sections) => sections
            .iter()
            .map(|(heading, body)| format!("{}:\n{}", heading, value_text(body)))
            .collect::<Vec<_>>()
            .join("\n\n"),
        other => other.to_string(),
    }
}

/// Rating shown as "x/5" when a number can be read from it, otherwise as sent
fn rating_text(rating: &Value) -> Option<String> {
    match rating {
        Value::Null => None,
        Value::Number(n) => n.as_f64().map(|score| format!("rating {:.1}/5", score)),
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(format!("rating {}", s.trim())),
        other => Some(format!("rating {}", other)),
    }
}

fn render_resource(resource: &Resource) -> String {
    let mut line = format!("  - {}", resource.title);
    if !resource.url.is_empty() {
        line.push_str(&format!(" <{}>", resource.url));
    }
    let mut details = Vec::new();
    if let Some(rating) = rating_text(&resource.rating) {
        details.push(rating);
    }
    let price = value_text(&resource.price);
    if !price.is_empty() {
        details.push(price);
    }
    if !resource.value_for_money.is_empty() {
        details.push(resource.value_for_money.clone());
    }
    if !details.is_empty() {
        line.push_str(&format!("\n    {}", details.join(" | ")));
    }
    line
}

/// One day's lesson as readable text
pub fn render_content(day_number: u32, doc: &ContentDocument) -> String {
    let mut out = format!("Day {}: {}\n\n", day_number, doc.title);
    if !doc.description.is_empty() {
        out.push_str(&doc.description);
        out.push_str("\n\n");
    }
    let explanation = value_text(&doc.detailed_explanation);
    if !explanation.is_empty() {
        out.push_str(&explanation);
        out.push_str("\n\n");
    }

    let sections = [
        ("Free resources", &doc.external_resources.free),
        ("Paid resources", &doc.external_resources.paid),
    ];
    for (heading, resources) in sections {
        if resources.is_empty() {
            continue;
        }
        out.push_str(heading);
        out.push_str(":\n");
        for resource in resources {
            out.push_str(&render_resource(resource));
            out.push('\n');
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

pub fn render_summary(summary: &SessionSummary) -> String {
    let days = if summary.days_generated.is_empty() {
        "none".to_string()
    } else {
        summary
            .days_generated
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Plan {}: {} refinement(s), days generated: {}, cache hits: {}",
        summary.plan_id, summary.refinements, days, summary.cache_hits
    )
}
