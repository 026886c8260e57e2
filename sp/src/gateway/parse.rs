//! Turning raw model text into domain types
//!
//! Models wrap JSON in code fences, prefix it with prose, or return a bare
//! array instead of the requested object. Parsing accepts all of these but
//! never repairs the plan itself: shape checks happen in the refinement loop.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::GatewayError;
use crate::domain::{ContentDocument, DayEntry, PlanDraft};

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").expect("fence regex is valid"));

/// Pull the JSON payload out of a model response
pub fn extract_json(text: &str) -> Result<Value, GatewayError> {
    debug!(text_len = text.len(), "extract_json: called");
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(caps) = FENCE_RE.captures(trimmed) {
        let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            debug!("extract_json: found fenced JSON");
            return Ok(value);
        }
    }

    // Outermost object or array embedded in prose
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    debug!(%open, "extract_json: found embedded JSON");
                    return Ok(value);
                }
            }
        }
    }

    Err(GatewayError::Parse("response contains no JSON".to_string()))
}

#[derive(Deserialize)]
struct PlanEnvelope {
    #[serde(alias = "plan", alias = "lessons")]
    days: Vec<DayEntry>,
}

/// Parse a plan draft from model text
///
/// Accepts `{"days": [...]}` or a bare array of day entries.
pub fn parse_plan(text: &str) -> Result<PlanDraft, GatewayError> {
    debug!("parse_plan: called");
    let value = extract_json(text)?;
    let days = match value {
        Value::Array(_) => serde_json::from_value::<Vec<DayEntry>>(value),
        other => serde_json::from_value::<PlanEnvelope>(other).map(|envelope| envelope.days),
    }
    .map_err(|e| GatewayError::Parse(format!("plan: {}", e)))?;

    debug!(day_count = days.len(), "parse_plan: parsed");
    Ok(PlanDraft::new(days))
}

/// Parse a content document from model text
pub fn parse_content(text: &str) -> Result<ContentDocument, GatewayError> {
    debug!("parse_content: called");
    let value = extract_json(text)?;
    serde_json::from_value(value).map_err(|e| GatewayError::Parse(format!("content: {}", e)))
}
