//! ContentDocument - detailed lesson material for one day
//!
//! The JSON shape (`title`, `description`, `detailedExplanation`,
//! `externalResources.free[]`, `externalResources.paid[]`) is consumed by
//! other tools, so field names and nesting must stay exactly as they are.
//! Values whose type models do not respect (`detailedExplanation`, `rating`,
//! `price`) are kept as the raw JSON the model sent and written back
//! unchanged; turning them into text is up to the presentation layer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Lesson content for one day of an approved plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    #[serde(deserialize_with = "lenient_text")]
    pub title: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,

    /// Long-form text, or structured sub-sections as the model returned them
    #[serde(default = "empty_text")]
    pub detailed_explanation: Value,

    #[serde(default)]
    pub external_resources: ExternalResources,
}

/// Further reading, split by cost
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalResources {
    #[serde(default)]
    pub free: Vec<Resource>,

    #[serde(default)]
    pub paid: Vec<Resource>,
}

/// A single external resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(deserialize_with = "lenient_text")]
    pub title: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub url: String,

    /// Number, "4.5/5", "N/A", ...; `null` when the model gave none
    #[serde(default)]
    pub rating: Value,

    #[serde(default = "empty_text")]
    pub price: Value,

    #[serde(default, deserialize_with = "lenient_text")]
    pub value_for_money: String,
}

impl ContentDocument {
    /// Total number of external resources
    pub fn resource_count(&self) -> usize {
        self.external_resources.free.len() + self.external_resources.paid.len()
    }
}

fn empty_text() -> Value {
    Value::String(String::new())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}
