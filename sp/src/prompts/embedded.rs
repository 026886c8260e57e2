//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// First draft of a plan
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");

/// Revision of a rejected plan
pub const REFINE: &str = include_str!("../../prompts/refine.pmt");

/// Lesson content for one day
pub const CONTENT: &str = include_str!("../../prompts/content.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "plan" => Some(PLAN),
        "refine" => Some(REFINE),
        "content" => Some(CONTENT),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
