//! Prompt Template System
//!
//! Loads and renders the `.pmt` templates behind the three gateway operations.
//!
//! Template loading chain:
//! 1. `{prompts-dir}/{name}.pmt` (user override, when configured)
//! 2. Embedded fallback compiled into the binary
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader};
