//! studyplan - Human-in-the-loop curriculum planner
//!
//! studyplan drafts a day-by-day learning plan with an LLM, lets a human
//! approve or reject it with feedback until they are satisfied, and then
//! generates detailed lesson content for individual days on demand.
//!
//! # Core Concepts
//!
//! - **Refinement Loop**: draft → review → (refine → review)* → approved plan
//! - **Closed Gateway**: the model is reached through three tagged operations
//! - **Content Cache**: each day of an approved plan is generated at most once
//! - **Owned Session State**: plan and cache live in a `Session`, never globals
//!
//! # Architecture
//!
//! ```text
//! CourseRequest → RefinementLoop ⇄ Reviewer (human)
//!                      ↓
//!                ApprovedPlan → ContentCache → ContentDocument
//!                      ↑              ↓
//!                 ModelGateway (generate / refine / content)
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Course requests, plans, decisions and content documents
//! - [`planning`] - The draft/review/refine state machine
//! - [`cache`] - Per-plan memoized content generation
//! - [`session`] - Session controller wiring loop and cache together
//! - [`gateway`] - Model gateway trait and its LLM-backed implementation
//! - [`llm`] - LLM client trait with Anthropic and OpenAI providers
//! - [`prompts`] - Handlebars prompt templates
//! - [`terminal`] - Interactive terminal front end
//! - [`export`] - Markdown/JSON export of approved plans and content
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod gateway;
pub mod llm;
pub mod planning;
pub mod prompts;
pub mod session;
pub mod terminal;

// Re-export commonly used types
pub use cache::ContentCache;
pub use config::{Config, LlmConfig, SessionConfig};
pub use domain::{
    ApprovedPlan, ContentDocument, CourseRequest, DayChange, DayEntry, ExternalResources, PlanDraft, PlanShapeError,
    Resource, ReviewDecision,
};
pub use error::CurriculumError;
pub use gateway::{GatewayError, GatewayLimits, GatewayOp, LlmGateway, ModelGateway};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use planning::{FnReviewer, RefinementConfig, RefinementLoop, RefinementOutcome, Reviewer};
pub use prompts::{PromptContext, PromptLoader};
pub use session::{DaySelection, Session, SessionIo, SessionSummary};
