//! Model gateway
//!
//! The core reaches the language model only through [`ModelGateway`]. The
//! three operations form a closed set, named by [`GatewayOp`] for logging and
//! error reporting. [`LlmGateway`] is the production implementation; tests
//! substitute stubs.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ApprovedPlan, ContentDocument, CourseRequest, PlanDraft};
use crate::llm::LlmError;

mod llm;
mod parse;

pub use llm::{GatewayLimits, LlmGateway};
pub use parse::{extract_json, parse_content, parse_plan};

/// The three agent roles behind the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    GeneratePlan,
    RefinePlan,
    GenerateContent,
}

impl GatewayOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GeneratePlan => "generate-plan",
            Self::RefinePlan => "refine-plan",
            Self::GenerateContent => "generate-content",
        }
    }

    /// Prompt template rendered for this operation
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::GeneratePlan => "plan",
            Self::RefinePlan => "refine",
            Self::GenerateContent => "content",
        }
    }
}

impl std::fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Why a gateway call produced nothing usable
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Could not parse model output: {0}")]
    Parse(String),

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),

    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Whether trying the same call again could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Llm(e) => e.is_retryable(),
            // A different sample may well parse
            GatewayError::Parse(_) => true,
            GatewayError::Prompt(_) => false,
            GatewayError::Other(_) => true,
        }
    }
}

/// Abstract access to the language model
///
/// Stateless from the caller's perspective: every call carries all the
/// context it needs.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Draft a plan for `request`
    async fn generate_plan(&self, request: &CourseRequest) -> Result<PlanDraft, GatewayError>;

    /// Revise `prior` using the reviewer's `feedback` (possibly empty)
    async fn refine_plan(
        &self,
        request: &CourseRequest,
        prior: &PlanDraft,
        feedback: &str,
    ) -> Result<PlanDraft, GatewayError>;

    /// Write the lesson for `day_number` of an approved plan
    async fn generate_content(&self, plan: &ApprovedPlan, day_number: u32) -> Result<ContentDocument, GatewayError>;
}
