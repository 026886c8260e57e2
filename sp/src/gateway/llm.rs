//! LLM-backed model gateway

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::parse::{parse_content, parse_plan};
use super::{GatewayError, GatewayOp, ModelGateway};
use crate::config::SessionConfig;
use crate::domain::{ApprovedPlan, ContentDocument, CourseRequest, PlanDraft};
use crate::llm::{CompletionRequest, LlmClient, Message, StopReason, TokenUsage};
use crate::prompts::{PromptContext, PromptLoader};

const SYSTEM_PROMPT: &str = "You are an expert curriculum designer. \
You build practical, well-sequenced courses and always answer with valid JSON exactly in the requested shape.";

/// Token budgets per operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayLimits {
    pub plan_max_tokens: u32,
    pub content_max_tokens: u32,
}

impl GatewayLimits {
    fn for_op(&self, op: GatewayOp) -> u32 {
        match op {
            GatewayOp::GeneratePlan | GatewayOp::RefinePlan => self.plan_max_tokens,
            GatewayOp::GenerateContent => self.content_max_tokens,
        }
    }
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for GatewayLimits {
    fn from(config: &SessionConfig) -> Self {
        Self {
            plan_max_tokens: config.plan_max_tokens,
            content_max_tokens: config.content_max_tokens,
        }
    }
}

/// Model gateway that renders a prompt template and asks an [`LlmClient`]
pub struct LlmGateway {
    llm: Arc<dyn LlmClient>,
    prompts: PromptLoader,
    limits: GatewayLimits,
    usage: Mutex<TokenUsage>,
}

impl LlmGateway {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: PromptLoader, limits: GatewayLimits) -> Self {
        debug!(?limits, "LlmGateway::new: called");
        Self {
            llm,
            prompts,
            limits,
            usage: Mutex::new(TokenUsage::default()),
        }
    }

    /// Tokens spent so far across all operations
    pub fn usage(&self) -> TokenUsage {
        self.usage.lock().map(|u| *u).unwrap_or_default()
    }

    /// Render the operation's template, call the model and return its text
    async fn ask(&self, op: GatewayOp, context: &PromptContext) -> Result<String, GatewayError> {
        debug!(%op, "ask: called");
        let prompt = self
            .prompts
            .render(op.template_name(), context)
            .map_err(|e| GatewayError::Prompt(e.to_string()))?;

        let request = CompletionRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.limits.for_op(op),
        };

        let response = self.llm.complete(request).await?;

        if let Ok(mut usage) = self.usage.lock() {
            usage.add(response.usage);
        }
        info!(
            %op,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "ask: model responded"
        );

        let truncated = response.stop_reason == StopReason::MaxTokens;
        if truncated {
            warn!(%op, "ask: response hit the token limit and may be truncated");
        }

        match response.content {
            Some(text) => Ok(text),
            None if truncated => Err(GatewayError::Parse("empty response (token limit reached)".to_string())),
            None => Err(GatewayError::Parse("empty response".to_string())),
        }
    }
}

#[async_trait]
impl ModelGateway for LlmGateway {
    async fn generate_plan(&self, request: &CourseRequest) -> Result<PlanDraft, GatewayError> {
        debug!(topic = %request.topic(), days = request.duration_days(), "generate_plan: called");
        let text = self
            .ask(GatewayOp::GeneratePlan, &PromptContext::for_plan(request))
            .await?;
        parse_plan(&text)
    }

    async fn refine_plan(
        &self,
        request: &CourseRequest,
        prior: &PlanDraft,
        feedback: &str,
    ) -> Result<PlanDraft, GatewayError> {
        debug!(feedback_len = feedback.len(), "refine_plan: called");
        let context = PromptContext::for_refinement(request, prior, feedback);
        let text = self.ask(GatewayOp::RefinePlan, &context).await?;
        parse_plan(&text)
    }

    async fn generate_content(&self, plan: &ApprovedPlan, day_number: u32) -> Result<ContentDocument, GatewayError> {
        debug!(plan_id = %plan.id(), %day_number, "generate_content: called");
        let text = self
            .ask(GatewayOp::GenerateContent, &PromptContext::for_content(plan, day_number))
            .await?;
        parse_content(&text)
    }
}
