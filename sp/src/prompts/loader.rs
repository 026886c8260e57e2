//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::{ApprovedPlan, CourseRequest, PlanDraft};

/// Context for rendering prompt templates
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    pub topic: String,
    pub experience_level: String,
    pub duration_days: u32,
    /// Day being written (content prompt only)
    pub day_number: Option<u32>,
    pub day_title: Option<String>,
    /// "Day N: Title" lines of the draft or approved plan
    pub outline: Option<String>,
    /// Reviewer feedback, verbatim
    pub feedback: Option<String>,
    /// False when the reviewer rejected without saying why
    pub has_feedback: bool,
}

impl PromptContext {
    /// Context for the first draft
    pub fn for_plan(request: &CourseRequest) -> Self {
        debug!(topic = %request.topic(), "PromptContext::for_plan: called");
        Self {
            topic: request.topic().to_string(),
            experience_level: request.experience_level().to_string(),
            duration_days: request.duration_days(),
            ..Self::default()
        }
    }

    /// Context for revising `prior` with `feedback`
    pub fn for_refinement(request: &CourseRequest, prior: &PlanDraft, feedback: &str) -> Self {
        debug!(feedback_len = feedback.len(), "PromptContext::for_refinement: called");
        Self {
            outline: Some(prior.outline()),
            feedback: Some(feedback.to_string()),
            has_feedback: !feedback.trim().is_empty(),
            ..Self::for_plan(request)
        }
    }

    /// Context for one day's lesson content
    pub fn for_content(plan: &ApprovedPlan, day_number: u32) -> Self {
        debug!(%day_number, "PromptContext::for_content: called");
        Self {
            day_number: Some(day_number),
            day_title: plan.entry(day_number).map(|e| e.title.clone()),
            outline: Some(plan.outline()),
            ..Self::for_plan(plan.request())
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (`prompts-dir` in config)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that prefers templates found in `override_dir`
    pub fn new(override_dir: Option<&Path>) -> Self {
        debug!(?override_dir, "PromptLoader::new: called");
        let override_dir = override_dir.filter(|dir| dir.is_dir()).map(Path::to_path_buf);
        if override_dir.is_none() {
            debug!("PromptLoader::new: no override directory, using embedded prompts");
        }
        Self {
            hbs: Self::engine(),
            override_dir,
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // Prompts are plain text; HTML escaping would mangle quotes in feedback
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `{prompts-dir}/{name}.pmt`
    /// 2. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template_name: &str, context: &PromptContext) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }
}
