//! Shared fixtures for integration tests
//!
//! `StubGateway` stands in for the language model and records every call;
//! `ScriptedIo` replays reviewer decisions and day selections.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use studyplan::domain::{
    ApprovedPlan, ContentDocument, CourseRequest, DayEntry, ExternalResources, PlanDraft, PlanShapeError, Resource,
    ReviewDecision,
};
use studyplan::error::CurriculumError;
use studyplan::gateway::{GatewayError, GatewayOp, ModelGateway};
use studyplan::planning::{RefinementOutcome, Reviewer};
use studyplan::session::SessionIo;

pub const DAY_TWO_TITLE: &str = "Python Descriptors and Custom Attribute Access";

// =============================================================================
// StubGateway
// =============================================================================

/// Deterministic gateway with call counters and failure injection
#[derive(Default)]
pub struct StubGateway {
    generate_calls: AtomicU32,
    refine_calls: AtomicU32,
    content_calls: Mutex<Vec<u32>>,
    feedback: Mutex<Vec<String>>,
    /// Remaining injected failures per day
    content_failures: Mutex<HashMap<u32, u32>>,
    /// Refinements return this many days instead of the requested duration
    refine_days: Option<u32>,
    /// Refinements still to come back one day short
    short_refines: AtomicU32,
    content_delay: Option<Duration>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refinements return a plan of the wrong length
    pub fn with_refine_days(days: u32) -> Self {
        Self {
            refine_days: Some(days),
            ..Self::default()
        }
    }

    /// The next `times` refinements drop their last day
    pub fn shorten_refines(&self, times: u32) {
        self.short_refines.store(times, Ordering::SeqCst);
    }

    /// Content generation sleeps before answering
    pub fn with_content_delay(delay: Duration) -> Self {
        Self {
            content_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail the next `times` content generations for `day`
    pub fn fail_content(&self, day: u32, times: u32) {
        self.content_failures.lock().unwrap().insert(day, times);
    }

    pub fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn refine_calls(&self) -> u32 {
        self.refine_calls.load(Ordering::SeqCst)
    }

    /// Day numbers passed to `generate_content`, in call order (failed calls included)
    pub fn content_calls(&self) -> Vec<u32> {
        self.content_calls.lock().unwrap().clone()
    }

    pub fn feedback(&self) -> Vec<String> {
        self.feedback.lock().unwrap().clone()
    }
}

fn draft_for(request: &CourseRequest) -> PlanDraft {
    let days = (1..=request.duration_days())
        .map(|day| {
            let title = if day == 2 {
                DAY_TWO_TITLE.to_string()
            } else {
                format!("{} - part {}", request.topic(), day)
            };
            DayEntry::new(day, title)
        })
        .collect();
    PlanDraft::new(days)
}

#[async_trait]
impl ModelGateway for StubGateway {
    async fn generate_plan(&self, request: &CourseRequest) -> Result<PlanDraft, GatewayError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(draft_for(request))
    }

    async fn refine_plan(
        &self,
        request: &CourseRequest,
        prior: &PlanDraft,
        feedback: &str,
    ) -> Result<PlanDraft, GatewayError> {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);
        self.feedback.lock().unwrap().push(feedback.to_string());

        if let Some(days) = self.refine_days {
            let wrong = (1..=days).map(|d| DayEntry::new(d, format!("Day {}", d))).collect();
            return Ok(PlanDraft::new(wrong));
        }
        let short = self
            .short_refines
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if short {
            let mut days = prior.days.clone();
            days.pop();
            return Ok(PlanDraft::new(days));
        }

        let mut days = prior.days.clone();
        let lower = feedback.to_lowercase();
        let n = days.len();
        if lower.contains("flask") && n >= 1 {
            days[n - 1].title = "Server Programming with Flask and Django".to_string();
        }
        if lower.contains("django") && n >= 3 {
            days[n - 2].title = "Building Web Applications with Django".to_string();
            days[n - 1].title = "Server Programming with Flask".to_string();
        }
        if days == prior.days {
            // Feedback the stub does not understand still produces a new draft
            days[0].title = format!("{} (revised)", request.topic());
        }
        Ok(PlanDraft::new(days))
    }

    async fn generate_content(&self, plan: &ApprovedPlan, day_number: u32) -> Result<ContentDocument, GatewayError> {
        self.content_calls.lock().unwrap().push(day_number);
        if let Some(delay) = self.content_delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut failures = self.content_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&day_number) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(GatewayError::Other("503 Service Unavailable".to_string()));
                }
            }
        }

        let title = plan
            .entry(day_number)
            .map(|e| e.title.clone())
            .unwrap_or_default();
        Ok(ContentDocument {
            title: title.clone(),
            description: format!("Day {} of {}", day_number, plan.request().topic()),
            detailed_explanation: Value::from(format!("Everything about {}.", title)),
            external_resources: ExternalResources {
                free: vec![Resource {
                    title: "Official documentation".to_string(),
                    url: "https://docs.python.org/3/".to_string(),
                    rating: Value::from(4.8),
                    price: Value::from("Free"),
                    value_for_money: "Excellent".to_string(),
                }],
                paid: vec![],
            },
        })
    }
}

// =============================================================================
// ScriptedIo
// =============================================================================

/// Session IO that replays scripted answers and records what it was shown
#[derive(Default)]
pub struct ScriptedIo {
    decisions: VecDeque<ReviewDecision>,
    selections: VecDeque<String>,
    retry_answers: VecDeque<bool>,
    pub reviewed: Vec<PlanDraft>,
    pub shown: Vec<(u32, ContentDocument, bool)>,
    pub errors: Vec<String>,
    pub retries_offered: Vec<GatewayOp>,
    pub approved_refinements: Option<u32>,
}

impl ScriptedIo {
    /// Reviewer decisions in order (approve once exhausted) and day-selection lines
    pub fn new(decisions: Vec<ReviewDecision>, selections: &[&str]) -> Self {
        Self {
            decisions: decisions.into(),
            selections: selections.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Answers to "retry?" prompts in order (decline once exhausted)
    pub fn with_retries(mut self, answers: &[bool]) -> Self {
        self.retry_answers = answers.iter().copied().collect();
        self
    }

    pub fn shown_days(&self) -> Vec<u32> {
        self.shown.iter().map(|(day, _, _)| *day).collect()
    }
}

impl Reviewer for ScriptedIo {
    fn review(&mut self, draft: &PlanDraft, _round: u32) -> Result<ReviewDecision, CurriculumError> {
        self.reviewed.push(draft.clone());
        Ok(self.decisions.pop_front().unwrap_or_else(ReviewDecision::approve))
    }

    fn retry_failed_step(&mut self, op: GatewayOp, _error: &GatewayError) -> bool {
        self.retries_offered.push(op);
        self.retry_answers.pop_front().unwrap_or(false)
    }

    fn retry_malformed_step(&mut self, op: GatewayOp, _reason: &PlanShapeError) -> bool {
        self.retries_offered.push(op);
        self.retry_answers.pop_front().unwrap_or(false)
    }
}

impl SessionIo for ScriptedIo {
    fn read_day(&mut self, _plan: &ApprovedPlan) -> Result<Option<String>, CurriculumError> {
        Ok(self.selections.pop_front())
    }

    fn plan_approved(&mut self, outcome: &RefinementOutcome) -> Result<(), CurriculumError> {
        self.approved_refinements = Some(outcome.refine_calls);
        Ok(())
    }

    fn show_content(&mut self, day_number: u32, doc: &ContentDocument, cached: bool) -> Result<(), CurriculumError> {
        self.shown.push((day_number, doc.clone(), cached));
        Ok(())
    }

    fn report_error(&mut self, error: &CurriculumError) {
        self.errors.push(error.to_string());
    }
}
