//! RefinementLoop - HITL state machine producing an approved plan
//!
//! ```text
//! Draft ──► Review ──approve──► Terminal
//!             ▲  │
//!             │  reject(feedback)
//!             │  ▼
//!            Refine
//! ```
//!
//! Every draft the gateway returns is checked against the requested duration
//! before it reaches the reviewer. A draft of the wrong shape is never
//! repaired: the reviewer may ask for the same step again with the same
//! inputs, otherwise the loop ends with `MalformedPlan`.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::domain::{ApprovedPlan, CourseRequest, PlanDraft, PlanShapeError, ReviewDecision};
use crate::error::CurriculumError;
use crate::gateway::{GatewayError, GatewayOp, ModelGateway};

/// The human decision step
///
/// Called once per draft, in order, and blocks until the human answers.
pub trait Reviewer {
    /// Approve `draft`, or reject it with feedback. `round` starts at 1.
    fn review(&mut self, draft: &PlanDraft, round: u32) -> Result<ReviewDecision, CurriculumError>;

    /// A gateway call failed; return true to re-attempt the same step with the same inputs
    fn retry_failed_step(&mut self, op: GatewayOp, error: &GatewayError) -> bool {
        debug!(%op, %error, "Reviewer::retry_failed_step: default declines");
        false
    }

    /// The gateway returned a draft of the wrong shape; return true to request
    /// a new draft from the same step with the same inputs
    fn retry_malformed_step(&mut self, op: GatewayOp, reason: &PlanShapeError) -> bool {
        debug!(%op, %reason, "Reviewer::retry_malformed_step: default declines");
        false
    }
}

/// Adapts a closure into a [`Reviewer`] that never retries failed steps
pub struct FnReviewer<F>(pub F);

impl<F> Reviewer for FnReviewer<F>
where
    F: FnMut(&PlanDraft, u32) -> ReviewDecision,
{
    fn review(&mut self, draft: &PlanDraft, round: u32) -> Result<ReviewDecision, CurriculumError> {
        Ok((self.0)(draft, round))
    }
}

/// Loop limits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinementConfig {
    /// Maximum refine calls before giving up (None = unbounded)
    pub max_refinements: Option<u32>,
}

impl From<&SessionConfig> for RefinementConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            max_refinements: config.max_refinements,
        }
    }
}

/// Result of a completed loop
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub plan: ApprovedPlan,
    /// Successful generate calls (always 1)
    pub generate_calls: u32,
    /// Successful refine calls, one per rejection
    pub refine_calls: u32,
    /// Review rounds, including the approving one
    pub rounds: u32,
    /// Every draft in the order it was produced; the last one was approved
    pub history: Vec<PlanDraft>,
}

#[derive(Debug)]
enum LoopState {
    Draft,
    Review(PlanDraft),
    Refine { draft: PlanDraft, feedback: String },
    Terminal(PlanDraft),
}

/// Drives one course request to an approved plan
#[derive(Debug, Clone, Default)]
pub struct RefinementLoop {
    config: RefinementConfig,
}

impl RefinementLoop {
    pub fn new(config: RefinementConfig) -> Self {
        Self { config }
    }

    /// Run the loop until the reviewer approves a draft
    pub async fn run<R, G>(
        &self,
        request: &CourseRequest,
        reviewer: &mut R,
        gateway: &G,
    ) -> Result<RefinementOutcome, CurriculumError>
    where
        R: Reviewer + ?Sized,
        G: ModelGateway + ?Sized,
    {
        debug!(topic = %request.topic(), days = request.duration_days(), "RefinementLoop::run: called");
        let expected = request.duration_days();

        let mut state = LoopState::Draft;
        let mut generate_calls = 0;
        let mut refine_calls = 0;
        let mut rounds = 0;
        let mut history: Vec<PlanDraft> = Vec::new();

        let approved = loop {
            state = match state {
                LoopState::Draft => {
                    info!("RefinementLoop: drafting plan");
                    let draft = draft_step(reviewer, GatewayOp::GeneratePlan, expected, move || {
                        gateway.generate_plan(request)
                    })
                    .await?;
                    generate_calls += 1;
                    history.push(draft.clone());
                    LoopState::Review(draft)
                }
                LoopState::Review(draft) => {
                    rounds += 1;
                    info!(round = rounds, "RefinementLoop: awaiting review");
                    let decision = reviewer.review(&draft, rounds)?;
                    if decision.approved {
                        LoopState::Terminal(draft)
                    } else {
                        let feedback = decision.feedback_text().to_string();
                        debug!(feedback_len = feedback.len(), "RefinementLoop: draft rejected");
                        LoopState::Refine { draft, feedback }
                    }
                }
                LoopState::Refine { draft, feedback } => {
                    if let Some(limit) = self.config.max_refinements {
                        if refine_calls >= limit {
                            warn!(limit, "RefinementLoop: refinement limit reached");
                            return Err(CurriculumError::RefinementLimitReached { limit });
                        }
                    }
                    info!(refinement = refine_calls + 1, "RefinementLoop: refining plan");
                    let prior = &draft;
                    let feedback = feedback.as_str();
                    let refined = draft_step(reviewer, GatewayOp::RefinePlan, expected, move || {
                        gateway.refine_plan(request, prior, feedback)
                    })
                    .await?;
                    refine_calls += 1;
                    history.push(refined.clone());
                    LoopState::Review(refined)
                }
                LoopState::Terminal(draft) => break draft,
            };
        };

        let plan = ApprovedPlan::new(request.clone(), approved).map_err(|reason| CurriculumError::MalformedPlan {
            op: if refine_calls > 0 {
                GatewayOp::RefinePlan
            } else {
                GatewayOp::GeneratePlan
            },
            expected,
            reason,
        })?;
        info!(plan_id = %plan.id(), refine_calls, rounds, "RefinementLoop: plan approved");

        Ok(RefinementOutcome {
            plan,
            generate_calls,
            refine_calls,
            rounds,
            history,
        })
    }
}

/// Run one drafting step until it yields a draft of `expected` days or the reviewer gives up
async fn draft_step<R, F, Fut>(
    reviewer: &mut R,
    op: GatewayOp,
    expected: u32,
    mut call: F,
) -> Result<PlanDraft, CurriculumError>
where
    R: Reviewer + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PlanDraft, GatewayError>>,
{
    loop {
        let draft = attempt(reviewer, op, &mut call).await?;
        match draft.check_shape(expected) {
            Ok(()) => return Ok(draft),
            Err(reason) => {
                warn!(%op, expected, %reason, "draft_step: malformed plan");
                if !reviewer.retry_malformed_step(op, &reason) {
                    return Err(CurriculumError::MalformedPlan { op, expected, reason });
                }
                info!(%op, "draft_step: requesting a new draft");
            }
        }
    }
}

/// Run one gateway step, offering the reviewer a retry on failure
async fn attempt<R, T, F, Fut>(reviewer: &mut R, op: GatewayOp, mut call: F) -> Result<T, CurriculumError>
where
    R: Reviewer + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                warn!(%op, %error, "attempt: gateway call failed");
                if !reviewer.retry_failed_step(op, &error) {
                    return Err(CurriculumError::Gateway { op, source: error });
                }
                info!(%op, "attempt: retrying step");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentDocument, DayEntry};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Gateway returning well-formed drafts, with scripted failures
    #[derive(Default)]
    struct ScriptedGateway {
        generate_calls: AtomicU32,
        refine_calls: AtomicU32,
        failures: Mutex<VecDeque<GatewayOp>>,
        refine_days: Option<u32>,
        /// Refinements still to come back one day short
        short_refines: AtomicU32,
        feedback_seen: Mutex<Vec<String>>,
    }

    impl ScriptedGateway {
        fn failing(ops: &[GatewayOp]) -> Self {
            Self {
                failures: Mutex::new(ops.iter().copied().collect()),
                ..Self::default()
            }
        }

        fn should_fail(&self, op: GatewayOp) -> bool {
            let mut failures = self.failures.lock().unwrap();
            if failures.front() == Some(&op) {
                failures.pop_front();
                true
            } else {
                false
            }
        }
    }

    fn plan_of(days: u32, prefix: &str) -> PlanDraft {
        PlanDraft::new((1..=days).map(|d| DayEntry::new(d, format!("{} {}", prefix, d))).collect())
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn generate_plan(&self, request: &CourseRequest) -> Result<PlanDraft, GatewayError> {
            if self.should_fail(GatewayOp::GeneratePlan) {
                return Err(GatewayError::Other("quota".to_string()));
            }
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            Ok(plan_of(request.duration_days(), "Draft"))
        }

        async fn refine_plan(
            &self,
            request: &CourseRequest,
            _prior: &PlanDraft,
            feedback: &str,
        ) -> Result<PlanDraft, GatewayError> {
            if self.should_fail(GatewayOp::RefinePlan) {
                return Err(GatewayError::Other("quota".to_string()));
            }
            let n = self.refine_calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.feedback_seen.lock().unwrap().push(feedback.to_string());
            let short = self
                .short_refines
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            let days = match self.refine_days {
                Some(days) => days,
                None if short => request.duration_days() - 1,
                None => request.duration_days(),
            };
            Ok(plan_of(days, &format!("Refined{}", n)))
        }

        async fn generate_content(&self, _plan: &ApprovedPlan, _day: u32) -> Result<ContentDocument, GatewayError> {
            Err(GatewayError::Other("not used".to_string()))
        }
    }

    /// Rejects the first `rejections` drafts, optionally retrying failed steps
    struct CountingReviewer {
        rejections: u32,
        retries: u32,
        malformed_retries: u32,
        seen: Vec<PlanDraft>,
    }

    impl CountingReviewer {
        fn new(rejections: u32) -> Self {
            Self {
                rejections,
                retries: 0,
                malformed_retries: 0,
                seen: Vec::new(),
            }
        }
    }

    impl Reviewer for CountingReviewer {
        fn review(&mut self, draft: &PlanDraft, round: u32) -> Result<ReviewDecision, CurriculumError> {
            self.seen.push(draft.clone());
            if round <= self.rejections {
                Ok(ReviewDecision::reject(format!("feedback {}", round)))
            } else {
                Ok(ReviewDecision::approve())
            }
        }

        fn retry_failed_step(&mut self, _op: GatewayOp, _error: &GatewayError) -> bool {
            if self.retries > 0 {
                self.retries -= 1;
                true
            } else {
                false
            }
        }

        fn retry_malformed_step(&mut self, _op: GatewayOp, _reason: &PlanShapeError) -> bool {
            if self.malformed_retries > 0 {
                self.malformed_retries -= 1;
                true
            } else {
                false
            }
        }
    }

    fn request(days: u32) -> CourseRequest {
        CourseRequest::new("Advance python concepts", "4 years", days).unwrap()
    }

    #[tokio::test]
    async fn test_approve_first_draft() {
        let gateway = ScriptedGateway::default();
        let mut reviewer = CountingReviewer::new(0);

        let outcome = RefinementLoop::default()
            .run(&request(5), &mut reviewer, &gateway)
            .await
            .unwrap();

        assert_eq!(outcome.generate_calls, 1);
        assert_eq!(outcome.refine_calls, 0);
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.plan.days().len(), 5);
        assert_eq!(outcome.history.len(), 1);
    }

    #[tokio::test]
    async fn test_reject_k_times_then_approve() {
        let gateway = ScriptedGateway::default();
        let mut reviewer = CountingReviewer::new(3);

        let outcome = RefinementLoop::default()
            .run(&request(4), &mut reviewer, &gateway)
            .await
            .unwrap();

        assert_eq!(gateway.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.refine_calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.refine_calls, 3);
        assert_eq!(outcome.rounds, 4);
        assert_eq!(outcome.plan.days()[0].title, "Refined3 1");
        assert_eq!(outcome.history.len(), 4);
        assert_eq!(reviewer.seen.len(), 4);
        assert_eq!(
            *gateway.feedback_seen.lock().unwrap(),
            vec!["feedback 1", "feedback 2", "feedback 3"]
        );
    }

    #[tokio::test]
    async fn test_empty_feedback_passed_through() {
        let gateway = ScriptedGateway::default();
        let mut reviewer = FnReviewer(|_: &PlanDraft, round: u32| {
            if round == 1 {
                ReviewDecision {
                    approved: false,
                    feedback: None,
                }
            } else {
                ReviewDecision::approve()
            }
        });

        RefinementLoop::default()
            .run(&request(2), &mut reviewer, &gateway)
            .await
            .unwrap();
        assert_eq!(*gateway.feedback_seen.lock().unwrap(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_refine_with_wrong_day_count_is_malformed() {
        let gateway = ScriptedGateway {
            refine_days: Some(3),
            ..ScriptedGateway::default()
        };
        let mut reviewer = CountingReviewer::new(1);

        let err = RefinementLoop::default()
            .run(&request(4), &mut reviewer, &gateway)
            .await
            .unwrap_err();

        match err {
            CurriculumError::MalformedPlan { op, expected, .. } => {
                assert_eq!(op, GatewayOp::RefinePlan);
                assert_eq!(expected, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The malformed draft never reached the reviewer
        assert_eq!(reviewer.seen.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_refine_asked_again_keeps_feedback() {
        let gateway = ScriptedGateway {
            short_refines: AtomicU32::new(1),
            ..ScriptedGateway::default()
        };
        let mut reviewer = CountingReviewer::new(1);
        reviewer.malformed_retries = 1;

        let outcome = RefinementLoop::default()
            .run(&request(4), &mut reviewer, &gateway)
            .await
            .unwrap();

        // The short draft was discarded, not padded; the next one came from the same inputs
        assert_eq!(*gateway.feedback_seen.lock().unwrap(), vec!["feedback 1", "feedback 1"]);
        assert_eq!(outcome.refine_calls, 1);
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(reviewer.seen.len(), 2);
        assert_eq!(outcome.plan.days().len(), 4);
        assert_eq!(outcome.plan.days()[0].title, "Refined2 1");
    }

    #[tokio::test]
    async fn test_refinement_limit() {
        let gateway = ScriptedGateway::default();
        let mut reviewer = CountingReviewer::new(10);
        let config = RefinementConfig {
            max_refinements: Some(2),
        };

        let err = RefinementLoop::new(config)
            .run(&request(3), &mut reviewer, &gateway)
            .await
            .unwrap_err();

        assert!(matches!(err, CurriculumError::RefinementLimitReached { limit: 2 }));
        assert_eq!(gateway.refine_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gateway_failure_without_retry_propagates() {
        let gateway = ScriptedGateway::failing(&[GatewayOp::GeneratePlan]);
        let mut reviewer = CountingReviewer::new(0);

        let err = RefinementLoop::default()
            .run(&request(3), &mut reviewer, &gateway)
            .await
            .unwrap_err();

        assert_eq!(err.gateway_op(), Some(GatewayOp::GeneratePlan));
        assert!(reviewer.seen.is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_retried_with_same_inputs() {
        let gateway = ScriptedGateway::failing(&[GatewayOp::RefinePlan]);
        let mut reviewer = CountingReviewer::new(1);
        reviewer.retries = 1;

        let outcome = RefinementLoop::default()
            .run(&request(3), &mut reviewer, &gateway)
            .await
            .unwrap();

        assert_eq!(outcome.refine_calls, 1);
        assert_eq!(*gateway.feedback_seen.lock().unwrap(), vec!["feedback 1"]);
    }

    #[tokio::test]
    async fn test_reviewer_cancel_stops_loop() {
        struct Quitter;
        impl Reviewer for Quitter {
            fn review(&mut self, _draft: &PlanDraft, _round: u32) -> Result<ReviewDecision, CurriculumError> {
                Err(CurriculumError::Cancelled)
            }
        }

        let gateway = ScriptedGateway::default();
        let err = RefinementLoop::default()
            .run(&request(2), &mut Quitter, &gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, CurriculumError::Cancelled));
        assert_eq!(gateway.refine_calls.load(Ordering::SeqCst), 0);
    }
}
