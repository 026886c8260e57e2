//! End-to-end session tests against a stub gateway

mod common;

use std::sync::Arc;

use common::{DAY_TWO_TITLE, ScriptedIo, StubGateway};
use studyplan::domain::{CourseRequest, ReviewDecision};
use studyplan::error::CurriculumError;
use studyplan::gateway::{GatewayOp, ModelGateway};
use studyplan::planning::RefinementConfig;
use studyplan::session::Session;

fn session(request: CourseRequest, gateway: &Arc<StubGateway>) -> Session {
    let gateway: Arc<dyn ModelGateway> = gateway.clone();
    Session::new(request, gateway, RefinementConfig::default())
}

// =============================================================================
// Happy paths
// =============================================================================

#[tokio::test]
async fn test_python_course_reject_once_then_read_day_two_twice() {
    let gateway = Arc::new(StubGateway::new());
    let request = CourseRequest::new("Advance python concepts", "4 years", 15).unwrap();
    let mut io = ScriptedIo::new(
        vec![
            ReviewDecision::reject("add django and flask for server programming"),
            ReviewDecision::approve(),
        ],
        &["2", "2", "-1"],
    );

    let mut session = session(request, &gateway);
    let summary = session.run(&mut io).await.unwrap();

    // One draft, one refinement carrying the feedback verbatim
    assert_eq!(gateway.generate_calls(), 1);
    assert_eq!(gateway.refine_calls(), 1);
    assert_eq!(gateway.feedback(), vec!["add django and flask for server programming"]);
    assert_eq!(io.reviewed.len(), 2);
    assert!(io.reviewed.iter().all(|draft| draft.len() == 15));
    let revised = io.reviewed[1].outline();
    assert!(revised.contains("Flask"));
    assert!(revised.contains("Django"));

    // Day 2 generated once, served twice
    assert_eq!(gateway.content_calls(), vec![2]);
    assert_eq!(io.shown_days(), vec![2, 2]);
    let (_, first, first_cached) = &io.shown[0];
    let (_, second, second_cached) = &io.shown[1];
    assert_eq!(first.title, DAY_TWO_TITLE);
    assert_eq!(first, second);
    assert!(!first_cached);
    assert!(second_cached);

    assert_eq!(summary.refinements, 1);
    assert_eq!(summary.days_generated, vec![2]);
    assert_eq!(summary.cache_hits, 1);
    assert_eq!(io.approved_refinements, Some(1));
    assert_eq!(session.plan().map(|p| p.id()), Some(summary.plan_id));
}

#[tokio::test]
async fn test_one_day_plan() {
    let gateway = Arc::new(StubGateway::new());
    let request = CourseRequest::new("Git basics", "none", 1).unwrap();
    let mut io = ScriptedIo::new(vec![], &["1", "-1"]);

    let summary = session(request, &gateway).run(&mut io).await.unwrap();

    assert_eq!(gateway.refine_calls(), 0);
    assert_eq!(gateway.content_calls(), vec![1]);
    assert_eq!(summary.days_generated, vec![1]);
    assert_eq!(io.shown_days(), vec![1]);
}

// =============================================================================
// Leaving the session
// =============================================================================

#[tokio::test]
async fn test_sentinel_exits_without_generating() {
    let gateway = Arc::new(StubGateway::new());
    let request = CourseRequest::new("Rust", "1 year", 5).unwrap();
    let mut io = ScriptedIo::new(vec![], &["-1", "3"]);

    let summary = session(request, &gateway).run(&mut io).await.unwrap();

    assert!(gateway.content_calls().is_empty());
    assert!(summary.days_generated.is_empty());
    assert!(io.shown.is_empty());
}

#[tokio::test]
async fn test_end_of_input_exits() {
    let gateway = Arc::new(StubGateway::new());
    let request = CourseRequest::new("Rust", "1 year", 5).unwrap();
    let mut io = ScriptedIo::new(vec![], &["4"]);

    let summary = session(request, &gateway).run(&mut io).await.unwrap();
    assert_eq!(summary.days_generated, vec![4]);
}

// =============================================================================
// Recoverable failures
// =============================================================================

#[tokio::test]
async fn test_invalid_selections_are_reported_and_reprompted() {
    let gateway = Arc::new(StubGateway::new());
    let request = CourseRequest::new("Advance python concepts", "4 years", 15).unwrap();
    let mut io = ScriptedIo::new(vec![], &["0", "16", "two", "3", "-1"]);

    session(request, &gateway).run(&mut io).await.unwrap();

    assert_eq!(io.errors.len(), 3);
    assert!(io.errors.iter().all(|e| e.contains("1 to 15")));
    assert_eq!(gateway.content_calls(), vec![3]);
}

#[tokio::test]
async fn test_failed_content_retried_on_request() {
    let gateway = Arc::new(StubGateway::new());
    gateway.fail_content(4, 1);
    let request = CourseRequest::new("Rust", "1 year", 5).unwrap();
    let mut io = ScriptedIo::new(vec![], &["4", "-1"]).with_retries(&[true]);

    let summary = session(request, &gateway).run(&mut io).await.unwrap();

    assert_eq!(io.retries_offered, vec![GatewayOp::GenerateContent]);
    assert_eq!(gateway.content_calls(), vec![4, 4]);
    assert_eq!(io.shown_days(), vec![4]);
    assert_eq!(summary.days_generated, vec![4]);
}

#[tokio::test]
async fn test_declined_retry_keeps_cache_intact() {
    let gateway = Arc::new(StubGateway::new());
    gateway.fail_content(2, 1);
    let request = CourseRequest::new("Rust", "1 year", 3).unwrap();
    let mut io = ScriptedIo::new(vec![], &["1", "2", "2", "1", "-1"]).with_retries(&[false]);

    let mut session = session(request, &gateway);
    let summary = session.run(&mut io).await.unwrap();

    // Day 2 failed once, then generated on the next selection; day 1 never regenerated
    assert_eq!(gateway.content_calls(), vec![1, 2, 2]);
    assert_eq!(io.shown_days(), vec![1, 2, 1]);
    assert!(io.shown[2].2, "day 1 should come from the cache");
    assert_eq!(summary.days_generated, vec![1, 2]);
    assert_eq!(summary.cache_hits, 1);

    let cache = session.cache().unwrap();
    assert!(cache.contains(1));
    assert!(cache.contains(2));
    assert!(!cache.contains(3));
}

// =============================================================================
// Fatal failures
// =============================================================================

#[tokio::test]
async fn test_refine_with_wrong_length_is_malformed() {
    let gateway = Arc::new(StubGateway::with_refine_days(14));
    let request = CourseRequest::new("Advance python concepts", "4 years", 15).unwrap();
    let mut io = ScriptedIo::new(vec![ReviewDecision::reject("shorter please")], &["1"]);

    let mut session = session(request, &gateway);
    let err = session.run(&mut io).await.unwrap_err();

    assert!(matches!(
        err,
        CurriculumError::MalformedPlan {
            op: GatewayOp::RefinePlan,
            expected: 15,
            ..
        }
    ));
    assert!(session.cache().is_none());
    assert!(gateway.content_calls().is_empty());
    assert_eq!(io.reviewed.len(), 1);
}

#[tokio::test]
async fn test_malformed_refine_can_be_requested_again() {
    let gateway = Arc::new(StubGateway::new());
    gateway.shorten_refines(1);
    let request = CourseRequest::new("Advance python concepts", "4 years", 15).unwrap();
    let mut io = ScriptedIo::new(
        vec![ReviewDecision::reject("add django and flask for server programming")],
        &["-1"],
    )
    .with_retries(&[true]);

    let mut session = session(request, &gateway);
    let summary = session.run(&mut io).await.unwrap();

    assert_eq!(io.retries_offered, vec![GatewayOp::RefinePlan]);
    assert_eq!(
        gateway.feedback(),
        vec!["add django and flask for server programming"; 2]
    );
    assert_eq!(summary.refinements, 1);
    assert_eq!(io.reviewed.len(), 2);
    assert_eq!(io.reviewed[1].len(), 15);
    assert_eq!(session.plan().unwrap().days().len(), 15);
}

#[tokio::test]
async fn test_refinement_cap_stops_session() {
    let gateway = Arc::new(StubGateway::new());
    let request = CourseRequest::new("Rust", "1 year", 3).unwrap();
    let mut io = ScriptedIo::new(
        vec![
            ReviewDecision::reject("more async"),
            ReviewDecision::reject("even more async"),
        ],
        &[],
    );

    let dyn_gateway: Arc<dyn ModelGateway> = gateway.clone();
    let config = RefinementConfig {
        max_refinements: Some(1),
    };
    let err = Session::new(request, dyn_gateway, config).run(&mut io).await.unwrap_err();

    assert!(matches!(err, CurriculumError::RefinementLimitReached { limit: 1 }));
    assert_eq!(gateway.refine_calls(), 1);
}
