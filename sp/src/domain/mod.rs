//! Domain types for curriculum planning
//!
//! - [`CourseRequest`] - what the learner asked for (immutable)
//! - [`PlanDraft`] / [`DayEntry`] - a proposed day-by-day outline
//! - [`ReviewDecision`] - the human verdict on a draft
//! - [`ApprovedPlan`] - the terminal, immutable outline content is keyed against
//! - [`ContentDocument`] - detailed lesson material for one day

mod content;
mod course;
mod plan;

pub use content::{ContentDocument, ExternalResources, Resource};
pub use course::CourseRequest;
pub use plan::{ApprovedPlan, DayChange, DayEntry, PlanDraft, PlanShapeError, ReviewDecision};
