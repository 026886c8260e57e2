//! Planning - the draft/review/refine loop
//!
//! A plan is drafted once, then alternates between human review and
//! model refinement until the reviewer approves it.

mod refinement;

pub use refinement::{FnReviewer, RefinementConfig, RefinementLoop, RefinementOutcome, Reviewer};
