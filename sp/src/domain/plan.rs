//! Plan drafts, review decisions and approved plans

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::CourseRequest;

/// One day of a plan outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    #[serde(alias = "day", alias = "day_number")]
    pub day_number: u32,
    pub title: String,
}

impl DayEntry {
    pub fn new(day_number: u32, title: impl Into<String>) -> Self {
        Self {
            day_number,
            title: title.into(),
        }
    }
}

/// Why a draft does not fit the requested duration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanShapeError {
    #[error("plan has {found} days")]
    WrongLength { found: usize },

    #[error("entry {position} is numbered day {found}, expected day {position}")]
    OutOfSequence { position: usize, found: u32 },
}

/// A proposed day-by-day outline
///
/// Drafts are superseded, never mutated: each refinement produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub days: Vec<DayEntry>,
}

impl PlanDraft {
    pub fn new(days: Vec<DayEntry>) -> Self {
        Self { days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Look up the entry for a day number
    pub fn entry(&self, day_number: u32) -> Option<&DayEntry> {
        self.days.iter().find(|d| d.day_number == day_number)
    }

    /// Check that the draft has exactly `expected` entries numbered 1..=expected in order
    pub fn check_shape(&self, expected: u32) -> Result<(), PlanShapeError> {
        debug!(%expected, found = self.days.len(), "PlanDraft::check_shape: called");
        if self.days.len() != expected as usize {
            return Err(PlanShapeError::WrongLength { found: self.days.len() });
        }
        for (idx, entry) in self.days.iter().enumerate() {
            let position = idx + 1;
            if entry.day_number as usize != position {
                debug!(%position, found = entry.day_number, "PlanDraft::check_shape: out of sequence");
                return Err(PlanShapeError::OutOfSequence {
                    position,
                    found: entry.day_number,
                });
            }
        }
        Ok(())
    }

    /// "Day N: Title" lines, one per entry
    pub fn outline(&self) -> String {
        self.days
            .iter()
            .map(|d| format!("Day {}: {}", d.day_number, d.title))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Compare this draft with a newer one, day by day
    pub fn diff(&self, newer: &PlanDraft) -> Vec<DayChange> {
        let before: BTreeMap<u32, &DayEntry> = self.days.iter().map(|d| (d.day_number, d)).collect();
        let after: BTreeMap<u32, &DayEntry> = newer.days.iter().map(|d| (d.day_number, d)).collect();

        let mut day_numbers: Vec<u32> = before.keys().chain(after.keys()).copied().collect();
        day_numbers.sort_unstable();
        day_numbers.dedup();

        let changes: Vec<DayChange> = day_numbers
            .into_iter()
            .filter_map(|day| match (before.get(&day), after.get(&day)) {
                (Some(old), Some(new)) if old.title != new.title => Some(DayChange::Retitled {
                    day_number: day,
                    before: old.title.clone(),
                    after: new.title.clone(),
                }),
                (Some(old), None) => Some(DayChange::Removed((*old).clone())),
                (None, Some(new)) => Some(DayChange::Added((*new).clone())),
                _ => None,
            })
            .collect();

        debug!(change_count = changes.len(), "PlanDraft::diff: computed");
        changes
    }
}

/// A single difference between two drafts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayChange {
    Retitled {
        day_number: u32,
        before: String,
        after: String,
    },
    Added(DayEntry),
    Removed(DayEntry),
}

/// The human verdict on a draft
///
/// Feedback only matters on rejection and is passed to the refiner verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDecision {
    pub approved: bool,
    pub feedback: Option<String>,
}

impl ReviewDecision {
    pub fn approve() -> Self {
        Self {
            approved: true,
            feedback: None,
        }
    }

    pub fn reject(feedback: impl Into<String>) -> Self {
        Self {
            approved: false,
            feedback: Some(feedback.into()),
        }
    }

    /// Feedback text, empty when none was given
    pub fn feedback_text(&self) -> &str {
        self.feedback.as_deref().unwrap_or("")
    }
}

/// A draft accepted by the reviewer
///
/// Immutable; content documents are keyed against its day numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedPlan {
    id: Uuid,
    request: CourseRequest,
    days: Vec<DayEntry>,
}

impl ApprovedPlan {
    /// Promote a draft, re-checking it against the request's duration
    pub fn new(request: CourseRequest, draft: PlanDraft) -> Result<Self, PlanShapeError> {
        draft.check_shape(request.duration_days())?;
        let id = Uuid::now_v7();
        debug!(%id, days = draft.len(), "ApprovedPlan::new: approved");
        Ok(Self {
            id,
            request,
            days: draft.days,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &CourseRequest {
        &self.request
    }

    pub fn days(&self) -> &[DayEntry] {
        &self.days
    }

    pub fn duration_days(&self) -> u32 {
        self.request.duration_days()
    }

    pub fn contains_day(&self, day_number: u32) -> bool {
        (1..=self.duration_days()).contains(&day_number)
    }

    pub fn entry(&self, day_number: u32) -> Option<&DayEntry> {
        self.days.iter().find(|d| d.day_number == day_number)
    }

    /// "Day N: Title" lines, one per entry
    pub fn outline(&self) -> String {
        PlanDraft::new(self.days.clone()).outline()
    }
}
