//! Error types for curriculum sessions

use thiserror::Error;

use crate::domain::PlanShapeError;
use crate::gateway::{GatewayError, GatewayOp};

/// Errors surfaced by the refinement loop, the content cache and the session
#[derive(Debug, Error)]
pub enum CurriculumError {
    #[error("Invalid course request: {0}")]
    InvalidRequest(String),

    #[error("Model gateway failed during {op}: {source}")]
    Gateway {
        op: GatewayOp,
        #[source]
        source: GatewayError,
    },

    #[error("Malformed plan from {op} (expected {expected} days): {reason}")]
    MalformedPlan {
        op: GatewayOp,
        expected: u32,
        #[source]
        reason: PlanShapeError,
    },

    #[error("Invalid day selection '{input}': choose a day from 1 to {max}, or -1 to exit")]
    InvalidDaySelection { input: String, max: u32 },

    #[error("No approval after {limit} refinements")]
    RefinementLimitReached { limit: u32 },

    #[error("Session cancelled")]
    Cancelled,

    #[error("Terminal interaction failed: {0}")]
    Interaction(String),
}

impl CurriculumError {
    /// Check if the session can carry on after reporting this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CurriculumError::InvalidDaySelection { .. })
    }

    /// Get the gateway operation involved, if any
    pub fn gateway_op(&self) -> Option<GatewayOp> {
        match self {
            CurriculumError::Gateway { op, .. } | CurriculumError::MalformedPlan { op, .. } => Some(*op),
            _ => None,
        }
    }
}
