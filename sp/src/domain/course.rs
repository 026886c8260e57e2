//! CourseRequest - the learner's topic, experience and duration

use serde::Serialize;
use tracing::debug;

use crate::error::CurriculumError;

/// What the learner asked for
///
/// Built once per session and never mutated. Fields are private so every
/// instance has passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    topic: String,
    experience_level: String,
    duration_days: u32,
}

impl CourseRequest {
    /// Upper bound on plan length when no configuration overrides it
    pub const DEFAULT_MAX_DAYS: u32 = 60;

    /// Create a request bounded by [`Self::DEFAULT_MAX_DAYS`]
    pub fn new(
        topic: impl Into<String>,
        experience_level: impl Into<String>,
        duration_days: u32,
    ) -> Result<Self, CurriculumError> {
        Self::with_max_days(topic, experience_level, duration_days, Self::DEFAULT_MAX_DAYS)
    }

    /// Create a request with an explicit upper bound on the number of days
    pub fn with_max_days(
        topic: impl Into<String>,
        experience_level: impl Into<String>,
        duration_days: u32,
        max_days: u32,
    ) -> Result<Self, CurriculumError> {
        let topic = topic.into().trim().to_string();
        let experience_level = experience_level.into().trim().to_string();
        debug!(%topic, %experience_level, %duration_days, %max_days, "CourseRequest::with_max_days: called");

        if topic.is_empty() {
            return Err(CurriculumError::InvalidRequest("topic must not be empty".to_string()));
        }
        if duration_days == 0 || duration_days > max_days {
            return Err(CurriculumError::InvalidRequest(format!(
                "duration must be between 1 and {} days, got {}",
                max_days, duration_days
            )));
        }

        Ok(Self {
            topic,
            experience_level,
            duration_days,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn experience_level(&self) -> &str {
        &self.experience_level
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }
}
