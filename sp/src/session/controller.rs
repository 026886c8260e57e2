//! Session controller

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::ContentCache;
use crate::domain::{ApprovedPlan, ContentDocument, CourseRequest};
use crate::error::CurriculumError;
use crate::gateway::ModelGateway;
use crate::planning::{RefinementConfig, RefinementLoop, RefinementOutcome, Reviewer};

/// Inputs that end the day-selection phase
const EXIT_WORDS: [&str; 4] = ["-1", "q", "quit", "exit"];

/// A parsed day-selection line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelection {
    Day(u32),
    Exit,
}

impl DaySelection {
    /// Interpret one line of input against a plan of `max_day` days
    pub fn parse(input: &str, max_day: u32) -> Result<Self, CurriculumError> {
        let trimmed = input.trim();
        debug!(%trimmed, %max_day, "DaySelection::parse: called");

        if EXIT_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
            return Ok(Self::Exit);
        }

        match trimmed.parse::<u32>() {
            Ok(day) if (1..=max_day).contains(&day) => Ok(Self::Day(day)),
            _ => Err(CurriculumError::InvalidDaySelection {
                input: trimmed.to_string(),
                max: max_day,
            }),
        }
    }
}

/// Everything the session needs from the person at the keyboard
///
/// Extends [`Reviewer`]: the same front end approves drafts, picks days and
/// decides whether failed model calls are retried.
pub trait SessionIo: Reviewer {
    /// Read one day-selection line; `None` means input is exhausted
    fn read_day(&mut self, plan: &ApprovedPlan) -> Result<Option<String>, CurriculumError>;

    /// The refinement loop finished with an approved plan
    fn plan_approved(&mut self, outcome: &RefinementOutcome) -> Result<(), CurriculumError>;

    /// Present one day's content
    fn show_content(&mut self, day_number: u32, doc: &ContentDocument, cached: bool) -> Result<(), CurriculumError>;

    /// Tell the user about a recoverable error
    fn report_error(&mut self, error: &CurriculumError);
}

/// What a finished session did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub plan_id: Uuid,
    pub refinements: u32,
    /// Days whose content was generated (ascending)
    pub days_generated: Vec<u32>,
    pub cache_hits: u64,
}

/// Owns the state of one planning session
pub struct Session {
    request: CourseRequest,
    gateway: Arc<dyn ModelGateway>,
    refinement: RefinementLoop,
    cache: Option<ContentCache>,
}

impl Session {
    pub fn new(request: CourseRequest, gateway: Arc<dyn ModelGateway>, config: RefinementConfig) -> Self {
        debug!(topic = %request.topic(), days = request.duration_days(), "Session::new: called");
        Self {
            request,
            gateway,
            refinement: RefinementLoop::new(config),
            cache: None,
        }
    }

    pub fn request(&self) -> &CourseRequest {
        &self.request
    }

    /// Content cache of the approved plan, once there is one
    pub fn cache(&self) -> Option<&ContentCache> {
        self.cache.as_ref()
    }

    pub fn plan(&self) -> Option<&ApprovedPlan> {
        self.cache.as_ref().map(ContentCache::plan)
    }

    /// Run the refinement loop, then serve day selections until the user exits
    pub async fn run<I>(&mut self, io: &mut I) -> Result<SessionSummary, CurriculumError>
    where
        I: SessionIo + ?Sized,
    {
        info!(topic = %self.request.topic(), "Session: starting");
        let outcome = self.refinement.run(&self.request, io, self.gateway.as_ref()).await?;
        io.plan_approved(&outcome)?;

        let gateway = self.gateway.as_ref();
        let cache: &ContentCache = self.cache.insert(ContentCache::new(outcome.plan.clone()));
        let max_day = cache.plan().duration_days();

        loop {
            let Some(line) = io.read_day(cache.plan())? else {
                debug!("Session: input exhausted");
                break;
            };

            match DaySelection::parse(&line, max_day) {
                Ok(DaySelection::Exit) => {
                    debug!("Session: exit requested");
                    break;
                }
                Ok(DaySelection::Day(day)) => serve_day(cache, gateway, io, day).await?,
                Err(e) => {
                    debug!(error = %e, "Session: invalid selection");
                    io.report_error(&e);
                }
            }
        }

        let summary = SessionSummary {
            plan_id: outcome.plan.id(),
            refinements: outcome.refine_calls,
            days_generated: cache.cached_days(),
            cache_hits: cache.hits(),
        };
        info!(
            plan_id = %summary.plan_id,
            refinements = summary.refinements,
            days_generated = summary.days_generated.len(),
            cache_hits = summary.cache_hits,
            "Session: finished"
        );
        Ok(summary)
    }
}

/// Serve one valid day, offering retries on gateway failure
///
/// A declined retry returns to the selection prompt; the cache is untouched.
async fn serve_day<I>(
    cache: &ContentCache,
    gateway: &dyn ModelGateway,
    io: &mut I,
    day_number: u32,
) -> Result<(), CurriculumError>
where
    I: SessionIo + ?Sized,
{
    loop {
        match cache.get_or_generate(day_number, gateway).await {
            Ok((doc, cached)) => return io.show_content(day_number, &doc, cached),
            Err(CurriculumError::Gateway { op, source }) => {
                if io.retry_failed_step(op, &source) {
                    info!(%day_number, "serve_day: retrying content generation");
                    continue;
                }
                warn!(%day_number, error = %source, "serve_day: content generation abandoned");
                return Ok(());
            }
            Err(e) if e.is_recoverable() => {
                io.report_error(&e);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }
}
