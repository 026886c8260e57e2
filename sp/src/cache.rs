//! ContentCache - per-plan memoized lesson content
//!
//! Each day of an approved plan is generated at most once. Concurrent
//! requests for the same day share one in-flight generation; a failed
//! generation leaves the day empty so it can be requested again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::domain::{ApprovedPlan, ContentDocument};
use crate::error::CurriculumError;
use crate::gateway::{GatewayOp, ModelGateway};

/// Lesson content for one approved plan, keyed by day number
pub struct ContentCache {
    plan: ApprovedPlan,
    entries: Mutex<HashMap<u32, Arc<OnceCell<ContentDocument>>>>,
    hits: AtomicU64,
    generations: AtomicU64,
}

impl ContentCache {
    pub fn new(plan: ApprovedPlan) -> Self {
        debug!(plan_id = %plan.id(), "ContentCache::new: called");
        Self {
            plan,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            generations: AtomicU64::new(0),
        }
    }

    /// The plan this cache is bound to
    pub fn plan(&self) -> &ApprovedPlan {
        &self.plan
    }

    /// Whether content for `day_number` has been generated
    pub fn contains(&self, day_number: u32) -> bool {
        self.get(day_number).is_some()
    }

    /// Cached content for `day_number`, without generating
    pub fn get(&self, day_number: u32) -> Option<ContentDocument> {
        let entries = self.entries.lock().ok()?;
        entries.get(&day_number).and_then(|cell| cell.get().cloned())
    }

    /// Days with generated content, ascending
    pub fn cached_days(&self) -> Vec<u32> {
        let mut days: Vec<u32> = match self.entries.lock() {
            Ok(entries) => entries
                .iter()
                .filter(|(_, cell)| cell.initialized())
                .map(|(day, _)| *day)
                .collect(),
            Err(_) => Vec::new(),
        };
        days.sort_unstable();
        days
    }

    pub fn len(&self) -> usize {
        self.cached_days().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requests answered without calling the gateway
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Successful gateway generations
    pub fn generations(&self) -> u64 {
        self.generations.load(Ordering::SeqCst)
    }

    /// Return the content for `day_number`, generating it on first request
    ///
    /// Returns the document and whether it came from the cache.
    pub async fn get_or_generate<G>(
        &self,
        day_number: u32,
        gateway: &G,
    ) -> Result<(ContentDocument, bool), CurriculumError>
    where
        G: ModelGateway + ?Sized,
    {
        debug!(%day_number, "ContentCache::get_or_generate: called");
        if !self.plan.contains_day(day_number) {
            return Err(CurriculumError::InvalidDaySelection {
                input: day_number.to_string(),
                max: self.plan.duration_days(),
            });
        }

        let cell = self.cell(day_number)?;
        let generated = AtomicBool::new(false);
        let plan = &self.plan;
        let flag = &generated;

        let doc = cell
            .get_or_try_init(move || async move {
                info!(%day_number, "ContentCache: generating content");
                let doc = gateway.generate_content(plan, day_number).await?;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, crate::gateway::GatewayError>(doc)
            })
            .await
            .map_err(|source| {
                warn!(%day_number, error = %source, "ContentCache: generation failed");
                CurriculumError::Gateway {
                    op: GatewayOp::GenerateContent,
                    source,
                }
            })?
            .clone();

        let from_cache = !generated.load(Ordering::SeqCst);
        if from_cache {
            self.hits.fetch_add(1, Ordering::SeqCst);
            debug!(%day_number, "ContentCache: hit");
        } else {
            self.generations.fetch_add(1, Ordering::SeqCst);
        }
        Ok((doc, from_cache))
    }

    fn cell(&self, day_number: u32) -> Result<Arc<OnceCell<ContentDocument>>, CurriculumError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CurriculumError::Interaction("content cache lock poisoned".to_string()))?;
        Ok(entries.entry(day_number).or_default().clone())
    }
}
