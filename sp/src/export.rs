//! Export of approved plans and generated content
//!
//! Writes `{stamp}-{slug}.md` for the plan and `{stamp}-{slug}/day-NN.json`
//! for each generated day. Files are only ever written, never read back.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use eyre::{Context, Result};
use tracing::{debug, info};

use crate::domain::{ApprovedPlan, ContentDocument};

const MAX_SLUG_LEN: usize = 60;

/// Writes export files for one approved plan
#[derive(Debug, Clone)]
pub struct Exporter {
    root: PathBuf,
    base_name: String,
}

impl Exporter {
    /// Exporter rooted at `root`, named after the plan's topic and the current time
    pub fn for_plan(root: impl Into<PathBuf>, plan: &ApprovedPlan) -> Self {
        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        Self::with_stamp(root, plan, &stamp)
    }

    pub fn with_stamp(root: impl Into<PathBuf>, plan: &ApprovedPlan, stamp: &str) -> Self {
        let root = root.into();
        let base_name = format!("{}-{}", stamp, slugify(plan.request().topic()));
        debug!(?root, %base_name, "Exporter::with_stamp: called");
        Self { root, base_name }
    }

    pub fn plan_path(&self) -> PathBuf {
        self.root.join(format!("{}.md", self.base_name))
    }

    pub fn content_path(&self, day_number: u32) -> PathBuf {
        self.root.join(&self.base_name).join(format!("day-{:02}.json", day_number))
    }

    /// Write the plan as Markdown
    pub fn write_plan(&self, plan: &ApprovedPlan, refinements: u32) -> Result<PathBuf> {
        let path = self.plan_path();
        ensure_dir(&self.root)?;
        fs::write(&path, plan_markdown(plan, refinements))
            .with_context(|| format!("Failed to write plan to {}", path.display()))?;
        info!(path = %path.display(), "Exporter: wrote plan");
        Ok(path)
    }

    /// Write one day's content as pretty JSON
    pub fn write_content(&self, day_number: u32, doc: &ContentDocument) -> Result<PathBuf> {
        let path = self.content_path(day_number);
        if let Some(dir) = path.parent() {
            ensure_dir(dir)?;
        }
        let json = serde_json::to_string_pretty(doc).context("Failed to serialize content")?;
        fs::write(&path, json).with_context(|| format!("Failed to write content to {}", path.display()))?;
        info!(path = %path.display(), %day_number, "Exporter: wrote content");
        Ok(path)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))
}

/// Lowercase, dash-separated file-name form of a topic
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() { "plan".to_string() } else { slug.to_string() }
}

/// Markdown rendering of an approved plan
pub fn plan_markdown(plan: &ApprovedPlan, refinements: u32) -> String {
    let request = plan.request();
    let mut out = format!("# {}\n\n", request.topic());
    out.push_str(&format!("- Experience: {}\n", request.experience_level()));
    out.push_str(&format!("- Duration: {} days\n", request.duration_days()));
    out.push_str(&format!("- Refinements: {}\n", refinements));
    out.push_str(&format!("- Plan id: {}\n\n", plan.id()));
    out.push_str("## Schedule\n\n");
    for day in plan.days() {
        out.push_str(&format!("{}. {}\n", day.day_number, day.title));
    }
    out
}
