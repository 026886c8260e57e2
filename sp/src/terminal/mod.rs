//! Interactive terminal front end
//!
//! Implements [`SessionIo`] on top of rustyline. Ctrl-D while reviewing a
//! draft cancels the session; at the day prompt it simply exits.

use std::path::PathBuf;

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::domain::{ApprovedPlan, ContentDocument, CourseRequest, PlanDraft, PlanShapeError, ReviewDecision};
use crate::error::CurriculumError;
use crate::export::Exporter;
use crate::gateway::{GatewayError, GatewayOp};
use crate::planning::{RefinementOutcome, Reviewer};
use crate::session::SessionIo;

pub mod render;

/// How a line typed at the review prompt is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAnswer {
    Approve,
    /// Rejected; `None` means the feedback still has to be asked for
    Reject(Option<String>),
}

/// Interpret the answer to "Approve this plan?"
pub fn interpret_review_answer(answer: &str) -> ReviewAnswer {
    let trimmed = answer.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "y" | "yes" | "approve" => ReviewAnswer::Approve,
        "n" | "no" => ReviewAnswer::Reject(None),
        _ => ReviewAnswer::Reject(Some(trimmed.to_string())),
    }
}

/// Terminal-backed session IO
pub struct TerminalIo {
    editor: DefaultEditor,
    json: bool,
    save_dir: Option<PathBuf>,
    exporter: Option<Exporter>,
    last_draft: Option<PlanDraft>,
}

impl TerminalIo {
    pub fn new(json: bool, save_dir: Option<PathBuf>) -> eyre::Result<Self> {
        debug!(%json, ?save_dir, "TerminalIo::new: called");
        let editor = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        Ok(Self {
            editor,
            json,
            save_dir,
            exporter: None,
            last_draft: None,
        })
    }

    /// Read one line; `Ok(None)` on end of input, `Cancelled` on Ctrl-C
    fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>, CurriculumError> {
        match self.editor.readline(&format!("{} ", prompt.bright_green())) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                Err(CurriculumError::Cancelled)
            }
            Err(err) => Err(CurriculumError::Interaction(err.to_string())),
        }
    }

    /// Ask for whatever part of the course request was not given on the command line
    pub fn prompt_request(
        &mut self,
        topic: Option<String>,
        experience: Option<String>,
        days: Option<u32>,
        max_days: u32,
    ) -> eyre::Result<CourseRequest> {
        debug!(?topic, ?experience, ?days, "TerminalIo::prompt_request: called");
        println!("{}", "studyplan".bright_cyan().bold());

        let topic = match topic {
            Some(t) => t,
            None => self.ask_required("What do you want to learn?")?,
        };
        let experience = match experience {
            Some(e) => e,
            None => self
                .prompt_line("Your experience with it (e.g. \"4 years\", \"none\"):")?
                .ok_or(CurriculumError::Cancelled)?,
        };

        let mut days = days;
        loop {
            let duration = match days.take() {
                Some(d) => d,
                None => {
                    let answer = self.ask_required(&format!("How many days (1-{})?", max_days))?;
                    match answer.trim().parse::<u32>() {
                        Ok(d) => d,
                        Err(_) => {
                            println!("{} '{}' is not a number of days", "?".yellow(), answer.trim());
                            continue;
                        }
                    }
                }
            };
            match CourseRequest::with_max_days(topic.clone(), experience.clone(), duration, max_days) {
                Ok(request) => return Ok(request),
                Err(CurriculumError::InvalidRequest(msg)) if !msg.contains("topic") => {
                    println!("{} {}", "?".yellow(), msg);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Yes/no question defaulting to yes; end of input or Ctrl-C means no
    fn confirm(&mut self, prompt: &str) -> bool {
        match self.prompt_line(prompt) {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes"),
            _ => false,
        }
    }

    fn ask_required(&mut self, prompt: &str) -> Result<String, CurriculumError> {
        loop {
            let line = self.prompt_line(prompt)?.ok_or(CurriculumError::Cancelled)?;
            if !line.trim().is_empty() {
                return Ok(line.trim().to_string());
            }
        }
    }
}

impl Reviewer for TerminalIo {
    fn review(&mut self, draft: &PlanDraft, round: u32) -> Result<ReviewDecision, CurriculumError> {
        debug!(%round, days = draft.len(), "TerminalIo::review: called");
        println!();
        println!("{}", format!("Proposed plan (round {})", round).bright_cyan().bold());
        println!("{}", render::render_draft(draft));

        if let Some(previous) = self.last_draft.replace(draft.clone()) {
            println!();
            println!("{}", "Changes since the previous draft:".dimmed());
            println!("{}", render::render_changes(&previous.diff(draft)));
        }
        println!();

        let answer = self
            .prompt_line("Approve this plan? [Y/n, or type what to change]")?
            .ok_or(CurriculumError::Cancelled)?;

        match interpret_review_answer(&answer) {
            ReviewAnswer::Approve => Ok(ReviewDecision::approve()),
            ReviewAnswer::Reject(Some(feedback)) => Ok(ReviewDecision::reject(feedback)),
            ReviewAnswer::Reject(None) => {
                let feedback = self
                    .prompt_line("What should change? (leave empty for a fresh take)")?
                    .ok_or(CurriculumError::Cancelled)?;
                Ok(ReviewDecision::reject(feedback.trim()))
            }
        }
    }

    fn retry_failed_step(&mut self, op: GatewayOp, error: &GatewayError) -> bool {
        println!("{} {} failed: {}", "✗".red(), op, error);
        self.confirm("Retry? [Y/n]")
    }

    fn retry_malformed_step(&mut self, op: GatewayOp, reason: &PlanShapeError) -> bool {
        println!("{} {} returned an unusable plan: {}", "✗".red(), op, reason);
        self.confirm("Ask for a new draft? [Y/n]")
    }
}

impl SessionIo for TerminalIo {
    fn read_day(&mut self, plan: &ApprovedPlan) -> Result<Option<String>, CurriculumError> {
        let prompt = format!("Select a day (1-{}, -1 to exit):", plan.duration_days());
        match self.prompt_line(&prompt) {
            Err(CurriculumError::Cancelled) => Ok(None),
            other => other,
        }
    }

    fn plan_approved(&mut self, outcome: &RefinementOutcome) -> Result<(), CurriculumError> {
        println!();
        println!(
            "{} Plan approved after {} refinement(s)",
            "✓".green(),
            outcome.refine_calls
        );
        println!("{}", outcome.plan.outline());
        println!();

        if let Some(ref dir) = self.save_dir {
            let exporter = Exporter::for_plan(dir, &outcome.plan);
            match exporter.write_plan(&outcome.plan, outcome.refine_calls) {
                Ok(path) => println!("{} Saved plan to {}", "✓".green(), path.display().to_string().cyan()),
                Err(e) => {
                    warn!(error = %e, "plan_approved: export failed");
                    println!("{} Could not save plan: {}", "!".yellow(), e);
                }
            }
            self.exporter = Some(exporter);
        }
        Ok(())
    }

    fn show_content(&mut self, day_number: u32, doc: &ContentDocument, cached: bool) -> Result<(), CurriculumError> {
        println!();
        if self.json {
            let json = serde_json::to_string_pretty(doc).map_err(|e| CurriculumError::Interaction(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", render::render_content(day_number, doc));
        }
        if cached {
            println!("{}", "(from cache)".dimmed());
        }
        println!();

        if !cached {
            if let Some(ref exporter) = self.exporter {
                if let Err(e) = exporter.write_content(day_number, doc) {
                    warn!(error = %e, %day_number, "show_content: export failed");
                    println!("{} Could not save day {}: {}", "!".yellow(), day_number, e);
                }
            }
        }
        Ok(())
    }

    fn report_error(&mut self, error: &CurriculumError) {
        println!("{} {}", "?".yellow(), error);
    }
}
