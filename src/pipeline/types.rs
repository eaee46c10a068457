//! Shared types for the triage pipeline.

use serde::{Deserialize, Serialize};

use crate::models::{ActionItem, Category};

// ── Category policy ─────────────────────────────────────────────────

/// How raw model text becomes a `Category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPolicy {
    /// Trimmed text must name a known label; anything else is Uncategorized.
    /// Suited to prompts that say "return only the category name".
    Strict,
    /// First of Important, Newsletter, Spam, To-Do contained in the text wins.
    #[default]
    ContainmentMatch,
}

impl std::fmt::Display for CategoryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::ContainmentMatch => write!(f, "containment"),
        }
    }
}

impl std::str::FromStr for CategoryPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "containment" | "containment_match" => Ok(Self::ContainmentMatch),
            other => Err(format!("Unknown category policy: {other}")),
        }
    }
}

// ── Triage state ────────────────────────────────────────────────────

/// Where an email ended up after one pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageState {
    /// Neither categorization nor extraction ran (prompts missing).
    Uncategorized,
    /// Category written, action extraction skipped.
    Categorized,
    /// Action items written; a draft was warranted but none was produced.
    ActionsExtracted,
    /// A new reply draft is waiting for the user.
    DraftPending,
    /// Finished: no draft warranted, or one already existed.
    Done,
}

impl TriageState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Uncategorized => "uncategorized",
            Self::Categorized => "categorized",
            Self::ActionsExtracted => "actions_extracted",
            Self::DraftPending => "draft_pending",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TriageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Results ─────────────────────────────────────────────────────────

/// Outcome of processing one email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedEmail {
    pub email_id: String,
    /// Category after the pass (unchanged when categorization was skipped).
    pub category: Category,
    /// `None` when action extraction was skipped.
    pub action_items: Option<Vec<ActionItem>>,
    pub draft_created: bool,
    pub state: TriageState,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Eligible emails the batch attempted.
    pub processed: usize,
    /// Of those, how many failed to commit.
    pub failed: usize,
}
