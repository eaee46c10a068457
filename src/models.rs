//! Domain records: emails, prompts, drafts, and the labels they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Category ────────────────────────────────────────────────────────

/// The fixed set of labels an email can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    Important,
    Newsletter,
    Spam,
    #[serde(rename = "To-Do")]
    ToDo,
    #[default]
    Uncategorized,
    Project,
    Personal,
}

impl Category {
    /// Every label, in declaration order.
    pub const ALL: [Category; 7] = [
        Category::Important,
        Category::Newsletter,
        Category::Spam,
        Category::ToDo,
        Category::Uncategorized,
        Category::Project,
        Category::Personal,
    ];

    /// The label as stored and shown to the model.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Important => "Important",
            Self::Newsletter => "Newsletter",
            Self::Spam => "Spam",
            Self::ToDo => "To-Do",
            Self::Uncategorized => "Uncategorized",
            Self::Project => "Project",
            Self::Personal => "Personal",
        }
    }

    /// Categories that cause an automatic reply draft.
    pub fn triggers_draft(&self) -> bool {
        matches!(self, Self::Important | Self::ToDo)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

// ── Action items ────────────────────────────────────────────────────

/// A task extracted from an email body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub task: String,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Serialize action items to the text form stored on an email.
pub fn serialize_action_items(items: &[ActionItem]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

// ── Email ───────────────────────────────────────────────────────────

/// A stored email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub id: String,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    /// JSON list of `ActionItem`, always valid (`[]` when empty).
    pub action_items: String,
    pub is_read: bool,
}

impl Email {
    /// Decode `action_items`. Stored text is always valid, so failure yields empty.
    pub fn action_item_list(&self) -> Vec<ActionItem> {
        serde_json::from_str(&self.action_items).unwrap_or_default()
    }
}

/// Fields for inserting a new email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmail {
    pub sender: String,
    pub subject: String,
    pub body: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub category: Category,
}

impl NewEmail {
    pub fn new(sender: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            body: body.into(),
            timestamp: Utc::now(),
            category: Category::Uncategorized,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ── Prompt ──────────────────────────────────────────────────────────

/// The prompt records the pipeline looks up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Categorization,
    ActionExtraction,
    AutoReply,
}

impl PromptKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Categorization => "categorization",
            Self::ActionExtraction => "action_extraction",
            Self::AutoReply => "auto_reply",
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub template: String,
    pub description: Option<String>,
}

/// Fields for creating or replacing a prompt (keyed by `name`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPrompt {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ── Draft ───────────────────────────────────────────────────────────

/// Status assigned to freshly created drafts.
pub const DRAFT_STATUS: &str = "draft";

/// A stored reply draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub email_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDraft {
    #[serde(default)]
    pub email_id: Option<String>,
    pub subject: String,
    pub body: String,
    #[serde(default = "default_draft_status")]
    pub status: String,
}

fn default_draft_status() -> String {
    DRAFT_STATUS.to_string()
}

impl NewDraft {
    /// A reply draft for `email`: subject `Re: <subject>`, status `draft`.
    pub fn reply_to(email: &Email, body: impl Into<String>) -> Self {
        Self {
            email_id: Some(email.id.clone()),
            subject: format!("Re: {}", email.subject),
            body: body.into(),
            status: default_draft_status(),
        }
    }
}

// ── Triage update ───────────────────────────────────────────────────

/// Everything one pipeline pass wants to write for a single email.
///
/// `None` fields belong to skipped steps and leave stored values unchanged.
#[derive(Debug, Clone, Default)]
pub struct TriageUpdate {
    pub category: Option<Category>,
    pub action_items: Option<Vec<ActionItem>>,
    pub draft: Option<NewDraft>,
}

/// What `commit_triage` actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriageCommit {
    /// A new draft row was inserted (false if skipped or one already existed).
    pub draft_created: bool,
}
