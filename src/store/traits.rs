//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::models::{
    Category, Draft, Email, NewDraft, NewEmail, NewPrompt, Prompt, TriageCommit, TriageUpdate,
};

/// Backend-agnostic database trait covering emails, prompts, and drafts.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Emails ──────────────────────────────────────────────────────

    /// Insert a new email with empty action items. Returns the stored row.
    async fn insert_email(&self, email: &NewEmail) -> Result<Email, DatabaseError>;

    /// Get an email by ID.
    async fn get_email(&self, id: &str) -> Result<Option<Email>, DatabaseError>;

    /// List emails, oldest first, paginated.
    async fn list_emails(&self, skip: usize, limit: usize) -> Result<Vec<Email>, DatabaseError>;

    /// All emails with the given category, oldest first.
    async fn list_emails_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<Email>, DatabaseError>;

    /// Total number of stored emails.
    async fn count_emails(&self) -> Result<usize, DatabaseError>;

    /// Delete every email. Returns the number removed.
    async fn delete_all_emails(&self) -> Result<usize, DatabaseError>;

    /// Write one pipeline pass for one email atomically.
    ///
    /// Category and action items are updated when present; a draft is
    /// inserted only when present and the email has no draft yet. Either
    /// everything commits or nothing does.
    async fn commit_triage(
        &self,
        email_id: &str,
        update: &TriageUpdate,
    ) -> Result<TriageCommit, DatabaseError>;

    // ── Prompts ─────────────────────────────────────────────────────

    /// Look up a prompt by its unique name.
    async fn get_prompt_by_name(&self, name: &str) -> Result<Option<Prompt>, DatabaseError>;

    /// All prompts, by name.
    async fn list_prompts(&self) -> Result<Vec<Prompt>, DatabaseError>;

    /// Insert a prompt, or replace template/description of the one with the same name.
    async fn upsert_prompt(&self, prompt: &NewPrompt) -> Result<Prompt, DatabaseError>;

    // ── Drafts ──────────────────────────────────────────────────────

    /// Insert a draft. Returns the stored row.
    async fn insert_draft(&self, draft: &NewDraft) -> Result<Draft, DatabaseError>;

    /// All drafts, oldest first.
    async fn list_drafts(&self) -> Result<Vec<Draft>, DatabaseError>;

    /// The draft attached to an email, if any.
    async fn get_draft_for_email(&self, email_id: &str) -> Result<Option<Draft>, DatabaseError>;

    /// Delete every draft. Returns the number removed.
    async fn delete_all_drafts(&self) -> Result<usize, DatabaseError>;
}
