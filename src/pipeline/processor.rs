//! Email processor: categorize, extract actions, draft a reply.
//!
//! Flow per email:
//! 1. "categorization" prompt → category
//! 2. "action_extraction" prompt → action items
//! 3. "auto_reply" prompt → draft, only for Important / To-Do
//! 4. One `commit_triage` transaction writes whatever the steps produced
//!
//! Model calls happen before the transaction opens, so a slow provider
//! never holds a write lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::llm::{CompletionRequest, ModelGateway};
use crate::models::{Category, Email, NewDraft, PromptKind, TriageCommit, TriageUpdate};
use crate::pipeline::interpret::{
    interpret_action_items, interpret_category, interpret_draft, render_template,
};
use crate::pipeline::types::{BatchReport, CategoryPolicy, ProcessedEmail, TriageState};
use crate::store::Database;

/// Sampling for step 1; the reply is a single label.
const CATEGORIZE_TEMPERATURE: f32 = 0.0;
const CATEGORIZE_MAX_TOKENS: u32 = 32;

/// Sampling for step 2.
const EXTRACT_TEMPERATURE: f32 = 0.1;
const EXTRACT_MAX_TOKENS: u32 = 512;

/// Sampling for step 3.
const DRAFT_TEMPERATURE: f32 = 0.7;
const DRAFT_MAX_TOKENS: u32 = 1024;

/// Processor settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessorConfig {
    pub category_policy: CategoryPolicy,
}

/// Runs emails through the triage pipeline.
pub struct EmailProcessor {
    db: Arc<dyn Database>,
    gateway: Arc<ModelGateway>,
    config: ProcessorConfig,
    /// Keeps batch runs from overlapping.
    batch_lock: Mutex<()>,
}

impl EmailProcessor {
    pub fn new(db: Arc<dyn Database>, gateway: Arc<ModelGateway>, config: ProcessorConfig) -> Self {
        Self {
            db,
            gateway,
            config,
            batch_lock: Mutex::new(()),
        }
    }

    /// Process every email still in `Uncategorized`, oldest first.
    ///
    /// Each email commits on its own; a failure is logged and the batch
    /// moves on. Only failing to list the inbox aborts the run.
    pub async fn process_all(&self) -> Result<BatchReport, PipelineError> {
        let _guard = self.batch_lock.lock().await;

        let pending = self
            .db
            .list_emails_by_category(Category::Uncategorized)
            .await?;
        let count = pending.len();
        info!(count, "Processing pending emails");

        let mut report = BatchReport {
            processed: count,
            failed: 0,
        };
        for email in &pending {
            if let Err(e) = self.process_email(email).await {
                error!(id = %email.id, error = %e, "Failed to process email in batch");
                report.failed += 1;
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed,
            "Batch processing complete"
        );
        Ok(report)
    }

    /// Look up an email and process it regardless of its current category.
    pub async fn process_email_by_id(&self, id: &str) -> Result<ProcessedEmail, PipelineError> {
        let email = self
            .db
            .get_email(id)
            .await?
            .ok_or_else(|| PipelineError::EmailNotFound(id.to_string()))?;
        self.process_email(&email).await
    }

    /// Run all three steps for one email and commit them together.
    pub async fn process_email(&self, email: &Email) -> Result<ProcessedEmail, PipelineError> {
        debug!(id = %email.id, subject = %email.subject, "Processing email");

        let mut update = TriageUpdate::default();
        let mut category = email.category;

        // Step 1: categorize
        if let Some(template) = self.template(PromptKind::Categorization).await? {
            let request = CompletionRequest::new(render_template(&template, &email.body))
                .with_temperature(CATEGORIZE_TEMPERATURE)
                .with_max_tokens(CATEGORIZE_MAX_TOKENS);
            let raw = self.gateway.complete(request).await;
            category = interpret_category(&raw, self.config.category_policy);
            update.category = Some(category);
        }

        // Step 2: extract action items
        if let Some(template) = self.template(PromptKind::ActionExtraction).await? {
            let request = CompletionRequest::new(render_template(&template, &email.body))
                .with_temperature(EXTRACT_TEMPERATURE)
                .with_max_tokens(EXTRACT_MAX_TOKENS);
            let raw = self.gateway.complete(request).await;
            update.action_items = Some(interpret_action_items(&raw));
        }

        // Step 3: draft a reply
        if category.triggers_draft() {
            if let Some(template) = self.template(PromptKind::AutoReply).await? {
                let request = CompletionRequest::new(render_template(&template, &email.body))
                    .with_temperature(DRAFT_TEMPERATURE)
                    .with_max_tokens(DRAFT_MAX_TOKENS);
                match self.gateway.try_complete(request).await {
                    Ok(raw) => {
                        update.draft = Some(NewDraft::reply_to(email, interpret_draft(&raw)));
                    }
                    Err(e) => {
                        warn!(id = %email.id, error = %e, "No model answered, skipping draft");
                    }
                }
            }
        }

        let commit = self.db.commit_triage(&email.id, &update).await?;
        let state = final_state(&update, commit, category);

        info!(
            id = %email.id,
            category = %category,
            action_items = update.action_items.as_ref().map_or(0, Vec::len),
            draft_created = commit.draft_created,
            state = %state,
            "Email processed"
        );

        Ok(ProcessedEmail {
            email_id: email.id.clone(),
            category,
            action_items: update.action_items,
            draft_created: commit.draft_created,
            state,
        })
    }

    /// Template for a prompt kind, or `None` (logged) when it is not configured.
    async fn template(&self, kind: PromptKind) -> Result<Option<String>, PipelineError> {
        match self.db.get_prompt_by_name(kind.name()).await? {
            Some(prompt) => Ok(Some(prompt.template)),
            None => {
                warn!(prompt = %kind, "Prompt not configured, skipping step");
                Ok(None)
            }
        }
    }
}

fn final_state(update: &TriageUpdate, commit: TriageCommit, category: Category) -> TriageState {
    if commit.draft_created {
        TriageState::DraftPending
    } else if update.draft.is_some() {
        // Draft generated but one already existed.
        TriageState::Done
    } else if update.action_items.is_none() {
        if update.category.is_some() {
            TriageState::Categorized
        } else {
            TriageState::Uncategorized
        }
    } else if category.triggers_draft() {
        TriageState::ActionsExtracted
    } else {
        TriageState::Done
    }
}
