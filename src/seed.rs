//! Demo inbox and default prompt templates.

use chrono::{Duration, Utc};
use tracing::info;

use crate::error::DatabaseError;
use crate::models::{NewEmail, NewPrompt, PromptKind};
use crate::store::Database;

/// The three prompts the pipeline looks up by name.
pub fn default_prompts() -> Vec<NewPrompt> {
    vec![
        NewPrompt {
            name: PromptKind::Categorization.name().into(),
            template: "Categorize the following email into one of these categories: \
                       Important, Newsletter, Spam, To-Do. Return only the category name.\
                       \n\nEmail Body:\n{email_body}"
                .into(),
            description: Some("Determines the category of an email.".into()),
        },
        NewPrompt {
            name: PromptKind::ActionExtraction.name().into(),
            template: "Extract action items from the following email. Return a JSON list \
                       of objects with 'task' and 'deadline' fields.\
                       \n\nEmail Body:\n{email_body}"
                .into(),
            description: Some("Extracts tasks and deadlines.".into()),
        },
        NewPrompt {
            name: PromptKind::AutoReply.name().into(),
            template: "Draft a polite reply to this email. If it's a meeting request, ask \
                       for an agenda. Keep it professional.\
                       \n\nEmail Body:\n{email_body}"
                .into(),
            description: Some("Generates a draft reply.".into()),
        },
    ]
}

/// Insert any default prompt whose name is not stored yet. Existing
/// prompts, edited or not, are left alone. Returns how many were added.
pub async fn create_default_prompts(db: &dyn Database) -> Result<usize, DatabaseError> {
    let mut created = 0;
    for prompt in default_prompts() {
        if db.get_prompt_by_name(&prompt.name).await?.is_none() {
            db.upsert_prompt(&prompt).await?;
            created += 1;
        }
    }
    if created > 0 {
        info!(created, "Default prompts created");
    }
    Ok(created)
}

/// Five sample emails spread over the last two days.
pub fn mock_emails() -> Vec<NewEmail> {
    let now = Utc::now();
    vec![
        NewEmail::new(
            "boss@oceanai.com",
            "Urgent: Q4 Report Due",
            "Hi, I need the Q4 report by EOD tomorrow. Please prioritize this.",
        )
        .with_timestamp(now - Duration::hours(2)),
        NewEmail::new(
            "newsletter@techweekly.com",
            "Tech Weekly: AI Revolution",
            "Top stories this week: 1. New AI models released. 2. Python 4.0 rumors.",
        )
        .with_timestamp(now - Duration::days(1)),
        NewEmail::new(
            "hr@oceanai.com",
            "Open Enrollment",
            "It's that time of year again! Please review your benefits package.",
        )
        .with_timestamp(now - Duration::days(2)),
        NewEmail::new(
            "client@shipping.com",
            "Meeting Request: Project Update",
            "Can we meet next Tuesday at 10 AM to discuss the new vessel tracking system?",
        )
        .with_timestamp(now - Duration::hours(5)),
        NewEmail::new(
            "spam@offers.com",
            "You won a cruise!",
            "Click here to claim your free ticket to the Bahamas.",
        )
        .with_timestamp(now - Duration::hours(1)),
    ]
}

/// Load the sample inbox unless the store already holds emails.
pub async fn create_mock_emails(db: &dyn Database) -> Result<usize, DatabaseError> {
    if db.count_emails().await? > 0 {
        info!("Inbox not empty, skipping mock emails");
        return Ok(0);
    }

    let emails = mock_emails();
    for email in &emails {
        db.insert_email(email).await?;
    }
    info!(count = emails.len(), "Mock emails loaded");
    Ok(emails.len())
}

/// What `reset_demo` removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSummary {
    pub drafts_deleted: usize,
    pub emails_deleted: usize,
}

/// Empty the inbox and drafts, then make sure the default prompts exist.
pub async fn reset_demo(db: &dyn Database) -> Result<ResetSummary, DatabaseError> {
    let drafts_deleted = db.delete_all_drafts().await?;
    let emails_deleted = db.delete_all_emails().await?;
    create_default_prompts(db).await?;

    info!(drafts_deleted, emails_deleted, "Demo state reset");
    Ok(ResetSummary {
        drafts_deleted,
        emails_deleted,
    })
}
