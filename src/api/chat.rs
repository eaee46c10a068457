//! Prompt construction for the inbox chat endpoint.

use crate::models::Email;

/// How many emails the inbox overview lists.
pub const OVERVIEW_EMAILS: usize = 5;

const CHAT_SYSTEM_PROMPT: &str = "You are an intelligent Email Productivity Agent. \
     Help the user manage their inbox. Use the provided context to answer questions. \
     If asked to draft a reply, suggest one based on the context.";

/// Context block describing a single email.
pub fn email_context(email: &Email) -> String {
    format!(
        "Email Context:\nSender: {}\nSubject: {}\nBody: {}\nCategory: {}\nAction Items: {}\n\n",
        email.sender, email.subject, email.body, email.category, email.action_items
    )
}

/// Context block listing a few inbox emails.
pub fn inbox_context(emails: &[Email]) -> String {
    let lines: Vec<String> = emails
        .iter()
        .take(OVERVIEW_EMAILS)
        .map(|e| format!("- [{}] {} (from {})", e.id, e.subject, e.sender))
        .collect();
    format!("Recent Emails:\n{}\n\n", lines.join("\n"))
}

/// Full prompt sent to the gateway.
pub fn build_chat_prompt(context: &str, query: &str) -> String {
    format!("{CHAT_SYSTEM_PROMPT}\n\n{context}User Query: {query}\n\nAgent Response:")
}
