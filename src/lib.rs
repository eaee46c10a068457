//! Inbox Triage: categorize emails, extract action items, draft replies.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod seed;
pub mod store;
