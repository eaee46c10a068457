//! Email triage pipeline.
//!
//! Every pending email flows through:
//! 1. `interpret`: prompt rendering and model-output interpretation
//! 2. `EmailProcessor::process_email()`: categorize → extract actions →
//!    conditional draft, committed in one transaction
//! 3. `EmailProcessor::process_all()`: batch driver over `Uncategorized` emails

pub mod interpret;
pub mod processor;
pub mod types;

pub use processor::{EmailProcessor, ProcessorConfig};
pub use types::{BatchReport, CategoryPolicy, ProcessedEmail, TriageState};
