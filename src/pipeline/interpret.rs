//! Turning raw model text into typed results.
//!
//! Model output is noisy: chatty prefixes, markdown fences, degraded
//! gateway payloads. Every function here is total and never fails; the
//! worst case is `Uncategorized` or an empty action list.

use tracing::debug;

use crate::llm::DEGRADED_PREFIX;
use crate::models::{ActionItem, Category};
use crate::pipeline::types::CategoryPolicy;

/// Placeholder in prompt templates that receives the email body.
pub const BODY_PLACEHOLDER: &str = "{email_body}";

/// Labels checked by containment matching, in priority order.
const CONTAINMENT_ORDER: [Category; 4] = [
    Category::Important,
    Category::Newsletter,
    Category::Spam,
    Category::ToDo,
];

/// Substitute the email body into a prompt template.
///
/// A template without the placeholder gets the body appended.
pub fn render_template(template: &str, body: &str) -> String {
    if template.contains(BODY_PLACEHOLDER) {
        template.replace(BODY_PLACEHOLDER, body)
    } else {
        format!("{template}\n\nEmail Body:\n{body}")
    }
}

/// True when `text` is the gateway's "no provider answered" payload.
pub fn is_degraded(text: &str) -> bool {
    text.trim_start().starts_with(DEGRADED_PREFIX)
}

/// Map model text to a category under `policy`.
pub fn interpret_category(raw: &str, policy: CategoryPolicy) -> Category {
    if is_degraded(raw) {
        debug!("Degraded model output, leaving email uncategorized");
        return Category::Uncategorized;
    }

    let text = raw.trim();
    match policy {
        CategoryPolicy::Strict => text.parse().unwrap_or_default(),
        CategoryPolicy::ContainmentMatch => CONTAINMENT_ORDER
            .iter()
            .find(|category| text.contains(category.label()))
            .copied()
            .unwrap_or_default(),
    }
}

/// Parse action items from the span between the first `[` and the last `]`.
///
/// Anything short of a fully valid list yields an empty list.
pub fn interpret_action_items(raw: &str) -> Vec<ActionItem> {
    if is_degraded(raw) {
        return Vec::new();
    }

    let Some(span) = extract_json_array(raw) else {
        debug!("No bracketed list in model output");
        return Vec::new();
    };

    match serde_json::from_str::<Vec<ActionItem>>(span) {
        Ok(items) => items,
        Err(e) => {
            debug!(error = %e, "Action item list did not parse");
            Vec::new()
        }
    }
}

/// The draft body is the model text verbatim.
pub fn interpret_draft(raw: &str) -> String {
    raw.to_string()
}

/// Inclusive span from the first `[` to the last `]`, if well ordered.
fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}
