//! Rendering of API payloads into chat-sized text.

use crate::connectors::discord::Attachment;
use serde_json::{Map, Value};

/// Compact JSON longer than this goes into an attachment instead of the message.
pub const INLINE_LIMIT: usize = 1500;
pub const ATTACHMENT_NAME: &str = "result.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct Formatted {
    pub text: String,
    pub attachment: Option<Attachment>,
}

/// Breaks every backtick apart with zero-width spaces so it cannot close a code fence.
pub fn escape_backticks(text: &str) -> String {
    text.replace('`', "\u{200b}`\u{200b}")
}

pub fn entry_count(value: &Value) -> usize {
    match value {
        Value::Array(entries) => entries.len(),
        Value::Object(entries) => entries.len(),
        _ => 1,
    }
}

pub fn format_response(value: &Value) -> Formatted {
    format_response_within(value, usize::MAX)
}

/// Like [`format_response`], but inline text never exceeds `budget` characters.
///
/// Pretty JSON is preferred, then compact JSON, then the attachment.
pub fn format_response_within(value: &Value, budget: usize) -> Formatted {
    let compact = value.to_string();
    if compact.chars().count() <= INLINE_LIMIT {
        let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| compact.clone());
        for text in [escape_backticks(&pretty), escape_backticks(&compact)] {
            if text.chars().count() <= budget {
                return Formatted {
                    text,
                    attachment: None,
                };
            }
        }
    }
    attached(value)
}

fn attached(value: &Value) -> Formatted {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    Formatted {
        text: format!(
            "{} entries found, content too long to display. Try paginating (&limit=10&offset=5), \
             reducing the page size when paginating, or selecting fewer columns. \
             The full result is attached.",
            entry_count(value)
        ),
        attachment: Some(Attachment {
            filename: ATTACHMENT_NAME.to_string(),
            bytes: pretty.into_bytes(),
        }),
    }
}

/// `key:` padded to the longest key, then the value, one row per line.
pub fn aligned_rows(row: &Map<String, Value>) -> String {
    let width = row.keys().map(|k| k.chars().count() + 1).max().unwrap_or(0);
    row.iter()
        .map(|(key, value)| format!("{:<width$} {}", format!("{key}:"), plain(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A JSON value without the quotes around strings.
pub fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

/// Cuts `text` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
