//! Decoded session log lines.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::helpers::lenient;

/// The `type` tag of a log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    User,
    Assistant,
    #[default]
    #[serde(other)]
    Other,
}

/// One line of a session log.
///
/// Fields with an unexpected JSON shape are treated as absent rather than
/// rejecting the whole line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: RecordKind,
    #[serde(default, deserialize_with = "lenient")]
    pub is_meta: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<MessagePayload>,
    #[serde(default)]
    pub tool_use_result: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<MessageContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Items(Vec<ContentItem>),
}

/// A single block of a structured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Text(String),
    /// `content` is `None` when the block carries no usable output at all,
    /// which is distinct from an empty string.
    ToolResult { content: Option<String>, is_error: bool },
    /// `tool_use`, `image`, `thinking` and anything else not shown.
    Other,
}

impl ContentItem {
    pub fn from_value(value: &Value) -> Self {
        match value.get("type").and_then(Value::as_str) {
            Some("text") => ContentItem::Text(
                value
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            Some("tool_result") => ContentItem::ToolResult {
                content: tool_result_text(value.get("content")),
                is_error: value
                    .get("is_error")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            _ => ContentItem::Other,
        }
    }
}

impl<'de> Deserialize<'de> for ContentItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ContentItem::from_value(&value))
    }
}

/// Tool results carry either a plain string or a list of text blocks.
fn tool_result_text(content: Option<&Value>) -> Option<String> {
    match content? {
        Value::String(text) => Some(text.clone()),
        Value::Array(blocks) => Some(
            blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(text) => Some(text.as_str()),
                    _ => block.get("text").and_then(Value::as_str),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

impl LogRecord {
    pub fn timestamp(&self) -> &str {
        self.timestamp.as_deref().unwrap_or_default()
    }

    pub fn content(&self) -> Option<&MessageContent> {
        self.message.as_ref().and_then(|m| m.content.as_ref())
    }

    /// The task list materialized by a TODO tool, when this record carries one.
    pub fn new_todos(&self) -> Option<&Value> {
        self.tool_use_result
            .as_ref()
            .and_then(|result| result.get("newTodos"))
            .filter(|todos| !todos.is_null())
    }

    /// The string payload, or `text` items joined by newlines. Tool results
    /// are not included.
    pub fn text(&self) -> String {
        match self.content() {
            Some(MessageContent::Text(text)) => text.clone(),
            Some(MessageContent::Items(items)) => items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        }
    }
}

/// Decode one log line. Lines that are not JSON objects yield `None`.
pub fn parse_record(line: &str) -> Option<LogRecord> {
    let value: Value = serde_json::from_str(line).ok()?;
    if !value.is_object() {
        return None;
    }
    LogRecord::deserialize(&value).ok()
}
