//! Node.js bindings for the Claude chat viewer.
//!
//! Exposes the normalization pipeline to JavaScript so a Node front end can
//! reuse the same transcript rules as the CLI.

use napi::bindgen_prelude::*;
use napi_derive::napi;

use claude_chat_viewer_core::{
    ConversationNormalizer, MessageKind, NormalizedMessage as CoreMessage, NormalizerConfig,
    TodoTheme,
};

/// A message in the normalized transcript.
#[napi(object)]
pub struct ConversationMessage {
    /// One of `user`, `assistant`, `system` or `todo`.
    #[napi(js_name = "type")]
    pub kind: String,
    pub content: String,
    pub timestamp: String,
}

fn kind_name(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::User => "user",
        MessageKind::Assistant => "assistant",
        MessageKind::System => "system",
        MessageKind::Todo => "todo",
    }
}

fn parse_kind(name: &str) -> Result<MessageKind> {
    match name {
        "user" => Ok(MessageKind::User),
        "assistant" => Ok(MessageKind::Assistant),
        "system" => Ok(MessageKind::System),
        "todo" => Ok(MessageKind::Todo),
        other => Err(Error::from_reason(format!("Unknown message type: {other}"))),
    }
}

impl From<CoreMessage> for ConversationMessage {
    fn from(msg: CoreMessage) -> Self {
        Self {
            kind: kind_name(msg.kind).to_string(),
            content: msg.content,
            timestamp: msg.timestamp,
        }
    }
}

impl TryFrom<ConversationMessage> for CoreMessage {
    type Error = Error;

    fn try_from(msg: ConversationMessage) -> Result<Self> {
        Ok(CoreMessage::new(parse_kind(&msg.kind)?, msg.content, msg.timestamp))
    }
}

/// Truncation limits. All fields are optional; unspecified values use core defaults.
#[napi(object)]
pub struct NormalizerOptions {
    /// Tool output with more lines than this is cut to head + tail.
    pub max_system_lines: Option<u32>,
    pub system_head_lines: Option<u32>,
    pub system_tail_lines: Option<u32>,
    /// Maximum characters per line of tool output.
    pub max_system_line_chars: Option<u32>,
    /// Maximum characters per line of TODO output that could not be decoded.
    pub max_todo_line_chars: Option<u32>,
}

fn normalizer_config(options: Option<NormalizerOptions>) -> NormalizerConfig {
    let defaults = NormalizerConfig::default();
    let Some(opts) = options else {
        return defaults;
    };
    let limit = |value: Option<u32>, default: usize| value.map_or(default, |v| v as usize);

    NormalizerConfig {
        max_system_lines: limit(opts.max_system_lines, defaults.max_system_lines),
        system_head_lines: limit(opts.system_head_lines, defaults.system_head_lines),
        system_tail_lines: limit(opts.system_tail_lines, defaults.system_tail_lines),
        max_system_line_chars: limit(opts.max_system_line_chars, defaults.max_system_line_chars),
        max_todo_line_chars: limit(opts.max_todo_line_chars, defaults.max_todo_line_chars),
    }
}

/// Normalize the contents of a session `.jsonl` log into transcript messages.
///
/// @param jsonl - The raw log text, one JSON record per line.
/// @param options - Optional truncation limits.
#[napi]
pub fn normalize_conversation(
    jsonl: String,
    options: Option<NormalizerOptions>,
) -> Vec<ConversationMessage> {
    ConversationNormalizer::new(normalizer_config(options))
        .normalize_jsonl(&jsonl)
        .into_iter()
        .map(Into::into)
        .collect()
}

/// Collapse runs of three or more consecutive system messages.
#[napi]
pub fn group_consecutive_system_messages(
    messages: Vec<ConversationMessage>,
) -> Result<Vec<ConversationMessage>> {
    let core: Vec<CoreMessage> = messages
        .into_iter()
        .map(CoreMessage::try_from)
        .collect::<Result<_>>()?;
    Ok(claude_chat_viewer_core::group_consecutive_system_messages(core)
        .into_iter()
        .map(Into::into)
        .collect())
}

/// Recover the first JSON array embedded in `text`.
///
/// Returns the array re-serialized as JSON, or null when none can be recovered.
#[napi]
pub fn extract_json_array(text: String) -> Option<String> {
    claude_chat_viewer_core::extract_json_array(&text)
        .ok()
        .map(|value| value.to_string())
}

/// Format a JSON task list as a TODO summary.
///
/// @param json - JSON text of the task array. Invalid JSON formats as an empty list.
#[napi]
pub fn format_todos(json: String) -> String {
    let value: serde_json::Value = serde_json::from_str(&json).unwrap_or_default();
    claude_chat_viewer_core::format_todos(&value)
}

/// Render transcript messages as a standalone HTML page.
///
/// @param theme - TODO background: grid (default), lines, graph, dots or clean.
#[napi]
pub fn render_html(messages: Vec<ConversationMessage>, theme: Option<String>) -> Result<String> {
    let theme = match theme {
        Some(name) => name
            .parse::<TodoTheme>()
            .map_err(|e| Error::from_reason(e.to_string()))?,
        None => TodoTheme::default(),
    };
    let core: Vec<CoreMessage> = messages
        .into_iter()
        .map(CoreMessage::try_from)
        .collect::<Result<_>>()?;
    claude_chat_viewer_core::render_html(&core, theme)
        .map_err(|e| Error::from_reason(e.to_string()))
}
