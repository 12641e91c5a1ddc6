//! Conversation normalizer turning session log records into chat messages.

use serde::{Deserialize, Serialize};

use crate::extract::extract_json_array;
use crate::grouping::group_consecutive_system_messages;
use crate::helpers::{limit_line_count, truncate_each_line};
use crate::record::{parse_record, ContentItem, LogRecord, MessageContent, RecordKind};
use crate::todos::format_todos;
use crate::{
    BOILERPLATE_MARKERS, EMPTY_OUTPUT_MESSAGE, MAX_SYSTEM_LINES, MAX_SYSTEM_LINE_CHARS,
    MAX_TODO_LINE_CHARS, SYSTEM_HEAD_LINES, SYSTEM_TAIL_LINES, TODO_MARKERS,
};

/// Who a transcript message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
    System,
    Todo,
}

/// A single display-ready message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: String,
}

impl NormalizedMessage {
    pub fn new(
        kind: MessageKind,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn user(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new(MessageKind::User, content, timestamp)
    }

    pub fn assistant(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new(MessageKind::Assistant, content, timestamp)
    }

    pub fn system(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new(MessageKind::System, content, timestamp)
    }

    pub fn todo(content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new(MessageKind::Todo, content, timestamp)
    }

    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }
}

/// Truncation limits applied to tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerConfig {
    /// Tool output with more lines than this is cut to head + tail.
    pub max_system_lines: usize,
    pub system_head_lines: usize,
    pub system_tail_lines: usize,
    pub max_system_line_chars: usize,
    /// Per-line limit for TODO output that could not be decoded.
    pub max_todo_line_chars: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_system_lines: MAX_SYSTEM_LINES,
            system_head_lines: SYSTEM_HEAD_LINES,
            system_tail_lines: SYSTEM_TAIL_LINES,
            max_system_line_chars: MAX_SYSTEM_LINE_CHARS,
            max_todo_line_chars: MAX_TODO_LINE_CHARS,
        }
    }
}

/// Converts decoded log records into [`NormalizedMessage`]s.
///
/// Holds configuration only, so a single normalizer can be shared freely
/// across threads and sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationNormalizer {
    config: NormalizerConfig,
}

fn is_boilerplate(text: &str) -> bool {
    BOILERPLATE_MARKERS.iter().any(|marker| text.contains(marker))
}

fn is_todo_output(content: &str) -> bool {
    TODO_MARKERS.iter().any(|marker| content.contains(marker))
}

impl ConversationNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Classify one record into zero or more messages.
    pub fn classify(&self, record: &LogRecord) -> Vec<NormalizedMessage> {
        if record.is_meta {
            return Vec::new();
        }

        match record.kind {
            RecordKind::User => self.classify_user(record),
            RecordKind::Assistant => self.classify_assistant(record),
            RecordKind::Other => Vec::new(),
        }
    }

    fn classify_user(&self, record: &LogRecord) -> Vec<NormalizedMessage> {
        let timestamp = record.timestamp();
        let items = match record.content() {
            Some(MessageContent::Text(text)) => {
                if text.trim().is_empty() || is_boilerplate(text) {
                    return Vec::new();
                }
                return vec![NormalizedMessage::user(text.as_str(), timestamp)];
            }
            Some(MessageContent::Items(items)) => items,
            None => return Vec::new(),
        };

        let mut messages = Vec::new();
        let mut text_parts: Vec<&str> = Vec::new();

        for item in items {
            match item {
                ContentItem::Text(text) => {
                    if !is_boilerplate(text) {
                        text_parts.push(text);
                    }
                }
                ContentItem::ToolResult { content: Some(content), is_error } => {
                    if content.is_empty() {
                        if !is_error {
                            messages
                                .push(NormalizedMessage::system(EMPTY_OUTPUT_MESSAGE, timestamp));
                        }
                    } else {
                        messages.push(self.classify_tool_output(record, content));
                    }
                }
                ContentItem::ToolResult { content: None, .. } => {}
                ContentItem::Other => {}
            }
        }

        let user_text = text_parts.join("\n");
        let user_text = user_text.trim();
        if !user_text.is_empty() {
            messages.push(NormalizedMessage::user(user_text, timestamp));
        }
        messages
    }

    /// Tool output is either a TODO list update or generic command output.
    fn classify_tool_output(&self, record: &LogRecord, content: &str) -> NormalizedMessage {
        let timestamp = record.timestamp();

        if is_todo_output(content) {
            if let Some(formatted) = recover_todos(record, content) {
                return NormalizedMessage::todo(formatted, timestamp);
            }
            tracing::debug!(timestamp, "task list could not be recovered from tool output");
            return NormalizedMessage::system(
                truncate_each_line(content, self.config.max_todo_line_chars),
                timestamp,
            );
        }

        let limited = limit_line_count(
            content,
            self.config.max_system_lines,
            self.config.system_head_lines,
            self.config.system_tail_lines,
        );
        NormalizedMessage::system(
            truncate_each_line(&limited, self.config.max_system_line_chars),
            timestamp,
        )
    }

    /// Only `text` items of a structured reply are shown.
    fn classify_assistant(&self, record: &LogRecord) -> Vec<NormalizedMessage> {
        let Some(MessageContent::Items(items)) = record.content() else {
            return Vec::new();
        };
        let text = items
            .iter()
            .filter_map(|item| match item {
                ContentItem::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            return Vec::new();
        }
        vec![NormalizedMessage::assistant(text, record.timestamp())]
    }

    /// Decode every line, classify the records in order, then collapse
    /// runs of system output. Lines that fail to decode are skipped.
    pub fn normalize_lines<'a, I>(&self, lines: I) -> Vec<NormalizedMessage>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut messages = Vec::new();
        let mut dropped = 0usize;

        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(line) {
                Some(record) => messages.extend(self.classify(&record)),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::trace!(dropped, "skipped undecodable log lines");
        }

        group_consecutive_system_messages(messages)
    }

    /// Normalize a whole JSONL document.
    pub fn normalize_jsonl(&self, text: &str) -> Vec<NormalizedMessage> {
        self.normalize_lines(text.lines())
    }
}

/// The record's materialized task list wins; otherwise the array is
/// recovered from the output text itself.
fn recover_todos(record: &LogRecord, content: &str) -> Option<String> {
    if let Some(todos) = record.new_todos() {
        return Some(format_todos(todos));
    }
    extract_json_array(content).ok().map(|todos| format_todos(&todos))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTINUATION: &str =
        "This session is being continued from a previous conversation that ran out of context.";

    fn classify(line: &str) -> Vec<NormalizedMessage> {
        let record = parse_record(line).expect("test line must decode");
        ConversationNormalizer::default().classify(&record)
    }

    fn user_items(items: &str) -> String {
        format!(
            r#"{{"type":"user","timestamp":"2024-05-01T10:00:00Z","message":{{"role":"user","content":{items}}}}}"#
        )
    }

    fn tool_result(content: &str) -> String {
        let escaped = serde_json::to_string(content).unwrap();
        user_items(&format!(r#"[{{"type":"tool_result","tool_use_id":"t","content":{escaped}}}]"#))
    }

    #[test]
    fn test_meta_records_are_discarded() {
        let messages = classify(r#"{"type":"user","isMeta":true,"message":{"content":"hi"}}"#);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_user_string() {
        let messages = classify(&user_items(r#""Refactor the parser""#));
        assert_eq!(
            messages,
            vec![NormalizedMessage::user("Refactor the parser", "2024-05-01T10:00:00Z")]
        );
    }

    #[test]
    fn test_user_string_boilerplate() {
        let payload = serde_json::to_string(CONTINUATION).unwrap();
        assert!(classify(&user_items(&payload)).is_empty());

        let payload = serde_json::to_string("/init is analyzing your codebase…").unwrap();
        assert!(classify(&user_items(&payload)).is_empty());

        assert!(classify(&user_items(r#""   ""#)).is_empty());
    }

    #[test]
    fn test_user_text_items_joined_after_tool_results() {
        let messages = classify(&user_items(
            r#"[{"type":"text","text":"first"},{"type":"tool_result","content":"ok"},{"type":"text","text":"second  "}]"#,
        ));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, MessageKind::System);
        assert_eq!(messages[0].content, "ok");
        assert_eq!(messages[1].kind, MessageKind::User);
        assert_eq!(messages[1].content, "first\nsecond");
    }

    #[test]
    fn test_boilerplate_text_item_skipped() {
        let items = format!(
            r#"[{{"type":"text","text":{}}},{{"type":"text","text":"real question"}}]"#,
            serde_json::to_string(CONTINUATION).unwrap()
        );
        let messages = classify(&user_items(&items));
        assert_eq!(messages, vec![NormalizedMessage::user("real question", "2024-05-01T10:00:00Z")]);
    }

    #[test]
    fn test_empty_tool_result() {
        let messages = classify(&user_items(r#"[{"type":"tool_result","content":""}]"#));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, EMPTY_OUTPUT_MESSAGE);

        let messages = classify(&user_items(r#"[{"type":"tool_result","content":"","is_error":true}]"#));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_tool_result_without_content_is_dropped() {
        let messages = classify(&user_items(r#"[{"type":"tool_result","tool_use_id":"x"}]"#));
        assert!(messages.is_empty());

        let messages = classify(&user_items(r#"[{"type":"tool_result","tool_use_id":"x","content":null}]"#));
        assert!(messages.is_empty());

        let messages = classify(&user_items(
            r#"[{"type":"tool_result","tool_use_id":"x"},{"type":"text","text":"still here"}]"#,
        ));
        assert_eq!(messages, vec![NormalizedMessage::user("still here", "2024-05-01T10:00:00Z")]);
    }

    #[test]
    fn test_todo_from_tool_result_text() {
        let messages = classify(&tool_result(
            r#"[{"status":"pending","priority":"high","content":"Test task"}]"#,
        ));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Todo);
        assert!(messages[0].content.starts_with("📋 **TODO List** (1 tasks)"));
        assert!(messages[0].content.contains("⬜ ⭐ Test task"));
    }

    #[test]
    fn test_todo_from_side_channel() {
        let line = r#"{"type":"user","timestamp":"t","message":{"content":[{"type":"tool_result","content":"Todos have been modified successfully. Ensure that you continue to use the todo list."}]},"toolUseResult":{"oldTodos":[],"newTodos":[{"status":"completed","priority":"low","content":"Done thing"}]}}"#;
        let messages = classify(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Todo);
        assert!(messages[0].content.contains("✅ ○ Done thing"));
    }

    #[test]
    fn test_todo_recovery_failure_falls_back_to_system() {
        let long = format!("\"status\": {}", "y".repeat(400));
        let messages = classify(&tool_result(&format!("[todo.status\n{long}")));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::System);
        let lines: Vec<&str> = messages[0].content.split('\n').collect();
        assert_eq!(lines[0], "[todo.status");
        assert_eq!(lines[1].chars().count(), 300);
        assert!(lines[1].ends_with("..."));
    }

    #[test]
    fn test_array_without_todo_markers_stays_system() {
        let messages = classify(&tool_result(r#"[{"name":"a"},{"name":"b"}]"#));
        assert_eq!(messages[0].kind, MessageKind::System);
    }

    #[test]
    fn test_generic_output_truncation() {
        let output = (1..=10).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let messages = classify(&tool_result(&output));
        assert_eq!(messages[0].content, "line 1\nline 2\nline 3\n...\nline 9\nline 10");

        let messages = classify(&tool_result(&"z".repeat(500)));
        assert_eq!(messages[0].content.chars().count(), 200);
        assert!(messages[0].content.ends_with("..."));
    }

    #[test]
    fn test_assistant_text_items() {
        let messages = classify(
            r#"{"type":"assistant","timestamp":"t","message":{"content":[{"type":"text","text":"Sure."},{"type":"tool_use","name":"Bash"},{"type":"text","text":"Done."}]}}"#,
        );
        assert_eq!(messages, vec![NormalizedMessage::assistant("Sure.\nDone.", "t")]);

        let messages = classify(
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Bash"}]}}"#,
        );
        assert!(messages.is_empty());
    }

    #[test]
    fn test_assistant_string_payload_ignored() {
        let messages = classify(r#"{"type":"assistant","timestamp":"t","message":{"content":"plain reply"}}"#);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_other_types_ignored() {
        assert!(classify(r#"{"type":"summary","summary":"x"}"#).is_empty());
        assert!(classify(r#"{"type":"system","content":"x"}"#).is_empty());
    }

    #[test]
    fn test_normalize_lines_end_to_end() {
        let continuation = user_items(&serde_json::to_string(CONTINUATION).unwrap());
        let question = user_items(r#""What changed?""#);
        let todo = tool_result(r#"[{"status":"pending","priority":"high","content":"Test task"}]"#);
        let outputs: Vec<String> = (0..4).map(|i| tool_result(&format!("out {i}"))).collect();
        let answer = r#"{"type":"assistant","timestamp":"t2","message":{"content":[{"type":"text","text":"Here."}]}}"#;

        let mut lines: Vec<&str> = vec![continuation.as_str(), "not json", question.as_str(), todo.as_str()];
        lines.extend(outputs.iter().map(String::as_str));
        lines.push(answer);

        let messages = ConversationNormalizer::default().normalize_lines(lines);
        let kinds: Vec<MessageKind> = messages.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::User,
                MessageKind::Todo,
                MessageKind::System,
                MessageKind::System,
                MessageKind::System,
                MessageKind::Assistant,
            ]
        );
        assert_eq!(messages[0].content, "What changed?");
        assert!(messages[1].content.contains("Test task"));
        assert_eq!(messages[2].content, "out 0");
        assert_eq!(messages[3].content, "...");
        assert_eq!(messages[4].content, "out 3");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let doc = [
            user_items(r#""hi""#),
            tool_result("a"),
            tool_result("b"),
            tool_result("c"),
        ]
        .join("\n");
        let normalizer = ConversationNormalizer::default();
        assert_eq!(normalizer.normalize_jsonl(&doc), normalizer.normalize_jsonl(&doc));
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&NormalizedMessage::todo("x", "t")).unwrap();
        assert_eq!(json, r#"{"type":"todo","content":"x","timestamp":"t"}"#);
    }
}
