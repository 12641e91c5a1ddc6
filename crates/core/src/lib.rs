//! Core normalization logic for Claude Code session logs.
//!
//! This crate provides the `ConversationNormalizer` which converts the
//! line-delimited JSON events of a coding-assistant session (prompts, replies,
//! tool output, TODO list updates) into a bounded, display-ready chat
//! transcript, plus the session scanner and HTML renderer built on top of it.

mod conversation;
mod error;
mod extract;
mod grouping;
mod helpers;
pub mod html;
pub mod pipeline;
mod record;
mod todos;

pub use conversation::{ConversationNormalizer, MessageKind, NormalizedMessage, NormalizerConfig};
pub use error::{Result, ViewerError};
pub use extract::{extract_json_array, ExtractError};
pub use grouping::{group_consecutive_system_messages, COLLAPSE_RUN_LENGTH};
pub use helpers::{
    clean_project_name, escape_json_for_script, limit_line_count, truncate_each_line,
    truncate_text, ELLIPSIS,
};
pub use html::{render_html, write_html_output, RenderOutcome, TodoTheme};
pub use pipeline::{
    discover_session_files, filter_conversations, find_session, load_conversation,
    render_session, scan_sessions, summarize_session, ConversationSummary, UserPrompt,
    ViewerConfig,
};
pub use record::{parse_record, ContentItem, LogRecord, MessageContent, RecordKind};
pub use todos::{format_todos, parse_tasks, TaskPriority, TaskRecord, TaskStatus, NO_TASKS};

/// User text containing any of these is session plumbing, not a prompt.
pub const BOILERPLATE_MARKERS: [&str; 2] = [
    "init is analyzing your codebase",
    "This session is being continued from a previous conversation",
];

/// Tool output containing any of these is treated as a TODO list update.
pub const TODO_MARKERS: [&str; 3] = [
    "Todos have been modified successfully",
    "\"status\":",
    "\"priority\":",
];

/// Shown for a tool result that succeeded without printing anything.
pub const EMPTY_OUTPUT_MESSAGE: &str = "Command executed successfully with no output";

/// Default maximum lines of tool output before head/tail truncation
pub const MAX_SYSTEM_LINES: usize = 6;

/// Default lines kept from the start of long tool output
pub const SYSTEM_HEAD_LINES: usize = 3;

/// Default lines kept from the end of long tool output
pub const SYSTEM_TAIL_LINES: usize = 2;

/// Default maximum characters per line of tool output
pub const MAX_SYSTEM_LINE_CHARS: usize = 200;

/// Default maximum characters per line of undecodable TODO output
pub const MAX_TODO_LINE_CHARS: usize = 300;

/// Prompts kept per session summary (and indexed for search).
pub const SUMMARY_PROMPT_COUNT: usize = 5;

pub const FIRST_PROMPT_CHARS: usize = 120;

pub const NEXT_PROMPT_CHARS: usize = 80;

pub const NO_USER_CONTENT: &str = "No user content found";
