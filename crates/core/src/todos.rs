//! Task ("TODO") list decoding and formatting.

use serde::Deserialize;
use serde_json::Value;

use crate::helpers::lenient;

/// Returned by [`format_todos`] when there is nothing to list.
pub const NO_TASKS: &str = "No tasks found";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn glyph(self) -> &'static str {
        match self {
            TaskStatus::Pending => "⬜",
            TaskStatus::InProgress => "🔄",
            TaskStatus::Completed => "✅",
            TaskStatus::Cancelled => "❌",
            TaskStatus::Unknown => "❓",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskPriority {
    pub fn glyph(self) -> &'static str {
        match self {
            TaskPriority::High => "⭐",
            TaskPriority::Medium => "◆",
            TaskPriority::Low => "○",
            TaskPriority::Unknown => "⚪",
        }
    }
}

/// One item of a task list.
///
/// Every field falls back to its default when missing or of the wrong JSON
/// type, so decoding a task never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub priority: TaskPriority,
    #[serde(default, deserialize_with = "lenient")]
    pub content: String,
}

impl TaskRecord {
    pub fn from_value(value: &Value) -> Self {
        TaskRecord::deserialize(value).unwrap_or_default()
    }
}

/// Decode every element of a JSON array as a task. Non-arrays yield nothing.
pub fn parse_tasks(value: &Value) -> Vec<TaskRecord> {
    value
        .as_array()
        .map(|items| items.iter().map(TaskRecord::from_value).collect())
        .unwrap_or_default()
}

/// Render a task list as a header line followed by one line per task.
///
/// Accepts any JSON value: `null`, non-arrays and empty arrays all produce
/// [`NO_TASKS`]. Tasks keep their input order.
pub fn format_todos(value: &Value) -> String {
    let tasks = parse_tasks(value);
    if tasks.is_empty() {
        return NO_TASKS.to_string();
    }

    let mut formatted = format!("📋 **TODO List** ({} tasks)\n\n", tasks.len());
    for task in &tasks {
        formatted.push_str(&format!(
            "{} {} {}\n",
            task.status.glyph(),
            task.priority.glyph(),
            task.content
        ));
    }
    formatted
}
