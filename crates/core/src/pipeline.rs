//! Session discovery, summaries, and the log-to-HTML pipeline.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::conversation::{ConversationNormalizer, NormalizedMessage, NormalizerConfig};
use crate::error::{Result, ViewerError};
use crate::helpers::{clean_project_name, truncate_text};
use crate::html::{write_html_output, RenderOutcome, TodoTheme};
use crate::record::{parse_record, RecordKind};
use crate::{
    BOILERPLATE_MARKERS, FIRST_PROMPT_CHARS, NEXT_PROMPT_CHARS, NO_USER_CONTENT,
    SUMMARY_PROMPT_COUNT,
};

/// Where sessions are read from and how transcripts are written.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Root holding one directory per project, each with `<session>.jsonl` logs.
    pub projects_dir: PathBuf,
    pub output_dir: PathBuf,
    pub todo_theme: TodoTheme,
    pub normalizer: NormalizerConfig,
}

impl ViewerConfig {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            projects_dir: projects_dir.into(),
            output_dir: PathBuf::from("."),
            todo_theme: TodoTheme::default(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

/// A prompt typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPrompt {
    pub content: String,
    pub timestamp: String,
}

/// Overview of one session log, used for listing and searching.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub file_path: PathBuf,
    pub project_name: String,
    /// File stem of the log.
    pub session_id: String,
    /// The `sessionId` recorded inside the log, falling back to the file stem.
    pub actual_session_id: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub message_count: usize,
    pub user_prompt_count: usize,
    pub first_prompt: String,
    pub full_first_prompt: String,
    pub search_text: String,
    pub user_prompts: Vec<UserPrompt>,
}

fn parse_timestamp(timestamp: Option<&str>) -> Option<DateTime<FixedOffset>> {
    timestamp.and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
}

/// Format an RFC 3339 timestamp in local time; unparseable input is returned as-is.
pub fn format_timestamp(timestamp: &str, format: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.with_timezone(&Local).format(format).to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// Elapsed time between two timestamps as `"2h 5m"` or `"42m"`.
pub fn format_duration(start: Option<&str>, end: Option<&str>) -> String {
    let minutes = match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => (end - start).num_minutes().max(0),
        _ => 0,
    };
    let hours = minutes / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

impl ConversationSummary {
    fn started_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.start_time.as_deref())
    }

    pub fn duration(&self) -> String {
        format_duration(self.start_time.as_deref(), self.end_time.as_deref())
    }

    /// One-line entry for a session listing.
    pub fn list_line(&self) -> String {
        let start = self
            .start_time
            .as_deref()
            .map(|ts| format_timestamp(ts, "%d/%m %H:%M"))
            .unwrap_or_default();
        let end = self
            .end_time
            .as_deref()
            .map(|ts| format_timestamp(ts, "%d/%m %H:%M"))
            .unwrap_or_default();
        format!(
            "{} - {} [{:>4}] {}\n  💬 {}",
            start, end, self.message_count, self.project_name, self.first_prompt
        )
    }

    /// Multi-line preview shown before rendering a session.
    pub fn describe(&self) -> String {
        let format_full = |ts: &Option<String>| {
            ts.as_deref()
                .map(|ts| format_timestamp(ts, "%d/%m/%Y %H:%M"))
                .unwrap_or_else(|| "unknown".to_string())
        };

        let mut summary = format!("📂 Project: {}\n", self.project_name);
        summary.push_str(&format!("📅 Start: {}\n", format_full(&self.start_time)));
        summary.push_str(&format!("⏰ End: {}\n", format_full(&self.end_time)));
        summary.push_str(&format!("⏱️  Duration: {}\n", self.duration()));
        summary.push_str(&format!(
            "💬 Messages: {} ({} from the user)\n\n",
            self.message_count, self.user_prompt_count
        ));
        summary.push_str(&format!("🎯 First prompt:\n\"{}\"\n", self.full_first_prompt));

        if self.user_prompts.len() > 1 {
            summary.push_str("\n📝 Following prompts:\n");
            for (i, prompt) in self.user_prompts.iter().enumerate().skip(1) {
                summary.push_str(&format!(
                    "{}. {}\n",
                    i + 1,
                    truncate_text(&prompt.content, NEXT_PROMPT_CHARS)
                ));
            }
        }
        summary
    }
}

/// Discover `<project>/<session>.jsonl` logs under the projects root.
pub fn discover_session_files(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "jsonl"))
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

fn read_log(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ViewerError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Summarize a single session log.
///
/// Returns `Ok(None)` when the log holds no decodable, non-meta records.
pub fn summarize_session(path: &Path, project_dir: &str) -> Result<Option<ConversationSummary>> {
    let content = read_log(path)?;

    let mut message_count = 0usize;
    let mut prompts: Vec<UserPrompt> = Vec::new();
    let mut start_time: Option<String> = None;
    let mut end_time: Option<String> = None;
    let mut actual_session_id: Option<String> = None;

    for line in content.lines() {
        let Some(record) = parse_record(line) else {
            continue;
        };
        if record.is_meta {
            continue;
        }

        if let Some(ts) = &record.timestamp {
            if start_time.is_none() {
                start_time = Some(ts.clone());
            }
            end_time = Some(ts.clone());
        }
        if actual_session_id.is_none() {
            actual_session_id = record.session_id.clone();
        }

        if record.kind == RecordKind::User {
            let text = record.text();
            let text = text.trim();
            if !text.is_empty() && !BOILERPLATE_MARKERS.iter().any(|m| text.contains(m)) {
                prompts.push(UserPrompt {
                    content: text.to_string(),
                    timestamp: record.timestamp().to_string(),
                });
            }
        }

        message_count += 1;
    }

    if message_count == 0 {
        return Ok(None);
    }

    let session_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let full_first_prompt = prompts
        .first()
        .map(|p| p.content.clone())
        .unwrap_or_else(|| NO_USER_CONTENT.to_string());
    let search_text = prompts
        .iter()
        .take(SUMMARY_PROMPT_COUNT)
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let user_prompt_count = prompts.len();
    prompts.truncate(SUMMARY_PROMPT_COUNT);

    Ok(Some(ConversationSummary {
        file_path: path.to_path_buf(),
        project_name: clean_project_name(project_dir),
        actual_session_id: actual_session_id.unwrap_or_else(|| session_id.clone()),
        session_id,
        start_time,
        end_time,
        message_count,
        user_prompt_count,
        first_prompt: truncate_text(&full_first_prompt, FIRST_PROMPT_CHARS),
        full_first_prompt,
        search_text,
        user_prompts: prompts,
    }))
}

/// Whether `candidate` should replace `existing` for the same session:
/// it has more messages, or it started later.
fn supersedes(candidate: &ConversationSummary, existing: &ConversationSummary) -> bool {
    if candidate.message_count > existing.message_count {
        return true;
    }
    matches!(
        (candidate.started_at(), existing.started_at()),
        (Some(new), Some(old)) if new > old
    )
}

/// Keep one summary per session identity and order them newest first.
pub fn dedupe_sessions(summaries: Vec<ConversationSummary>) -> Vec<ConversationSummary> {
    let mut by_session: HashMap<String, ConversationSummary> = HashMap::new();
    for summary in summaries {
        match by_session.get(&summary.actual_session_id) {
            Some(existing) if !supersedes(&summary, existing) => {}
            _ => {
                by_session.insert(summary.actual_session_id.clone(), summary);
            }
        }
    }

    let mut sessions: Vec<ConversationSummary> = by_session.into_values().collect();
    sessions.sort_by(|a, b| {
        b.started_at()
            .cmp(&a.started_at())
            .then_with(|| a.session_id.cmp(&b.session_id))
    });
    sessions
}

/// Summarize every session log under `projects_dir` in parallel.
///
/// Logs that cannot be read are skipped with a warning.
pub fn scan_sessions(projects_dir: &Path) -> Result<Vec<ConversationSummary>> {
    if !projects_dir.is_dir() {
        return Err(ViewerError::ProjectsDirMissing(projects_dir.to_path_buf()));
    }

    let files = discover_session_files(projects_dir);
    let total_files = files.len();

    let summaries: Vec<ConversationSummary> = files
        .into_par_iter()
        .filter_map(|path| {
            let project_dir = path
                .parent()
                .and_then(Path::file_name)
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match summarize_session(&path, &project_dir) {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = ?e, "could not read session log");
                    None
                }
            }
        })
        .collect();

    let sessions = dedupe_sessions(summaries);
    tracing::info!(files = total_files, sessions = sessions.len(), "scanned session logs");
    Ok(sessions)
}

/// Case-insensitive search over prompts, project name, and session id.
pub fn filter_conversations<'a>(
    conversations: &'a [ConversationSummary],
    term: &str,
) -> Vec<&'a ConversationSummary> {
    let term = term.trim().to_lowercase();
    conversations
        .iter()
        .filter(|conv| {
            term.is_empty()
                || conv.search_text.contains(&term)
                || conv.project_name.to_lowercase().contains(&term)
                || conv.first_prompt.to_lowercase().contains(&term)
                || conv.session_id.to_lowercase().contains(&term)
        })
        .collect()
}

/// Find a session by exact id, or by a prefix matching exactly one session.
pub fn find_session<'a>(
    conversations: &'a [ConversationSummary],
    query: &str,
) -> Result<&'a ConversationSummary> {
    let exact = conversations
        .iter()
        .find(|c| c.session_id == query || c.actual_session_id == query);
    if let Some(conv) = exact {
        return Ok(conv);
    }

    let mut matches = conversations
        .iter()
        .filter(|c| c.session_id.starts_with(query) || c.actual_session_id.starts_with(query));
    match (matches.next(), matches.next()) {
        (Some(conv), None) if !query.is_empty() => Ok(conv),
        _ => Err(ViewerError::SessionNotFound(query.to_string())),
    }
}

/// Read a whole session log and normalize it into transcript messages.
pub fn load_conversation(path: &Path, config: &NormalizerConfig) -> Result<Vec<NormalizedMessage>> {
    let content = read_log(path)?;
    Ok(ConversationNormalizer::new(*config).normalize_jsonl(&content))
}

/// Normalize a session log and write its HTML transcript into the output directory.
pub fn render_session(log_path: &Path, config: &ViewerConfig) -> Result<RenderOutcome> {
    let messages = load_conversation(log_path, &config.normalizer)?;
    let outcome = write_html_output(&messages, &config.output_dir, config.todo_theme)?;
    tracing::info!(
        source = %log_path.display(),
        output = %outcome.output_path.display(),
        messages = outcome.message_count,
        "rendered conversation"
    );
    Ok(outcome)
}
