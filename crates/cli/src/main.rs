//! CLI tool for browsing Claude Code sessions and rendering them as HTML chats.
//!
//! Sessions are read from the Claude Code projects directory
//! (`~/.claude/projects/<project>/<session>.jsonl`), normalized into a chat
//! transcript and written out as a standalone HTML page.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use claude_chat_viewer_core::{
    filter_conversations, find_session, render_session, scan_sessions, summarize_session,
    ConversationSummary, TodoTheme, ViewerConfig,
};

/// Find and view your Claude Code conversations.
#[derive(Parser, Debug)]
#[command(name = "claude-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding one folder of session logs per project
    /// [default: ~/.claude/projects]
    #[arg(long, env = "CLAUDE_PROJECTS_DIR", global = true)]
    projects_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List conversations, newest first
    List {
        /// Only show conversations whose prompts, project or id match
        #[arg(long, short)]
        search: Option<String>,

        /// Maximum number of conversations to show
        #[arg(long)]
        limit: Option<usize>,

        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a summary of one conversation
    Show {
        /// Session id (or unique prefix) or path to a .jsonl log
        session: String,
    },
    /// Render a conversation as a standalone HTML chat
    Render {
        /// Session id (or unique prefix) or path to a .jsonl log
        session: String,

        /// Directory the HTML file is written to
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Background for TODO bubbles: grid, lines, graph, dots or clean
        #[arg(long, default_value = "grid")]
        todo_background: TodoTheme,
    },
}

fn default_projects_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine the home directory")?;
    Ok(home.join(".claude").join("projects"))
}

/// Resolve a session argument: an existing log file is used directly,
/// anything else is looked up among the scanned sessions.
fn resolve_session(projects_dir: &Path, session: &str) -> Result<PathBuf> {
    let candidate = Path::new(session);
    if candidate.is_file() {
        return Ok(candidate.to_path_buf());
    }

    let sessions = scan_sessions(projects_dir)?;
    let summary = find_session(&sessions, session)?;
    Ok(summary.file_path.clone())
}

/// A log given by path is summarized directly, even outside the projects
/// directory; anything else is looked up among the scanned sessions.
fn find_summary(projects_dir: &Path, session: &str) -> Result<ConversationSummary> {
    let path = Path::new(session);
    if path.is_file() {
        let project_dir = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        return summarize_session(path, &project_dir)?
            .with_context(|| format!("{} holds no conversation records", path.display()));
    }

    let sessions = scan_sessions(projects_dir)?;
    Ok(find_session(&sessions, session)?.clone())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("claude_chat=info,claude_chat_viewer_core=info")
        }))
        .init();
}

fn run(args: Args) -> Result<()> {
    let projects_dir = match args.projects_dir {
        Some(dir) => dir,
        None => default_projects_dir()?,
    };
    let mut config = ViewerConfig::new(projects_dir);
    tracing::debug!(projects_dir = %config.projects_dir.display(), "using projects directory");

    match args.command {
        Command::List { search, limit, json } => {
            let sessions = scan_sessions(&config.projects_dir)?;
            let mut matches = filter_conversations(&sessions, search.as_deref().unwrap_or(""));
            if let Some(limit) = limit {
                matches.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
                return Ok(());
            }

            println!("📋 Conversations: {} of {}\n", matches.len(), sessions.len());
            for summary in matches {
                println!("{}  ({})", summary.list_line(), summary.session_id);
            }
        }
        Command::Show { session } => {
            let summary = find_summary(&config.projects_dir, &session)?;
            println!("{}", summary.describe());
            println!("📄 {}", summary.file_path.display());
        }
        Command::Render {
            session,
            output_dir,
            todo_background,
        } => {
            let log_path = resolve_session(&config.projects_dir, &session)?;
            config.output_dir = output_dir;
            config.todo_theme = todo_background;

            let outcome = render_session(&log_path, &config)
                .with_context(|| format!("could not render {}", log_path.display()))?;
            println!("✅ HTML written: {}", outcome.output_path.display());
            println!("📊 {} messages processed", outcome.message_count);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    if let Err(err) = run(Args::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_render_args() {
        let args = Args::try_parse_from([
            "claude-chat",
            "--projects-dir",
            "/tmp/projects",
            "render",
            "abc123",
            "--todo-background",
            "dots",
        ])
        .unwrap();
        assert_eq!(args.projects_dir, Some(PathBuf::from("/tmp/projects")));
        match args.command {
            Command::Render {
                session,
                output_dir,
                todo_background,
            } => {
                assert_eq!(session, "abc123");
                assert_eq!(output_dir, PathBuf::from("."));
                assert_eq!(todo_background, TodoTheme::Dots);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    fn write_log(path: &Path, session_id: &str, prompt: &str) {
        let line = serde_json::json!({
            "type": "user",
            "timestamp": "2024-05-01T10:00:00Z",
            "sessionId": session_id,
            "message": {"role": "user", "content": prompt},
        });
        std::fs::write(path, format!("{line}\n")).unwrap();
    }

    #[test]
    fn test_show_accepts_log_outside_projects_dir() {
        let root = tempfile::tempdir().unwrap();
        let projects = root.path().join("projects");
        std::fs::create_dir_all(projects.join("-Users-me-app")).unwrap();
        write_log(&projects.join("-Users-me-app").join("inside.jsonl"), "inside", "hi");

        let loose = root.path().join("elsewhere.jsonl");
        write_log(&loose, "loose-session", "fix the build");

        let summary = find_summary(&projects, loose.to_str().unwrap()).unwrap();
        assert_eq!(summary.session_id, "elsewhere");
        assert_eq!(summary.actual_session_id, "loose-session");
        assert_eq!(summary.full_first_prompt, "fix the build");
        assert_eq!(summary.file_path, loose);
    }

    #[test]
    fn test_show_looks_up_session_id() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("-Users-me-app");
        std::fs::create_dir_all(&project).unwrap();
        write_log(&project.join("abc123.jsonl"), "abc123", "hello");

        let summary = find_summary(root.path(), "abc").unwrap();
        assert_eq!(summary.session_id, "abc123");
        assert!(find_summary(root.path(), "zzz").is_err());
    }

    #[test]
    fn test_show_rejects_empty_log_file() {
        let root = tempfile::tempdir().unwrap();
        let empty = root.path().join("empty.jsonl");
        std::fs::write(&empty, "\n").unwrap();
        assert!(find_summary(root.path(), empty.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_invalid_theme_rejected() {
        let result = Args::try_parse_from(["claude-chat", "render", "abc", "--todo-background", "plaid"]);
        assert!(result.is_err());
    }
}
