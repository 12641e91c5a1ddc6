//! Self-contained HTML rendering of a normalized transcript.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::conversation::NormalizedMessage;
use crate::error::{Result, ViewerError};
use crate::helpers::escape_json_for_script;

/// Background pattern drawn behind TODO bubbles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoTheme {
    /// Subtle square grid.
    #[default]
    Grid,
    /// Ruled paper.
    Lines,
    /// Dense graph paper.
    Graph,
    /// Bullet-journal dots.
    Dots,
    /// No pattern.
    Clean,
}

impl TodoTheme {
    pub const ALL: [TodoTheme; 5] = [
        TodoTheme::Grid,
        TodoTheme::Lines,
        TodoTheme::Graph,
        TodoTheme::Dots,
        TodoTheme::Clean,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TodoTheme::Grid => "grid",
            TodoTheme::Lines => "lines",
            TodoTheme::Graph => "graph",
            TodoTheme::Dots => "dots",
            TodoTheme::Clean => "clean",
        }
    }

    /// CSS declarations for the TODO bubble background.
    pub fn background_css(self) -> &'static str {
        match self {
            TodoTheme::Grid => {
                "background-image:
                    linear-gradient(to right, #e0e0e0 1px, transparent 1px),
                    linear-gradient(to bottom, #e0e0e0 1px, transparent 1px);
                background-size: 12px 12px;"
            }
            TodoTheme::Lines => {
                "background-image:
                    linear-gradient(to bottom, transparent 19px, #d0d0d0 20px);
                background-size: 100% 20px;"
            }
            TodoTheme::Graph => {
                "background-image:
                    linear-gradient(to right, #e8e8e8 1px, transparent 1px),
                    linear-gradient(to bottom, #e8e8e8 1px, transparent 1px),
                    linear-gradient(to right, #d0d0d0 1px, transparent 1px),
                    linear-gradient(to bottom, #d0d0d0 1px, transparent 1px);
                background-size: 5px 5px, 5px 5px, 25px 25px, 25px 25px;"
            }
            TodoTheme::Dots => {
                "background-image:
                    radial-gradient(circle, #c0c0c0 1px, transparent 1px);
                background-size: 15px 15px;
                background-position: 7.5px 7.5px;"
            }
            TodoTheme::Clean => "",
        }
    }
}

impl fmt::Display for TodoTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoTheme {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        TodoTheme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == wanted)
            .ok_or_else(|| ViewerError::InvalidTheme(s.to_string()))
    }
}

/// Where a transcript was written.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output_path: PathBuf,
    pub message_count: usize,
}

const TODO_BACKGROUND_SLOT: &str = "/*__TODO_BACKGROUND__*/";
const CONVERSATION_DATA_SLOT: &str = "__CONVERSATION_DATA__";

/// Render the transcript as a standalone HTML page.
///
/// Messages are embedded as JSON and drawn client-side; the JSON is escaped
/// so message text cannot terminate the surrounding `<script>` element.
pub fn render_html(messages: &[NormalizedMessage], theme: TodoTheme) -> Result<String> {
    let data = escape_json_for_script(&serde_json::to_string(messages)?);
    Ok(TEMPLATE
        .replace(TODO_BACKGROUND_SLOT, theme.background_css())
        .replace(CONVERSATION_DATA_SLOT, &data))
}

/// Output file name for a transcript generated at `millis` since the epoch.
pub fn output_file_name(millis: i64) -> String {
    format!("claude-conversation-{millis}.html")
}

/// Render the transcript and write it to a timestamped file in `output_dir`.
pub fn write_html_output(
    messages: &[NormalizedMessage],
    output_dir: &Path,
    theme: TodoTheme,
) -> Result<RenderOutcome> {
    let html = render_html(messages, theme)?;

    fs::create_dir_all(output_dir).map_err(|source| ViewerError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let output_path = output_dir.join(output_file_name(chrono::Utc::now().timestamp_millis()));
    fs::write(&output_path, html).map_err(|source| ViewerError::Write {
        path: output_path.clone(),
        source,
    })?;

    Ok(RenderOutcome {
        output_path,
        message_count: messages.len(),
    })
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Claude Conversation Viewer</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif;
            background-color: #e5ddd5;
        }

        .container { max-width: 800px; margin: 0 auto; background-color: #f0f0f0; min-height: 100vh; }

        .header {
            background-color: #075e54;
            color: white;
            padding: 15px 20px;
            display: flex;
            align-items: center;
            box-shadow: 0 1px 3px rgba(0,0,0,0.15);
        }
        .header h1 { font-size: 19px; font-weight: 500; margin-left: 15px; }
        .avatar {
            width: 40px; height: 40px; border-radius: 50%;
            background-color: #25d366;
            display: flex; align-items: center; justify-content: center;
            font-weight: bold;
        }

        .chat-container { padding: 20px; padding-bottom: 80px; }

        .message { margin-bottom: 12px; display: flex; align-items: flex-end; }
        .message.user { justify-content: flex-end; }
        .message.assistant { justify-content: flex-start; }
        .message.system { justify-content: flex-start; margin: 8px 0; }
        .message.todo { justify-content: flex-start; margin: 12px 0; }

        .message-bubble {
            max-width: 65%;
            padding: 8px 12px;
            border-radius: 7.5px;
            position: relative;
            word-wrap: break-word;
            white-space: pre-wrap;
            font-size: 14.5px;
            line-height: 1.4;
        }
        .user .message-bubble { background-color: #dcf8c6; margin-right: 8px; }
        .assistant .message-bubble { background-color: white; margin-left: 8px; }
        .system .message-bubble {
            background-color: #f0f0f0;
            border: 1px solid #ddd;
            font-size: 12px;
            color: #666;
            max-width: 80%;
            margin-left: 20px;
            font-family: 'Monaco', 'Menlo', 'Ubuntu Mono', monospace;
        }
        .todo .message-bubble {
            background-color: #f5f7fa;
            /*__TODO_BACKGROUND__*/
            border: 1px solid #607d8b;
            border-left: 4px solid #607d8b;
            font-size: 13px;
            color: #37474f;
            max-width: 85%;
            margin-left: 20px;
            font-family: 'Monaco', 'Menlo', 'Ubuntu Mono', monospace;
        }
        .todo .message-bubble::before {
            content: "📋 TODO";
            position: absolute;
            top: -8px;
            left: 8px;
            background-color: #607d8b;
            color: white;
            padding: 2px 6px;
            border-radius: 3px;
            font-size: 10px;
            font-weight: bold;
        }

        .timestamp { font-size: 11px; color: #667781; margin-top: 4px; text-align: right; }
        .assistant .timestamp, .system .timestamp, .todo .timestamp { text-align: left; }
        .system .timestamp, .todo .timestamp { font-size: 10px; }

        .date-divider { text-align: center; margin: 20px 0; }
        .date-divider span {
            background-color: #e1f3fb;
            padding: 5px 12px;
            border-radius: 7.5px;
            font-size: 12.5px;
            color: #54656f;
            display: inline-block;
        }

        pre { background-color: #f4f4f4; padding: 10px; border-radius: 5px; overflow-x: auto; margin: 8px 0; }
        code { background-color: #f4f4f4; padding: 2px 4px; border-radius: 3px; font-size: 13px; }

        @media (max-width: 600px) {
            .message-bubble { max-width: 80%; }
        }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <div class="avatar">C</div>
            <h1>Claude Conversation</h1>
        </div>
        <div class="chat-container" id="chat"></div>
    </div>

    <script>
        const conversationData = __CONVERSATION_DATA__;

        function parseDate(timestamp) {
            const date = new Date(timestamp);
            return isNaN(date.getTime()) ? null : date;
        }

        function escapeHtml(text) {
            const div = document.createElement('div');
            div.textContent = text;
            return div.innerHTML;
        }

        function processMarkdown(text) {
            const stashed = [];
            const stash = (html) => {
                stashed.push(html);
                return '@@STASH' + (stashed.length - 1) + '@@';
            };

            let out = text.replace(/```(?:[\w-]*\n)?([\s\S]*?)```/g,
                (match, code) => stash('<pre><code>' + escapeHtml(code) + '</code></pre>'));
            out = out.replace(/`([^`\n]+)`/g,
                (match, code) => stash('<code>' + escapeHtml(code) + '</code>'));

            out = escapeHtml(out);
            out = out.replace(/\*\*(.+?)\*\*/g, '<strong>$1</strong>');
            out = out.replace(/__(.+?)__/g, '<strong>$1</strong>');
            out = out.replace(/~~(.+?)~~/g, '<del>$1</del>');

            return out.replace(/@@STASH(\d+)@@/g, (match, index) => stashed[Number(index)]);
        }

        function renderMessages() {
            const chat = document.getElementById('chat');
            let lastDay = null;

            conversationData.forEach((msg) => {
                const date = parseDate(msg.timestamp);
                if (date && date.toDateString() !== lastDay) {
                    const divider = document.createElement('div');
                    divider.className = 'date-divider';
                    const label = document.createElement('span');
                    label.textContent = date.toLocaleDateString(undefined,
                        { day: 'numeric', month: 'long', year: 'numeric' });
                    divider.appendChild(label);
                    chat.appendChild(divider);
                    lastDay = date.toDateString();
                }

                const message = document.createElement('div');
                message.className = 'message ' + msg.type;

                const bubble = document.createElement('div');
                bubble.className = 'message-bubble';
                bubble.innerHTML = processMarkdown(msg.content);

                if (date) {
                    const time = document.createElement('div');
                    time.className = 'timestamp';
                    time.textContent = date.toLocaleTimeString(undefined,
                        { hour: '2-digit', minute: '2-digit' });
                    bubble.appendChild(time);
                }

                message.appendChild(bubble);
                chat.appendChild(message);
            });
        }

        document.addEventListener('DOMContentLoaded', renderMessages);
    </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::NormalizedMessage;
    use tempfile::TempDir;

    #[test]
    fn test_theme_parsing() {
        assert_eq!("dots".parse::<TodoTheme>().unwrap(), TodoTheme::Dots);
        assert_eq!(" Lines ".parse::<TodoTheme>().unwrap(), TodoTheme::Lines);
        assert!(matches!(
            "plaid".parse::<TodoTheme>(),
            Err(ViewerError::InvalidTheme(theme)) if theme == "plaid"
        ));
        assert_eq!(TodoTheme::default(), TodoTheme::Grid);
        for theme in TodoTheme::ALL {
            assert_eq!(theme.to_string().parse::<TodoTheme>().unwrap(), theme);
        }
    }

    #[test]
    fn test_render_embeds_escaped_data() {
        let messages = vec![
            NormalizedMessage::user("</script><script>alert('x')</script>", "2024-05-01T10:00:00Z"),
            NormalizedMessage::todo("📋 **TODO List** (1 tasks)", "2024-05-01T10:00:01Z"),
        ];
        let html = render_html(&messages, TodoTheme::Dots).unwrap();

        assert!(!html.contains(CONVERSATION_DATA_SLOT));
        assert!(!html.contains(TODO_BACKGROUND_SLOT));
        assert!(html.contains("radial-gradient(circle, #c0c0c0 1px"));
        assert!(html.contains(r#""type":"todo""#));
        assert!(html.contains(r"\u003c/script\u003e\u003cscript\u003ealert(\u0027x\u0027)"));
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[test]
    fn test_clean_theme_has_no_pattern() {
        let html = render_html(&[], TodoTheme::Clean).unwrap();
        assert!(!html.contains("linear-gradient"));
        assert!(!html.contains("radial-gradient"));
        assert!(html.contains("const conversationData = [];"));
    }

    #[test]
    fn test_write_html_output() {
        let temp = TempDir::new().unwrap();
        let out_dir = temp.path().join("nested").join("out");
        let messages = vec![NormalizedMessage::assistant("Hello", "")];

        let outcome = write_html_output(&messages, &out_dir, TodoTheme::Grid).unwrap();
        assert_eq!(outcome.message_count, 1);
        let name = outcome.output_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("claude-conversation-") && name.ends_with(".html"));
        assert!(std::fs::read_to_string(&outcome.output_path).unwrap().contains("Hello"));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(1714557600000), "claude-conversation-1714557600000.html");
    }
}
