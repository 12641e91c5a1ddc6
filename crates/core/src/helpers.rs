//! Helper functions for text truncation and lenient decoding.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::LazyLock;

/// Marker appended to truncated lines and inserted between kept line ranges.
pub const ELLIPSIS: &str = "...";

// Project directory slug patterns
static LEADING_DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-").unwrap());
static VOLUMES_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Volumes/DevelopmentProjects/").unwrap());
static USER_HOME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Users/[^/]+/").unwrap());

/// Deserialize a field, substituting `T::default()` when the JSON value has
/// an unexpected shape instead of failing the enclosing record.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Truncate `text` to at most `max_chars` characters, ending in [`ELLIPSIS`]
/// when anything was cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Apply [`truncate_text`] to every line of `text`.
pub fn truncate_each_line(text: &str, max_chars: usize) -> String {
    text.split('\n')
        .map(|line| truncate_text(line, max_chars))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep the first `head` and last `tail` lines of `text` when it has more
/// than `max_lines` lines, separated by an [`ELLIPSIS`] line.
pub fn limit_line_count(text: &str, max_lines: usize, head: usize, tail: usize) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }

    let head = head.min(lines.len());
    let tail = tail.min(lines.len() - head);
    let mut kept: Vec<&str> = Vec::with_capacity(head + tail + 1);
    kept.extend_from_slice(&lines[..head]);
    kept.push(ELLIPSIS);
    kept.extend_from_slice(&lines[lines.len() - tail..]);
    kept.join("\n")
}

/// Turn a project directory slug (`-Users-me-code-app`) back into a
/// readable path (`~/code/app`).
pub fn clean_project_name(slug: &str) -> String {
    let name = LEADING_DASH_RE.replace(slug, "").replace('-', "/");
    let name = VOLUMES_PREFIX_RE.replace(&name, "");
    USER_HOME_RE.replace(&name, "~/").into_owned()
}

/// Escape JSON so it can be embedded verbatim inside an inline `<script>`.
pub fn escape_json_for_script(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('\'', "\\u0027")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_text("this is too long", 10), "this is...");
        // Counts characters, not bytes
        assert_eq!(truncate_text("ééééé", 5), "ééééé");
        assert_eq!(truncate_text("éééééé", 5), "éé...");
    }

    #[test]
    fn test_truncate_each_line() {
        let long = "x".repeat(250);
        let out = truncate_each_line(&format!("ok\n{long}"), 200);
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines[0], "ok");
        assert_eq!(lines[1].chars().count(), 200);
        assert!(lines[1].ends_with("..."));
    }

    #[test]
    fn test_limit_line_count() {
        assert_eq!(limit_line_count("1\n2\n3\n4\n5\n6", 6, 3, 2), "1\n2\n3\n4\n5\n6");
        assert_eq!(
            limit_line_count("1\n2\n3\n4\n5\n6\n7", 6, 3, 2),
            "1\n2\n3\n...\n6\n7"
        );
    }

    #[test]
    fn test_clean_project_name() {
        assert_eq!(clean_project_name("-Users-alice-code-app"), "~/code/app");
        assert_eq!(
            clean_project_name("-Volumes-DevelopmentProjects-tools-viewer"),
            "tools/viewer"
        );
        assert_eq!(clean_project_name("-home-bob-work"), "home/bob/work");
    }

    #[test]
    fn test_escape_json_for_script() {
        assert_eq!(
            escape_json_for_script(r#"{"c":"</script><b>'x'"}"#),
            r#"{"c":"\u003c/script\u003e\u003cb\u003e\u0027x\u0027"}"#
        );
    }
}
