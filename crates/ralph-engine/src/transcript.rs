//! Extract the latest turn's output from the host transcript.
//!
//! Host transcripts are JSONL: one message per line, assistant messages
//! carrying either a content string or an array of typed blocks. Only a
//! bounded tail is read; the last assistant message is always at the end
//! of the file. Files that are not JSONL at all are treated as plain text
//! (tests and simpler hosts hand those over).

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// How much of the transcript tail to inspect.
const TAIL_BYTES: u64 = 256 * 1024;

/// The last assistant message's text, or the raw tail for non-JSONL
/// files. Missing or unreadable files yield the empty string; an empty
/// transcript is a scoreable input, not an error.
pub fn read_last_output(transcript_path: &Path) -> String {
    let Ok(mut file) = std::fs::File::open(transcript_path) else {
        return String::new();
    };
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);

    let tail_start = size.saturating_sub(TAIL_BYTES);
    if file.seek(SeekFrom::Start(tail_start)).is_err() {
        return String::new();
    }
    let mut tail = String::new();
    if file.read_to_string(&mut tail).is_err() {
        return String::new();
    }
    // A mid-line seek leaves a partial first line; drop it.
    let tail = if tail_start > 0 {
        match tail.find('\n') {
            Some(idx) => &tail[idx + 1..],
            None => "",
        }
    } else {
        tail.as_str()
    };

    let mut last_assistant: Option<String> = None;
    let mut any_json = false;
    for line in tail.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
            continue;
        };
        any_json = true;
        if value["type"].as_str() != Some("assistant") {
            continue;
        }
        if let Some(text) = message_text(&value["message"]) {
            last_assistant = Some(text);
        }
    }

    match last_assistant {
        Some(text) => text,
        None if any_json => String::new(),
        None => tail.trim().to_string(),
    }
}

/// Pull text out of a message: either a bare string or an array of
/// `{type: "text", text}` blocks joined by blank lines.
fn message_text(message: &serde_json::Value) -> Option<String> {
    if let Some(text) = message["content"].as_str() {
        return Some(text.to_string());
    }
    let blocks = message["content"].as_array()?;
    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"].as_str() == Some("text"))
        .filter_map(|b| b["text"].as_str())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("transcript.jsonl");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert_eq!(read_last_output(&dir.path().join("nope.jsonl")), "");
    }

    #[test]
    fn test_plain_text_passthrough() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "just some output\nfrom a simple host\n");
        assert_eq!(
            read_last_output(&path),
            "just some output\nfrom a simple host"
        );
    }

    #[test]
    fn test_last_assistant_message_wins() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            concat!(
                r#"{"type":"assistant","message":{"content":"first turn"}}"#,
                "\n",
                r#"{"type":"user","message":{"content":"a question"}}"#,
                "\n",
                r#"{"type":"assistant","message":{"content":"second turn"}}"#,
                "\n",
            ),
        );
        assert_eq!(read_last_output(&path), "second turn");
    }

    #[test]
    fn test_content_block_array() {
        let dir = tempdir().unwrap();
        let path = write(
            &dir,
            concat!(
                r#"{"type":"assistant","message":{"content":[{"type":"text","text":"part one"},"#,
                r#"{"type":"tool_use","id":"t1"},{"type":"text","text":"part two"}]}}"#,
                "\n",
            ),
        );
        assert_eq!(read_last_output(&path), "part one\n\npart two");
    }

    #[test]
    fn test_jsonl_without_assistant_is_empty() {
        let dir = tempdir().unwrap();
        let path = write(&dir, r#"{"type":"user","message":{"content":"hi"}}"#);
        assert_eq!(read_last_output(&path), "");
    }

    #[test]
    fn test_empty_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "");
        assert_eq!(read_last_output(&path), "");
    }
}
