//! Prompt whitespace trimming.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimResult {
    pub text: String,
    /// Characters removed (not bytes).
    pub saved_chars: usize,
}

/// Tighten whitespace in prompt text.
///
/// - trailing spaces and tabs are stripped from every line
/// - runs of spaces/tabs inside a line collapse to one space, leading
///   indentation is left alone
/// - three or more consecutive newlines collapse to two
///
/// If the result would be blank the original is returned unchanged.
pub fn trim_whitespace(text: &str) -> TrimResult {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        lines.push(tighten_line(line));
    }

    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() && i > 0 {
            blank_run += 1;
            // One blank line (two newlines) is the most we keep.
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
    }

    if out.trim().is_empty() {
        return TrimResult {
            text: text.to_string(),
            saved_chars: 0,
        };
    }

    let saved_chars = text.chars().count().saturating_sub(out.chars().count());
    TrimResult {
        text: out,
        saved_chars,
    }
}

fn tighten_line(line: &str) -> String {
    let line = line.trim_end_matches([' ', '\t', '\r']);
    let body_start = line.len() - line.trim_start_matches([' ', '\t']).len();
    let (indent, body) = line.split_at(body_start);

    let mut out = String::with_capacity(line.len());
    out.push_str(indent);
    let mut in_run = false;
    for c in body.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Trim every prompt text field in an LLM request body in place.
///
/// Covers `messages[].content` (string or text blocks), a top-level
/// `system` (string or text blocks) and Gemini `contents[].parts[].text`.
/// Returns total characters saved.
pub fn optimize_request_body(body: &mut Value) -> usize {
    let mut saved = 0;

    if let Some(system) = body.get_mut("system") {
        saved += trim_content(system);
    }
    if let Some(messages) = body.get_mut("messages").and_then(Value::as_array_mut) {
        for message in messages {
            if let Some(content) = message.get_mut("content") {
                saved += trim_content(content);
            }
        }
    }
    if let Some(contents) = body.get_mut("contents").and_then(Value::as_array_mut) {
        for content in contents {
            if let Some(parts) = content.get_mut("parts").and_then(Value::as_array_mut) {
                for part in parts {
                    if let Some(text) = part.get_mut("text") {
                        saved += trim_string(text);
                    }
                }
            }
        }
    }
    saved
}

fn trim_content(content: &mut Value) -> usize {
    if content.is_string() {
        return trim_string(content);
    }
    content.as_array_mut().map_or(0, |blocks| {
        blocks
            .iter_mut()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get_mut("text"))
            .map(trim_string)
            .sum()
    })
}

fn trim_string(value: &mut Value) -> usize {
    let Value::String(text) = value else {
        return 0;
    };
    let result = trim_whitespace(text);
    if result.saved_chars > 0 {
        *text = result.text;
    }
    result.saved_chars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collapses_interior_runs() {
        let result = trim_whitespace("hello    world   test");
        assert_eq!(result.text, "hello world test");
        assert!(result.saved_chars > 0);
        assert_eq!(result.saved_chars, 5);
    }

    #[test]
    fn test_clean_text_is_unchanged() {
        let result = trim_whitespace("already tidy\n\nparagraph two");
        assert_eq!(result.text, "already tidy\n\nparagraph two");
        assert_eq!(result.saved_chars, 0);
    }

    #[test]
    fn test_keeps_indentation_and_caps_blank_lines() {
        let result = trim_whitespace("fn main() {   \n    let  x = 1;\n\n\n\n}");
        assert_eq!(result.text, "fn main() {\n    let x = 1;\n\n}");
    }

    #[test]
    fn test_blank_result_falls_back_to_original() {
        let result = trim_whitespace("   \n\n\n   ");
        assert_eq!(result.text, "   \n\n\n   ");
        assert_eq!(result.saved_chars, 0);
    }

    #[test]
    fn test_optimize_request_body_covers_vendor_shapes() {
        let mut body = json!({
            "system": "be   brief",
            "messages": [
                {"role": "user", "content": "hi    there"},
                {"role": "user", "content": [
                    {"type": "text", "text": "a  b"},
                    {"type": "image", "source": {"data": "x  y"}}
                ]}
            ],
            "contents": [{"parts": [{"text": "gem   ini"}]}]
        });

        let saved = optimize_request_body(&mut body);
        assert_eq!(saved, 2 + 3 + 1 + 2);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["messages"][0]["content"], "hi there");
        assert_eq!(body["messages"][1]["content"][0]["text"], "a b");
        assert_eq!(body["messages"][1]["content"][1]["source"]["data"], "x  y");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "gem ini");
    }
}
