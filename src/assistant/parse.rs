//! Parsing of generated text, with fallbacks for loosely formatted answers.

/// Filler used when fewer questions than requested could be extracted.
pub const QUESTION_PLACEHOLDER: &str = "(Prepare for similar topics)";

/// Maximum bullets produced by the sentence-split fallback.
const MAX_FALLBACK_BULLETS: usize = 4;

/// Normalize a generated summary into bullet lines.
///
/// Text that already contains a `-` is returned trimmed. Otherwise it is split
/// on `.` and the first four non-empty sentences become `- ` bullets.
pub fn summary_bullets(raw: &str) -> String {
    let text = raw.trim();
    if text.contains('-') {
        return text.to_string();
    }
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_FALLBACK_BULLETS)
        .map(|s| format!("- {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip a surrounding Markdown code fence (optionally tagged `json`).
fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
        if text.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            text = &text[4..];
        }
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a JSON array of questions, tolerating a code fence around it.
///
/// Non-string elements are stringified; blank entries are dropped.
/// Returns None if the text is not a JSON array.
pub fn parse_question_array(raw: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s.trim().to_string(),
                other => other.to_string().trim().to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Split text into lines, dropping leading `1.` style numbering and blanks.
pub fn numbered_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| strip_numbering(line.trim()).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_numbering(line: &str) -> &str {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    match line[digits..].strip_prefix('.') {
        Some(rest) => rest,
        None => line,
    }
}

/// Truncate to `n` questions, padding with [`QUESTION_PLACEHOLDER`].
pub fn finalize_questions(mut questions: Vec<String>, n: usize) -> Vec<String> {
    questions.truncate(n);
    while questions.len() < n {
        questions.push(QUESTION_PLACEHOLDER.to_string());
    }
    questions
}
