//! Pulls a JSON value out of free-form model output.
//!
//! Models wrap JSON in markdown fences or chatter around it even when asked
//! not to, so every call site that reads model output goes through
//! [`parse_model_json`].

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("model returned no text")]
    Empty,
    #[error("no JSON value found in model output")]
    NoJson,
    #[error("invalid JSON in model output: {0}")]
    Invalid(#[from] serde_json::Error),
}

pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, ParseError> {
    let clean = strip_markdown_fences(text);
    if clean.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<T>(clean) {
        return Ok(value);
    }

    let balanced = balanced_fragment(clean);
    let greedy = greedy_fragment(clean);
    if balanced.is_none() && greedy.is_none() {
        return Err(ParseError::NoJson);
    }

    let mut last_err = None;
    for fragment in [balanced, greedy].into_iter().flatten() {
        match serde_json::from_str::<T>(fragment) {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }
    match last_err {
        Some(e) => Err(ParseError::Invalid(e)),
        None => Err(ParseError::NoJson),
    }
}

/// Strip markdown code fences, including a fenced block embedded in prose.
pub fn strip_markdown_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[open + 3..];
    // The fence line may carry a language tag such as ```json
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let tag = after_open[..body_start].trim();
    let body = if tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        &after_open[body_start..]
    } else {
        after_open
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// First `{` or `[` through its matching close, honouring strings and escapes.
fn balanced_fragment(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(ch) {
                    return None;
                }
                if stack.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// First opening bracket through the last matching closing bracket.
fn greedy_fragment(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}
