//! Decoding of server-sent chat-completion stream lines.

use serde::Deserialize;

/// Classification of one line of a streamed chat-completion body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Incremental text from `choices[0].delta.content`.
    Fragment(String),
    /// The `[DONE]` sentinel.
    Done,
    /// Blank lines, comments, other fields, and chunks without content.
    Ignored,
    /// A `data:` payload that is not valid chunk JSON. Callers skip these.
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

pub fn decode_line(line: &str) -> SseLine {
    let Some(payload) = line.trim_end_matches(['\r', '\n']).strip_prefix("data:") else {
        return SseLine::Ignored;
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return SseLine::Done;
    }
    if payload.is_empty() {
        return SseLine::Ignored;
    }
    match serde_json::from_str::<Chunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .map_or(SseLine::Ignored, SseLine::Fragment),
        Err(err) => SseLine::Malformed(err.to_string()),
    }
}
