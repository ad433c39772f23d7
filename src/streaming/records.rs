use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    #[serde(default)]
    choices: Vec<CompleteChoice>,
}

#[derive(Debug, Deserialize)]
struct CompleteChoice {
    message: CompleteMessage,
}

#[derive(Debug, Deserialize)]
struct CompleteMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One parsed line of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Text to append to the message
    Delta(String),
    /// A valid record carrying no text (role announcement, finish marker, blank line)
    Empty,
    /// End-of-stream sentinel
    Done,
}

const DONE_SENTINEL: &str = "[DONE]";

/// Parse one line of the stream.
///
/// Accepts bare NDJSON and SSE style `data:` lines. The `[DONE]` sentinel is
/// recognised before any JSON parsing.
pub fn parse_record(line: &str) -> Result<Record, serde_json::Error> {
    let trimmed = line.trim();
    let payload = trimmed
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(trimmed);

    if payload.is_empty() {
        return Ok(Record::Empty);
    }
    if payload == DONE_SENTINEL {
        return Ok(Record::Done);
    }

    let response: StreamResponse = serde_json::from_str(payload)?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty());

    Ok(match content {
        Some(content) => Record::Delta(content),
        None => Record::Empty,
    })
}

/// Content of a non-streaming `{ choices: [ { message: { content } } ] }` body
pub fn parse_complete_response(body: &str) -> Result<String, serde_json::Error> {
    let response: CompleteResponse = serde_json::from_str(body)?;
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_record() {
        let line = r#"{"id":"x","choices":[{"index":0,"delta":{"content":"<Analyze>"},"finish_reason":null}]}"#;
        assert_eq!(parse_record(line).unwrap(), Record::Delta("<Analyze>".to_string()));
    }

    #[test]
    fn test_sse_prefix_is_accepted() {
        let line = r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#;
        assert_eq!(parse_record(line).unwrap(), Record::Delta("hi".to_string()));
    }

    #[test]
    fn test_done_sentinel() {
        assert_eq!(parse_record("data: [DONE]").unwrap(), Record::Done);
        assert_eq!(parse_record("  [DONE]\r").unwrap(), Record::Done);
    }

    #[test]
    fn test_records_without_text() {
        for line in [
            "",
            "   ",
            r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":""}}]}"#,
            r#"{"choices":[]}"#,
        ] {
            assert_eq!(parse_record(line).unwrap(), Record::Empty, "{line}");
        }
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        assert!(parse_record(r#"{"choices":[{"delta":{"content":"cut"#).is_err());
        assert!(parse_record("event: ping").is_err());
    }

    #[test]
    fn test_complete_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"<Answer>42</Answer>"}}]}"#;
        assert_eq!(parse_complete_response(body).unwrap(), "<Answer>42</Answer>");
        assert_eq!(parse_complete_response(r#"{"choices":[]}"#).unwrap(), "");
        assert!(parse_complete_response("oops").is_err());
    }
}
