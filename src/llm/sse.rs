use serde::Deserialize;

use super::LlmError;

/// Incremental server-sent events decoder. Feed raw chunks in, get the
/// `data` payload of every completed event out.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = self.accept_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush an event left open when the connection closed
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.accept_line(&line) {
                return Some(event);
            }
        }
        self.take_event()
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            self.data_lines.push(data.to_string());
        }
        // event:, id:, retry: carry nothing we use
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(data)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CompletionEvent {
    Delta(String),
    Done,
}

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ProviderError>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

/// Interpret one chat-completions stream event. Role-only and empty deltas
/// yield `None`.
pub fn parse_completion_event(data: &str) -> Result<Option<CompletionEvent>, LlmError> {
    if data.trim() == "[DONE]" {
        return Ok(Some(CompletionEvent::Done));
    }

    let chunk: Chunk =
        serde_json::from_str(data).map_err(|e| LlmError::Decode(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(LlmError::Provider(error.message));
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty());

    Ok(content.map(CompletionEvent::Delta))
}
