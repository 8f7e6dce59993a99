use serde::Deserialize;
use thiserror::Error;

/// Sentinel payload some backends send after the last event. Ignored:
/// termination is driven by a finish reason or the transport closing,
/// never by the sentinel alone.
const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Error)]
pub enum StreamParseError {
    #[error("event payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("event payload has no choices")]
    MissingChoice,
    #[error("event line is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// What one fed chunk produced: zero or more content deltas, and whether a
/// finish reason made the sequence terminal.
#[derive(Debug, Default)]
pub struct ChunkOutcome {
    pub deltas: Vec<String>,
    pub finished: bool,
}

/// Incremental parser over the upstream's text-event framing.
///
/// Chunk boundaries may fall anywhere, including inside a multi-byte UTF-8
/// sequence; bytes stay in the pending buffer until a full line is available,
/// so split characters are reassembled intact. A frame ends at an empty line;
/// its accumulated `data:` payload is then interpreted. Once a finish reason
/// is seen the parser is terminal and further input is discarded.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    pending: Vec<u8>,
    data_lines: Vec<String>,
    finished: bool,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<ChunkOutcome, StreamParseError> {
        let mut outcome = ChunkOutcome {
            deltas: Vec::new(),
            finished: self.finished,
        };
        if self.finished {
            return Ok(outcome);
        }

        self.pending.extend_from_slice(chunk);
        while let Some(index) = self.pending.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=index).collect();
            let line = &line[..line.len() - 1];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let line = std::str::from_utf8(line)?;

            if line.is_empty() {
                if self.dispatch_frame(&mut outcome)? {
                    self.finished = true;
                    outcome.finished = true;
                    self.pending.clear();
                    break;
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data_lines.push(value.to_owned());
            }
        }

        Ok(outcome)
    }

    /// Interprets one completed frame. Returns true when the frame carried a
    /// finish reason.
    fn dispatch_frame(&mut self, outcome: &mut ChunkOutcome) -> Result<bool, StreamParseError> {
        if self.data_lines.is_empty() {
            return Ok(false);
        }
        let payload = self.data_lines.join("\n");
        self.data_lines.clear();

        if payload == DONE_SENTINEL {
            return Ok(false);
        }

        let event: CompletionEvent = serde_json::from_str(&payload)?;
        let choice = event.choices.first().ok_or(StreamParseError::MissingChoice)?;
        if choice.finish_reason.is_some() {
            return Ok(true);
        }
        if let Some(content) = &choice.delta.content {
            if !content.is_empty() {
                outcome.deltas.push(content.clone());
            }
        }
        Ok(false)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionEvent {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    delta: CompletionDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionDelta {
    #[serde(default)]
    content: Option<String>,
}
