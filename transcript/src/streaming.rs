//! Accumulators for incremental events: the open message cursors, reasoning
//! buffers and per-call exec output decoders.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use codex_transcript_protocol::config_types::ReasoningSummary;
use codex_transcript_protocol::protocol::ExecOutputStream;
use serde::Serialize;

use crate::cell::AgentMessageCell;
use crate::cell::Cell;
use crate::cell::CellBody;
use crate::cell::CellKind;
use crate::log::CellLog;

/// Cells that the next matching streaming event merges into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpenCursors {
    pub user_message: Option<usize>,
    pub agent_message: Option<usize>,
}

impl OpenCursors {
    pub(crate) fn user_message(&self, log: &CellLog) -> Option<usize> {
        self.user_message
            .filter(|&position| log.get(position).map(Cell::kind) == Some(CellKind::UserMessage))
    }

    pub(crate) fn agent_message(&self, log: &CellLog) -> Option<usize> {
        self.agent_message
            .filter(|&position| log.get(position).map(Cell::kind) == Some(CellKind::AgentMessage))
    }

    /// Marks the open agent message as finished and forgets it.
    pub(crate) fn close_agent_message(&mut self, log: &mut CellLog) {
        if let Some(position) = self.agent_message(log)
            && let Some(cell) = log
                .get_mut(position)
                .and_then(|cell| cell.body.as_agent_message_mut())
        {
            cell.streaming = false;
        }
        self.agent_message = None;
    }

    pub(crate) fn append_agent_delta(
        &mut self,
        log: &mut CellLog,
        delta: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
    ) {
        if delta.is_empty() {
            return;
        }
        if let Some(position) = self.agent_message(log)
            && let Some(cell) = log.get_mut(position)
        {
            cell.record_event(event_id);
            if let Some(message) = cell.body.as_agent_message_mut() {
                message.message.push_str(delta);
                message.streaming = true;
            }
            return;
        }
        let position = log.push(
            timestamp,
            event_id,
            CellBody::AgentMessage(AgentMessageCell {
                message: delta.to_string(),
                streaming: true,
                item_id: None,
            }),
        );
        self.agent_message = Some(position);
    }

    /// Completes the agent message: overwrites the open cell when there is
    /// one, otherwise appends a finished cell. Returns the cell's position.
    pub(crate) fn finish_agent_message(
        &mut self,
        log: &mut CellLog,
        message: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
    ) -> usize {
        if let Some(position) = self.agent_message(log)
            && let Some(cell) = log.get_mut(position)
        {
            cell.record_event(event_id);
            if let Some(agent) = cell.body.as_agent_message_mut() {
                agent.message = message.to_string();
            }
            self.close_agent_message(log);
            return position;
        }
        self.agent_message = None;
        log.push(
            timestamp,
            event_id,
            CellBody::AgentMessage(AgentMessageCell {
                message: message.to_string(),
                streaming: false,
                item_id: None,
            }),
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningSummaryFormat {
    #[default]
    None,
    Experimental,
}

impl ReasoningSummaryFormat {
    /// Codex-family models stream summaries worth showing.
    pub fn for_model(model: &str) -> Self {
        let normalized = model.to_lowercase();
        if ["test-gpt-5-codex", "codex-", "gpt-5-codex"]
            .iter()
            .any(|prefix| normalized.starts_with(prefix))
        {
            ReasoningSummaryFormat::Experimental
        } else {
            ReasoningSummaryFormat::None
        }
    }

    pub fn for_preference(preference: ReasoningSummary) -> Self {
        match preference {
            ReasoningSummary::None => ReasoningSummaryFormat::None,
            ReasoningSummary::Auto | ReasoningSummary::Concise | ReasoningSummary::Detailed => {
                ReasoningSummaryFormat::Experimental
            }
        }
    }
}

/// Reasoning text assembled from deltas until a terminal reasoning event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReasoningState {
    /// Text of the current summary section.
    pub section: String,
    /// Text of every section since the last terminal event.
    pub full: String,
    /// Header last published to the status line.
    pub latest_header: Option<String>,
    pub pending_text: Option<String>,
}

impl ReasoningState {
    /// Appends a delta and returns the header to publish if it changed.
    pub(crate) fn push_delta(&mut self, delta: &str) -> Option<String> {
        self.section.push_str(delta);
        self.full.push_str(delta);
        self.pending_text = Some(self.section.clone());
        let header = extract_reasoning_header(&self.section)?;
        if self.latest_header.as_deref() == Some(header.as_str()) {
            return None;
        }
        self.latest_header = Some(header.clone());
        Some(header)
    }

    pub(crate) fn section_break(&mut self) {
        self.full.push_str(&self.section);
        self.full.push_str("\n\n");
        self.section.clear();
    }

    /// Text a terminal reasoning event finalizes.
    pub(crate) fn working_text(&self, explicit: &str) -> String {
        if !explicit.trim().is_empty() {
            explicit.to_string()
        } else if !self.section.is_empty() {
            self.section.clone()
        } else {
            self.full.clone()
        }
    }

    pub(crate) fn clear_published(&mut self) {
        self.latest_header = None;
        self.pending_text = None;
    }

    pub(crate) fn clear(&mut self) {
        self.section.clear();
        self.full.clear();
        self.clear_published();
    }
}

/// Splits `**Header**rest` into its parts after trimming. The header must be
/// non-empty.
fn split_header(text: &str) -> Option<(&str, &str)> {
    let after_open = text.trim().strip_prefix("**")?;
    let closing = after_open.find("**")?;
    let header = after_open[..closing].trim();
    if header.is_empty() {
        return None;
    }
    Some((header, &after_open[closing + 2..]))
}

/// The bold header a reasoning section opens with, if any.
pub fn extract_reasoning_header(text: &str) -> Option<String> {
    split_header(text).map(|(header, _)| header.to_string())
}

/// Removes a leading bold header. Returns the trimmed body, which is empty
/// for header-only text; text without a header is returned unchanged.
pub fn strip_reasoning_header(text: &str) -> String {
    match split_header(text) {
        Some((_, body)) => body.trim().to_string(),
        None => text.to_string(),
    }
}

pub fn has_reasoning_body(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let Some(after_open) = trimmed.strip_prefix("**") else {
        return true;
    };
    match after_open.find("**") {
        Some(closing) => !after_open[closing + 2..].trim().is_empty(),
        None => true,
    }
}

/// Incremental UTF-8 decoding: incomplete trailing sequences wait for the
/// next chunk, invalid bytes become U+FFFD.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecStreamDecoders {
    stdout: Utf8StreamDecoder,
    stderr: Utf8StreamDecoder,
}

impl ExecStreamDecoders {
    pub fn decode(&mut self, stream: ExecOutputStream, chunk: &[u8]) -> String {
        match stream {
            ExecOutputStream::Stdout => self.stdout.decode(chunk),
            ExecOutputStream::Stderr => self.stderr.decode(chunk),
        }
    }
}

/// Decoders keyed by exec call id.
pub type ExecDecoderMap = BTreeMap<String, ExecStreamDecoders>;
