//! Owns the current snapshot of one conversation and publishes every new
//! snapshot to subscribers.

use std::sync::Arc;

use codex_transcript_protocol::config_types::ReasoningSummary;
use codex_transcript_protocol::protocol::ConversationEvent;
use tokio::sync::watch;
use tracing::debug;
use tracing::warn;

use crate::approvals;
use crate::approvals::ApprovalRequest;
use crate::cell::ApprovalDecision;
use crate::config::StoreOptions;
use crate::error::Result;
use crate::error::TranscriptError;
use crate::reducer::apply_event;
use crate::reducer::reduce;
use crate::side_effect::SideEffect;
use crate::snapshot::ConversationSnapshot;

pub struct ConversationStore {
    options: StoreOptions,
    state: watch::Sender<Arc<ConversationSnapshot>>,
    events: Vec<ConversationEvent>,
    event_count: usize,
    approval_requests: Vec<ApprovalRequest>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

impl ConversationStore {
    pub fn new(options: StoreOptions) -> Self {
        let (state, _) = watch::channel(Arc::new(ConversationSnapshot::from_options(&options)));
        Self {
            options,
            state,
            events: Vec::new(),
            event_count: 0,
            approval_requests: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Arc<ConversationSnapshot> {
        self.state.borrow().clone()
    }

    /// Receives every snapshot published after this call.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConversationSnapshot>> {
        self.state.subscribe()
    }

    /// Reduces one live event and publishes the result.
    pub fn ingest(&mut self, event: ConversationEvent) -> Arc<ConversationSnapshot> {
        let next = Arc::new(reduce(&self.snapshot(), &event));
        if let Some(request) = ApprovalRequest::from_event(&event.msg) {
            debug!(call_id = request.call_id(), "approval requested");
            self.approval_requests.push(request);
        }
        self.record(event);
        self.state.send_replace(next.clone());
        next
    }

    /// Reduces a batch of historical events and publishes once at the end.
    /// Approval requests in history are already settled and are not queued.
    pub fn replay_history(
        &mut self,
        events: impl IntoIterator<Item = ConversationEvent>,
    ) -> Arc<ConversationSnapshot> {
        let mut working = ConversationSnapshot::clone(&self.snapshot());
        let mut replayed = 0usize;
        for event in events {
            apply_event(&mut working, &event);
            self.record(event);
            replayed += 1;
        }
        debug!(replayed, "replayed history");
        let next = Arc::new(working);
        self.state.send_replace(next.clone());
        next
    }

    fn record(&mut self, event: ConversationEvent) {
        self.event_count += 1;
        if self.options.record_events {
            self.events.push(event);
        }
    }

    /// Returns the queued side effects and clears the queue.
    pub fn drain_side_effects(&mut self) -> Vec<SideEffect> {
        let mut drained = Vec::new();
        self.state.send_if_modified(|snapshot| {
            if snapshot.side_effects.is_empty() {
                return false;
            }
            drained = std::mem::take(&mut Arc::make_mut(snapshot).side_effects);
            true
        });
        drained
    }

    pub fn take_approval_requests(&mut self) -> Vec<ApprovalRequest> {
        std::mem::take(&mut self.approval_requests)
    }

    pub fn record_approval_decision(&mut self, call_id: &str, decision: ApprovalDecision) -> bool {
        self.state.send_if_modified(|snapshot| {
            approvals::record_decision(&mut Arc::make_mut(snapshot).log, call_id, decision)
        })
    }

    pub fn set_reasoning_summary_preference(&mut self, preference: Option<ReasoningSummary>) {
        self.options.reasoning_summary = preference;
        self.state.send_modify(|snapshot| {
            Arc::make_mut(snapshot).set_reasoning_summary_preference(preference);
        });
    }

    /// Drops all conversation state. The reasoning preference survives.
    pub fn reset(&mut self) {
        debug!(events = self.event_count, "resetting conversation store");
        self.events.clear();
        self.event_count = 0;
        self.approval_requests.clear();
        self.state
            .send_replace(Arc::new(ConversationSnapshot::from_options(&self.options)));
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn events(&self) -> &[ConversationEvent] {
        &self.events
    }

    /// One JSON envelope per line, in ingestion order.
    pub fn events_as_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event).map_err(TranscriptError::Encode)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Parses newline-delimited envelopes, skipping blank lines. A line that is
/// valid JSON but not an envelope is logged and skipped; a line that is not
/// JSON at all is an error.
pub fn parse_events_jsonl(contents: &str) -> Result<Vec<ConversationEvent>> {
    let mut events = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ConversationEvent>(line) {
            Ok(event) => events.push(event),
            Err(source) if source.is_data() => {
                warn!(line = index + 1, "skipping malformed event envelope: {source}");
            }
            Err(source) => {
                return Err(TranscriptError::Decode {
                    line: index + 1,
                    source,
                });
            }
        }
    }
    Ok(events)
}
