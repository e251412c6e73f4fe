use chrono::DateTime;
use chrono::Utc;
use codex_transcript_protocol::ConversationId;
use codex_transcript_protocol::config_types::ReasoningSummary;
use codex_transcript_protocol::protocol::RateLimitSnapshot;
use codex_transcript_protocol::protocol::TokenUsageInfo;
use serde::Serialize;

use crate::cell::Cell;
use crate::config::DEFAULT_STATUS_HEADER;
use crate::config::StoreOptions;
use crate::log::CellLog;
use crate::side_effect::SideEffect;
use crate::streaming::ExecDecoderMap;
use crate::streaming::OpenCursors;
use crate::streaming::ReasoningState;
use crate::streaming::ReasoningSummaryFormat;
use crate::turn_diff::TurnDiff;
use crate::turn_diff::TurnDiffTracker;

/// Complete transcript state of one conversation after some prefix of its
/// events. Only the reducer mutates it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConversationSnapshot {
    pub conversation_id: Option<ConversationId>,
    pub log: CellLog,
    pub cursors: OpenCursors,
    pub reasoning: ReasoningState,
    /// When set, the next exploration command starts a new cell.
    pub break_exploration_group: bool,
    pub turn_diffs: TurnDiffTracker,
    pub pending_task_started_at: Option<DateTime<Utc>>,
    pub reasoning_summary_format: ReasoningSummaryFormat,
    pub reasoning_summary_preference: Option<ReasoningSummary>,
    pub status_header: String,
    pub context_tokens_in_window: Option<u64>,
    pub max_context_window: Option<u64>,
    pub token_info: Option<TokenUsageInfo>,
    pub rate_limits: Option<RateLimitSnapshot>,
    pub side_effects: Vec<SideEffect>,
    #[serde(skip)]
    pub(crate) exec_decoders: ExecDecoderMap,
    #[serde(skip)]
    pub(crate) default_status_header: String,
}

impl Default for ConversationSnapshot {
    fn default() -> Self {
        Self::with_status_header(DEFAULT_STATUS_HEADER)
    }
}

impl ConversationSnapshot {
    pub fn from_options(options: &StoreOptions) -> Self {
        let mut snapshot = Self::with_status_header(&options.default_status_header);
        if let Some(preference) = options.reasoning_summary {
            snapshot.set_reasoning_summary_preference(Some(preference));
        }
        snapshot
    }

    fn with_status_header(header: &str) -> Self {
        Self {
            conversation_id: None,
            log: CellLog::new(),
            cursors: OpenCursors::default(),
            reasoning: ReasoningState::default(),
            break_exploration_group: false,
            turn_diffs: TurnDiffTracker::default(),
            pending_task_started_at: None,
            reasoning_summary_format: ReasoningSummaryFormat::default(),
            reasoning_summary_preference: None,
            status_header: header.to_string(),
            context_tokens_in_window: None,
            max_context_window: None,
            token_info: None,
            rate_limits: None,
            side_effects: Vec::new(),
            exec_decoders: ExecDecoderMap::new(),
            default_status_header: header.to_string(),
        }
    }

    pub fn cells(&self) -> impl DoubleEndedIterator<Item = &Cell> + ExactSizeIterator {
        self.log.iter()
    }

    pub fn latest_turn_diff(&self) -> Option<&TurnDiff> {
        self.turn_diffs.latest()
    }

    /// An explicit preference overrides the format derived from the model;
    /// `None` leaves the current format alone.
    pub fn set_reasoning_summary_preference(&mut self, preference: Option<ReasoningSummary>) {
        self.reasoning_summary_preference = preference;
        if let Some(preference) = preference {
            self.reasoning_summary_format = ReasoningSummaryFormat::for_preference(preference);
        }
    }

    pub(crate) fn reset_status_header(&mut self) {
        self.status_header.clone_from(&self.default_status_header);
    }
}
