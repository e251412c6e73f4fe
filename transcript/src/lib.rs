//! Folds the event stream of an agent conversation into a structured
//! transcript: an append-only log of cells plus the indices, streaming
//! buffers and turn-diff history needed to merge later events into it.

// Prevent accidental direct writes to stdout/stderr in library code.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod approvals;
pub mod cell;
mod config;
mod error;
pub mod explore;
mod log;
mod reducer;
mod side_effect;
mod snapshot;
mod store;
pub mod streaming;
mod turn_diff;
mod view;

pub use approvals::ApprovalRequest;
pub use config::DEFAULT_STATUS_HEADER;
pub use config::StoreOptions;
pub use config::TranscriptConfigToml;
pub use error::Result;
pub use error::TranscriptError;
pub use log::CellIndices;
pub use log::CellLog;
pub use reducer::apply_event;
pub use reducer::reduce;
pub use side_effect::Severity;
pub use side_effect::SideEffect;
pub use snapshot::ConversationSnapshot;
pub use store::ConversationStore;
pub use store::parse_events_jsonl;
pub use turn_diff::TurnDiff;
pub use turn_diff::TurnDiffTracker;
pub use view::TranscriptEntry;
pub use view::build_transcript_view;
