use std::path::Path;

use codex_transcript_protocol::config_types::ReasoningSummary;
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_STATUS_HEADER: &str = "Working";

/// Store settings, read from the `[store]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Explicit reasoning summary preference; `none` hides reasoning cells.
    pub reasoning_summary: Option<ReasoningSummary>,
    /// Keep every ingested event for JSONL export.
    pub record_events: bool,
    /// Status line shown while no reasoning header is published.
    pub default_status_header: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            reasoning_summary: None,
            record_events: true,
            default_status_header: DEFAULT_STATUS_HEADER.to_string(),
        }
    }
}

/// On-disk config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TranscriptConfigToml {
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    pub store: StoreOptions,
}

impl TranscriptConfigToml {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}
