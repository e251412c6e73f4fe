use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Failures at the edges of the transcript: decoding input, encoding
/// exports and reading configuration. Reducing an event never fails.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("failed to decode conversation event on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode conversation event: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid store config: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
