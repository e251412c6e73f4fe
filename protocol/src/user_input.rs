use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

/// One piece of user-supplied input attached to a user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserInput {
    Text { text: String },
    /// Pre-encoded data: URI image.
    Image { image_url: String },
    /// Local image path provided by the user.
    LocalImage { path: PathBuf },
}
