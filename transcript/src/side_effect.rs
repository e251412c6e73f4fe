use serde::Serialize;
use strum_macros::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A notification for the surrounding application to present. Produced as a
/// byproduct of reducing an event and consumed once via drain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SideEffect {
    pub severity: Severity,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SideEffect {
    pub fn warning(description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            title: "Warning".to_string(),
            description: Some(description.into()),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: "Error".to_string(),
            description: Some(description.into()),
        }
    }
}
