use crate::user_input::UserInput;
use serde::Deserialize;
use serde::Serialize;

/// A finished unit of a turn, delivered by `item_completed`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnItem {
    UserMessage(UserMessageItem),
    AgentMessage(AgentMessageItem),
    Reasoning(ReasoningItem),
    WebSearch(WebSearchItem),
}

/// Payload of `item_completed`. Item kinds this client does not model are
/// kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CompletedItem {
    Known(TurnItem),
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserMessageItem {
    pub id: String,
    pub content: Vec<UserInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum AgentMessageContent {
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgentMessageItem {
    pub id: String,
    pub content: Vec<AgentMessageContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReasoningItem {
    pub id: String,
    pub summary_text: Vec<String>,
    #[serde(default)]
    pub raw_content: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebSearchItem {
    pub id: String,
    pub query: String,
}

fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl UserMessageItem {
    /// Text segments joined by blank lines, plus any image references.
    pub fn message_and_images(&self) -> (String, Option<Vec<String>>) {
        let mut text = Vec::new();
        let mut images = Vec::new();
        for input in &self.content {
            match input {
                UserInput::Text { text: segment } => text.push(segment.as_str()),
                UserInput::Image { image_url } => images.push(image_url.clone()),
                UserInput::LocalImage { path } => {
                    images.push(path.to_string_lossy().into_owned())
                }
            }
        }
        let images = if images.is_empty() {
            None
        } else {
            Some(images)
        };
        (join_segments(text), images)
    }
}

impl AgentMessageItem {
    pub fn text(&self) -> String {
        join_segments(self.content.iter().map(|entry| match entry {
            AgentMessageContent::Text { text } => text.as_str(),
        }))
    }
}

impl ReasoningItem {
    pub fn text(&self) -> String {
        join_segments(self.summary_text.iter().map(String::as_str))
    }
}
