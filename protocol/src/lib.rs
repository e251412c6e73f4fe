pub mod config_types;
mod conversation_id;
pub use conversation_id::ConversationId;
pub mod items;
pub mod parse_command;
pub mod plan_tool;
pub mod protocol;
pub mod user_input;
