use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

/// Best-effort classification of one sub-command of a shell invocation, as
/// reported by the agent runtime alongside `exec_command_begin`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedCommand {
    Read {
        cmd: String,
        name: String,
        /// (Best effort) Path to the file being read by the command. When
        /// relative, it should be resolved against the command's `cwd`.
        path: PathBuf,
    },
    ListFiles {
        cmd: String,
        #[serde(default)]
        path: Option<String>,
    },
    Search {
        cmd: String,
        #[serde(default)]
        query: Option<String>,
        #[serde(default)]
        path: Option<String>,
    },
    Unknown {
        cmd: String,
    },
}

impl ParsedCommand {
    pub fn cmd(&self) -> &str {
        match self {
            ParsedCommand::Read { cmd, .. }
            | ParsedCommand::ListFiles { cmd, .. }
            | ParsedCommand::Search { cmd, .. }
            | ParsedCommand::Unknown { cmd } => cmd,
        }
    }

    /// Read, list and search commands only look at the workspace.
    pub fn is_exploration(&self) -> bool {
        matches!(
            self,
            ParsedCommand::Read { .. }
                | ParsedCommand::ListFiles { .. }
                | ParsedCommand::Search { .. }
        )
    }
}
