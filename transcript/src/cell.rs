use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use codex_transcript_protocol::ConversationId;
use codex_transcript_protocol::config_types::ReasoningEffort;
use codex_transcript_protocol::parse_command::ParsedCommand;
use codex_transcript_protocol::plan_tool::PlanItemArg;
use codex_transcript_protocol::protocol::ExecOutputStream;
use codex_transcript_protocol::protocol::FileChange;
use codex_transcript_protocol::protocol::InputMessageKind;
use codex_transcript_protocol::protocol::McpInvocation;
use indexmap::IndexSet;
use serde::Serialize;
use strum_macros::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellId(pub u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the transcript.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub id: CellId,
    pub timestamp: DateTime<Utc>,
    /// Source events that contributed to this cell, in arrival order.
    pub event_ids: IndexSet<String>,
    #[serde(flatten)]
    pub body: CellBody,
}

impl Cell {
    pub fn kind(&self) -> CellKind {
        self.body.kind()
    }

    pub fn record_event(&mut self, event_id: &str) {
        if !self.event_ids.contains(event_id) {
            self.event_ids.insert(event_id.to_string());
        }
    }

    /// Reasoning cells without a visible summary are never shown and do not
    /// interrupt exploration groups.
    pub fn is_hidden_reasoning(&self) -> bool {
        matches!(&self.body, CellBody::AgentReasoning(cell) if !cell.visible)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CellKind {
    SessionConfigured,
    UserMessage,
    AgentMessage,
    AgentReasoning,
    Task,
    Exec,
    ExecApproval,
    Plan,
    Status,
    Error,
    Patch,
    PatchApproval,
    Tool,
    Generic,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CellBody {
    SessionConfigured(SessionConfiguredCell),
    UserMessage(UserMessageCell),
    AgentMessage(AgentMessageCell),
    AgentReasoning(AgentReasoningCell),
    Task(TaskCell),
    Exec(ExecCell),
    ExecApproval(ExecApprovalCell),
    Plan(PlanCell),
    Status(StatusCell),
    Error(ErrorCell),
    Patch(PatchCell),
    PatchApproval(PatchApprovalCell),
    Tool(ToolCell),
    Generic(GenericCell),
}

impl CellBody {
    pub fn kind(&self) -> CellKind {
        match self {
            CellBody::SessionConfigured(_) => CellKind::SessionConfigured,
            CellBody::UserMessage(_) => CellKind::UserMessage,
            CellBody::AgentMessage(_) => CellKind::AgentMessage,
            CellBody::AgentReasoning(_) => CellKind::AgentReasoning,
            CellBody::Task(_) => CellKind::Task,
            CellBody::Exec(_) => CellKind::Exec,
            CellBody::ExecApproval(_) => CellKind::ExecApproval,
            CellBody::Plan(_) => CellKind::Plan,
            CellBody::Status(_) => CellKind::Status,
            CellBody::Error(_) => CellKind::Error,
            CellBody::Patch(_) => CellKind::Patch,
            CellBody::PatchApproval(_) => CellKind::PatchApproval,
            CellBody::Tool(_) => CellKind::Tool,
            CellBody::Generic(_) => CellKind::Generic,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionConfiguredCell {
    pub session_id: ConversationId,
    pub model: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub rollout_path: PathBuf,
    pub history_entry_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserMessageCell {
    pub message: String,
    pub message_kind: InputMessageKind,
    pub images: Option<Vec<String>>,
    pub item_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentMessageCell {
    pub message: String,
    pub streaming: bool,
    pub item_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentReasoningCell {
    pub text: String,
    pub streaming: bool,
    pub visible: bool,
    pub item_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Started,
    Complete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskCell {
    pub status: TaskStatus,
    pub model_context_window: Option<u64>,
    pub last_agent_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecStatus {
    Running,
    Succeeded,
    Failed,
}

impl ExecStatus {
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            ExecStatus::Succeeded
        } else {
            ExecStatus::Failed
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecOutputChunk {
    pub stream: ExecOutputStream,
    pub chunk: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExplorationCall {
    pub call_id: String,
    pub command: Vec<String>,
    pub parsed: Vec<ParsedCommand>,
    pub status: ExecStatus,
    pub duration: Option<Duration>,
}

/// Consecutive read/list/search calls folded into a single exec cell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Exploration {
    pub calls: Vec<ExplorationCall>,
}

impl Exploration {
    /// The latest call with this id; a reused id routes to its newest call.
    pub fn call_mut(&mut self, call_id: &str) -> Option<&mut ExplorationCall> {
        self.calls.iter_mut().rev().find(|call| call.call_id == call_id)
    }

    pub fn any_running(&self) -> bool {
        self.calls
            .iter()
            .any(|call| call.status == ExecStatus::Running)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecCell {
    /// Most recent call routed to this cell.
    pub call_id: String,
    pub command: Vec<String>,
    pub cwd: PathBuf,
    pub parsed: Vec<ParsedCommand>,
    pub status: ExecStatus,
    pub stdout: String,
    pub stderr: String,
    pub aggregated_output: String,
    pub formatted_output: String,
    pub exit_code: Option<i32>,
    pub duration: Option<Duration>,
    pub streaming: bool,
    pub output_chunks: Vec<ExecOutputChunk>,
    pub exploration: Option<Exploration>,
}

impl ExecCell {
    pub fn is_running(&self) -> bool {
        self.status == ExecStatus::Running
            || self
                .exploration
                .as_ref()
                .is_some_and(Exploration::any_running)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalDecision {
    Pending,
    Approved,
    ApprovedForSession,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecApprovalCell {
    pub call_id: String,
    pub command: Vec<String>,
    pub cwd: PathBuf,
    pub reason: Option<String>,
    pub decision: ApprovalDecision,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatchApprovalCell {
    pub call_id: String,
    pub reason: Option<String>,
    pub grant_root: Option<PathBuf>,
    pub changes: HashMap<PathBuf, FileChange>,
    pub decision: ApprovalDecision,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Applying,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatchCell {
    pub call_id: String,
    pub auto_approved: bool,
    pub changes: HashMap<PathBuf, FileChange>,
    pub status: PatchStatus,
    pub stdout: String,
    pub stderr: String,
    pub success: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanCell {
    pub explanation: Option<String>,
    pub steps: Vec<PlanItemArg>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusType {
    TurnAborted,
    Background,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusCell {
    pub status_type: StatusType,
    pub summary: String,
    /// The originating event payload.
    pub data: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Error,
    Stream,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorCell {
    pub severity: ErrorSeverity,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ToolType {
    Mcp,
    WebSearch,
    ViewImage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCell {
    pub tool_type: ToolType,
    pub status: ToolStatus,
    pub call_id: String,
    pub invocation: Option<McpInvocation>,
    pub result: Option<serde_json::Value>,
    pub duration: Option<Duration>,
    pub path: Option<PathBuf>,
    pub query: Option<String>,
    pub item_id: Option<String>,
}

impl ToolCell {
    pub(crate) fn new(tool_type: ToolType, call_id: &str, status: ToolStatus) -> Self {
        Self {
            tool_type,
            status,
            call_id: call_id.to_string(),
            invocation: None,
            result: None,
            duration: None,
            path: None,
            query: None,
            item_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenericCell {
    pub event_type: String,
    pub payload: serde_json::Value,
}

macro_rules! body_accessors {
    ($( $variant:ident => $ty:ty, $as_ref:ident, $as_mut:ident; )*) => {
        impl CellBody {
            $(
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match self {
                        CellBody::$variant(cell) => Some(cell),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        CellBody::$variant(cell) => Some(cell),
                        _ => None,
                    }
                }
            )*
        }
    };
}

body_accessors! {
    UserMessage => UserMessageCell, as_user_message, as_user_message_mut;
    AgentMessage => AgentMessageCell, as_agent_message, as_agent_message_mut;
    AgentReasoning => AgentReasoningCell, as_agent_reasoning, as_agent_reasoning_mut;
    Task => TaskCell, as_task, as_task_mut;
    Exec => ExecCell, as_exec, as_exec_mut;
    ExecApproval => ExecApprovalCell, as_exec_approval, as_exec_approval_mut;
    PatchApproval => PatchApprovalCell, as_patch_approval, as_patch_approval_mut;
    Patch => PatchCell, as_patch, as_patch_mut;
    Tool => ToolCell, as_tool, as_tool_mut;
}
