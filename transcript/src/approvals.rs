use std::collections::HashMap;
use std::path::PathBuf;

use codex_transcript_protocol::protocol::EventMsg;
use codex_transcript_protocol::protocol::FileChange;
use serde::Serialize;

use crate::cell::ApprovalDecision;
use crate::cell::CellBody;
use crate::log::CellLog;

/// An approval the agent is waiting on, handed to whatever surface asks the
/// user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalRequest {
    Exec {
        call_id: String,
        command: Vec<String>,
        cwd: PathBuf,
        reason: Option<String>,
    },
    Patch {
        call_id: String,
        reason: Option<String>,
        grant_root: Option<PathBuf>,
        changes: HashMap<PathBuf, FileChange>,
    },
}

impl ApprovalRequest {
    pub fn from_event(msg: &EventMsg) -> Option<Self> {
        match msg {
            EventMsg::ExecApprovalRequest(ev) => Some(ApprovalRequest::Exec {
                call_id: ev.call_id.clone(),
                command: ev.command.clone(),
                cwd: ev.cwd.clone(),
                reason: ev.reason.clone(),
            }),
            EventMsg::ApplyPatchApprovalRequest(ev) => Some(ApprovalRequest::Patch {
                call_id: ev.call_id.clone(),
                reason: ev.reason.clone(),
                grant_root: ev.grant_root.clone(),
                changes: ev.changes.clone(),
            }),
            _ => None,
        }
    }

    pub fn call_id(&self) -> &str {
        match self {
            ApprovalRequest::Exec { call_id, .. } | ApprovalRequest::Patch { call_id, .. } => {
                call_id
            }
        }
    }
}

/// Records the user's answer on the most recent approval cell for `call_id`.
/// Returns false when no such cell exists.
pub(crate) fn record_decision(
    log: &mut CellLog,
    call_id: &str,
    decision: ApprovalDecision,
) -> bool {
    let position = log.iter().rposition(|cell| match &cell.body {
        CellBody::ExecApproval(approval) => approval.call_id == call_id,
        CellBody::PatchApproval(approval) => approval.call_id == call_id,
        _ => false,
    });
    let Some(cell) = position.and_then(|position| log.get_mut(position)) else {
        return false;
    };
    match &mut cell.body {
        CellBody::ExecApproval(approval) => approval.decision = decision,
        CellBody::PatchApproval(approval) => approval.decision = decision,
        _ => return false,
    }
    true
}
