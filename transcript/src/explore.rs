//! Folding consecutive read/list/search commands into one exec cell.

use chrono::DateTime;
use chrono::Utc;
use codex_transcript_protocol::parse_command::ParsedCommand;
use codex_transcript_protocol::protocol::ExecCommandBeginEvent;
use codex_transcript_protocol::protocol::ExecCommandEndEvent;

use crate::cell::CellBody;
use crate::cell::ExecCell;
use crate::cell::ExecStatus;
use crate::cell::Exploration;
use crate::cell::ExplorationCall;
use crate::log::CellLog;

/// True when every parsed sub-command only inspects the workspace.
pub fn is_exploration(parsed: &[ParsedCommand]) -> bool {
    !parsed.is_empty() && parsed.iter().all(ParsedCommand::is_exploration)
}

/// The exec cell the next exploration call may join. Hidden reasoning cells
/// are skipped; any other cell ends the search.
pub fn find_exploration_anchor(log: &CellLog) -> Option<usize> {
    let (position, cell) = log
        .iter()
        .enumerate()
        .rev()
        .find(|(_, cell)| !cell.is_hidden_reasoning())?;
    cell.body
        .as_exec()
        .and_then(|exec| exec.exploration.as_ref())
        .map(|_| position)
}

fn exploration_call(event: &ExecCommandBeginEvent) -> ExplorationCall {
    ExplorationCall {
        call_id: event.call_id.clone(),
        command: event.command.clone(),
        parsed: event.parsed_cmd.clone(),
        status: ExecStatus::Running,
        duration: None,
    }
}

pub(crate) fn new_exec_cell(event: &ExecCommandBeginEvent, exploration: bool) -> ExecCell {
    ExecCell {
        call_id: event.call_id.clone(),
        command: event.command.clone(),
        cwd: event.cwd.clone(),
        parsed: event.parsed_cmd.clone(),
        status: ExecStatus::Running,
        stdout: String::new(),
        stderr: String::new(),
        aggregated_output: String::new(),
        formatted_output: String::new(),
        exit_code: None,
        duration: None,
        streaming: true,
        output_chunks: Vec::new(),
        exploration: exploration.then(|| Exploration {
            calls: vec![exploration_call(event)],
        }),
    }
}

/// An end event with no matching begin.
pub(crate) fn orphaned_exec_cell(event: &ExecCommandEndEvent) -> ExecCell {
    ExecCell {
        call_id: event.call_id.clone(),
        command: Vec::new(),
        cwd: Default::default(),
        parsed: Vec::new(),
        status: ExecStatus::from_exit_code(event.exit_code),
        stdout: event.stdout.clone(),
        stderr: event.stderr.clone(),
        aggregated_output: event.aggregated_output.clone(),
        formatted_output: event.formatted_output.clone(),
        exit_code: Some(event.exit_code),
        duration: Some(event.duration),
        streaming: false,
        output_chunks: Vec::new(),
        exploration: None,
    }
}

/// Adds the call to the anchor's wrapper and routes its events there.
pub(crate) fn extend_anchor(
    log: &mut CellLog,
    anchor: usize,
    event: &ExecCommandBeginEvent,
    event_id: &str,
) -> bool {
    let Some(cell) = log.get_mut(anchor) else {
        return false;
    };
    let Some(exec) = cell.body.as_exec_mut() else {
        return false;
    };
    let Some(exploration) = exec.exploration.as_mut() else {
        return false;
    };
    exploration.calls.push(exploration_call(event));
    exec.call_id = event.call_id.clone();
    exec.status = ExecStatus::Running;
    exec.streaming = true;
    cell.record_event(event_id);
    log.index_exec(&event.call_id, anchor);
    true
}

/// Applies an end event to the exec cell at `position`. Exploration cells only
/// update the matching call; the cell stays running while any call runs and
/// otherwise succeeds, even if individual calls failed.
pub(crate) fn finish_exec(log: &mut CellLog, position: usize, event: &ExecCommandEndEvent, event_id: &str) {
    let Some(cell) = log.get_mut(position) else {
        return;
    };
    cell.record_event(event_id);
    let Some(exec) = cell.body.as_exec_mut() else {
        return;
    };
    match exec.exploration.as_mut() {
        Some(exploration) => {
            if let Some(call) = exploration.call_mut(&event.call_id) {
                call.status = ExecStatus::from_exit_code(event.exit_code);
                call.duration = Some(event.duration);
            }
            let still_running = exploration.any_running();
            exec.status = if still_running {
                ExecStatus::Running
            } else {
                ExecStatus::Succeeded
            };
            exec.streaming = still_running;
        }
        None => {
            exec.status = ExecStatus::from_exit_code(event.exit_code);
            exec.stdout = event.stdout.clone();
            exec.stderr = event.stderr.clone();
            exec.aggregated_output = event.aggregated_output.clone();
            exec.formatted_output = event.formatted_output.clone();
            exec.exit_code = Some(event.exit_code);
            exec.duration = Some(event.duration);
            exec.streaming = false;
        }
    }
}

/// Forces every in-flight exec cell and exploration call to failed.
pub(crate) fn fail_running_execs(log: &mut CellLog, event_id: &str) {
    let running: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.body.as_exec().is_some_and(ExecCell::is_running))
        .map(|(position, _)| position)
        .collect();
    for position in running {
        let Some(cell) = log.get_mut(position) else {
            continue;
        };
        cell.record_event(event_id);
        if let Some(exec) = cell.body.as_exec_mut() {
            if let Some(exploration) = exec.exploration.as_mut() {
                for call in &mut exploration.calls {
                    if call.status == ExecStatus::Running {
                        call.status = ExecStatus::Failed;
                    }
                }
            }
            exec.status = ExecStatus::Failed;
            exec.streaming = false;
        }
    }
}

pub(crate) fn push_exec_cell(
    log: &mut CellLog,
    timestamp: DateTime<Utc>,
    event_id: &str,
    cell: ExecCell,
) -> usize {
    let call_id = cell.call_id.clone();
    let position = log.push(timestamp, event_id, CellBody::Exec(cell));
    log.index_exec(&call_id, position);
    position
}
