use codex_transcript::ConversationSnapshot;
use codex_transcript::SideEffect;
use codex_transcript::TranscriptEntry;
use codex_transcript::cell::Cell;
use codex_transcript::cell::CellBody;
use codex_transcript::cell::ExecCell;
use codex_transcript::cell::ExecStatus;
use codex_transcript::cell::PatchStatus;
use codex_transcript::cell::TaskStatus;
use codex_transcript::cell::ToolCell;
use codex_transcript::cell::ToolStatus;
use codex_transcript::cell::ToolType;
use codex_transcript_protocol::protocol::FileChange;

use crate::console_writer::ConsoleWriter;

pub(crate) struct TranscriptPrinter {
    writer: Box<dyn ConsoleWriter>,
}

impl TranscriptPrinter {
    pub(crate) fn new(writer: Box<dyn ConsoleWriter>) -> Self {
        TranscriptPrinter { writer }
    }

    pub(crate) fn print_cells(&mut self, snapshot: &ConversationSnapshot) {
        for (position, cell) in snapshot.cells().enumerate() {
            self.print_cell(position, cell);
        }
    }

    /// Prints the folded view: a collapsed turn shows only its final cell.
    pub(crate) fn print_view(&mut self, snapshot: &ConversationSnapshot, entries: &[TranscriptEntry]) {
        for entry in entries {
            match entry {
                TranscriptEntry::Cell { position } => {
                    if let Some(cell) = snapshot.log.get(*position) {
                        self.print_cell(*position, cell);
                    }
                }
                TranscriptEntry::CollapsedTurn {
                    user_position,
                    final_position,
                    hidden_positions,
                    ..
                } => {
                    self.writer.collapsed_turn(
                        user_position + 1,
                        final_position.saturating_sub(1),
                        hidden_positions.len(),
                    );
                    if let Some(cell) = snapshot.log.get(*final_position) {
                        self.print_cell(*final_position, cell);
                    }
                }
            }
        }
    }

    pub(crate) fn print_side_effects(&mut self, side_effects: &[SideEffect]) {
        for effect in side_effects {
            self.writer
                .side_effect(&effect.title, effect.description.as_deref().unwrap_or_default());
        }
    }

    pub(crate) fn print_totals(&mut self, snapshot: &ConversationSnapshot, events: usize) {
        self.writer
            .totals(snapshot.log.len(), events, &snapshot.status_header);
    }

    fn print_cell(&mut self, position: usize, cell: &Cell) {
        match &cell.body {
            CellBody::SessionConfigured(session) => {
                let summary = format!("{} ({})", session.model, session.session_id);
                self.writer.cell(position, "session", &summary);
            }
            CellBody::UserMessage(user) => {
                self.writer.cell(position, "user", first_line(&user.message));
            }
            CellBody::AgentMessage(agent) => {
                let label = if agent.streaming { "agent (streaming)" } else { "agent" };
                self.writer.cell(position, label, first_line(&agent.message));
            }
            CellBody::AgentReasoning(reasoning) => {
                if reasoning.visible {
                    self.writer
                        .cell(position, "reasoning", first_line(&reasoning.text));
                }
            }
            CellBody::Task(task) => {
                let summary = match task.status {
                    TaskStatus::Started => "started".to_string(),
                    TaskStatus::Complete => match &task.last_agent_message {
                        Some(message) => format!("complete: {}", first_line(message)),
                        None => "complete".to_string(),
                    },
                };
                self.writer.cell(position, "task", &summary);
            }
            CellBody::Exec(exec) => self.print_exec(position, exec),
            CellBody::ExecApproval(approval) => {
                let summary = format!("{} [{}]", approval.command.join(" "), approval.decision);
                self.writer.cell(position, "approval", &summary);
            }
            CellBody::PatchApproval(approval) => {
                let summary = format!("{} file(s) [{}]", approval.changes.len(), approval.decision);
                self.writer.cell(position, "patch approval", &summary);
            }
            CellBody::Patch(patch) => {
                let status = match patch.status {
                    PatchStatus::Applying => "applying",
                    PatchStatus::Succeeded => "applied",
                    PatchStatus::Failed => "failed",
                };
                let mut changes = patch
                    .changes
                    .iter()
                    .map(|(path, change)| format!("{} {}", format_file_change(change), path.display()))
                    .collect::<Vec<_>>();
                changes.sort();
                let summary = format!("{status}: {}", changes.join(", "));
                self.writer.cell(position, "patch", &summary);
            }
            CellBody::Plan(plan) => {
                let summary = format!(
                    "{} step(s){}",
                    plan.steps.len(),
                    plan.explanation
                        .as_deref()
                        .map(|explanation| format!(": {}", first_line(explanation)))
                        .unwrap_or_default()
                );
                self.writer.cell(position, "plan", &summary);
            }
            CellBody::Status(status) => {
                self.writer.cell(position, "status", &status.summary);
            }
            CellBody::Error(error) => {
                self.writer.cell(position, "error", first_line(&error.message));
            }
            CellBody::Tool(tool) => {
                let label = tool.tool_type.to_string();
                self.writer.cell(position, &label, &describe_tool(tool));
            }
            CellBody::Generic(generic) => {
                self.writer.cell(position, "item", &generic.event_type);
            }
        }
    }

    fn print_exec(&mut self, position: usize, exec: &ExecCell) {
        let (command, detail) = match &exec.exploration {
            Some(exploration) => {
                let commands = exploration
                    .calls
                    .iter()
                    .map(|call| call.command.join(" "))
                    .collect::<Vec<_>>()
                    .join("; ");
                (commands, format!("({} calls)", exploration.calls.len()))
            }
            None => {
                let detail = match exec.exit_code {
                    Some(code) => format!("(exit {code})"),
                    None => String::new(),
                };
                (exec.command.join(" "), detail)
            }
        };
        match exec.status {
            ExecStatus::Running => self
                .writer
                .cell(position, "exec", &format!("{command} running")),
            ExecStatus::Succeeded => self.writer.exec_succeeded(position, &command, &detail),
            ExecStatus::Failed => self.writer.exec_failed(position, &command, &detail),
        }
    }
}

fn describe_tool(tool: &ToolCell) -> String {
    let status = match tool.status {
        ToolStatus::Running => "running",
        ToolStatus::Succeeded => "ok",
        ToolStatus::Failed => "failed",
    };
    let target = match tool.tool_type {
        ToolType::Mcp => tool
            .invocation
            .as_ref()
            .map(|invocation| format!("{}.{}", invocation.server, invocation.tool)),
        ToolType::WebSearch => tool.query.clone(),
        ToolType::ViewImage => tool.path.as_ref().map(|path| path.display().to_string()),
    };
    match target {
        Some(target) => format!("{target} ({status})"),
        None => format!("{} ({status})", tool.call_id),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

fn format_file_change(change: &FileChange) -> &'static str {
    match change {
        FileChange::Add { .. } => "A",
        FileChange::Delete { .. } => "D",
        FileChange::Update {
            move_path: Some(_), ..
        } => "R",
        FileChange::Update {
            move_path: None, ..
        } => "M",
    }
}
