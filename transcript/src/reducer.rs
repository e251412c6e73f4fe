//! The transition function: one handler per event kind, each mutating a
//! private copy of the snapshot.

use chrono::DateTime;
use chrono::Utc;
use codex_transcript_protocol::items::AgentMessageItem;
use codex_transcript_protocol::items::CompletedItem;
use codex_transcript_protocol::items::ReasoningItem;
use codex_transcript_protocol::items::TurnItem;
use codex_transcript_protocol::items::UserMessageItem;
use codex_transcript_protocol::items::WebSearchItem;
use codex_transcript_protocol::plan_tool::UpdatePlanArgs;
use codex_transcript_protocol::protocol::ApplyPatchApprovalRequestEvent;
use codex_transcript_protocol::protocol::ConversationEvent;
use codex_transcript_protocol::protocol::EventMsg;
use codex_transcript_protocol::protocol::ExecApprovalRequestEvent;
use codex_transcript_protocol::protocol::ExecCommandBeginEvent;
use codex_transcript_protocol::protocol::ExecCommandEndEvent;
use codex_transcript_protocol::protocol::ExecCommandOutputDeltaEvent;
use codex_transcript_protocol::protocol::ExecOutputStream;
use codex_transcript_protocol::protocol::InputMessageKind;
use codex_transcript_protocol::protocol::McpToolCallBeginEvent;
use codex_transcript_protocol::protocol::McpToolCallEndEvent;
use codex_transcript_protocol::protocol::PatchApplyBeginEvent;
use codex_transcript_protocol::protocol::PatchApplyEndEvent;
use codex_transcript_protocol::protocol::SessionConfiguredEvent;
use codex_transcript_protocol::protocol::TaskCompleteEvent;
use codex_transcript_protocol::protocol::TaskStartedEvent;
use codex_transcript_protocol::protocol::TokenCountEvent;
use codex_transcript_protocol::protocol::TurnAbortedEvent;
use codex_transcript_protocol::protocol::ViewImageToolCallEvent;
use codex_transcript_protocol::protocol::WebSearchBeginEvent;
use codex_transcript_protocol::protocol::WebSearchEndEvent;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use crate::cell::AgentReasoningCell;
use crate::cell::ApprovalDecision;
use crate::cell::CellBody;
use crate::cell::CellKind;
use crate::cell::ErrorCell;
use crate::cell::ErrorSeverity;
use crate::cell::ExecApprovalCell;
use crate::cell::ExecOutputChunk;
use crate::cell::GenericCell;
use crate::cell::PatchApprovalCell;
use crate::cell::PatchCell;
use crate::cell::PatchStatus;
use crate::cell::PlanCell;
use crate::cell::SessionConfiguredCell;
use crate::cell::StatusCell;
use crate::cell::StatusType;
use crate::cell::TaskCell;
use crate::cell::TaskStatus;
use crate::cell::ToolCell;
use crate::cell::ToolStatus;
use crate::cell::ToolType;
use crate::cell::UserMessageCell;
use crate::explore;
use crate::side_effect::SideEffect;
use crate::snapshot::ConversationSnapshot;
use crate::streaming::ReasoningSummaryFormat;
use crate::streaming::has_reasoning_body;
use crate::streaming::strip_reasoning_header;

/// Applies `event` to a copy of `snapshot` and returns the copy. Cells are
/// shared with the input until a handler writes to them.
pub fn reduce(snapshot: &ConversationSnapshot, event: &ConversationEvent) -> ConversationSnapshot {
    let mut next = snapshot.clone();
    apply_event(&mut next, event);
    next
}

/// In-place form of [`reduce`]. Never fails: unexpected events leave the
/// snapshot unchanged or produce a best-effort cell.
pub fn apply_event(snapshot: &mut ConversationSnapshot, event: &ConversationEvent) {
    let ctx = EventContext {
        event_id: &event.event_id,
        timestamp: event.timestamp,
    };
    trace!(event_id = ctx.event_id, kind = %event.msg, "applying event");

    match &event.msg {
        EventMsg::SessionConfigured(ev) => snapshot.on_session_configured(&ctx, event, ev),
        EventMsg::UserMessage(ev) => {
            let images = ev.images.clone().filter(|images| !images.is_empty());
            snapshot.on_user_message(&ctx, &ev.message, ev.kind.unwrap_or_default(), images);
        }
        EventMsg::AgentMessageDelta(ev) => snapshot.on_agent_message_delta(&ctx, &ev.delta),
        EventMsg::AgentMessage(ev) => {
            snapshot.on_agent_message(&ctx, &ev.message);
        }
        EventMsg::AgentReasoningDelta(ev) => snapshot.on_reasoning_delta(&ev.delta),
        EventMsg::AgentReasoningRawContentDelta(ev) => snapshot.on_reasoning_delta(&ev.delta),
        EventMsg::AgentReasoning(ev) => {
            snapshot.on_reasoning(&ctx, &ev.text);
        }
        EventMsg::AgentReasoningRawContent(ev) => {
            snapshot.on_reasoning(&ctx, &ev.text);
        }
        EventMsg::AgentReasoningSectionBreak(_) => snapshot.reasoning.section_break(),
        EventMsg::TaskStarted(ev) => snapshot.on_task_started(&ctx, ev),
        EventMsg::TaskComplete(ev) => snapshot.on_task_complete(&ctx, ev),
        EventMsg::TurnAborted(ev) => snapshot.on_turn_aborted(&ctx, ev),
        EventMsg::TokenCount(ev) => snapshot.on_token_count(ev),
        EventMsg::TurnDiff(ev) => {
            let diff = ev.unified_diff.clone().unwrap_or_default();
            snapshot.turn_diffs.record(ctx.event_id, ctx.timestamp, diff);
        }
        EventMsg::PlanUpdate(ev) => snapshot.on_plan_update(&ctx, ev),
        EventMsg::BackgroundEvent(ev) => {
            snapshot.push_status(&ctx, StatusType::Background, ev.message.clone(), &event.msg);
        }
        EventMsg::ExecCommandBegin(ev) => snapshot.on_exec_begin(&ctx, ev),
        EventMsg::ExecCommandOutputDelta(ev) => snapshot.on_exec_output_delta(&ctx, ev),
        EventMsg::ExecCommandEnd(ev) => snapshot.on_exec_end(&ctx, ev),
        EventMsg::ExecApprovalRequest(ev) => snapshot.on_exec_approval_request(&ctx, ev),
        EventMsg::ApplyPatchApprovalRequest(ev) => snapshot.on_patch_approval_request(&ctx, ev),
        EventMsg::PatchApplyBegin(ev) => snapshot.on_patch_begin(&ctx, ev),
        EventMsg::PatchApplyEnd(ev) => snapshot.on_patch_end(&ctx, ev),
        EventMsg::McpToolCallBegin(ev) => snapshot.on_mcp_begin(&ctx, ev),
        EventMsg::McpToolCallEnd(ev) => snapshot.on_mcp_end(&ctx, ev),
        EventMsg::WebSearchBegin(ev) => snapshot.on_web_search_begin(&ctx, ev),
        EventMsg::WebSearchEnd(ev) => snapshot.on_web_search_end(&ctx, ev),
        EventMsg::ViewImageToolCall(ev) => snapshot.on_view_image(&ctx, ev),
        EventMsg::ItemCompleted(ev) => snapshot.on_item_completed(&ctx, &ev.item),
        EventMsg::Warning(ev) => snapshot.side_effects.push(SideEffect::warning(&ev.message)),
        EventMsg::Error(ev) => {
            snapshot.push_error(&ctx, ErrorSeverity::Error, &ev.message);
            snapshot.side_effects.push(SideEffect::error(&ev.message));
        }
        EventMsg::StreamError(ev) => snapshot.push_error(&ctx, ErrorSeverity::Stream, &ev.message),
        EventMsg::Unknown(raw) => {
            debug!(event_id = ctx.event_id, kind = ?raw.get("type"), "ignoring unrecognised event");
        }
    }
}

struct EventContext<'a> {
    event_id: &'a str,
    timestamp: DateTime<Utc>,
}

impl ConversationSnapshot {
    fn on_session_configured(
        &mut self,
        ctx: &EventContext<'_>,
        event: &ConversationEvent,
        ev: &SessionConfiguredEvent,
    ) {
        self.conversation_id = Some(event.conversation_id);
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::SessionConfigured(SessionConfiguredCell {
                session_id: ev.session_id,
                model: ev.model.clone(),
                reasoning_effort: ev.reasoning_effort,
                rollout_path: ev.rollout_path.clone(),
                history_entry_count: ev.history_entry_count,
            }),
        );
        self.reasoning_summary_format = ReasoningSummaryFormat::for_model(&ev.model);
        if let Some(preference) = self.reasoning_summary_preference {
            self.reasoning_summary_format = ReasoningSummaryFormat::for_preference(preference);
        }
    }

    fn on_user_message(
        &mut self,
        ctx: &EventContext<'_>,
        message: &str,
        kind: InputMessageKind,
        images: Option<Vec<String>>,
    ) -> usize {
        let position = match self.cursors.user_message(&self.log) {
            Some(position) => {
                if let Some(cell) = self.log.get_mut(position) {
                    cell.timestamp = ctx.timestamp;
                    cell.record_event(ctx.event_id);
                    if let Some(user) = cell.body.as_user_message_mut() {
                        user.message = message.to_string();
                        user.message_kind = kind;
                        user.images = images;
                    }
                }
                position
            }
            None => {
                let position = self.log.push(
                    ctx.timestamp,
                    ctx.event_id,
                    CellBody::UserMessage(UserMessageCell {
                        message: message.to_string(),
                        message_kind: kind,
                        images,
                        item_id: None,
                    }),
                );
                self.cursors.user_message = Some(position);
                position
            }
        };
        self.turn_diffs.clear_latest();
        self.cursors.close_agent_message(&mut self.log);
        self.break_exploration_group = true;
        position
    }

    fn on_agent_message_delta(&mut self, ctx: &EventContext<'_>, delta: &str) {
        self.cursors
            .append_agent_delta(&mut self.log, delta, ctx.event_id, ctx.timestamp);
    }

    fn on_agent_message(&mut self, ctx: &EventContext<'_>, message: &str) -> usize {
        let position =
            self.cursors
                .finish_agent_message(&mut self.log, message, ctx.event_id, ctx.timestamp);
        self.cursors.user_message = None;
        position
    }

    fn on_reasoning_delta(&mut self, delta: &str) {
        if let Some(header) = self.reasoning.push_delta(delta) {
            self.status_header = header;
        }
    }

    /// Finalizes the buffered reasoning. Returns the new cell's position, or
    /// `None` when there was no body to show.
    fn on_reasoning(&mut self, ctx: &EventContext<'_>, explicit: &str) -> Option<usize> {
        let working = self.reasoning.working_text(explicit);
        let body = strip_reasoning_header(&working).trim().to_string();
        self.reasoning.clear();
        if body.is_empty() || !has_reasoning_body(&body) {
            trace!(event_id = ctx.event_id, "discarding header-only reasoning");
            return None;
        }
        Some(self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::AgentReasoning(AgentReasoningCell {
                text: body,
                streaming: false,
                visible: self.reasoning_summary_format == ReasoningSummaryFormat::Experimental,
                item_id: None,
            }),
        ))
    }

    fn on_task_started(&mut self, ctx: &EventContext<'_>, ev: &TaskStartedEvent) {
        self.pending_task_started_at = Some(ctx.timestamp);
        self.turn_diffs.start_turn();
        self.reasoning.clear_published();
        self.reset_status_header();
        if let Some(window) = ev.model_context_window {
            self.max_context_window = Some(window);
        }
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::Task(TaskCell {
                status: TaskStatus::Started,
                model_context_window: ev.model_context_window,
                last_agent_message: None,
                started_at: Some(ctx.timestamp),
                completed_at: None,
            }),
        );
    }

    fn on_task_complete(&mut self, ctx: &EventContext<'_>, ev: &TaskCompleteEvent) {
        self.cursors.close_agent_message(&mut self.log);
        let pending_started_at = self.pending_task_started_at.take();

        let open_task = self.log.last_position_of(CellKind::Task).filter(|&position| {
            self.log
                .get(position)
                .and_then(|cell| cell.body.as_task())
                .is_some_and(|task| task.status == TaskStatus::Started)
        });
        match open_task.and_then(|position| self.log.get_mut(position)) {
            Some(cell) => {
                cell.timestamp = ctx.timestamp;
                cell.record_event(ctx.event_id);
                if let Some(task) = cell.body.as_task_mut() {
                    task.status = TaskStatus::Complete;
                    task.last_agent_message.clone_from(&ev.last_agent_message);
                    task.completed_at = Some(ctx.timestamp);
                    task.started_at = task.started_at.or(pending_started_at);
                }
            }
            None => {
                debug!(event_id = ctx.event_id, "task complete without a started task");
                self.log.push(
                    ctx.timestamp,
                    ctx.event_id,
                    CellBody::Task(TaskCell {
                        status: TaskStatus::Complete,
                        model_context_window: None,
                        last_agent_message: ev.last_agent_message.clone(),
                        started_at: None,
                        completed_at: Some(ctx.timestamp),
                    }),
                );
            }
        }

        self.cursors.user_message = None;
        self.break_exploration_group = true;
        self.reset_status_header();
    }

    fn on_turn_aborted(&mut self, ctx: &EventContext<'_>, ev: &TurnAbortedEvent) {
        explore::fail_running_execs(&mut self.log, ctx.event_id);
        let data = serde_json::to_value(ev).unwrap_or(Value::Null);
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::Status(StatusCell {
                status_type: StatusType::TurnAborted,
                summary: format!("Turn aborted: {}", ev.reason),
                data,
            }),
        );
        self.reasoning.clear();
        self.turn_diffs.clear_latest();
        self.turn_diffs.end_turn();
        self.cursors.user_message = None;
        self.break_exploration_group = true;
        self.cursors.close_agent_message(&mut self.log);
        self.reset_status_header();
    }

    fn on_token_count(&mut self, ev: &TokenCountEvent) {
        self.token_info.clone_from(&ev.info);
        self.rate_limits.clone_from(&ev.rate_limits);
        let Some(info) = &ev.info else {
            return;
        };
        let usage = info
            .last_token_usage
            .as_ref()
            .unwrap_or(&info.total_token_usage);
        self.context_tokens_in_window = Some(usage.tokens_in_context_window());
        if let Some(window) = info.model_context_window {
            self.max_context_window = Some(window);
        }
    }

    fn on_plan_update(&mut self, ctx: &EventContext<'_>, ev: &UpdatePlanArgs) {
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::Plan(PlanCell {
                explanation: ev.explanation.clone(),
                steps: ev.plan.clone(),
            }),
        );
    }

    fn push_status(
        &mut self,
        ctx: &EventContext<'_>,
        status_type: StatusType,
        summary: String,
        msg: &EventMsg,
    ) {
        let data = serde_json::to_value(msg).unwrap_or(Value::Null);
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::Status(StatusCell {
                status_type,
                summary,
                data,
            }),
        );
    }

    fn push_error(&mut self, ctx: &EventContext<'_>, severity: ErrorSeverity, message: &str) {
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::Error(ErrorCell {
                severity,
                message: message.to_string(),
            }),
        );
    }

    fn on_exec_begin(&mut self, ctx: &EventContext<'_>, ev: &ExecCommandBeginEvent) {
        self.exec_decoders.entry(ev.call_id.clone()).or_default();
        let exploration = explore::is_exploration(&ev.parsed_cmd);

        if !self.break_exploration_group
            && exploration
            && let Some(anchor) = explore::find_exploration_anchor(&self.log)
            && explore::extend_anchor(&mut self.log, anchor, ev, ctx.event_id)
        {
            return;
        }

        self.break_exploration_group = false;
        explore::push_exec_cell(
            &mut self.log,
            ctx.timestamp,
            ctx.event_id,
            explore::new_exec_cell(ev, exploration),
        );
    }

    fn on_exec_output_delta(&mut self, ctx: &EventContext<'_>, ev: &ExecCommandOutputDeltaEvent) {
        let Some(position) = self.log.exec_position(&ev.call_id) else {
            debug!(call_id = %ev.call_id, "output for unknown exec call");
            return;
        };
        let text = self
            .exec_decoders
            .entry(ev.call_id.clone())
            .or_default()
            .decode(ev.stream, &ev.chunk);
        if text.is_empty() {
            return;
        }
        let Some(cell) = self.log.get_mut(position) else {
            return;
        };
        cell.record_event(ctx.event_id);
        if let Some(exec) = cell.body.as_exec_mut() {
            match ev.stream {
                ExecOutputStream::Stdout => exec.stdout.push_str(&text),
                ExecOutputStream::Stderr => exec.stderr.push_str(&text),
            }
            exec.aggregated_output.push_str(&text);
            exec.output_chunks.push(ExecOutputChunk {
                stream: ev.stream,
                chunk: text,
            });
        }
    }

    fn on_exec_end(&mut self, ctx: &EventContext<'_>, ev: &ExecCommandEndEvent) {
        match self.log.exec_position(&ev.call_id) {
            Some(position) => explore::finish_exec(&mut self.log, position, ev, ctx.event_id),
            None => {
                debug!(call_id = %ev.call_id, "exec end without begin");
                explore::push_exec_cell(
                    &mut self.log,
                    ctx.timestamp,
                    ctx.event_id,
                    explore::orphaned_exec_cell(ev),
                );
            }
        }
        self.exec_decoders.remove(&ev.call_id);
    }

    fn on_exec_approval_request(&mut self, ctx: &EventContext<'_>, ev: &ExecApprovalRequestEvent) {
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::ExecApproval(ExecApprovalCell {
                call_id: ev.call_id.clone(),
                command: ev.command.clone(),
                cwd: ev.cwd.clone(),
                reason: ev.reason.clone(),
                decision: ApprovalDecision::Pending,
            }),
        );
    }

    fn on_patch_approval_request(
        &mut self,
        ctx: &EventContext<'_>,
        ev: &ApplyPatchApprovalRequestEvent,
    ) {
        self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::PatchApproval(PatchApprovalCell {
                call_id: ev.call_id.clone(),
                reason: ev.reason.clone(),
                grant_root: ev.grant_root.clone(),
                changes: ev.changes.clone(),
                decision: ApprovalDecision::Pending,
            }),
        );
    }

    fn on_patch_begin(&mut self, ctx: &EventContext<'_>, ev: &PatchApplyBeginEvent) {
        let position = self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::Patch(PatchCell {
                call_id: ev.call_id.clone(),
                auto_approved: ev.auto_approved,
                changes: ev.changes.clone(),
                status: PatchStatus::Applying,
                stdout: String::new(),
                stderr: String::new(),
                success: None,
            }),
        );
        self.log.index_patch(&ev.call_id, position);
    }

    fn on_patch_end(&mut self, ctx: &EventContext<'_>, ev: &PatchApplyEndEvent) {
        let status = if ev.success {
            PatchStatus::Succeeded
        } else {
            PatchStatus::Failed
        };
        if let Some(position) = self.log.patch_position(&ev.call_id)
            && let Some(cell) = self.log.get_mut(position)
        {
            cell.record_event(ctx.event_id);
            if let Some(patch) = cell.body.as_patch_mut() {
                patch.status = status;
                patch.stdout.clone_from(&ev.stdout);
                patch.stderr.clone_from(&ev.stderr);
                patch.success = Some(ev.success);
            }
            return;
        }
        debug!(call_id = %ev.call_id, "patch end without begin");
        let position = self.log.push(
            ctx.timestamp,
            ctx.event_id,
            CellBody::Patch(PatchCell {
                call_id: ev.call_id.clone(),
                auto_approved: false,
                changes: Default::default(),
                status,
                stdout: ev.stdout.clone(),
                stderr: ev.stderr.clone(),
                success: Some(ev.success),
            }),
        );
        self.log.index_patch(&ev.call_id, position);
    }

    fn push_tool(&mut self, ctx: &EventContext<'_>, tool: ToolCell) -> usize {
        let tool_type = tool.tool_type;
        let call_id = tool.call_id.clone();
        let position = self.log.push(ctx.timestamp, ctx.event_id, CellBody::Tool(tool));
        self.log.index_tool(tool_type, &call_id, position);
        position
    }

    /// Runs `update` on the indexed tool cell, if there is one.
    fn update_tool(
        &mut self,
        ctx: &EventContext<'_>,
        tool_type: ToolType,
        call_id: &str,
        update: impl FnOnce(&mut ToolCell),
    ) -> Option<usize> {
        let position = self.log.tool_position(tool_type, call_id)?;
        let cell = self.log.get_mut(position)?;
        cell.record_event(ctx.event_id);
        if let Some(tool) = cell.body.as_tool_mut() {
            update(tool);
        }
        Some(position)
    }

    fn on_mcp_begin(&mut self, ctx: &EventContext<'_>, ev: &McpToolCallBeginEvent) {
        let mut tool = ToolCell::new(ToolType::Mcp, &ev.call_id, ToolStatus::Running);
        tool.invocation = Some(ev.invocation.clone());
        self.push_tool(ctx, tool);
    }

    fn on_mcp_end(&mut self, ctx: &EventContext<'_>, ev: &McpToolCallEndEvent) {
        let status = if ev.is_success() {
            ToolStatus::Succeeded
        } else {
            ToolStatus::Failed
        };
        let result = match &ev.result {
            Ok(value) => value.clone(),
            Err(message) => Value::String(message.clone()),
        };
        let apply = |tool: &mut ToolCell| {
            tool.status = status;
            tool.invocation = Some(ev.invocation.clone());
            tool.result = Some(result.clone());
            tool.duration = Some(ev.duration);
        };
        if self
            .update_tool(ctx, ToolType::Mcp, &ev.call_id, apply)
            .is_some()
        {
            return;
        }
        debug!(call_id = %ev.call_id, "mcp tool end without begin");
        let mut tool = ToolCell::new(ToolType::Mcp, &ev.call_id, status);
        apply(&mut tool);
        self.push_tool(ctx, tool);
    }

    fn on_web_search_begin(&mut self, ctx: &EventContext<'_>, ev: &WebSearchBeginEvent) {
        let restarted = self.update_tool(ctx, ToolType::WebSearch, &ev.call_id, |tool| {
            tool.status = ToolStatus::Running;
        });
        if restarted.is_none() {
            self.push_tool(
                ctx,
                ToolCell::new(ToolType::WebSearch, &ev.call_id, ToolStatus::Running),
            );
        }
    }

    fn on_web_search_end(&mut self, ctx: &EventContext<'_>, ev: &WebSearchEndEvent) {
        self.complete_web_search(ctx, &ev.call_id, &ev.query);
    }

    /// Completion shared by web-search end events and completed web-search
    /// items; the call id doubles as the item id.
    fn complete_web_search(&mut self, ctx: &EventContext<'_>, call_id: &str, query: &str) -> usize {
        let apply = |tool: &mut ToolCell| {
            tool.status = ToolStatus::Succeeded;
            tool.query = Some(query.to_string());
            tool.item_id = Some(call_id.to_string());
        };
        let position = match self.update_tool(ctx, ToolType::WebSearch, call_id, apply) {
            Some(position) => position,
            None => {
                let mut tool = ToolCell::new(ToolType::WebSearch, call_id, ToolStatus::Succeeded);
                apply(&mut tool);
                self.push_tool(ctx, tool)
            }
        };
        self.log.index_item(call_id, position);
        position
    }

    fn on_view_image(&mut self, ctx: &EventContext<'_>, ev: &ViewImageToolCallEvent) {
        let mut tool = ToolCell::new(ToolType::ViewImage, &ev.call_id, ToolStatus::Succeeded);
        tool.path = Some(ev.path.clone());
        self.push_tool(ctx, tool);
    }

    fn on_item_completed(&mut self, ctx: &EventContext<'_>, item: &CompletedItem) {
        match item {
            CompletedItem::Known(TurnItem::UserMessage(item)) => self.complete_user_item(ctx, item),
            CompletedItem::Known(TurnItem::AgentMessage(item)) => {
                self.complete_agent_item(ctx, item)
            }
            CompletedItem::Known(TurnItem::Reasoning(item)) => {
                self.complete_reasoning_item(ctx, item)
            }
            CompletedItem::Known(TurnItem::WebSearch(WebSearchItem { id, query })) => {
                self.complete_web_search(ctx, id, query);
            }
            CompletedItem::Other(payload) => {
                let event_type = payload
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("item_completed")
                    .to_string();
                self.log.push(
                    ctx.timestamp,
                    ctx.event_id,
                    CellBody::Generic(GenericCell {
                        event_type,
                        payload: payload.clone(),
                    }),
                );
            }
        }
    }

    fn complete_user_item(&mut self, ctx: &EventContext<'_>, item: &UserMessageItem) {
        let (message, images) = item.message_and_images();
        if let Some(position) = self.log.item_position(&item.id, CellKind::UserMessage)
            && let Some(cell) = self.log.get_mut(position)
        {
            cell.record_event(ctx.event_id);
            if let Some(user) = cell.body.as_user_message_mut() {
                user.message = message;
                user.images = images;
            }
            return;
        }
        let position = self.on_user_message(ctx, &message, InputMessageKind::Plain, images);
        self.attach_item(position, &item.id);
    }

    fn complete_agent_item(&mut self, ctx: &EventContext<'_>, item: &AgentMessageItem) {
        let message = item.text();
        if let Some(position) = self.log.item_position(&item.id, CellKind::AgentMessage)
            && let Some(cell) = self.log.get_mut(position)
        {
            cell.record_event(ctx.event_id);
            if let Some(agent) = cell.body.as_agent_message_mut() {
                agent.message = message;
                agent.streaming = false;
            }
            return;
        }
        let position = self.on_agent_message(ctx, &message);
        self.attach_item(position, &item.id);
    }

    fn complete_reasoning_item(&mut self, ctx: &EventContext<'_>, item: &ReasoningItem) {
        let text = item.text();
        if let Some(position) = self.log.item_position(&item.id, CellKind::AgentReasoning)
            && let Some(cell) = self.log.get_mut(position)
        {
            let body = strip_reasoning_header(&text).trim().to_string();
            if body.is_empty() {
                return;
            }
            cell.record_event(ctx.event_id);
            if let Some(reasoning) = cell.body.as_agent_reasoning_mut() {
                reasoning.text = body;
            }
            return;
        }
        if let Some(position) = self.on_reasoning(ctx, &text) {
            self.attach_item(position, &item.id);
        }
    }

    fn attach_item(&mut self, position: usize, item_id: &str) {
        let Some(cell) = self.log.get_mut(position) else {
            return;
        };
        let slot = match &mut cell.body {
            CellBody::UserMessage(cell) => &mut cell.item_id,
            CellBody::AgentMessage(cell) => &mut cell.item_id,
            CellBody::AgentReasoning(cell) => &mut cell.item_id,
            CellBody::Tool(cell) => &mut cell.item_id,
            _ => return,
        };
        *slot = Some(item_id.to_string());
        self.log.index_item(item_id, position);
    }
}
