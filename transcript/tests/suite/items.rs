#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use codex_transcript::Severity;
use codex_transcript::cell::ApprovalDecision;
use codex_transcript::cell::CellBody;
use codex_transcript::cell::CellKind;
use codex_transcript::cell::ErrorSeverity;
use codex_transcript::cell::PatchStatus;
use codex_transcript::cell::StatusType;
use codex_transcript::cell::ToolStatus;
use codex_transcript::cell::ToolType;
use codex_transcript_protocol::items::AgentMessageContent;
use codex_transcript_protocol::items::AgentMessageItem;
use codex_transcript_protocol::items::CompletedItem;
use codex_transcript_protocol::items::ReasoningItem;
use codex_transcript_protocol::items::TurnItem;
use codex_transcript_protocol::items::UserMessageItem;
use codex_transcript_protocol::items::WebSearchItem;
use codex_transcript_protocol::plan_tool::PlanItemArg;
use codex_transcript_protocol::plan_tool::StepStatus;
use codex_transcript_protocol::plan_tool::UpdatePlanArgs;
use codex_transcript_protocol::protocol::BackgroundEventEvent;
use codex_transcript_protocol::protocol::EventMsg;
use codex_transcript_protocol::protocol::ExecApprovalRequestEvent;
use codex_transcript_protocol::protocol::FileChange;
use codex_transcript_protocol::protocol::ItemCompletedEvent;
use codex_transcript_protocol::protocol::McpInvocation;
use codex_transcript_protocol::protocol::McpToolCallBeginEvent;
use codex_transcript_protocol::protocol::McpToolCallEndEvent;
use codex_transcript_protocol::protocol::PatchApplyBeginEvent;
use codex_transcript_protocol::protocol::PatchApplyEndEvent;
use codex_transcript_protocol::protocol::StreamErrorEvent;
use codex_transcript_protocol::protocol::ViewImageToolCallEvent;
use codex_transcript_protocol::protocol::WarningEvent;
use codex_transcript_protocol::protocol::WebSearchBeginEvent;
use codex_transcript_protocol::protocol::WebSearchEndEvent;
use codex_transcript_protocol::user_input::UserInput;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::Conversation;
use crate::common::agent_delta;
use crate::common::session_configured;
use crate::common::user_message;

fn item(item: TurnItem) -> EventMsg {
    EventMsg::ItemCompleted(ItemCompletedEvent {
        item: CompletedItem::Known(item),
    })
}

fn invocation() -> McpInvocation {
    McpInvocation {
        server: "docs".to_string(),
        tool: "lookup".to_string(),
        arguments: Some(json!({ "q": "watch channel" })),
    }
}

fn mcp_end(call_id: &str, result: Result<serde_json::Value, String>) -> EventMsg {
    EventMsg::McpToolCallEnd(McpToolCallEndEvent {
        call_id: call_id.to_string(),
        invocation: invocation(),
        duration: Duration::from_millis(30),
        result,
    })
}

fn patch_end(call_id: &str, success: bool) -> EventMsg {
    EventMsg::PatchApplyEnd(PatchApplyEndEvent {
        call_id: call_id.to_string(),
        stdout: "Success. Updated the following files:\nM src/lib.rs".to_string(),
        stderr: String::new(),
        success,
    })
}

#[test]
fn web_search_end_completes_the_running_cell() {
    let mut conversation = Conversation::default();
    conversation.send(EventMsg::WebSearchBegin(WebSearchBeginEvent {
        call_id: "ws1".to_string(),
    }));
    {
        let cells = conversation.cells();
        let tool = cells[0].body.as_tool().unwrap();
        assert_eq!(tool.status, ToolStatus::Running);
        assert_eq!(tool.query, None);
    }

    conversation.send(EventMsg::WebSearchEnd(WebSearchEndEvent {
        call_id: "ws1".to_string(),
        query: "tokio watch channel".to_string(),
    }));

    let cells = conversation.cells();
    assert_eq!(cells.len(), 1);
    let tool = cells[0].body.as_tool().unwrap();
    assert_eq!(tool.tool_type, ToolType::WebSearch);
    assert_eq!(tool.status, ToolStatus::Succeeded);
    assert_eq!(tool.query.as_deref(), Some("tokio watch channel"));
    assert_eq!(tool.item_id.as_deref(), Some("ws1"));
    assert_eq!(
        conversation.snapshot.log.item_position("ws1", CellKind::Tool),
        Some(0)
    );
}

#[test]
fn web_search_item_updates_the_same_cell() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        EventMsg::WebSearchBegin(WebSearchBeginEvent {
            call_id: "ws1".to_string(),
        }),
        item(TurnItem::WebSearch(WebSearchItem {
            id: "ws1".to_string(),
            query: "serde untagged".to_string(),
        })),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 1);
    let tool = cells[0].body.as_tool().unwrap();
    assert_eq!(tool.status, ToolStatus::Succeeded);
    assert_eq!(tool.query.as_deref(), Some("serde untagged"));
}

#[test]
fn web_search_end_without_begin_creates_a_cell() {
    let mut conversation = Conversation::default();
    conversation.send(EventMsg::WebSearchEnd(WebSearchEndEvent {
        call_id: "ws9".to_string(),
        query: "orphan".to_string(),
    }));

    let cells = conversation.cells();
    let tool = cells[0].body.as_tool().unwrap();
    assert_eq!(tool.status, ToolStatus::Succeeded);
    assert_eq!(tool.item_id.as_deref(), Some("ws9"));
}

#[test]
fn completed_user_item_merges_with_the_open_user_cell() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        user_message("Summarize the repo"),
        item(TurnItem::UserMessage(UserMessageItem {
            id: "u1".to_string(),
            content: vec![
                UserInput::Text {
                    text: "Summarize the repo".to_string(),
                },
                UserInput::LocalImage {
                    path: PathBuf::from("/tmp/shot.png"),
                },
            ],
        })),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 1);
    let user = cells[0].body.as_user_message().unwrap();
    assert_eq!(user.item_id.as_deref(), Some("u1"));
    assert_eq!(user.images, Some(vec!["/tmp/shot.png".to_string()]));
    assert_eq!(
        conversation
            .snapshot
            .log
            .item_position("u1", CellKind::UserMessage),
        Some(0)
    );
}

#[test]
fn completed_agent_item_finishes_the_streamed_message() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        agent_delta("Partial"),
        item(TurnItem::AgentMessage(AgentMessageItem {
            id: "a1".to_string(),
            content: vec![
                AgentMessageContent::Text {
                    text: "First paragraph.".to_string(),
                },
                AgentMessageContent::Text {
                    text: "Second paragraph.".to_string(),
                },
            ],
        })),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 1);
    let agent = cells[0].body.as_agent_message().unwrap();
    assert_eq!(agent.message, "First paragraph.\n\nSecond paragraph.");
    assert!(!agent.streaming);
    assert_eq!(agent.item_id.as_deref(), Some("a1"));
}

#[test]
fn completed_reasoning_item_is_rewritten_in_place() {
    let reasoning = |summary: &[&str]| {
        item(TurnItem::Reasoning(ReasoningItem {
            id: "r1".to_string(),
            summary_text: summary.iter().copied().map(str::to_string).collect(),
            raw_content: Vec::new(),
        }))
    };
    let mut conversation = Conversation::default();
    conversation.send_all([
        session_configured("gpt-5-codex"),
        reasoning(&["**Plan**\nRead the config"]),
        reasoning(&["**Plan**\nRead the config", "Then the tests"]),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 2);
    let reasoning = cells[1].body.as_agent_reasoning().unwrap();
    assert_eq!(reasoning.text, "Read the config\n\nThen the tests");
    assert_eq!(reasoning.item_id.as_deref(), Some("r1"));
    assert!(reasoning.visible);
}

#[test]
fn unknown_items_become_generic_cells() {
    let mut conversation = Conversation::default();
    let msg: EventMsg = serde_json::from_value(json!({
        "type": "item_completed",
        "item": { "type": "todo_list", "id": "t1", "items": ["a", "b"] },
    }))
    .unwrap();
    conversation.send(msg);
    conversation.send(EventMsg::ItemCompleted(ItemCompletedEvent {
        item: CompletedItem::Other(json!({ "id": "x" })),
    }));

    let generic: Vec<_> = conversation
        .cells()
        .into_iter()
        .filter_map(|cell| match &cell.body {
            CellBody::Generic(generic) => Some(generic.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(generic.len(), 2);
    assert_eq!(generic[0].event_type, "todo_list");
    assert_eq!(generic[0].payload["items"], json!(["a", "b"]));
    assert_eq!(generic[1].event_type, "item_completed");
}

#[test]
fn mcp_calls_track_success_and_failure() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        EventMsg::McpToolCallBegin(McpToolCallBeginEvent {
            call_id: "m1".to_string(),
            invocation: invocation(),
        }),
        EventMsg::McpToolCallBegin(McpToolCallBeginEvent {
            call_id: "m2".to_string(),
            invocation: invocation(),
        }),
        mcp_end("m1", Ok(json!({ "content": [], "isError": true }))),
        mcp_end("m2", Ok(json!({ "content": [{ "type": "text", "text": "ok" }] }))),
        mcp_end("m3", Err("server disconnected".to_string())),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 3);
    let statuses: Vec<_> = cells
        .iter()
        .map(|cell| {
            let tool = cell.body.as_tool().unwrap();
            (tool.call_id.as_str(), tool.status)
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("m1", ToolStatus::Failed),
            ("m2", ToolStatus::Succeeded),
            ("m3", ToolStatus::Failed),
        ]
    );
    let orphan = cells[2].body.as_tool().unwrap();
    assert_eq!(orphan.result, Some(json!("server disconnected")));
    assert_eq!(orphan.duration, Some(Duration::from_millis(30)));
    assert_eq!(orphan.invocation, Some(invocation()));
}

#[test]
fn view_image_is_a_finished_tool_cell() {
    let mut conversation = Conversation::default();
    conversation.send(EventMsg::ViewImageToolCall(ViewImageToolCallEvent {
        call_id: "v1".to_string(),
        path: PathBuf::from("/repo/diagram.png"),
    }));

    let cells = conversation.cells();
    let tool = cells[0].body.as_tool().unwrap();
    assert_eq!(tool.tool_type, ToolType::ViewImage);
    assert_eq!(tool.status, ToolStatus::Succeeded);
    assert_eq!(tool.path, Some(PathBuf::from("/repo/diagram.png")));
}

#[test]
fn patch_end_updates_begin_or_stands_alone() {
    let changes = HashMap::from([(
        PathBuf::from("src/lib.rs"),
        FileChange::Update {
            unified_diff: "@@ -1 +1 @@\n-a\n+b\n".to_string(),
            move_path: None,
        },
    )]);
    let mut conversation = Conversation::default();
    conversation.send_all([
        EventMsg::PatchApplyBegin(PatchApplyBeginEvent {
            call_id: "p1".to_string(),
            auto_approved: true,
            changes: changes.clone(),
        }),
        patch_end("p1", true),
        patch_end("p2", false),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 2);
    let applied = cells[0].body.as_patch().unwrap();
    assert_eq!(applied.status, PatchStatus::Succeeded);
    assert_eq!(applied.changes, changes);
    assert!(applied.auto_approved);
    assert_eq!(applied.success, Some(true));

    let orphan = cells[1].body.as_patch().unwrap();
    assert_eq!(orphan.call_id, "p2");
    assert_eq!(orphan.status, PatchStatus::Failed);
    assert!(orphan.changes.is_empty());
    assert_eq!(conversation.snapshot.log.patch_position("p2"), Some(1));
}

#[test]
fn plan_updates_append_plan_cells() {
    let plan = UpdatePlanArgs {
        explanation: Some("Two steps".to_string()),
        plan: vec![
            PlanItemArg {
                step: "Read code".to_string(),
                status: StepStatus::Completed,
            },
            PlanItemArg {
                step: "Write tests".to_string(),
                status: StepStatus::InProgress,
            },
        ],
    };
    let mut conversation = Conversation::default();
    conversation.send_all([
        EventMsg::PlanUpdate(plan.clone()),
        EventMsg::PlanUpdate(plan.clone()),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 2);
    let CellBody::Plan(cell) = &cells[1].body else {
        panic!("expected plan cell");
    };
    assert_eq!(cell.explanation, plan.explanation);
    assert_eq!(cell.steps, plan.plan);
}

#[test]
fn approval_requests_start_pending() {
    let mut conversation = Conversation::default();
    conversation.send(EventMsg::ExecApprovalRequest(ExecApprovalRequestEvent {
        call_id: "c1".to_string(),
        command: vec!["rm".to_string(), "-rf".to_string(), "target".to_string()],
        cwd: PathBuf::from("/repo"),
        reason: Some("outside the sandbox".to_string()),
    }));

    let cells = conversation.cells();
    let approval = cells[0].body.as_exec_approval().unwrap();
    assert_eq!(approval.decision, ApprovalDecision::Pending);
    assert_eq!(approval.reason.as_deref(), Some("outside the sandbox"));
}

#[test]
fn background_events_keep_their_payload() {
    let mut conversation = Conversation::default();
    conversation.send(EventMsg::BackgroundEvent(BackgroundEventEvent {
        message: "Compacting history".to_string(),
    }));

    let cells = conversation.cells();
    let CellBody::Status(status) = &cells[0].body else {
        panic!("expected status cell");
    };
    assert_eq!(status.status_type, StatusType::Background);
    assert_eq!(status.summary, "Compacting history");
    assert_eq!(
        status.data,
        json!({ "type": "background_event", "message": "Compacting history" })
    );
}

#[test]
fn warnings_and_stream_errors_take_different_routes() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        EventMsg::Warning(WarningEvent {
            message: "approaching limit".to_string(),
        }),
        EventMsg::StreamError(StreamErrorEvent {
            message: "stream disconnected, retrying".to_string(),
        }),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 1);
    let CellBody::Error(error) = &cells[0].body else {
        panic!("expected error cell");
    };
    assert_eq!(error.severity, ErrorSeverity::Stream);

    let side_effects = &conversation.snapshot.side_effects;
    assert_eq!(side_effects.len(), 1);
    assert_eq!(side_effects[0].severity, Severity::Warning);
}

#[test]
fn unknown_events_leave_the_log_alone() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        EventMsg::from_value(json!({ "type": "entered_review_mode", "target": "HEAD" })),
        EventMsg::from_value(json!({ "type": "exec_command_end", "call_id": "c1" })),
    ]);

    assert!(conversation.snapshot.log.is_empty());
    assert!(conversation.snapshot.side_effects.is_empty());
}
