#![allow(clippy::unwrap_used)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use codex_transcript::cell::CellKind;
use codex_transcript::cell::ExecStatus;
use codex_transcript_protocol::protocol::EventMsg;
use codex_transcript_protocol::protocol::TurnAbortReason;
use codex_transcript_protocol::protocol::TurnAbortedEvent;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::Conversation;
use crate::common::agent_delta;
use crate::common::agent_message;
use crate::common::call_ids;
use crate::common::exec_end;
use crate::common::read;
use crate::common::reasoning;
use crate::common::reasoning_delta;
use crate::common::run;
use crate::common::search;
use crate::common::session_configured;
use crate::common::task_complete;
use crate::common::user_message;

#[test]
fn consecutive_exploration_calls_share_one_cell() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        search("c1", "alpha"),
        exec_end("c1", 0),
        read("c2", "src/bar.rs"),
        exec_end("c2", 0),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 1);
    assert_eq!(call_ids(execs[0]), vec!["c1", "c2"]);
    assert_eq!(execs[0].status, ExecStatus::Succeeded);
    assert!(!execs[0].streaming);
}

#[test]
fn failed_call_does_not_fail_the_group() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        read("c1", "a.rs"),
        exec_end("c1", 0),
        read("c2", "missing.rs"),
        exec_end("c2", 1),
        search("c3", "beta"),
        exec_end("c3", 0),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 1);
    let calls = &execs[0].exploration.as_ref().unwrap().calls;
    let statuses: Vec<_> = calls.iter().map(|call| call.status).collect();
    assert_eq!(
        statuses,
        vec![ExecStatus::Succeeded, ExecStatus::Failed, ExecStatus::Succeeded]
    );
    assert_eq!(execs[0].status, ExecStatus::Succeeded);
}

#[test]
fn group_stays_running_until_every_call_ends() {
    let mut conversation = Conversation::default();
    conversation.send_all([read("c1", "a.rs"), read("c2", "b.rs"), exec_end("c1", 0)]);

    let execs = conversation.exec_cells();
    assert_eq!(execs[0].status, ExecStatus::Running);
    assert!(execs[0].streaming);
    assert_eq!(execs[0].call_id, "c2");

    conversation.send(exec_end("c2", 0));
    assert_eq!(conversation.exec_cells()[0].status, ExecStatus::Succeeded);
}

#[test]
fn header_only_reasoning_does_not_split_the_group() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        search("c1", "alpha"),
        exec_end("c1", 0),
        reasoning_delta("**Exploration pause**"),
        read("c2", "src/bar.rs"),
        exec_end("c2", 0),
    ]);

    assert_eq!(conversation.cells().len(), 1);
    assert_eq!(call_ids(conversation.exec_cells()[0]), vec!["c1", "c2"]);
}

#[test]
fn hidden_reasoning_cell_does_not_split_the_group() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        session_configured("gpt-5"),
        search("c1", "alpha"),
        exec_end("c1", 0),
        reasoning("**Plan**\nCheck the layout"),
        read("c2", "src/bar.rs"),
        exec_end("c2", 0),
    ]);

    assert_eq!(conversation.cells().len(), 3);
    assert_eq!(call_ids(conversation.exec_cells()[0]), vec!["c1", "c2"]);
}

#[test]
fn visible_reasoning_starts_a_new_group() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        session_configured("gpt-5-codex-latest"),
        search("c1", "alpha"),
        exec_end("c1", 0),
        reasoning("**Exploration pause**\nReviewing layout components"),
        read("c2", "src/bar.rs"),
        exec_end("c2", 0),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 2);
    assert_eq!(call_ids(execs[0]), vec!["c1"]);
    assert_eq!(call_ids(execs[1]), vec!["c2"]);
}

#[test]
fn earlier_groups_are_never_reopened() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        search("c1", "alpha"),
        exec_end("c1", 0),
        read("c2", "src/foo.rs"),
        exec_end("c2", 0),
        reasoning_delta("**Plan**"),
        read("c3", "src/state.rs"),
        exec_end("c3", 0),
        agent_message("I have a few ideas."),
        search("c4", "turn_diff"),
        exec_end("c4", 0),
    ]);

    let cells = conversation.cells();
    assert_eq!(cells.len(), 3);
    let execs = conversation.exec_cells();
    assert_eq!(call_ids(execs[0]), vec!["c1", "c2", "c3"]);
    assert_eq!(call_ids(execs[1]), vec!["c4"]);
}

#[test]
fn agent_messages_separate_exploration_runs() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        read("c1", "package.json"),
        exec_end("c1", 0),
        agent_message("First plan update"),
        read("c2", "src/sidebar.rs"),
        exec_end("c2", 0),
        agent_message("Second plan update"),
        read("c3", "src/state.rs"),
        exec_end("c3", 0),
    ]);

    let execs = conversation.exec_cells();
    let groups: Vec<_> = execs.iter().map(|exec| call_ids(exec)).collect();
    assert_eq!(groups, vec![vec!["c1"], vec!["c2"], vec!["c3"]]);
}

#[test]
fn delta_into_an_earlier_agent_cell_keeps_the_group() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        agent_delta("Initial plan"),
        read("c1", "package.json"),
        exec_end("c1", 0),
        agent_delta(" - gathering more context"),
        read("c2", "src/state.rs"),
        exec_end("c2", 0),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 1);
    assert_eq!(call_ids(execs[0]), vec!["c1", "c2"]);
    let cells = conversation.cells();
    let agent = cells[0].body.as_agent_message().unwrap();
    assert_eq!(agent.message, "Initial plan - gathering more context");
}

#[test]
fn task_completion_starts_a_new_group() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        task_complete(Some("Initial summary")),
        read("c1", "package.json"),
        exec_end("c1", 0),
        task_complete(Some("Updated summary")),
        read("c2", "src/index.rs"),
        exec_end("c2", 0),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 2);
    assert_eq!(call_ids(execs[0]), vec!["c1"]);
    assert_eq!(call_ids(execs[1]), vec!["c2"]);
}

#[test]
fn reused_call_id_after_a_user_message_opens_a_new_cell() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        read("c1", "a.rs"),
        exec_end("c1", 0),
        task_complete(None),
        user_message("and the other file?"),
        read("c1", "b.rs"),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 2);
    assert_eq!(execs[0].status, ExecStatus::Succeeded);
    assert!(!execs[0].streaming);
    assert_eq!(execs[1].status, ExecStatus::Running);
    assert_eq!(execs[1].command, vec!["cat".to_string(), "b.rs".to_string()]);
    assert_eq!(conversation.snapshot.log.exec_position("c1"), Some(3));

    conversation.send(exec_end("c1", 0));
    let execs = conversation.exec_cells();
    assert_eq!(execs[0].exploration.as_ref().unwrap().calls.len(), 1);
    assert_eq!(execs[1].status, ExecStatus::Succeeded);
}

#[test]
fn reused_call_id_within_a_group_ends_the_newest_call() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        read("c1", "a.rs"),
        exec_end("c1", 1),
        read("c1", "a.rs"),
        exec_end("c1", 0),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 1);
    let statuses: Vec<_> = execs[0]
        .exploration
        .as_ref()
        .unwrap()
        .calls
        .iter()
        .map(|call| call.status)
        .collect();
    assert_eq!(statuses, vec![ExecStatus::Failed, ExecStatus::Succeeded]);
    assert_eq!(execs[0].status, ExecStatus::Succeeded);
}

#[test]
fn exec_index_follows_the_anchor() {
    let mut conversation = Conversation::default();
    conversation.send_all([read("c1", "a.rs"), read("c2", "b.rs")]);

    let log = &conversation.snapshot.log;
    assert_eq!(log.exec_position("c1"), Some(0));
    assert_eq!(log.exec_position("c2"), Some(0));
    assert_eq!(log.get(0).unwrap().kind(), CellKind::Exec);
}

#[test]
fn abort_fails_in_flight_calls_and_breaks_the_group() {
    let mut conversation = Conversation::default();
    conversation.send_all([
        read("c1", "a.rs"),
        exec_end("c1", 0),
        read("c2", "b.rs"),
        EventMsg::TurnAborted(TurnAbortedEvent {
            reason: TurnAbortReason::Interrupted,
        }),
        read("c3", "c.rs"),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs.len(), 2);
    let calls = &execs[0].exploration.as_ref().unwrap().calls;
    assert_eq!(calls[0].status, ExecStatus::Succeeded);
    assert_eq!(calls[1].status, ExecStatus::Failed);
    assert_eq!(execs[0].status, ExecStatus::Failed);
    assert!(!execs[0].streaming);
    assert_eq!(call_ids(execs[1]), vec!["c3"]);
}

#[test]
fn base64_output_deltas_decode_per_stream() {
    let delta = |stream: &str, bytes: &[u8]| -> EventMsg {
        serde_json::from_value(json!({
            "type": "exec_command_output_delta",
            "call_id": "c1",
            "stream": stream,
            "chunk": STANDARD.encode(bytes),
        }))
        .unwrap()
    };
    let text = "compiling caf\u{e9}\n".as_bytes();
    let mut conversation = Conversation::default();
    conversation.send_all([
        run("c1", "cargo build"),
        delta("stdout", &text[..14]),
        delta("stdout", &text[14..]),
        delta("stderr", b"warning\n"),
        delta("stdout", b""),
    ]);

    let execs = conversation.exec_cells();
    assert_eq!(execs[0].stdout, "compiling caf\u{e9}\n");
    assert_eq!(execs[0].stderr, "warning\n");
    assert_eq!(execs[0].aggregated_output, "compiling caf\u{e9}\nwarning\n");
    assert_eq!(execs[0].output_chunks.len(), 3);
}
