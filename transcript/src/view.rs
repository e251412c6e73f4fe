//! Display projection over the flat cell log. Finished turns fold their
//! intermediate cells (reasoning, tool calls, plans) behind a single entry.

use serde::Serialize;

use crate::cell::Cell;
use crate::cell::CellBody;
use crate::cell::CellKind;
use crate::cell::StatusType;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TranscriptEntry {
    Cell {
        position: usize,
    },
    CollapsedTurn {
        /// Stable across streaming updates of the cells involved.
        turn_key: String,
        user_position: usize,
        final_position: usize,
        hidden_positions: Vec<usize>,
    },
}

/// A cell that ends the turn opened by the preceding user message.
fn is_final(cell: &Cell) -> bool {
    match &cell.body {
        CellBody::AgentMessage(_) => true,
        CellBody::Status(status) => status.status_type == StatusType::TurnAborted,
        _ => false,
    }
}

fn turn_key(user: &Cell, user_position: usize, last: &Cell, final_position: usize) -> String {
    format!(
        "turn::{user_position}::{final_position}::{}::{}",
        user.id, last.id
    )
}

pub fn build_transcript_view<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Vec<TranscriptEntry> {
    let cells: Vec<&Cell> = cells.into_iter().collect();
    let mut entries = Vec::with_capacity(cells.len());
    let mut position = 0;

    while position < cells.len() {
        let user = cells[position];
        if user.kind() != CellKind::UserMessage {
            entries.push(TranscriptEntry::Cell { position });
            position += 1;
            continue;
        }

        let user_position = position;
        let mut intermediate = Vec::new();
        let mut final_position = None;
        position += 1;
        while let Some(cell) = cells.get(position) {
            if cell.kind() == CellKind::UserMessage {
                break;
            }
            if is_final(cell) {
                final_position = Some(position);
                position += 1;
                break;
            }
            intermediate.push(position);
            position += 1;
        }

        entries.push(TranscriptEntry::Cell {
            position: user_position,
        });
        let renderable: Vec<usize> = intermediate
            .iter()
            .copied()
            .filter(|&hidden| !cells[hidden].is_hidden_reasoning())
            .collect();
        match final_position {
            Some(final_position) if !renderable.is_empty() => {
                entries.push(TranscriptEntry::CollapsedTurn {
                    turn_key: turn_key(user, user_position, cells[final_position], final_position),
                    user_position,
                    final_position,
                    hidden_positions: renderable,
                });
            }
            _ => {
                entries.extend(
                    intermediate
                        .into_iter()
                        .chain(final_position)
                        .map(|position| TranscriptEntry::Cell { position }),
                );
            }
        }
    }

    entries
}
