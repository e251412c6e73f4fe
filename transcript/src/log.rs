//! Append-only cell log and the lookup indices that point into it.
//!
//! Positions handed out by [`CellLog::push`] stay valid for the lifetime of
//! the conversation: cells are only ever mutated in place, never removed or
//! reordered. Cells are shared between snapshots and copied on first write.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use indexmap::IndexSet;
use serde::Serialize;

use crate::cell::Cell;
use crate::cell::CellBody;
use crate::cell::CellId;
use crate::cell::CellKind;
use crate::cell::ToolType;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CellIndices {
    exec: BTreeMap<String, usize>,
    tool: BTreeMap<ToolType, BTreeMap<String, usize>>,
    patch: BTreeMap<String, usize>,
    item: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellLog {
    cells: Vec<Arc<Cell>>,
    next_id: u64,
    indices: CellIndices,
}

impl Default for CellLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CellLog {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            next_id: 1,
            indices: CellIndices::default(),
        }
    }

    /// Appends a cell built from `body` and returns its position.
    pub fn push(&mut self, timestamp: DateTime<Utc>, event_id: &str, body: CellBody) -> usize {
        let id = self.next_cell_id();
        let mut event_ids = IndexSet::new();
        event_ids.insert(event_id.to_string());
        self.cells.push(Arc::new(Cell {
            id,
            timestamp,
            event_ids,
            body,
        }));
        self.cells.len() - 1
    }

    pub fn get(&self, position: usize) -> Option<&Cell> {
        self.cells.get(position).map(AsRef::as_ref)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Cell> {
        self.cells.get_mut(position).map(Arc::make_mut)
    }

    pub fn cells(&self) -> &[Arc<Cell>] {
        &self.cells
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Cell> + ExactSizeIterator {
        self.cells.iter().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn next_cell_id(&mut self) -> CellId {
        let id = CellId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn kind_at(&self, position: usize) -> Option<CellKind> {
        self.get(position).map(Cell::kind)
    }

    fn verified(&self, position: Option<usize>, kind: CellKind) -> Option<usize> {
        position.filter(|&position| self.kind_at(position) == Some(kind))
    }

    pub fn index_exec(&mut self, call_id: &str, position: usize) {
        self.indices.exec.insert(call_id.to_string(), position);
    }

    pub fn exec_position(&self, call_id: &str) -> Option<usize> {
        self.verified(self.indices.exec.get(call_id).copied(), CellKind::Exec)
    }

    pub fn index_tool(&mut self, tool_type: ToolType, call_id: &str, position: usize) {
        self.indices
            .tool
            .entry(tool_type)
            .or_default()
            .insert(call_id.to_string(), position);
    }

    pub fn tool_position(&self, tool_type: ToolType, call_id: &str) -> Option<usize> {
        let position = self
            .indices
            .tool
            .get(&tool_type)
            .and_then(|by_call| by_call.get(call_id))
            .copied();
        self.verified(position, CellKind::Tool).filter(|&position| {
            self.get(position)
                .and_then(|cell| cell.body.as_tool())
                .is_some_and(|tool| tool.tool_type == tool_type)
        })
    }

    pub fn index_patch(&mut self, call_id: &str, position: usize) {
        self.indices.patch.insert(call_id.to_string(), position);
    }

    pub fn patch_position(&self, call_id: &str) -> Option<usize> {
        self.verified(self.indices.patch.get(call_id).copied(), CellKind::Patch)
    }

    pub fn index_item(&mut self, item_id: &str, position: usize) {
        self.indices.item.insert(item_id.to_string(), position);
    }

    /// Item ids may point at message, reasoning or tool cells; the caller
    /// names the kind it expects.
    pub fn item_position(&self, item_id: &str, kind: CellKind) -> Option<usize> {
        self.verified(self.indices.item.get(item_id).copied(), kind)
    }

    /// Most recent cell of `kind`, scanning from the end of the log.
    pub fn last_position_of(&self, kind: CellKind) -> Option<usize> {
        self.cells.iter().rposition(|cell| cell.kind() == kind)
    }
}
