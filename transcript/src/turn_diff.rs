use chrono::DateTime;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;

/// Unified diff produced during one turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TurnDiff {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub unified_diff: String,
    pub turn_number: u64,
}

/// Keeps one diff per turn number, in the order turns first produced one,
/// plus the turn numbering state the diffs are keyed by.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TurnDiffTracker {
    history: IndexMap<u64, TurnDiff>,
    latest: Option<u64>,
    turn_counter: u64,
    active_turn: Option<u64>,
}

impl TurnDiffTracker {
    pub fn history(&self) -> impl Iterator<Item = &TurnDiff> {
        self.history.values()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn get(&self, turn_number: u64) -> Option<&TurnDiff> {
        self.history.get(&turn_number)
    }

    pub fn latest(&self) -> Option<&TurnDiff> {
        self.latest.and_then(|turn| self.history.get(&turn))
    }

    pub fn active_turn(&self) -> Option<u64> {
        self.active_turn
    }

    pub fn turn_counter(&self) -> u64 {
        self.turn_counter
    }

    /// A task started: opens the next turn.
    pub(crate) fn start_turn(&mut self) -> u64 {
        self.turn_counter = self.turn_counter.saturating_add(1);
        self.active_turn = Some(self.turn_counter);
        self.latest = None;
        self.turn_counter
    }

    pub(crate) fn end_turn(&mut self) {
        self.active_turn = None;
    }

    pub(crate) fn clear_latest(&mut self) {
        self.latest = None;
    }

    fn next_turn_number(&self) -> u64 {
        if let Some(active) = self.active_turn {
            active
        } else if let Some(last) = self.history.keys().next_back() {
            last.saturating_add(1)
        } else if self.turn_counter > 0 {
            self.turn_counter.saturating_add(1)
        } else {
            1
        }
    }

    /// Upserts the diff for the current turn and makes it the latest.
    pub(crate) fn record(
        &mut self,
        event_id: &str,
        timestamp: DateTime<Utc>,
        unified_diff: String,
    ) -> u64 {
        let turn_number = self.next_turn_number();
        self.history.insert(
            turn_number,
            TurnDiff {
                event_id: event_id.to_string(),
                timestamp,
                unified_diff,
                turn_number,
            },
        );
        self.latest = Some(turn_number);
        self.turn_counter = self.turn_counter.max(turn_number);
        self.active_turn = Some(turn_number);
        turn_number
    }
}
