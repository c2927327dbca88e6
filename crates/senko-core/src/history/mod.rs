//! Ordered turn storage.
//!
//! Insertion order is conversation order and is the only ordering guarantee; there are no
//! separate sequence numbers. `History` itself never talks to a view. Callers that render go
//! through [`crate::conversation::Conversation`], which pairs every mutation here with a
//! render-surface notification.

mod turn;

use chrono::Utc;
use serde::{Deserialize, Serialize};
pub use turn::{Sender, Turn, TurnId};

use crate::markup;

/// Counts reported by `stats()` and written into exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub edited: usize,
    pub hidden: usize,
    pub visible: usize,
}

#[derive(Debug, Default)]
pub struct History {
    turns: Vec<Turn>,
    next_id: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a history from previously exported turns, in order.
    ///
    /// Imported ids are discarded and fresh ones assigned so ids stay unique and increasing.
    pub fn restore(turns: impl IntoIterator<Item = Turn>) -> Self {
        let mut history = Self::new();
        for mut turn in turns {
            turn.id = history.allocate_id();
            history.turns.push(turn);
        }
        history
    }

    fn allocate_id(&mut self) -> TurnId {
        self.next_id += 1;
        TurnId(self.next_id)
    }

    /// Appends a turn stamped with the current time. Always succeeds.
    pub fn append(&mut self, content: impl Into<String>, sender: Sender, hidden: bool) -> &Turn {
        let id = self.allocate_id();
        let index = self.turns.len();
        self.turns.push(Turn::new(id, sender, content.into(), hidden));
        &self.turns[index]
    }

    /// Index of the first turn whose normalized content equals the normalized `text`.
    ///
    /// Scans from the start, so when several turns normalize to the same text the earliest
    /// one wins.
    pub fn find_index_by_normalized_content(&self, text: &str) -> Option<usize> {
        let needle = markup::normalize(text);
        self.turns
            .iter()
            .position(|turn| markup::normalize(&turn.content) == needle)
    }

    pub fn position(&self, id: TurnId) -> Option<usize> {
        self.turns.iter().position(|turn| turn.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn by_id(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    /// Replaces the content at `index` and marks the turn edited.
    ///
    /// Returns `None` without touching anything when the index is out of range or the new
    /// content is blank.
    pub fn edit(&mut self, index: usize, new_content: impl Into<String>) -> Option<&Turn> {
        let new_content = new_content.into();
        if new_content.trim().is_empty() {
            return None;
        }
        let turn = self.turns.get_mut(index)?;
        turn.content = new_content;
        turn.edited = true;
        turn.edited_at = Some(Utc::now());
        Some(turn)
    }

    /// Removes exactly the turn at `index`.
    pub fn delete(&mut self, index: usize) -> Option<Turn> {
        (index < self.turns.len()).then(|| self.turns.remove(index))
    }

    /// Keeps turns `0..=index` and returns the discarded tail.
    pub fn truncate_after(&mut self, index: usize) -> Vec<Turn> {
        let keep = index.saturating_add(1);
        if keep >= self.turns.len() {
            return Vec::new();
        }
        self.turns.split_off(keep)
    }

    /// Empties the history and returns what was removed.
    pub fn clear(&mut self) -> Vec<Turn> {
        std::mem::take(&mut self.turns)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Turns a render surface shows, in conversation order.
    pub fn visible(&self) -> impl DoubleEndedIterator<Item = &Turn> {
        self.turns.iter().filter(|turn| !turn.hidden)
    }

    /// The last `limit` turns, hidden ones included. This is the model context window.
    pub fn recent(&self, limit: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(limit);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn stats(&self) -> HistoryStats {
        let total = self.turns.len();
        let edited = self.turns.iter().filter(|turn| turn.edited).count();
        let hidden = self.turns.iter().filter(|turn| turn.hidden).count();
        HistoryStats {
            total,
            edited,
            hidden,
            visible: total - hidden,
        }
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(history: &History) -> Vec<&str> {
        history.iter().map(Turn::content).collect()
    }

    fn three_turns() -> History {
        let mut history = History::new();
        history.append("hi", Sender::User, false);
        history.append("hello", Sender::Assistant, false);
        history.append("bye", Sender::User, false);
        history
    }

    #[test]
    fn appends_keep_order_and_count() {
        let mut history = History::new();
        for i in 0..25 {
            history.append(format!("turn {i}"), Sender::User, i % 3 == 0);
        }
        assert_eq!(history.len(), 25);
        for (i, turn) in history.iter().enumerate() {
            assert_eq!(turn.content(), format!("turn {i}"));
        }
    }

    #[test]
    fn visible_walks_from_either_end() {
        let mut history = three_turns();
        history.append("continue", Sender::User, true);

        let last = history.visible().next_back().map(Turn::content);
        assert_eq!(last, Some("bye"));
        let backwards: Vec<&str> = history.visible().rev().map(Turn::content).collect();
        assert_eq!(backwards, vec!["bye", "hello", "hi"]);
    }

    #[test]
    fn ids_increase_monotonically() {
        let history = three_turns();
        let ids: Vec<u64> = history.iter().map(|t| t.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut history = three_turns();
        history.delete(2);
        let id = history.append("again", Sender::User, false).id();
        assert_eq!(id.get(), 4);
    }

    #[test]
    fn truncate_after_keeps_inclusive_prefix() {
        let mut history = three_turns();
        let before: Vec<Turn> = history.turns().to_vec();

        let discarded = history.truncate_after(0);

        assert_eq!(history.len(), 1);
        assert_eq!(history.turns()[0], before[0]);
        assert_eq!(discarded.len(), 2);
        assert_eq!(contents(&history), vec!["hi"]);
    }

    #[test]
    fn truncate_after_last_index_discards_nothing() {
        let mut history = three_turns();
        assert!(history.truncate_after(2).is_empty());
        assert!(history.truncate_after(10).is_empty());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn delete_removes_one_and_shifts_the_rest() {
        let mut history = three_turns();
        let first = history.turns()[0].clone();
        let last = history.turns()[2].clone();

        let removed = history.delete(1).unwrap();

        assert_eq!(removed.content(), "hello");
        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0], first);
        assert_eq!(history.turns()[1], last);
    }

    #[test]
    fn delete_out_of_range_is_none() {
        let mut history = three_turns();
        assert!(history.delete(3).is_none());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn edit_preserves_sender_and_created_at() {
        let mut history = three_turns();
        let before = history.turns()[1].clone();

        let turn = history.edit(1, "howdy").unwrap().clone();

        assert_eq!(turn.content(), "howdy");
        assert_eq!(turn.sender(), before.sender());
        assert_eq!(turn.created_at(), before.created_at());
        assert_eq!(turn.id(), before.id());
        assert!(turn.is_edited());
        assert!(turn.edited_at().is_some());
    }

    #[test]
    fn edit_with_blank_content_is_a_no_op() {
        let mut history = History::new();
        history.append("x", Sender::User, false);
        history.append("foo", Sender::Assistant, false);

        assert!(history.edit(1, "").is_none());
        assert!(history.edit(1, "  \n\t").is_none());

        let turn = &history.turns()[1];
        assert_eq!(turn.content(), "foo");
        assert!(!turn.is_edited());
        assert!(turn.edited_at().is_none());
    }

    #[test]
    fn edit_out_of_range_is_a_no_op() {
        let mut history = three_turns();
        assert!(history.edit(7, "new").is_none());
        assert_eq!(contents(&history), vec!["hi", "hello", "bye"]);
    }

    #[test]
    fn duplicate_content_matches_first_occurrence() {
        let mut history = History::new();
        history.append("ok", Sender::User, false);
        history.append("ok", Sender::Assistant, false);
        assert_eq!(history.find_index_by_normalized_content("ok"), Some(0));
    }

    #[test]
    fn lookup_normalizes_both_sides() {
        let mut history = History::new();
        history.append("first", Sender::User, false);
        history.append("  <b>tagged</b> \n", Sender::Assistant, false);
        assert_eq!(
            history.find_index_by_normalized_content("<i>tagged</i>"),
            Some(1)
        );
        assert_eq!(history.find_index_by_normalized_content("missing"), None);
    }

    #[test]
    fn clear_empties_everything() {
        let mut history = three_turns();
        let removed = history.clear();
        assert_eq!(removed.len(), 3);
        assert!(history.is_empty());
    }

    #[test]
    fn recent_includes_hidden_turns() {
        let mut history = History::new();
        history.append("a", Sender::User, false);
        history.append("continue", Sender::User, true);
        history.append("b", Sender::Assistant, false);
        let recent: Vec<&str> = history.recent(2).iter().map(Turn::content).collect();
        assert_eq!(recent, vec!["continue", "b"]);
        assert_eq!(history.recent(50).len(), 3);
    }

    #[test]
    fn stats_count_edited_and_hidden() {
        let mut history = History::new();
        history.append("a", Sender::User, false);
        history.append("continue", Sender::User, true);
        history.append("b", Sender::Assistant, false);
        history.edit(2, "c");
        assert_eq!(
            history.stats(),
            HistoryStats {
                total: 3,
                edited: 1,
                hidden: 1,
                visible: 2,
            }
        );
    }

    #[test]
    fn restore_reassigns_ids_in_order() {
        let source = three_turns();
        let mut turns = source.turns().to_vec();
        turns.reverse();
        let restored = History::restore(turns);
        assert_eq!(contents(&restored), vec!["bye", "hello", "hi"]);
        let ids: Vec<u64> = restored.iter().map(|t| t.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
