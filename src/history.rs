use heapless::{String, Vec};
use log::debug;

use crate::error::Error;

/// Hard ceiling on usable history entries
pub const MAX_HISTORY_ENTRIES: usize = 32;

/// One spare slot separates a full ring from an empty one
const MAX_SLOTS: usize = MAX_HISTORY_ENTRIES + 1;

/// Configuration for command history
#[derive(Clone, Copy, Debug)]
pub struct HistoryConfig {
    /// Maximum number of history entries
    pub max_entries: usize,
    /// Whether to deduplicate consecutive identical commands
    pub deduplicate: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: MAX_HISTORY_ENTRIES,
            deduplicate: true,
        }
    }
}

/// Circular command history with a commit cursor and a browse cursor.
///
/// The ring has `max_entries + 1` slots. `commit` is always the next slot to be
/// written; `browse` walks from `next_after(commit)` (oldest) to `commit`
/// (the line being edited). The slot at `commit` never counts as history, it
/// only holds the in-progress line while browsing.
pub struct HistoryRing<const LINE: usize> {
    slots: Vec<String<LINE>, MAX_SLOTS>,
    commit: usize,
    browse: usize,
    config: HistoryConfig,
}

impl<const LINE: usize> HistoryRing<LINE> {
    /// Create an empty ring
    pub fn new(config: HistoryConfig) -> Self {
        let config = HistoryConfig {
            max_entries: config.max_entries.clamp(1, MAX_HISTORY_ENTRIES),
            ..config
        };
        let mut slots = Vec::new();
        for _ in 0..=config.max_entries {
            // bounded by MAX_SLOTS through the clamp above
            let _ = slots.push(String::new());
        }
        Self {
            slots,
            commit: 0,
            browse: 0,
            config,
        }
    }

    fn size(&self) -> usize {
        self.slots.len()
    }

    /// Ring position after `index`, wrapping to zero
    pub fn next_after(&self, index: usize) -> usize {
        if index + 1 >= self.size() {
            0
        } else {
            index + 1
        }
    }

    /// Ring position before `index`, wrapping to the last slot
    pub fn prev_before(&self, index: usize) -> usize {
        if index == 0 {
            self.size() - 1
        } else {
            index - 1
        }
    }

    pub fn commit_cursor(&self) -> usize {
        self.commit
    }

    pub fn browse_cursor(&self) -> usize {
        self.browse
    }

    /// Whether recall has moved away from the line being edited
    pub fn is_browsing(&self) -> bool {
        self.browse != self.commit
    }

    /// The most recently committed line, empty if there is none
    pub fn last(&self) -> &str {
        self.slots[self.prev_before(self.commit)].as_str()
    }

    /// Store a finished line and reset browsing.
    ///
    /// Returns whether a new entry was appended. Empty lines and repeats of the
    /// previous entry are not stored.
    pub fn commit(&mut self, line: &str) -> bool {
        let appended = if line.is_empty() || (self.config.deduplicate && self.last() == line) {
            false
        } else {
            store(&mut self.slots[self.commit], line);
            self.commit = self.next_after(self.commit);
            debug!("history: committed into slot {}", self.prev_before(self.commit));
            true
        };
        // drop whatever a wrapped ring or an earlier snapshot left behind
        self.slots[self.commit].clear();
        self.browse = self.commit;
        appended
    }

    /// Park the in-progress line in the commit slot without advancing it
    pub fn snapshot(&mut self, line: &str) {
        store(&mut self.slots[self.commit], line);
    }

    /// Line stored at a ring position
    pub fn browse_at(&self, cursor: usize) -> &str {
        self.slots.get(cursor).map(|s| s.as_str()).unwrap_or("")
    }

    /// Cursor one step older than `cursor`.
    ///
    /// Fails at the commit slot (the ring has wrapped) or at an empty slot.
    pub fn step_older(&self, cursor: usize) -> Result<usize, Error> {
        let prev = self.prev_before(cursor);
        if prev == self.commit || self.slots[prev].is_empty() {
            return Err(Error::AtOldestBoundary);
        }
        Ok(prev)
    }

    /// Cursor one step newer than `cursor`, never past the commit slot
    pub fn step_newer(&self, cursor: usize) -> Result<usize, Error> {
        if cursor == self.commit {
            return Err(Error::AtNewestBoundary);
        }
        let next = self.next_after(cursor);
        if next != self.commit && self.slots[next].is_empty() {
            return Err(Error::AtNewestBoundary);
        }
        Ok(next)
    }

    /// Move the browse cursor to the previous entry and return it
    pub fn older(&mut self) -> Result<&str, Error> {
        self.browse = self.step_older(self.browse)?;
        Ok(self.slots[self.browse].as_str())
    }

    /// Move the browse cursor to the next entry and return it
    pub fn newer(&mut self) -> Result<&str, Error> {
        self.browse = self.step_newer(self.browse)?;
        Ok(self.slots[self.browse].as_str())
    }

    /// Reset the history navigation position
    pub fn reset_position(&mut self) {
        self.browse = self.commit;
    }

    /// Every populated slot, oldest to newest, ending with the commit slot.
    /// The browse slot is always included, even when empty.
    pub fn render_all(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let size = self.size();
        let start = self.next_after(self.commit);
        let browse = self.browse;
        (0..size)
            .map(move |offset| (start + offset) % size)
            .map(move |index| (index, self.slots[index].as_str()))
            .filter(move |(index, line)| !line.is_empty() || *index == browse)
    }

    /// Entries after the browse cursor up to (not including) the commit slot
    pub fn recent(&self) -> impl Iterator<Item = &str> + '_ {
        let size = self.size();
        let start = self.next_after(self.browse);
        let span = (self.commit + size - start) % size;
        (0..span)
            .map(move |offset| self.slots[(start + offset) % size].as_str())
            .filter(|line| !line.is_empty())
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        let size = self.size();
        let start = self.next_after(self.commit);
        (0..size - 1)
            .filter(|offset| !self.slots[(start + offset) % size].is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usable entries, one less than the slot count
    pub fn capacity(&self) -> usize {
        self.config.max_entries
    }

    /// Clear all history
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        self.commit = 0;
        self.browse = 0;
    }
}

fn store<const LINE: usize>(slot: &mut String<LINE>, line: &str) {
    slot.clear();
    for c in line.chars() {
        if slot.push(c).is_err() {
            break;
        }
    }
}

/// Read-only view of history used by command handlers
pub trait HistoryView {
    /// Visit the entries listed by the `history` command, oldest first
    fn visit_recent(&self, visit: &mut dyn FnMut(&str));
}

impl<const LINE: usize> HistoryView for HistoryRing<LINE> {
    fn visit_recent(&self, visit: &mut dyn FnMut(&str)) {
        for line in self.recent() {
            visit(line);
        }
    }
}
