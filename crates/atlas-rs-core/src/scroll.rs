//! Follow-the-bottom behavior for the message log viewport.

use log::debug;
use std::cmp::min;

/// Default distance from the end still treated as pinned.
pub const DEFAULT_TOLERANCE: u16 = 40;

/// What the viewport should do after a message was appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    /// Move to the newest entry.
    Follow,
    /// Leave the viewport where the user put it.
    Hold,
}

/// Tracks whether the viewport is pinned to the newest entry and how many
/// entries arrived while it was not.
///
/// Offsets count from the top; `max_offset` is the offset that shows the end
/// of the log.
#[derive(Debug, Clone)]
pub struct ScrollController {
    offset: u16,
    max_offset: u16,
    tolerance: u16,
    pinned: bool,
    missed: usize,
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl ScrollController {
    pub fn new(tolerance: u16) -> Self {
        Self {
            offset: 0,
            max_offset: 0,
            tolerance,
            pinned: true,
            missed: 0,
        }
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn max_offset(&self) -> u16 {
        self.max_offset
    }

    pub fn pinned_to_bottom(&self) -> bool {
        self.pinned
    }

    /// Entries appended since the viewport left the bottom.
    pub fn missed_count(&self) -> usize {
        self.missed
    }

    /// React to an appended message.
    pub fn note_append(&mut self) -> ScrollAction {
        if self.pinned {
            self.offset = self.max_offset;
            ScrollAction::Follow
        } else {
            self.missed += 1;
            debug!("append while unpinned (missed={})", self.missed);
            ScrollAction::Hold
        }
    }

    /// Update the end position after layout changes. A pinned viewport snaps
    /// to the new end; an unpinned one keeps its offset.
    pub fn update_bounds(&mut self, max_offset: u16) {
        self.max_offset = max_offset;
        if self.pinned {
            self.offset = max_offset;
        } else {
            self.offset = min(self.offset, max_offset);
            self.refresh_pinned();
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.offset = self.offset.saturating_sub(lines);
        self.refresh_pinned();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.offset = min(self.offset.saturating_add(lines), self.max_offset);
        self.refresh_pinned();
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.refresh_pinned();
    }

    /// Explicit request to show the newest entry; resets the missed count.
    pub fn jump_to_latest(&mut self) {
        self.offset = self.max_offset;
        self.pinned = true;
        self.missed = 0;
    }

    /// Forget all position state, e.g. after the session was cleared.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.max_offset = 0;
        self.pinned = true;
        self.missed = 0;
    }

    fn refresh_pinned(&mut self) {
        self.pinned = self.max_offset - self.offset <= self.tolerance;
        if self.pinned {
            self.missed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Appends while within tolerance keep following.
    #[test]
    fn pinned_viewport_follows() {
        let mut scroll = ScrollController::new(2);
        scroll.update_bounds(10);
        scroll.scroll_up(2);
        assert!(scroll.pinned_to_bottom());

        assert_eq!(scroll.note_append(), ScrollAction::Follow);
        scroll.update_bounds(14);
        assert_eq!(scroll.offset(), 14);
        assert!(scroll.pinned_to_bottom());
        assert_eq!(scroll.missed_count(), 0);
    }

    /// Appends while scrolled away count up until an explicit jump.
    #[test]
    fn unpinned_viewport_counts_missed() {
        let mut scroll = ScrollController::new(1);
        scroll.update_bounds(30);
        scroll.scroll_up(10);
        assert!(!scroll.pinned_to_bottom());

        for expected in 1..=3 {
            assert_eq!(scroll.note_append(), ScrollAction::Hold);
            scroll.update_bounds(30 + expected as u16 * 3);
            assert_eq!(scroll.missed_count(), expected);
            assert_eq!(scroll.offset(), 20);
        }

        scroll.jump_to_latest();
        assert_eq!(scroll.missed_count(), 0);
        assert_eq!(scroll.offset(), 39);
        assert!(scroll.pinned_to_bottom());
    }

    /// Scrolling back into the tolerance band re-pins and clears the count.
    #[test]
    fn scrolling_back_down_repins() {
        let mut scroll = ScrollController::new(1);
        scroll.update_bounds(20);
        scroll.scroll_to_top();
        scroll.note_append();
        assert_eq!(scroll.missed_count(), 1);

        scroll.scroll_down(19);
        assert!(scroll.pinned_to_bottom());
        assert_eq!(scroll.missed_count(), 0);
    }

    /// Shrinking content clamps the offset.
    #[test]
    fn shrinking_bounds_clamp_offset() {
        let mut scroll = ScrollController::new(0);
        scroll.update_bounds(50);
        scroll.scroll_up(10);
        scroll.update_bounds(5);
        assert_eq!(scroll.offset(), 5);
        assert!(scroll.pinned_to_bottom());
    }
}
