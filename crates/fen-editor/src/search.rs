//! Search — incremental, cancellable substring search.
//!
//! Driven by the prompt loop in the binary: every keystroke re-runs
//! [`search_step`] so matches update live as the query grows. The state
//! that the original behavior kept across calls — the last matched row
//! and the scan direction — lives in an explicit [`SearchState`] value
//! threaded through the session, never in hidden statics.
//!
//! The state also snapshots the cursor and scroll offsets at prompt
//! start; on cancellation the controller restores them verbatim, so an
//! abandoned search leaves no trace.
//!
//! Matching happens on the render form (what the user sees), and the
//! match column is translated back to a byte index with
//! [`rx_to_cx`](crate::row::Row::rx_to_cx), so a match behind a tab
//! lands on the right character.

use crate::buffer::Buffer;
use crate::cursor::Cursor;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Scan direction for match resumption.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

// ---------------------------------------------------------------------------
// SearchState
// ---------------------------------------------------------------------------

/// Transient search-session state.
///
/// Created when the search prompt opens, dropped when it closes.
#[derive(Debug)]
pub struct SearchState {
    /// Row of the most recent match, if any.
    last_match: Option<usize>,
    /// Direction for the next probe.
    direction: SearchDirection,
    /// Cursor at prompt start, restored on cancel.
    saved_cursor: Cursor,
    /// Scroll offsets at prompt start, restored on cancel.
    saved_rowoff: usize,
    saved_coloff: usize,
}

impl SearchState {
    /// Open a search session, snapshotting cursor and scroll state.
    #[must_use]
    pub const fn new(cursor: Cursor, rowoff: usize, coloff: usize) -> Self {
        Self {
            last_match: None,
            direction: SearchDirection::Forward,
            saved_cursor: cursor,
            saved_rowoff: rowoff,
            saved_coloff: coloff,
        }
    }

    /// The cursor position captured at prompt start.
    #[must_use]
    pub const fn saved_cursor(&self) -> Cursor {
        self.saved_cursor
    }

    /// The `(rowoff, coloff)` pair captured at prompt start.
    #[must_use]
    pub const fn saved_offsets(&self) -> (usize, usize) {
        (self.saved_rowoff, self.saved_coloff)
    }

    /// Current scan direction.
    #[must_use]
    pub const fn direction(&self) -> SearchDirection {
        self.direction
    }

    /// Steer the next probe (arrow-key navigation).
    pub const fn set_direction(&mut self, direction: SearchDirection) {
        self.direction = direction;
    }

    /// Forget the match position and direction.
    ///
    /// Called when the query changes (restart from the cursor's row
    /// onward) and when the session ends.
    pub const fn reset(&mut self) {
        self.last_match = None;
        self.direction = SearchDirection::Forward;
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A located match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Row index of the match.
    pub row: usize,
    /// Byte index of the match start within the row.
    pub cx: usize,
}

/// Probe for the next match of `query`.
///
/// Scans at most one full buffer's worth of rows, starting one step
/// past the last match in the current direction and wrapping at both
/// ends, so an absent query can never loop forever. With no previous
/// match the direction is forced forward and the scan starts at row 0.
///
/// On a hit the state's `last_match` advances and the match location is
/// returned; on a miss the state is unchanged.
pub fn search_step(buf: &Buffer, state: &mut SearchState, query: &[u8]) -> Option<Match> {
    if query.is_empty() || buf.is_empty() {
        return None;
    }
    if state.last_match.is_none() {
        state.direction = SearchDirection::Forward;
    }

    let mut current = state.last_match;
    for _ in 0..buf.len() {
        let row_idx = advance(current, state.direction, buf.len());
        current = Some(row_idx);

        let row = buf.row(row_idx)?;
        if let Some(rx) = find_bytes(row.render(), query) {
            state.last_match = Some(row_idx);
            return Some(Match {
                row: row_idx,
                cx: row.rx_to_cx(rx),
            });
        }
    }
    None
}

/// One wrapping step from `current` in `direction`.
const fn advance(current: Option<usize>, direction: SearchDirection, len: usize) -> usize {
    match (current, direction) {
        (None, SearchDirection::Forward) => 0,
        (None, SearchDirection::Backward) => len - 1,
        (Some(i), SearchDirection::Forward) => {
            if i + 1 >= len { 0 } else { i + 1 }
        }
        (Some(i), SearchDirection::Backward) => {
            if i == 0 { len - 1 } else { i - 1 }
        }
    }
}

/// First occurrence of `needle` in `haystack`, as a byte offset.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(lines: &[&[u8]]) -> Buffer {
        let mut buf = Buffer::new();
        for (i, line) in lines.iter().enumerate() {
            buf.insert_row(i, line.to_vec());
        }
        buf
    }

    fn fresh_state() -> SearchState {
        SearchState::new(Cursor::new(), 0, 0)
    }

    // -- Forward resume and wraparound --------------------------------------

    #[test]
    fn forward_search_resumes_and_wraps() {
        let buf = buffer_with(&[b"foobar", b"barbaz"]);
        let mut state = fresh_state();

        let first = search_step(&buf, &mut state, b"bar").unwrap();
        assert_eq!(first, Match { row: 0, cx: 3 });

        let second = search_step(&buf, &mut state, b"bar").unwrap();
        assert_eq!(second, Match { row: 1, cx: 0 });

        let wrapped = search_step(&buf, &mut state, b"bar").unwrap();
        assert_eq!(wrapped, Match { row: 0, cx: 3 });
    }

    #[test]
    fn backward_search_wraps_to_last_row() {
        let buf = buffer_with(&[b"alpha", b"needle", b"needle again"]);
        let mut state = fresh_state();

        // Establish a match first; direction only applies with one.
        let first = search_step(&buf, &mut state, b"needle").unwrap();
        assert_eq!(first.row, 1);

        state.set_direction(SearchDirection::Backward);
        let back = search_step(&buf, &mut state, b"needle").unwrap();
        assert_eq!(back.row, 2, "backward from row 1 wraps past row 0");
    }

    #[test]
    fn direction_is_forced_forward_without_a_match() {
        let buf = buffer_with(&[b"hit"]);
        let mut state = fresh_state();
        state.set_direction(SearchDirection::Backward);

        let m = search_step(&buf, &mut state, b"hit").unwrap();
        assert_eq!(m.row, 0);
        assert_eq!(state.direction(), SearchDirection::Forward);
    }

    // -- Reset semantics ----------------------------------------------------

    #[test]
    fn reset_restarts_from_the_top() {
        let buf = buffer_with(&[b"aa", b"aa"]);
        let mut state = fresh_state();

        assert_eq!(search_step(&buf, &mut state, b"aa").unwrap().row, 0);
        assert_eq!(search_step(&buf, &mut state, b"aa").unwrap().row, 1);

        // Query edited: the session restarts as if new.
        state.reset();
        assert_eq!(search_step(&buf, &mut state, b"aa").unwrap().row, 0);
    }

    #[test]
    fn snapshot_is_preserved_for_cancel() {
        let cursor = Cursor { cx: 4, cy: 2, rx: 4 };
        let state = SearchState::new(cursor, 7, 3);

        assert_eq!(state.saved_cursor(), cursor);
        assert_eq!(state.saved_offsets(), (7, 3));
    }

    // -- Misses and degenerate input ----------------------------------------

    #[test]
    fn miss_leaves_state_unchanged() {
        let buf = buffer_with(&[b"nothing here"]);
        let mut state = fresh_state();

        assert!(search_step(&buf, &mut state, b"absent").is_none());
        // A subsequent hit still starts from the top.
        assert_eq!(search_step(&buf, &mut state, b"here").unwrap().row, 0);
    }

    #[test]
    fn empty_query_never_matches() {
        let buf = buffer_with(&[b"text"]);
        let mut state = fresh_state();
        assert!(search_step(&buf, &mut state, b"").is_none());
    }

    #[test]
    fn empty_buffer_never_matches() {
        let buf = Buffer::new();
        let mut state = fresh_state();
        assert!(search_step(&buf, &mut state, b"x").is_none());
    }

    #[test]
    fn probe_count_is_bounded() {
        // Query longer than any row: every probe misses, the scan still
        // terminates after one lap.
        let buf = buffer_with(&[b"a", b"b", b"c"]);
        let mut state = fresh_state();
        assert!(search_step(&buf, &mut state, b"zzzzzz").is_none());
    }

    // -- Render-form matching -----------------------------------------------

    #[test]
    fn match_behind_tab_translates_to_byte_index() {
        // Render form is eight spaces then "bar": the match is at
        // render column 8 but byte index 1.
        let buf = buffer_with(&[b"\tbar"]);
        let mut state = fresh_state();

        let m = search_step(&buf, &mut state, b"bar").unwrap();
        assert_eq!(m, Match { row: 0, cx: 1 });
    }

    #[test]
    fn query_with_spaces_matches_expanded_tab() {
        // Two spaces match inside a tab's expansion: search runs over
        // what the user sees, not the raw bytes.
        let buf = buffer_with(&[b"a\tb"]);
        let mut state = fresh_state();

        assert!(search_step(&buf, &mut state, b"  ").is_some());
    }
}
