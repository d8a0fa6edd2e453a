//! Cursor — logical position tracking and movement.
//!
//! The cursor is a value type: `cx`/`cy` in buffer coordinates plus the
//! derived render column `rx` (recomputed by the view on every scroll).
//! It does not own or reference the buffer; movement methods borrow it
//! per call, so one cursor works against any buffer state.
//!
//! `cx` may legally equal the current row's length ("after the last
//! character"), and `cy` may equal the row count — that value addresses
//! the virtual line past the end of the buffer, where typing appends a
//! new row. Every vertical move re-clamps `cx` to the new row's length,
//! so the cursor can never rest past the end of a shorter line.

use crate::buffer::Buffer;

/// Cursor position: byte index, row index, render column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Byte index into the current row's content (may equal its length).
    pub cx: usize,
    /// Row index (may equal the buffer's row count: the virtual line).
    pub cy: usize,
    /// `cx` translated into render-column space; derived, maintained by
    /// the view's scroll pass.
    pub rx: usize,
}

impl Cursor {
    /// Cursor at the top-left of the buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of the row under `cy`, or 0 on the virtual line.
    fn current_row_len(&self, buf: &Buffer) -> usize {
        buf.row(self.cy).map_or(0, crate::row::Row::len)
    }

    /// Move one cell left; at column 0, wrap to the end of the previous
    /// row if there is one.
    pub fn move_left(&mut self, buf: &Buffer) {
        if self.cx > 0 {
            self.cx -= 1;
        } else if self.cy > 0 {
            self.cy -= 1;
            self.cx = self.current_row_len(buf);
        }
    }

    /// Move one cell right; at the end of a row, wrap to the start of
    /// the next row (the virtual line included).
    pub fn move_right(&mut self, buf: &Buffer) {
        if let Some(row) = buf.row(self.cy) {
            if self.cx < row.len() {
                self.cx += 1;
            } else {
                self.cy += 1;
                self.cx = 0;
            }
        }
    }

    /// Move one row up, clamping `cx` to the new row's length.
    pub fn move_up(&mut self, buf: &Buffer) {
        if self.cy > 0 {
            self.cy -= 1;
        }
        self.clamp_cx(buf);
    }

    /// Move one row down (stopping at the virtual line), clamping `cx`.
    pub fn move_down(&mut self, buf: &Buffer) {
        if self.cy < buf.len() {
            self.cy += 1;
        }
        self.clamp_cx(buf);
    }

    /// Jump to column 0.
    pub fn line_home(&mut self) {
        self.cx = 0;
    }

    /// Jump past the last character of the current row.
    pub fn line_end(&mut self, buf: &Buffer) {
        self.cx = self.current_row_len(buf);
    }

    /// Clamp `cx` to the current row's length.
    pub fn clamp_cx(&mut self, buf: &Buffer) {
        let len = self.current_row_len(buf);
        if self.cx > len {
            self.cx = len;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
