//! Row — one line of the edited file.
//!
//! A row keeps two byte sequences: `chars`, the authoritative content
//! with no trailing newline, and `render`, the derived on-screen form
//! where each tab expands to spaces up to the next multiple of
//! [`TAB_STOP`] and every other byte maps 1:1. The render form is
//! regenerated on every mutation of `chars`, so it can never be
//! observed stale.
//!
//! All positions are single-byte indices. `cx` is an index into
//! `chars` (it may equal the row length, meaning "after the last
//! character"); `rx` is the corresponding visual column in `render`.
//! [`cx_to_rx`](Row::cx_to_rx) and [`rx_to_cx`](Row::rx_to_cx) convert
//! between the two, and only tabs make them disagree.

/// Spaces per tab stop in the render form.
pub const TAB_STOP: usize = 8;

/// One line of text with its derived render form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Authoritative content, no trailing newline.
    chars: Vec<u8>,
    /// Display form: tabs expanded, everything else 1:1. Rebuilt on
    /// every mutation of `chars`.
    render: Vec<u8>,
}

impl Row {
    /// Create a row from raw content bytes.
    #[must_use]
    pub fn new(chars: Vec<u8>) -> Self {
        let mut row = Self {
            chars,
            render: Vec::new(),
        };
        row.rebuild_render();
        row
    }

    /// The raw content bytes.
    #[inline]
    #[must_use]
    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    /// The display form bytes.
    #[inline]
    #[must_use]
    pub fn render(&self) -> &[u8] {
        &self.render
    }

    /// Content length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Whether the row holds no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    // -- Mutation -----------------------------------------------------------

    /// Insert one byte at index `at`, clamped to the row length.
    pub fn insert_char(&mut self, at: usize, b: u8) {
        let at = at.min(self.chars.len());
        self.chars.insert(at, b);
        self.rebuild_render();
    }

    /// Remove the byte at index `at`.
    ///
    /// Returns `false` (leaving the row untouched) if `at` is out of
    /// range.
    pub fn delete_char(&mut self, at: usize) -> bool {
        if at >= self.chars.len() {
            return false;
        }
        self.chars.remove(at);
        self.rebuild_render();
        true
    }

    /// Append bytes to the end of the row.
    ///
    /// Used when a deleted line's remainder merges into the previous
    /// line.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.chars.extend_from_slice(bytes);
        self.rebuild_render();
    }

    /// Split the row at `at`, keeping the prefix and returning the
    /// suffix bytes.
    ///
    /// The prefix and the returned suffix concatenate back to the
    /// original content exactly.
    pub fn split_off(&mut self, at: usize) -> Vec<u8> {
        let at = at.min(self.chars.len());
        let tail = self.chars.split_off(at);
        self.rebuild_render();
        tail
    }

    // -- Index translation --------------------------------------------------

    /// Translate a `chars` index into a render column.
    #[must_use]
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        let mut rx = 0;
        for &b in &self.chars[..cx.min(self.chars.len())] {
            if b == b'\t' {
                rx += (TAB_STOP - 1) - (rx % TAB_STOP);
            }
            rx += 1;
        }
        rx
    }

    /// Translate a render column back into a `chars` index.
    ///
    /// Walks forward accumulating visual width and returns the first
    /// index whose trailing visual edge passes `rx`. Columns past the
    /// end of the row map to the row length.
    #[must_use]
    pub fn rx_to_cx(&self, rx: usize) -> usize {
        let mut cur_rx = 0;
        for (cx, &b) in self.chars.iter().enumerate() {
            if b == b'\t' {
                cur_rx += (TAB_STOP - 1) - (cur_rx % TAB_STOP);
            }
            cur_rx += 1;
            if cur_rx > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    /// Rebuild the render form from `chars`.
    fn rebuild_render(&mut self) {
        self.render.clear();
        for &b in &self.chars {
            if b == b'\t' {
                self.render.push(b' ');
                while self.render.len() % TAB_STOP != 0 {
                    self.render.push(b' ');
                }
            } else {
                self.render.push(b);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
