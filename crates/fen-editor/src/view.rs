//! View — viewport scrolling and frame composition.
//!
//! The `View` maps the cursor's buffer position onto a screen-sized
//! window (`rowoff`/`coloff`) and composes one full redraw — text rows,
//! status bar, message bar, cursor placement — into fen-term's
//! [`OutputBuffer`]. The caller flushes that buffer in a single write,
//! which is what keeps frames tear-free.
//!
//! The view holds only scroll state and the fixed screen dimensions.
//! Buffer, cursor, and message are passed to [`render`](View::render)
//! as parameters.
//!
//! # Frame layout
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ text rows (render form,      │  ← rows - 2 screen lines
//! │ clipped by rowoff/coloff)    │
//! ├──────────────────────────────┤
//! │ status bar (reverse video)   │  ← 1 line
//! ├──────────────────────────────┤
//! │ message bar (5s expiry)      │  ← 1 line
//! └──────────────────────────────┘
//! ```

use std::io::{self, Write};
use std::time::{Duration, Instant};

use fen_term::ansi;
use fen_term::output::OutputBuffer;
use fen_term::terminal::Size;

use crate::buffer::Buffer;
use crate::cursor::Cursor;

/// Editor version shown in the welcome banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long a status message stays visible.
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Screen lines reserved below the text area (status + message bars).
const BAR_ROWS: u16 = 2;

// ---------------------------------------------------------------------------
// StatusMessage
// ---------------------------------------------------------------------------

/// A transient one-line message with its timestamp.
///
/// Any `set` overwrites the previous message and restarts the clock;
/// the text is displayed only while younger than [`MESSAGE_TIMEOUT`].
#[derive(Debug)]
pub struct StatusMessage {
    text: String,
    time: Instant,
}

impl StatusMessage {
    /// Create with no visible message.
    #[must_use]
    pub fn new() -> Self {
        Self {
            text: String::new(),
            time: Instant::now(),
        }
    }

    /// Replace the message and restart its expiry clock.
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.time = Instant::now();
    }

    /// The message text while it is unexpired, `None` otherwise.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        if !self.text.is_empty() && self.time.elapsed() < MESSAGE_TIMEOUT {
            Some(&self.text)
        } else {
            None
        }
    }
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Scroll state plus fixed screen dimensions.
#[derive(Debug)]
pub struct View {
    /// First buffer row visible on screen.
    rowoff: usize,
    /// First render column visible on screen.
    coloff: usize,
    /// Text-area height (terminal rows minus the two bars).
    screenrows: usize,
    /// Text-area width.
    screencols: usize,
}

impl View {
    /// Build a view for a terminal of the given size, reserving the
    /// bottom two lines for the status and message bars.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            rowoff: 0,
            coloff: 0,
            screenrows: usize::from(size.rows.saturating_sub(BAR_ROWS)),
            screencols: usize::from(size.cols),
        }
    }

    /// Text-area height in screen rows.
    #[inline]
    #[must_use]
    pub const fn screen_rows(&self) -> usize {
        self.screenrows
    }

    /// Text-area width in screen columns.
    #[inline]
    #[must_use]
    pub const fn screen_cols(&self) -> usize {
        self.screencols
    }

    /// First visible buffer row.
    #[inline]
    #[must_use]
    pub const fn row_offset(&self) -> usize {
        self.rowoff
    }

    /// First visible render column.
    #[inline]
    #[must_use]
    pub const fn col_offset(&self) -> usize {
        self.coloff
    }

    /// Restore saved scroll offsets (search cancellation).
    pub fn set_offsets(&mut self, rowoff: usize, coloff: usize) {
        self.rowoff = rowoff;
        self.coloff = coloff;
    }

    /// Push `rowoff` past the end of the buffer so the next
    /// [`scroll`](View::scroll) snaps the viewport to the cursor row.
    /// Used after a search match to bring it into view at the top.
    pub fn scroll_past_end(&mut self, buf: &Buffer) {
        self.rowoff = buf.len();
    }

    // -- Scrolling ----------------------------------------------------------

    /// Recompute `rx` and clamp the scroll offsets so the cursor's
    /// screen-relative position lands inside
    /// `[0, screenrows) x [0, screencols)`.
    pub fn scroll(&mut self, cursor: &mut Cursor, buf: &Buffer) {
        cursor.rx = buf
            .row(cursor.cy)
            .map_or(0, |row| row.cx_to_rx(cursor.cx));

        if cursor.cy < self.rowoff {
            self.rowoff = cursor.cy;
        }
        if cursor.cy >= self.rowoff + self.screenrows {
            self.rowoff = cursor.cy + 1 - self.screenrows;
        }
        if cursor.rx < self.coloff {
            self.coloff = cursor.rx;
        }
        if cursor.rx >= self.coloff + self.screencols {
            self.coloff = cursor.rx + 1 - self.screencols;
        }
    }

    // -- Rendering ----------------------------------------------------------

    /// Compose one full frame into `out`.
    ///
    /// Hide cursor, home, text rows, status bar, message bar, cursor
    /// placement, show cursor — in that order, so the flush shows a
    /// complete frame with the cursor in its final position.
    ///
    /// # Errors
    ///
    /// Propagates writer errors; writes into an [`OutputBuffer`] cannot
    /// fail.
    pub fn render(
        &self,
        out: &mut OutputBuffer,
        buf: &Buffer,
        cursor: &Cursor,
        message: &StatusMessage,
    ) -> io::Result<()> {
        ansi::cursor_hide(out)?;
        ansi::cursor_home(out)?;

        self.draw_rows(out, buf)?;
        self.draw_status_bar(out, buf, cursor)?;
        self.draw_message_bar(out, message)?;

        ansi::cursor_to(
            out,
            to_u16(cursor.rx - self.coloff),
            to_u16(cursor.cy - self.rowoff),
        )?;
        ansi::cursor_show(out)
    }

    /// Draw the text area: visible row slices, the welcome banner on an
    /// empty buffer, `~` fillers past the end.
    fn draw_rows(&self, out: &mut OutputBuffer, buf: &Buffer) -> io::Result<()> {
        for y in 0..self.screenrows {
            let filerow = y + self.rowoff;
            if let Some(row) = buf.row(filerow) {
                let render = row.render();
                let start = self.coloff.min(render.len());
                let end = (self.coloff + self.screencols).min(render.len());
                out.write_all(&render[start..end])?;
            } else if buf.is_empty() && y == self.screenrows / 2 {
                self.draw_welcome(out)?;
            } else {
                out.write_all(b"~")?;
            }

            ansi::clear_line(out)?;
            out.write_all(b"\r\n")?;
        }
        Ok(())
    }

    /// Centered version banner for the empty-buffer screen.
    fn draw_welcome(&self, out: &mut OutputBuffer) -> io::Result<()> {
        let banner = format!("fen editor -- version {VERSION}");
        let shown = &banner.as_bytes()[..banner.len().min(self.screencols)];

        let mut padding = (self.screencols - shown.len()) / 2;
        if padding > 0 {
            out.write_all(b"~")?;
            padding -= 1;
        }
        for _ in 0..padding {
            out.write_all(b" ")?;
        }
        out.write_all(shown)
    }

    /// Reverse-video status bar: filename, line count, modified marker
    /// on the left; `current/total` on the right when it fits.
    fn draw_status_bar(
        &self,
        out: &mut OutputBuffer,
        buf: &Buffer,
        cursor: &Cursor,
    ) -> io::Result<()> {
        ansi::reverse_video(out)?;

        let name = buf
            .path()
            .and_then(|p| p.file_name())
            .map_or_else(|| "[No Name]".into(), |n| n.to_string_lossy());
        let modified = if buf.is_modified() { " (modified)" } else { "" };
        let left = format!("{name:.20} - {} lines{modified}", buf.len());
        let right = format!("{}/{}", cursor.cy + 1, buf.len());

        let left_bytes = &left.as_bytes()[..left.len().min(self.screencols)];
        out.write_all(left_bytes)?;

        let mut len = left_bytes.len();
        while len < self.screencols {
            if self.screencols - len == right.len() {
                out.write_all(right.as_bytes())?;
                break;
            }
            out.write_all(b" ")?;
            len += 1;
        }

        ansi::normal_video(out)?;
        out.write_all(b"\r\n")
    }

    /// Message bar: the status text truncated to the screen width,
    /// blank once expired.
    fn draw_message_bar(&self, out: &mut OutputBuffer, message: &StatusMessage) -> io::Result<()> {
        ansi::clear_line(out)?;
        if let Some(text) = message.text() {
            let bytes = text.as_bytes();
            out.write_all(&bytes[..bytes.len().min(self.screencols)])?;
        }
        Ok(())
    }
}

/// Saturating usize-to-u16 conversion for cursor placement.
fn to_u16(v: usize) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Size = Size { cols: 80, rows: 24 };

    fn buffer_with(lines: &[&[u8]]) -> Buffer {
        let mut buf = Buffer::new();
        for (i, line) in lines.iter().enumerate() {
            buf.insert_row(i, line.to_vec());
        }
        buf
    }

    fn frame(view: &View, buf: &Buffer, cursor: &Cursor, msg: &StatusMessage) -> Vec<u8> {
        let mut out = OutputBuffer::new();
        view.render(&mut out, buf, cursor, msg).unwrap();
        out.as_bytes().to_vec()
    }

    /// The cursor's screen-relative position must stay on screen.
    fn assert_cursor_contained(view: &View, cursor: &Cursor) {
        assert!(cursor.cy >= view.row_offset());
        assert!(cursor.cy < view.row_offset() + view.screen_rows());
        assert!(cursor.rx >= view.col_offset());
        assert!(cursor.rx < view.col_offset() + view.screen_cols());
    }

    // -- Geometry -----------------------------------------------------------

    #[test]
    fn view_reserves_two_bar_rows() {
        let view = View::new(SIZE);
        assert_eq!(view.screen_rows(), 22);
        assert_eq!(view.screen_cols(), 80);
    }

    #[test]
    fn tiny_terminal_does_not_underflow() {
        let view = View::new(Size { cols: 10, rows: 1 });
        assert_eq!(view.screen_rows(), 0);
    }

    // -- Scrolling ----------------------------------------------------------

    #[test]
    fn scroll_is_stable_inside_the_window() {
        let buf = buffer_with(&[b"aaa", b"bbb", b"ccc"]);
        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 1, cy: 1, rx: 0 };

        view.scroll(&mut cursor, &buf);
        assert_eq!(view.row_offset(), 0);
        assert_eq!(view.col_offset(), 0);
        assert_eq!(cursor.rx, 1);
        assert_cursor_contained(&view, &cursor);
    }

    #[test]
    fn scroll_follows_cursor_below_window() {
        let lines: Vec<Vec<u8>> = (0..100).map(|i| format!("line {i}").into_bytes()).collect();
        let refs: Vec<&[u8]> = lines.iter().map(Vec::as_slice).collect();
        let buf = buffer_with(&refs);

        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 0, cy: 50, rx: 0 };
        view.scroll(&mut cursor, &buf);

        assert_eq!(view.row_offset(), 50 - view.screen_rows() + 1);
        assert_cursor_contained(&view, &cursor);
    }

    #[test]
    fn scroll_follows_cursor_back_above_window() {
        let lines: Vec<Vec<u8>> = (0..100).map(|i| format!("line {i}").into_bytes()).collect();
        let refs: Vec<&[u8]> = lines.iter().map(Vec::as_slice).collect();
        let buf = buffer_with(&refs);

        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 0, cy: 90, rx: 0 };
        view.scroll(&mut cursor, &buf);

        cursor.cy = 3;
        view.scroll(&mut cursor, &buf);
        assert_eq!(view.row_offset(), 3);
        assert_cursor_contained(&view, &cursor);
    }

    #[test]
    fn scroll_clamps_horizontally() {
        let long = vec![b'x'; 300];
        let buf = buffer_with(&[long.as_slice()]);

        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 200, cy: 0, rx: 0 };
        view.scroll(&mut cursor, &buf);

        assert_eq!(cursor.rx, 200);
        assert_eq!(view.col_offset(), 200 - view.screen_cols() + 1);
        assert_cursor_contained(&view, &cursor);

        cursor.cx = 5;
        view.scroll(&mut cursor, &buf);
        assert_eq!(view.col_offset(), 5);
        assert_cursor_contained(&view, &cursor);
    }

    #[test]
    fn scroll_recomputes_rx_through_tabs() {
        let buf = buffer_with(&[b"\tabc"]);
        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 1, cy: 0, rx: 0 };

        view.scroll(&mut cursor, &buf);
        assert_eq!(cursor.rx, 8);
    }

    #[test]
    fn rx_is_zero_on_virtual_line() {
        let buf = buffer_with(&[b"abc"]);
        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 0, cy: 1, rx: 99 };

        view.scroll(&mut cursor, &buf);
        assert_eq!(cursor.rx, 0);
    }

    #[test]
    fn scroll_past_end_re_snaps_to_cursor() {
        let lines: Vec<Vec<u8>> = (0..50).map(|i| format!("{i}").into_bytes()).collect();
        let refs: Vec<&[u8]> = lines.iter().map(Vec::as_slice).collect();
        let buf = buffer_with(&refs);

        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 0, cy: 30, rx: 0 };

        view.scroll_past_end(&buf);
        assert_eq!(view.row_offset(), 50);

        view.scroll(&mut cursor, &buf);
        assert_eq!(view.row_offset(), 30, "match row snaps to the top");
        assert_cursor_contained(&view, &cursor);
    }

    // -- Frame composition --------------------------------------------------

    #[test]
    fn frame_hides_homes_and_shows_cursor() {
        let buf = Buffer::new();
        let view = View::new(SIZE);
        let bytes = frame(&view, &buf, &Cursor::new(), &StatusMessage::new());

        assert!(bytes.starts_with(b"\x1b[?25l\x1b[H"));
        assert!(bytes.ends_with(b"\x1b[?25h"));
    }

    #[test]
    fn frame_has_no_extra_blank_line_before_bars() {
        // Every text row plus the status bar ends in \r\n; the message
        // bar does not. One frame therefore holds exactly rows+1 pairs.
        let buf = buffer_with(&[b"hello"]);
        let view = View::new(SIZE);
        let bytes = frame(&view, &buf, &Cursor::new(), &StatusMessage::new());

        let pairs = bytes.windows(2).filter(|w| w == b"\r\n").count();
        assert_eq!(pairs, view.screen_rows() + 1);
    }

    #[test]
    fn empty_buffer_shows_welcome_banner_and_fillers() {
        let buf = Buffer::new();
        let view = View::new(SIZE);
        let bytes = frame(&view, &buf, &Cursor::new(), &StatusMessage::new());
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("fen editor -- version"));
        assert!(text.contains('~'));
    }

    #[test]
    fn non_empty_buffer_has_no_banner() {
        let buf = buffer_with(&[b"content"]);
        let view = View::new(SIZE);
        let bytes = frame(&view, &buf, &Cursor::new(), &StatusMessage::new());

        assert!(!String::from_utf8_lossy(&bytes).contains("version"));
    }

    #[test]
    fn rows_are_clipped_by_column_offset() {
        let long = vec![b'a'; 200];
        let buf = buffer_with(&[long.as_slice()]);

        let mut view = View::new(SIZE);
        let mut cursor = Cursor { cx: 150, cy: 0, rx: 0 };
        view.scroll(&mut cursor, &buf);

        let bytes = frame(&view, &buf, &cursor, &StatusMessage::new());
        let first_line_len = bytes
            .windows(3)
            .position(|w| w == b"\x1b[K")
            .map(|p| p - b"\x1b[?25l\x1b[H".len())
            .unwrap();
        assert_eq!(first_line_len, view.screen_cols());
    }

    // -- Status bar ---------------------------------------------------------

    #[test]
    fn status_bar_shows_placeholder_without_filename() {
        let buf = buffer_with(&[b"x"]);
        let view = View::new(SIZE);
        let bytes = frame(&view, &buf, &Cursor::new(), &StatusMessage::new());
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("\x1b[7m"));
        assert!(text.contains("[No Name] - 1 lines"));
        assert!(text.contains("\x1b[m"));
    }

    #[test]
    fn status_bar_shows_modified_marker() {
        let mut buf = buffer_with(&[b"x"]);
        buf.insert_char(0, 0, b'y');
        let view = View::new(SIZE);
        let bytes = frame(&view, &buf, &Cursor::new(), &StatusMessage::new());

        assert!(String::from_utf8_lossy(&bytes).contains("(modified)"));
    }

    #[test]
    fn status_bar_right_aligns_position() {
        let buf = buffer_with(&[b"a", b"b", b"c"]);
        let view = View::new(SIZE);
        let cursor = Cursor { cx: 0, cy: 1, rx: 0 };
        let bytes = frame(&view, &buf, &cursor, &StatusMessage::new());
        let text = String::from_utf8_lossy(&bytes);

        // The right-aligned segment sits immediately before SGR reset.
        assert!(text.contains("2/3\x1b[m"));
    }

    // -- Message bar --------------------------------------------------------

    #[test]
    fn fresh_message_is_rendered() {
        let buf = buffer_with(&[b"x"]);
        let view = View::new(SIZE);
        let mut msg = StatusMessage::new();
        msg.set("HELP: Ctrl-Q = quit");

        let bytes = frame(&view, &buf, &Cursor::new(), &msg);
        assert!(String::from_utf8_lossy(&bytes).contains("HELP: Ctrl-Q = quit"));
    }

    #[test]
    fn empty_message_renders_nothing() {
        let msg = StatusMessage::new();
        assert_eq!(msg.text(), None);
    }

    #[test]
    fn set_message_becomes_visible_and_overwrites() {
        let mut msg = StatusMessage::new();
        msg.set("first");
        assert_eq!(msg.text(), Some("first"));
        msg.set("second");
        assert_eq!(msg.text(), Some("second"));
        msg.set("");
        assert_eq!(msg.text(), None);
    }

    #[test]
    fn long_message_is_truncated_to_width() {
        let buf = buffer_with(&[b"x"]);
        let view = View::new(Size { cols: 10, rows: 24 });
        let mut msg = StatusMessage::new();
        msg.set("0123456789ABCDEF");

        let bytes = frame(&view, &buf, &Cursor::new(), &msg);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("0123456789"));
        assert!(!text.contains("0123456789A"));
    }
}
