// SPDX-License-Identifier: MIT
//
// fen — a small terminal text editor.
//
// This is the main binary that wires together the crates:
//
//   fen-term   → raw mode, window size, key decoding, frame output
//   fen-editor → rows, buffer, cursor, viewport, search
//
// The Editor struct is the controller: it owns every piece of editor
// state and is the only mutator of it. Each iteration of the event
// loop flows:
//
//   render frame → read_key (bounded wait) → dispatch → mutate state
//
// There is no second thread and no hidden state; search-session and
// quit-confirmation state are explicit fields. Fatal errors (terminal
// setup, read failure) unwind through `?` to `main`, which resets the
// screen, prints the error to stderr, and exits 1. The terminal guard
// restores cooked mode on every path, panics included.

use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use fen_editor::buffer::Buffer;
use fen_editor::cursor::Cursor;
use fen_editor::search::{self, SearchDirection, SearchState};
use fen_editor::view::{StatusMessage, View};
use fen_term::ansi;
use fen_term::input::{Key, ctrl};
use fen_term::output::OutputBuffer;
use fen_term::terminal::Terminal;

// ─── Key bindings ───────────────────────────────────────────────────────────

const KEY_QUIT: u8 = ctrl(b'q');
const KEY_SAVE: u8 = ctrl(b's');
const KEY_FIND: u8 = ctrl(b'f');
const KEY_BACKSPACE_ALIAS: u8 = ctrl(b'h');
const KEY_REFRESH: u8 = ctrl(b'l');
const KEY_ENTER: u8 = b'\r';

/// Ctrl-Q presses required to discard unsaved changes.
const QUIT_CONFIRMATIONS: u8 = 3;

const HELP_MESSAGE: &str = "HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find";

// ─── Prompt protocol ────────────────────────────────────────────────────────

/// What the prompt loop tells its keystroke observer.
///
/// The observer runs after every keystroke (live-update search hangs
/// off this), and exactly once with `Submit` or `Cancel` when the
/// session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptEvent {
    /// A keystroke was processed; the query may have changed.
    Key(Key),
    /// Enter on a non-empty query.
    Submit,
    /// Escape; the caller restores whatever the session touched.
    Cancel,
}

// ─── Dispatch result ────────────────────────────────────────────────────────

/// Whether the event loop keeps running after a keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    Quit,
}

// ─── Editor ─────────────────────────────────────────────────────────────────

/// The controller: sole owner and mutator of all editor state.
struct Editor {
    term: Terminal,
    buf: Buffer,
    cursor: Cursor,
    view: View,
    message: StatusMessage,
    out: OutputBuffer,
    /// Remaining Ctrl-Q presses before a modified buffer is discarded.
    quit_confirmations: u8,
    /// Live search session, present while a find prompt is open.
    search: Option<SearchState>,
}

impl Editor {
    fn new(term: Terminal, view: View, buf: Buffer) -> Self {
        Self {
            term,
            buf,
            cursor: Cursor::new(),
            view,
            message: StatusMessage::new(),
            out: OutputBuffer::new(),
            quit_confirmations: QUIT_CONFIRMATIONS,
            search: None,
        }
    }

    // ── Rendering ───────────────────────────────────────────────────

    /// Scroll to the cursor, compose a frame, flush it in one write.
    fn refresh_screen(&mut self) -> io::Result<()> {
        self.view.scroll(&mut self.cursor, &self.buf);
        self.out.clear();
        self.view
            .render(&mut self.out, &self.buf, &self.cursor, &self.message)?;
        self.out.flush_stdout()
    }

    // ── Dispatch ────────────────────────────────────────────────────

    fn process_key(&mut self, key: Key) -> io::Result<Outcome> {
        match key {
            Key::Byte(KEY_QUIT) => {
                if self.buf.is_modified() && self.quit_confirmations > 0 {
                    self.message.set(format!(
                        "WARNING!!! File has unsaved changes. \
                         Press Ctrl-Q {} more times to quit.",
                        self.quit_confirmations
                    ));
                    self.quit_confirmations -= 1;
                    return Ok(Outcome::Continue);
                }
                return Ok(Outcome::Quit);
            }

            Key::Byte(KEY_SAVE) => self.save()?,
            Key::Byte(KEY_FIND) => self.find()?,

            Key::Byte(KEY_ENTER) => self.insert_newline(),
            Key::Backspace | Key::Byte(KEY_BACKSPACE_ALIAS) => self.delete_char(),
            Key::Delete => {
                // Delete-forward: step right, then delete backward.
                self.cursor.move_right(&self.buf);
                self.delete_char();
            }

            Key::Up => self.cursor.move_up(&self.buf),
            Key::Down => self.cursor.move_down(&self.buf),
            Key::Left => self.cursor.move_left(&self.buf),
            Key::Right => self.cursor.move_right(&self.buf),
            Key::Home => self.cursor.line_home(),
            Key::End => self.cursor.line_end(&self.buf),
            Key::PageUp => self.page_up(),
            Key::PageDown => self.page_down(),

            // The screen repaints every iteration; nothing to do.
            Key::Escape | Key::Byte(KEY_REFRESH) => {}

            Key::Byte(b) if is_insertable(b) => self.insert_char(b),
            Key::Byte(_) => {}
        }

        self.quit_confirmations = QUIT_CONFIRMATIONS;
        Ok(Outcome::Continue)
    }

    // ── Editing operations ──────────────────────────────────────────

    /// Insert a byte at the cursor, growing the buffer by an empty row
    /// first when the cursor sits on the virtual line past the end.
    fn insert_char(&mut self, b: u8) {
        if self.cursor.cy == self.buf.len() {
            self.buf.insert_row(self.buf.len(), Vec::new());
        }
        self.buf.insert_char(self.cursor.cy, self.cursor.cx, b);
        self.cursor.cx += 1;
    }

    /// Split the current row at the cursor and step to the new row.
    fn insert_newline(&mut self) {
        self.buf.split_row(self.cursor.cy, self.cursor.cx);
        self.cursor.cy += 1;
        self.cursor.cx = 0;
    }

    /// Delete the byte left of the cursor, merging with the previous
    /// row at column 0. A no-op at the very start of the document and
    /// on the virtual line.
    fn delete_char(&mut self) {
        if self.cursor.cy == self.buf.len() {
            return;
        }
        if self.cursor.cx == 0 && self.cursor.cy == 0 {
            return;
        }

        if self.cursor.cx > 0 {
            self.buf.delete_char(self.cursor.cy, self.cursor.cx - 1);
            self.cursor.cx -= 1;
        } else {
            let junction = self.buf.row(self.cursor.cy - 1).map_or(0, |r| r.len());
            let remainder = self
                .buf
                .row(self.cursor.cy)
                .map_or_else(Vec::new, |r| r.chars().to_vec());
            self.buf.append_to_row(self.cursor.cy - 1, &remainder);
            self.buf.delete_row(self.cursor.cy);
            self.cursor.cy -= 1;
            self.cursor.cx = junction;
        }
    }

    /// Jump to the top of the viewport, then move up one screenful,
    /// reusing the single-step logic so `cx` clamps per row.
    fn page_up(&mut self) {
        self.cursor.cy = self.view.row_offset();
        self.cursor.clamp_cx(&self.buf);
        for _ in 0..self.view.screen_rows() {
            self.cursor.move_up(&self.buf);
        }
    }

    /// Jump to the bottom of the viewport, then move down one screenful.
    fn page_down(&mut self) {
        let bottom = self.view.row_offset() + self.view.screen_rows().saturating_sub(1);
        self.cursor.cy = bottom.min(self.buf.len());
        self.cursor.clamp_cx(&self.buf);
        for _ in 0..self.view.screen_rows() {
            self.cursor.move_down(&self.buf);
        }
    }

    // ── Save ────────────────────────────────────────────────────────

    /// Write the buffer to disk, prompting for a filename first when
    /// none is set.
    fn save(&mut self) -> io::Result<()> {
        if self.buf.path().is_none() {
            let name = self.prompt("Save as: ", |_: &mut Self, _: &str, _: PromptEvent| {})?;
            self.finish_save_as(name);
            return Ok(());
        }
        self.write_buffer();
        Ok(())
    }

    /// Complete a save-as: a cancelled prompt aborts without touching
    /// the buffer, anything else stores the path and writes.
    fn finish_save_as(&mut self, name: Option<String>) {
        match name {
            Some(name) => {
                self.buf.set_path(PathBuf::from(name));
                self.write_buffer();
            }
            None => self.message.set("Save aborted"),
        }
    }

    /// The actual write, reported through the message bar either way.
    /// Save failures are recoverable: the modified flag stays set and
    /// editing continues.
    fn write_buffer(&mut self) {
        match self.buf.save() {
            Ok(n) => self.message.set(format!("{n} bytes written to disk")),
            Err(err) => self.message.set(format!("Can't save! I/O error: {err}")),
        }
    }

    // ── Find ────────────────────────────────────────────────────────

    /// Run the incremental search prompt. Cancellation restores the
    /// cursor and scroll exactly as they were.
    fn find(&mut self) -> io::Result<()> {
        self.search = Some(SearchState::new(
            self.cursor,
            self.view.row_offset(),
            self.view.col_offset(),
        ));

        let result = self.prompt("Search (Use ESC/Arrows/Enter): ", Self::find_callback)?;

        if let Some(state) = self.search.take() {
            if result.is_none() {
                self.cursor = state.saved_cursor();
                let (rowoff, coloff) = state.saved_offsets();
                self.view.set_offsets(rowoff, coloff);
            }
        }
        Ok(())
    }

    /// Keystroke observer for the search prompt: steer the direction on
    /// arrows, restart on edits, probe, and jump to the match.
    fn find_callback(&mut self, query: &str, event: PromptEvent) {
        let Some(state) = self.search.as_mut() else {
            return;
        };

        match event {
            PromptEvent::Cancel | PromptEvent::Submit => {
                state.reset();
                return;
            }
            PromptEvent::Key(Key::Right | Key::Down) => {
                state.set_direction(SearchDirection::Forward);
            }
            PromptEvent::Key(Key::Left | Key::Up) => {
                state.set_direction(SearchDirection::Backward);
            }
            PromptEvent::Key(_) => state.reset(),
        }

        if let Some(m) = search::search_step(&self.buf, state, query.as_bytes()) {
            self.cursor.cy = m.row;
            self.cursor.cx = m.cx;
            self.view.scroll_past_end(&self.buf);
        }
    }

    // ── Prompt loop ─────────────────────────────────────────────────

    /// Read a line of input through the message bar.
    ///
    /// Shows `label` plus the partial query, redraws, and reads one key
    /// per iteration. Backspace (and its aliases) shrinks the query,
    /// Escape cancels (`None`), Enter on a non-empty query submits. The
    /// observer is invoked after every keystroke, and one final time
    /// with the `Submit`/`Cancel` verdict.
    fn prompt(
        &mut self,
        label: &str,
        mut on_key: impl FnMut(&mut Self, &str, PromptEvent),
    ) -> io::Result<Option<String>> {
        let mut query = String::new();
        loop {
            self.message.set(format!("{label}{query}"));
            self.refresh_screen()?;

            let key = self.term.read_key()?;
            match key {
                Key::Backspace | Key::Delete | Key::Byte(KEY_BACKSPACE_ALIAS) => {
                    query.pop();
                }
                Key::Escape => {
                    self.message.set("");
                    on_key(self, &query, PromptEvent::Cancel);
                    return Ok(None);
                }
                Key::Byte(KEY_ENTER) => {
                    if !query.is_empty() {
                        self.message.set("");
                        on_key(self, &query, PromptEvent::Submit);
                        return Ok(Some(query));
                    }
                }
                Key::Byte(b) if !b.is_ascii_control() && b < 0x80 => {
                    query.push(char::from(b));
                }
                _ => {}
            }

            on_key(self, &query, PromptEvent::Key(key));
        }
    }
}

/// Bytes the default dispatch arm inserts: printable ASCII plus tab.
const fn is_insertable(b: u8) -> bool {
    b == b'\t' || (!b.is_ascii_control() && b < 0x80)
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn run() -> io::Result<()> {
    let mut term = Terminal::new()?;
    term.enter()?;
    let size = term.size()?;

    let buf = match env::args_os().nth(1) {
        Some(arg) => Buffer::from_file(Path::new(&arg))?,
        None => Buffer::new(),
    };

    let mut editor = Editor::new(term, View::new(size), buf);
    editor.message.set(HELP_MESSAGE);

    loop {
        editor.refresh_screen()?;
        let key = editor.term.read_key()?;
        if editor.process_key(key)? == Outcome::Quit {
            break;
        }
    }

    // User-initiated quit: leave a clean screen, restore cooked mode.
    // A restore failure is fatal like any other teardown error.
    let mut stdout = io::stdout();
    ansi::clear_screen(&mut stdout)?;
    ansi::cursor_home(&mut stdout)?;
    stdout.flush()?;
    editor.term.leave()
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The terminal guard has already restored cooked mode on
            // the way out; reset the screen so the error is readable.
            let mut stdout = io::stdout();
            let _ = ansi::clear_screen(&mut stdout);
            let _ = ansi::cursor_home(&mut stdout);
            let _ = stdout.flush();
            eprintln!("fen: {err}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
