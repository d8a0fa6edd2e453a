// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, window-size discovery, key input.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), and raw fd reads/writes. These are
// the standard POSIX interfaces for terminal control — there is no safe
// alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. It enters raw mode via
// termios and guarantees restoration on every exit path: normal return
// (explicit `leave`), early error return (`Drop`), and panic (a hook
// that writes a pre-built restore sequence directly to fd 1, bypassing
// Rust's stdout lock, then restores termios from a global backup).
//
// The read policy is blocking-with-timeout: VMIN=0, VTIME=1 makes
// `read()` return within a tenth of a second even when no byte has
// arrived. That bounded wait is what lets an escape sequence that
// stops halfway (the user really pressed ESC) degrade into a bare
// Escape key instead of hanging the process.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi;
use crate::input::{self, Key};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of original termios for panic recovery.
///
/// The [`Terminal`] struct owns its own copy, but the panic hook can't
/// access it. This global backup — behind a [`Mutex`], not `static mut`
/// — lets the hook restore cooked mode without the struct.
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original);
            }
        }
    }
}

/// Screen restore sequence for emergency use: clear, home, show cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Panic hook guard — the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing.
///
/// Without this, a panic in raw mode leaves the user's terminal broken:
/// no echo, no line editing, no way to read the error message. The hook
/// writes [`EMERGENCY_RESTORE`] directly to fd 1 (bypassing Rust's
/// stdout lock to avoid deadlock if the panic happened mid-flush),
/// restores termios, then delegates to the original panic handler so
/// the message prints to a working terminal.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            unsafe {
                let _ = libc::write(
                    libc::STDOUT_FILENO,
                    EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
                    EMERGENCY_RESTORE.len(),
                );
            }
            restore_termios_from_backup();
            original(info);
        }));
    });
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Terminal handle with RAII cleanup.
///
/// Call [`enter`](Self::enter) to switch to raw mode. The original mode
/// is restored when [`leave`](Self::leave) is called or the handle is
/// dropped — even on panic.
///
/// # Example
///
/// ```no_run
/// use fen_term::terminal::Terminal;
///
/// let mut term = Terminal::new()?;
/// term.enter()?;
/// let size = term.size()?;
/// // ... render frames, read keys ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    /// Original termios saved before entering raw mode.
    original_termios: Option<libc::termios>,

    /// Whether raw mode is currently active.
    active: bool,
}

impl Terminal {
    /// Create a terminal handle.
    ///
    /// Does **not** touch the terminal — call [`enter`](Self::enter)
    /// for that.
    ///
    /// # Errors
    ///
    /// Currently infallible, but returns `Result` for forward
    /// compatibility with platforms that need setup here.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            original_termios: None,
            active: false,
        })
    }

    /// Whether raw mode is currently active.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enter raw mode.
    ///
    /// Disables break/parity/strip/flow-control input processing and
    /// output post-processing, forces 8-bit characters, and turns off
    /// echo, canonical mode, extended input, and signal generation.
    /// Reads return within a tenth of a second whether or not a byte
    /// arrived (VMIN=0, VTIME=1). Installs the panic hook on first use.
    ///
    /// Idempotent: calling `enter()` while already active is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal attributes cannot be read or
    /// applied (stdin is not a terminal, for instance). The caller
    /// treats this as fatal — there is no degraded mode.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            // Save original for restore.
            self.original_termios = Some(termios);

            // Also save to the global backup for the panic hook.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            termios.c_iflag &= !(libc::BRKINT
                | libc::ICRNL
                | libc::INPCK
                | libc::ISTRIP
                | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_cflag |= libc::CS8;
            termios.c_lflag &=
                !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);

            // VMIN=0, VTIME=1: read() returns after at most 100ms with
            // whatever bytes are available, possibly none.
            termios.c_cc[libc::VMIN] = 0;
            termios.c_cc[libc::VTIME] = 1;

            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        self.active = true;
        Ok(())
    }

    /// Leave raw mode and restore the original terminal attributes.
    ///
    /// Idempotent: calling `leave()` while inactive is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the termios restore fails. The caller treats
    /// this as fatal — the terminal is in an unknown state.
    pub fn leave(&mut self) -> io::Result<()> {
        if let Some(ref original) = self.original_termios {
            unsafe {
                if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            // Clear the global backup — we've restored successfully.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }

            self.original_termios = None;
        }

        self.active = false;
        Ok(())
    }

    // ── Window size ─────────────────────────────────────────────────

    /// Query the terminal size.
    ///
    /// Prefers `ioctl(TIOCGWINSZ)`. If that fails or reports zero
    /// columns, falls back to pushing the cursor to the bottom-right
    /// corner and asking the terminal where it ended up.
    ///
    /// # Errors
    ///
    /// Returns an error if neither method yields a usable size. The
    /// caller treats this as fatal.
    pub fn size(&mut self) -> io::Result<Size> {
        if let Some(size) = ioctl_size() {
            return Ok(size);
        }
        self.size_from_probe()
    }

    /// Fallback size query via cursor positioning.
    ///
    /// Emits `ESC[999C ESC[999B` (the terminal clamps the cursor at the
    /// screen edge) followed by a DSR position query, then parses the
    /// `ESC[{row};{col}R` reply from stdin.
    fn size_from_probe(&mut self) -> io::Result<Size> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        ansi::probe_bottom_right(&mut lock)?;
        ansi::query_cursor_position(&mut lock)?;
        lock.flush()?;
        drop(lock);

        // Collect the reply up to its 'R' terminator. A terminal that
        // never answers runs the timeout dry and we give up.
        let mut reply = Vec::with_capacity(16);
        loop {
            let Some(b) = self.read_byte()? else { break };
            reply.push(b);
            if b == b'R' || reply.len() >= 16 {
                break;
            }
        }

        input::parse_cursor_report(&reply)
            .map(|(rows, cols)| Size { cols, rows })
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "unable to determine window size")
            })
    }

    // ── Key input ───────────────────────────────────────────────────

    /// Block (within the read-timeout policy) until one key arrives.
    ///
    /// A leading ESC starts escape-sequence collection: up to two more
    /// bytes, plus the `~` terminator for the digit grammar, each
    /// within the read timeout. A follow-up byte that never arrives, or
    /// a sequence outside the grammar, degrades to [`Key::Escape`] —
    /// this never blocks indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if `read()` fails with anything other than
    /// "try again" or an interrupt. The caller treats this as fatal.
    pub fn read_key(&mut self) -> io::Result<Key> {
        let first = loop {
            if let Some(b) = self.read_byte()? {
                break b;
            }
        };

        if first != 0x1B {
            return Ok(Key::from_byte(first));
        }

        let Some(b1) = self.read_byte()? else {
            return Ok(Key::Escape);
        };
        let mut seq = [b1, 0, 0];
        let mut len = 1;

        if b1 == b'[' || b1 == b'O' {
            let Some(b2) = self.read_byte()? else {
                return Ok(Key::Escape);
            };
            seq[1] = b2;
            len = 2;

            if b1 == b'[' && b2.is_ascii_digit() {
                let Some(b3) = self.read_byte()? else {
                    return Ok(Key::Escape);
                };
                seq[2] = b3;
                len = 3;
            }
        }

        Ok(input::decode_sequence(&seq[..len]).unwrap_or(Key::Escape))
    }

    /// Read one byte from stdin under the VMIN=0/VTIME=1 policy.
    ///
    /// Returns `Ok(None)` when the timeout expired with no input (a
    /// zero-byte read, `EAGAIN`, or an interrupt). Any other failure is
    /// a real error.
    fn read_byte(&self) -> io::Result<Option<u8>> {
        let mut b: u8 = 0;
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                (&raw mut b).cast::<libc::c_void>(),
                1,
            )
        };
        match n {
            1 => Ok(Some(b)),
            0 => Ok(None),
            _ => {
                let err = io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(libc::EAGAIN | libc::EINTR) => Ok(None),
                    _ => Err(err),
                }
            }
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

/// Query the terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if the query fails or reports a zero dimension.
fn ioctl_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // Raw-mode entry requires a real tty and is exercised manually;
    // these tests cover everything that is safe without one.

    #[test]
    fn terminal_new_is_inactive() {
        let term = Terminal::new().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn leave_without_enter_is_a_noop() {
        let mut term = Terminal::new().unwrap();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn double_leave_is_idempotent() {
        let mut term = Terminal::new().unwrap();
        term.leave().unwrap();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn drop_without_enter_does_not_panic() {
        let term = Terminal::new().unwrap();
        drop(term);
    }

    #[test]
    fn size_is_copy_and_comparable() {
        let a = Size { cols: 80, rows: 24 };
        let b = a;
        assert_eq!(a, b);
        assert_ne!(a, Size { cols: 120, rows: 40 });
    }

    // ── Emergency restore sequence ──────────────────────────────────

    #[test]
    fn emergency_restore_is_valid_utf8() {
        std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
    }

    #[test]
    fn emergency_restore_contains_all_sequences() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        assert!(s.contains("\x1b[2J"), "must clear the screen");
        assert!(s.contains("\x1b[H"), "must home the cursor");
        assert!(s.ends_with("\x1b[?25h"), "must show the cursor last");
    }
}
