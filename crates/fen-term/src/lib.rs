// SPDX-License-Identifier: MIT
//
// fen-term — Terminal control for fen.
//
// The only crate that touches the physical terminal. It owns raw mode
// (via termios), window-size discovery (ioctl with a cursor-report
// fallback), decoding of the small escape-sequence grammar the editor
// understands, and an append-only output buffer so each frame reaches
// the terminal in a single write.
//
// This crate intentionally avoids external TUI frameworks (ratatui,
// crossterm) in favor of direct terminal control via ANSI escape
// sequences and raw termios. Every byte sent to the terminal is
// accounted for.

pub mod ansi;
pub mod input;
pub mod output;
pub mod terminal;
