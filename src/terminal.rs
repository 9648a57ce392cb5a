use anyhow::Context;
use crossterm::{cursor, execute, terminal};
use std::io::{Stdout, Write, stdout};

/// RAII ownership of the terminal: raw mode plus alternate screen on
/// construction, both undone on drop even when setup or the frame loop
/// bails early.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Guard exists from here on so Drop restores raw mode if any later
        // setup step fails.
        let guard = Self { _private: () };

        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            terminal::Clear(terminal::ClearType::All),
            cursor::Hide,
        )
        .context("prepare alternate screen")?;

        Ok(guard)
    }

    pub fn stdout() -> Stdout {
        stdout()
    }

    pub fn size() -> anyhow::Result<(u16, u16)> {
        terminal::size().context("get terminal size")
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        // Undo modes the renderers may have left on: sync output, autowrap
        // off, colors.
        let _ = out.write_all(b"\x1b[?2026l\x1b[?7h\x1b[0m");
        let _ = out.flush();
        let _ = execute!(out, cursor::Show, terminal::LeaveAlternateScreen);
    }
}
