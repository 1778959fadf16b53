use anyhow::Context;
use crossterm::{
    cursor,
    terminal::{self, ClearType},
    ExecutableCommand,
};
use std::io::{stdout, Write};

/// Rows reserved under the picture for the status line.
pub const HUD_ROWS: u16 = 1;

/// Raw mode plus alternate screen for as long as the guard lives.
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enable raw mode")?;
        // Guard exists from here on so Drop undoes raw mode if setup fails.
        let guard = Self { _private: () };

        let mut out = stdout();
        out.execute(terminal::EnterAlternateScreen)
            .context("enter alternate screen")?;
        out.execute(terminal::Clear(ClearType::All))
            .context("clear screen")?;
        out.execute(cursor::Hide).context("hide cursor")?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = stdout();
        let _ = out.write_all(b"\x1b[?2026l\x1b[?7h\x1b[0m");
        let _ = out.flush();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
    }
}

/// Picture area for a terminal of `cols` x `rows`: columns, text rows, and
/// the half-block pixel height.
pub fn visual_geometry(cols: u16, rows: u16) -> (u16, u16, usize) {
    let visual_rows = rows.saturating_sub(HUD_ROWS);
    (cols, visual_rows, visual_rows as usize * 2)
}
