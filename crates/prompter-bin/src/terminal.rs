//! Display sinks for the console host.

use anyhow::Result;
use core_session::DisplaySink;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use std::io::{IsTerminal, Write, stdout};
use std::time::Duration;
use tracing::warn;

/// Console output: a redrawn alternate screen when stdout is a terminal, plain
/// frame-per-block text otherwise.
pub enum ConsoleSink {
    Screen(ScreenSink),
    Plain,
}

impl ConsoleSink {
    pub fn detect() -> Result<Self> {
        if stdout().is_terminal() {
            Ok(ConsoleSink::Screen(ScreenSink::enter()?))
        } else {
            Ok(ConsoleSink::Plain)
        }
    }
}

impl DisplaySink for ConsoleSink {
    fn show(&mut self, frame: &str, timeout: Duration) {
        let result = match self {
            ConsoleSink::Screen(screen) => screen.draw(frame),
            ConsoleSink::Plain => write_plain(frame),
        };
        if let Err(error) = result {
            warn!(target: "runtime.display", %error, timeout_ms = timeout.as_millis() as u64, "frame_write_failed");
        }
    }
}

fn write_plain(frame: &str) -> Result<()> {
    let mut out = stdout().lock();
    writeln!(out, "{frame}")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Alternate-screen session; leaves the alternate screen on drop.
pub struct ScreenSink {
    active: bool,
}

impl ScreenSink {
    fn enter() -> Result<Self> {
        execute!(stdout(), EnterAlternateScreen, Hide, SetTitle("prompter"))?;
        Ok(Self { active: true })
    }

    fn draw(&mut self, frame: &str) -> Result<()> {
        let mut out = stdout().lock();
        queue!(out, Clear(ClearType::All))?;
        for (row, line) in frame.lines().enumerate() {
            queue!(out, MoveTo(0, row as u16), Print(line))?;
        }
        out.flush()?;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.active {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            self.active = false;
        }
        Ok(())
    }
}

impl Drop for ScreenSink {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}
