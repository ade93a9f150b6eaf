//! Line-oriented input protocol.
//!
//! Each line is either a transcript fragment or a `:`-prefixed command:
//!
//! ```text
//! welcome to the show        final transcript
//! ~welcome to                interim transcript
//! :fwd 3   :back 2   :goto 10   :reset   :status   :quit
//! :set words_per_minute 180
//! ```

use crate::subscription::ShutdownListener;
use crate::{AsyncEventSource, CommandEvent, Event, TranscriptEvent};
use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_input_line(line: &str) -> Result<Option<Event>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let Some(command) = line.strip_prefix(':') else {
        let event = match line.strip_prefix('~') {
            Some(interim) => TranscriptEvent::interim(interim),
            None => TranscriptEvent::final_text(line),
        };
        return Ok(Some(Event::Transcript(event)));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let count = |arg: Option<&str>| -> Result<usize> {
        match arg {
            None => Ok(1),
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("`{raw}` is not a line count")),
        }
    };
    let cmd = match name {
        "fwd" | "forward" => CommandEvent::ScrollForward(count(parts.next())?),
        "back" => CommandEvent::ScrollBack(count(parts.next())?),
        "goto" => {
            let Some(raw) = parts.next() else {
                bail!(":goto needs a line number");
            };
            CommandEvent::GoToLine(
                raw.parse::<usize>()
                    .with_context(|| format!("`{raw}` is not a line number"))?,
            )
        }
        "reset" => CommandEvent::Reset,
        "status" => CommandEvent::Status,
        "quit" | "q" => CommandEvent::Quit,
        "set" => {
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                bail!(":set needs a key and a value");
            };
            CommandEvent::Set {
                key: key.to_string(),
                value: value.to_string(),
            }
        }
        other => bail!("unknown command `:{other}`"),
    };
    Ok(Some(Event::Command(cmd)))
}

/// Event source reading the line protocol from any async buffered reader (stdin in the
/// binary). End of input is reported as `Event::Shutdown`.
pub struct LineEventSource<R> {
    reader: R,
    shutdown: ShutdownListener,
}

impl<R> LineEventSource<R> {
    pub fn new(reader: R, shutdown: ShutdownListener) -> Self {
        Self { reader, shutdown }
    }
}

impl<R> AsyncEventSource for LineEventSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        "lines"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let LineEventSource { reader, shutdown } = *self;
        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                let next = tokio::select! {
                    _ = shutdown.wait() => {
                        info!(target: "events.lines", reason = "shutdown_signal", "line_source_stopped");
                        return;
                    }
                    next = lines.next_line() => next,
                };
                let line = match next {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!(target: "events.lines", reason = "eof", "line_source_stopped");
                        let _ = tx.send(Event::Shutdown).await;
                        return;
                    }
                    Err(error) => {
                        warn!(target: "events.lines", %error, "line_read_failed");
                        let _ = tx.send(Event::Shutdown).await;
                        return;
                    }
                };
                match parse_input_line(&line) {
                    Ok(Some(event)) => {
                        debug!(target: "events.lines", kind = event.kind(), "line_event");
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(error) => warn!(target: "events.lines", %error, "line_rejected"),
                }
            }
        })
    }
}
