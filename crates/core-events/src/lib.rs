//! Event types, async event sources and the timer scheduler for the prompter runtime.

pub mod lines;
pub mod subscription;
pub mod timer;

pub use lines::{LineEventSource, parse_input_line};
pub use subscription::{ShutdownHandle, ShutdownListener, Subscription};
pub use timer::{TaskId, TimerKind, TimerQueue};

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Bounded capacity of the runtime channel. Producers await on a full channel rather
/// than dropping events.
pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Transcript(TranscriptEvent),
    Command(CommandEvent),
    /// Periodic wakeup; the loop polls the timer queue on each one.
    Tick,
    Shutdown,
}

impl Event {
    pub const fn kind(&self) -> &'static str {
        match self {
            Event::Transcript(_) => "transcript",
            Event::Command(_) => "command",
            Event::Tick => "tick",
            Event::Shutdown => "shutdown",
        }
    }
}

/// One delivery from the live transcript stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
}

impl TranscriptEvent {
    pub fn new(text: impl Into<String>, is_final: bool) -> Self {
        Self {
            text: text.into(),
            is_final,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self::new(text, false)
    }
}

/// Remote-control requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
    ScrollForward(usize),
    ScrollBack(usize),
    GoToLine(usize),
    Reset,
    Status,
    /// Runtime setting change; key and value are parsed by the settings layer.
    Set { key: String, value: String },
    Quit,
}

/// Trait implemented by any async event producer. Implementors hold their configuration
/// and spawn one background task that pushes `Event`s into the shared channel, stopping
/// when a send fails because the consumer is gone.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used in logs.
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn all registered sources, each with its own clone of `tx`. Sources are drained
    /// so a second call spawns nothing. During shutdown drop the last `Sender` before
    /// awaiting the handles so sources observe the closed channel.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Emits `Event::Tick` every configured interval.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}
