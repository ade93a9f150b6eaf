//! Prompter entrypoint: loads a script, reads transcript and remote-control lines from
//! stdin and renders frames to the console.

mod runtime;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use core_config::{Config, SettingKey, SettingValue, load_from};
use core_events::{
    EVENT_CHANNEL_CAP, Event, EventSourceRegistry, LineEventSource, ShutdownHandle,
    ShutdownListener, TickEventSource,
};
use core_session::{SessionRegistry, TeleprompterController};
use runtime::{CONSOLE_SESSION, CONSOLE_USER, LoopControl, SessionRuntime, ShutdownReason};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};
use terminal::ConsoleSink;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Host wakeup period; timers are polled on every tick.
const HOST_TICK: Duration = Duration::from_millis(50);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "prompter", version, about = "Speech-synchronized teleprompter")]
struct Args {
    /// Script to display (UTF-8 text).
    pub script: PathBuf,
    /// Configuration file path (overrides discovery of `prompter.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Follow the speaker using transcript lines from stdin.
    #[arg(long)]
    pub speech: bool,
    /// Start over after the end message instead of stopping.
    #[arg(long = "auto-replay")]
    pub auto_replay: bool,
    /// Scroll speed in words per minute.
    #[arg(long)]
    pub wpm: Option<u32>,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("prompter.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "prompter.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        if tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
            .is_ok()
        {
            self.log_guard = Some(guard);
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }

    fn load_config(args: &Args) -> Result<Config> {
        let mut config = load_from(args.config.clone())?;
        let overrides = [
            args.speech
                .then_some((SettingKey::SpeechMode, SettingValue::Bool(true))),
            args.auto_replay
                .then_some((SettingKey::AutoReplay, SettingValue::Bool(true))),
            args.wpm
                .map(|wpm| (SettingKey::WordsPerMinute, SettingValue::Number(f64::from(wpm)))),
        ];
        for (key, value) in overrides.into_iter().flatten() {
            config.apply_setting(key, value)?;
        }
        Ok(config)
    }
}

fn log_shutdown_stage(reason: ShutdownReason, stage: &'static str) {
    info!(
        target: "runtime.shutdown",
        reason = reason.as_str(),
        stage = stage,
        "shutdown_stage"
    );
}

struct PrompterRuntime {
    session: SessionRuntime<ConsoleSink>,
    rx: mpsc::Receiver<Event>,
    tx: Option<mpsc::Sender<Event>>,
    source_handles: Vec<tokio::task::JoinHandle<()>>,
    input_shutdown: Option<ShutdownHandle>,
}

impl PrompterRuntime {
    async fn run(&mut self) -> Result<()> {
        let loop_span = tracing::debug_span!(target: "runtime", "event_loop");
        let _enter_loop = loop_span.enter();

        let mut shutdown_reason = ShutdownReason::ChannelClosed;
        while let Some(event) = self.rx.recv().await {
            if let LoopControl::Break { reason } = self.session.handle(&event, Instant::now()) {
                shutdown_reason = reason;
                break;
            }
            for reply in self.session.take_replies() {
                eprintln!("{reply}");
            }
        }

        self.rx.close();
        self.finalize_shutdown(shutdown_reason).await;
        Ok(())
    }

    async fn finalize_shutdown(&mut self, reason: ShutdownReason) {
        log_shutdown_stage(reason, "begin");
        self.session.shutdown();
        if let Some(shutdown) = self.input_shutdown.take() {
            trace!(target: "runtime.shutdown", reason = reason.as_str(), "input_shutdown_signal");
            shutdown.signal();
        }
        drop(self.tx.take());

        while let Some(handle) = self.source_handles.pop() {
            match tokio::time::timeout(Duration::from_millis(200), handle).await {
                Ok(Ok(_)) => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_stopped"
                ),
                Ok(Err(err)) if err.is_cancelled() => trace!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_cancelled"
                ),
                Ok(Err(err)) => error!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    ?err,
                    "event_source_task_error"
                ),
                Err(_) => warn!(
                    target: "runtime.shutdown",
                    reason = reason.as_str(),
                    "event_source_task_timeout"
                ),
            }
        }
        log_shutdown_stage(reason, "complete");
    }
}

fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = AppStartup::load_config(&args)?;
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading script {}", args.script.display()))?;
    info!(
        target: "runtime.startup",
        text_len = text.len(),
        config_override = args.config.is_some(),
        speech_mode = config.speech_mode,
        "bootstrap_complete"
    );

    let tokio_rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;
    let result = tokio_rt.block_on(run_session(text, config));
    // A pending stdin read cannot be cancelled; don't wait for it.
    tokio_rt.shutdown_timeout(Duration::from_millis(100));
    drop(startup.log_guard.take());
    result
}

async fn run_session(text: String, config: Config) -> Result<()> {
    let sink = ConsoleSink::detect()?;
    let mut registry = SessionRegistry::new();
    registry.attach(CONSOLE_SESSION, CONSOLE_USER, || {
        TeleprompterController::new(text, config, sink, Instant::now())
    })?;

    let (tx, rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let (input_shutdown, listener) = ShutdownListener::new_pair();
    let mut sources = EventSourceRegistry::new();
    sources.register(TickEventSource::new(HOST_TICK));
    sources.register(LineEventSource::new(
        BufReader::new(tokio::io::stdin()),
        listener,
    ));
    let source_handles = sources.spawn_all(&tx);

    let mut runtime = PrompterRuntime {
        session: SessionRuntime::new(registry),
        rx,
        tx: Some(tx),
        source_handles,
        input_shutdown: Some(input_shutdown),
    };
    runtime.run().await
}
