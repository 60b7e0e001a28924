//! Interactive terminal front end for the attune engine.
//!
//! Wires settings, logging, the chat backend, and the model lifecycle
//! into a stdin REPL around one [`ConversationSession`]. `--mock` swaps
//! in the scripted backends so the whole pipeline runs offline, which is
//! also the quickest way to watch the affect path move: the scripted
//! facial classifier feeds the same stabilization window a real one
//! would.

#![deny(unsafe_code)]

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use attune_affect::StabilizerConfig;
use attune_completion::{
    ChatBackend, CompletionClient, CompletionConfig, HttpChatBackend, MockChatBackend,
};
use attune_core::affect::{Detection, FacialExpression, VocalTone};
use attune_core::events::SessionEvent;
use attune_core::messages::AgeGroup;
use attune_inference::{
    BackendId, BackendLoader, Frame, InferenceError, MockFacialClassifier, ModelLifecycleManager,
    Utterance,
};
use attune_session::{
    AffectMonitor, ConversationSession, EventEmitter, FacialSampler, FrameSource, MonitorConfig,
};
use clap::Parser;
use mimalloc::MiMalloc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Reply the offline backend gives for every message.
const MOCK_REPLY: &str = "I hear you. I'm right here with you, take all the time you need.";

#[derive(Debug, Parser)]
#[command(name = "attune", about = "Emotional-support chat session in a terminal")]
struct Args {
    /// Settings file to load instead of the default location.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Run against scripted offline backends instead of a live service.
    #[arg(long)]
    mock: bool,

    /// Age bracket for this conversation (children, teenagers, adults).
    #[arg(long)]
    age: Option<AgeGroup>,

    /// Emit newline-delimited JSON logs instead of the human format.
    #[arg(long)]
    log_json: bool,
}

/// Backend loader for the terminal app.
///
/// Chat counts as loaded once the service answers a probe. The classifier
/// backends have no real implementation in this binary: they come up
/// instantly under `--mock` and stay failed otherwise, leaving the
/// session in its degraded text-only mode.
struct AppLoader {
    chat: Arc<dyn ChatBackend>,
    mock_classifiers: bool,
}

#[async_trait]
impl BackendLoader for AppLoader {
    async fn load(&self, backend: BackendId) -> Result<(), InferenceError> {
        match backend {
            BackendId::Chat => self
                .chat
                .probe()
                .await
                .map_err(|error| InferenceError::Unavailable(error.to_string())),
            BackendId::Facial | BackendId::Vocal => {
                if self.mock_classifiers {
                    Ok(())
                } else {
                    Err(InferenceError::LoadFailed(format!(
                        "no {backend} model is wired into this build"
                    )))
                }
            }
        }
    }
}

/// Frame source standing in for a capture device: always has a frame
/// ready, never any pixels. The scripted classifier ignores the contents.
struct StillCamera;

#[async_trait]
impl FrameSource for StillCamera {
    async fn next_frame(&self) -> Option<Frame> {
        Some(Frame::empty())
    }
}

/// Detections the offline facial classifier replays, one per poll tick.
///
/// The sequence settles from neutral into happy, so a fresh `--mock` run
/// shows a verdict forming and then flipping once the majority moves.
fn mock_facial_script() -> Vec<Result<Option<Detection<FacialExpression>>, InferenceError>> {
    vec![
        Ok(Some(Detection::new(FacialExpression::Neutral, 0.72))),
        Ok(Some(Detection::new(FacialExpression::Neutral, 0.68))),
        Ok(Some(Detection::new(FacialExpression::Happy, 0.81))),
        Ok(Some(Detection::new(FacialExpression::Happy, 0.85))),
        Ok(Some(Detection::new(FacialExpression::Happy, 0.9))),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => attune_settings::load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => attune_settings::load_settings().context("loading settings")?,
    };
    if args.log_json {
        attune_core::logging::init_json(&settings.logging.level);
    } else {
        attune_core::logging::init(&settings.logging.level);
    }
    attune_settings::init_settings(settings.clone());

    let backend: Arc<dyn ChatBackend> = if args.mock {
        Arc::new(MockChatBackend::always(MOCK_REPLY))
    } else {
        Arc::new(HttpChatBackend::new(settings.completion.base_url.clone()))
    };
    let lifecycle = ModelLifecycleManager::new(Arc::new(AppLoader {
        chat: Arc::clone(&backend),
        mock_classifiers: args.mock,
    }));

    // Warm the chat backend up front. A failure is not fatal: every turn
    // falls back to the canned reply until the service comes back.
    if !lifecycle.ensure_loaded(BackendId::Chat).await.is_ready() {
        warn!("chat backend is unreachable, replies will use the fallback");
    }

    let completion = CompletionClient::with_config(
        Arc::clone(&backend),
        CompletionConfig {
            timeout: Duration::from_millis(settings.completion.timeout_ms),
        },
    );

    let emitter = Arc::new(EventEmitter::new());
    spawn_affect_logger(&emitter);

    let age_group = args.age.unwrap_or(settings.session.default_age_group);
    let session = ConversationSession::with_age_group(completion, Arc::clone(&emitter), age_group);

    let monitor = Arc::new(AffectMonitor::with_config(MonitorConfig {
        stabilizer: StabilizerConfig {
            capacity: settings.affect.window_size,
            min_samples: settings.affect.min_samples,
            confidence_floor: settings.affect.confidence_floor,
        },
        log_capacity: settings.affect.log_capacity,
    }));

    let shutdown = CancellationToken::new();
    let mut sampler = None;
    if args.mock {
        let facial = FacialSampler::new(
            Arc::clone(&monitor),
            lifecycle.clone(),
            Arc::new(MockFacialClassifier::scripted(mock_facial_script())),
            Arc::new(StillCamera),
            Arc::clone(&emitter),
            session.id().to_string(),
            Duration::from_millis(settings.affect.poll_interval_ms),
        );
        sampler = Some(tokio::spawn(facial.run(shutdown.clone())));
    }

    info!(session = %session.id(), age = %age_group, mock = args.mock, "session ready");
    println!("attune is listening. Type a message, /help for commands, /quit to leave.");

    repl(&session, &monitor).await?;

    shutdown.cancel();
    if let Some(task) = sampler {
        let _ = task.await;
    }
    info!("session closed");
    Ok(())
}

/// Read, send, print until EOF, `/quit`, or ctrl-c.
async fn repl(session: &ConversationSession, monitor: &AffectMonitor) -> Result<()> {
    loop {
        print!("you> ");
        std::io::stdout().flush().context("flushing prompt")?;

        let line = tokio::select! {
            line = read_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if let Some(command) = text.strip_prefix('/') {
            if !run_command(command, session, monitor) {
                break;
            }
            continue;
        }

        let emotion = monitor.current_expression().map(|verdict| verdict.label);
        let tone = monitor.current_tone().map(|verdict| verdict.label);
        match session.send(text, emotion, tone).await {
            Ok(reply) => println!("attune> {}", reply.content),
            Err(error) => println!("attune> ({error})"),
        }
    }
    Ok(())
}

/// One line from stdin without pinning the runtime. `None` on EOF.
async fn read_line() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = std::io::stdin().read_line(&mut line)?;
        Ok::<_, std::io::Error>((read > 0).then_some(line))
    })
    .await
    .context("stdin reader panicked")?
    .context("reading stdin")
}

/// Handle one `/command` line. Returns `false` when the REPL should exit.
fn run_command(command: &str, session: &ConversationSession, monitor: &AffectMonitor) -> bool {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "age" => match parts.next() {
            None => println!("age group: {}", session.age_group()),
            Some(raw) => match raw.parse::<AgeGroup>() {
                Ok(age) => {
                    session.set_age_group(age);
                    println!("age group set to {age}; applies from the next message");
                }
                Err(error) => println!("{error}"),
            },
        },
        "mood" => print_mood(monitor),
        "tone" => match parts.next().map(str::parse::<VocalTone>) {
            Some(Ok(tone)) => {
                let confidence = parts
                    .next()
                    .and_then(|raw| raw.parse::<f32>().ok())
                    .unwrap_or(0.8);
                let _ = monitor.record_vocal(&Utterance {
                    transcript: String::new(),
                    tone: Some(Detection::new(tone, confidence)),
                });
                print_mood(monitor);
            }
            Some(Err(error)) => println!("{error}"),
            None => println!("usage: /tone <label> [confidence]"),
        },
        "clear" => {
            session.clear_messages();
            println!("conversation cleared");
        }
        "quit" | "exit" => return false,
        "help" | "" => print_help(),
        other => println!("unknown command /{other}; try /help"),
    }
    true
}

fn print_mood(monitor: &AffectMonitor) {
    match monitor.current_expression() {
        Some(verdict) => println!("facial: {} ({:.2})", verdict.label, verdict.confidence),
        None => println!("facial: unknown"),
    }
    match monitor.current_tone() {
        Some(verdict) => println!("vocal:  {} ({:.2})", verdict.label, verdict.confidence),
        None => println!("vocal:  unknown"),
    }
    println!(
        "samples seen: {} facial, {} vocal",
        monitor.recent_facial_samples().len(),
        monitor.recent_vocal_samples().len()
    );
}

fn print_help() {
    println!("/age [children|teenagers|adults]   show or set the age group");
    println!("/mood                              show the current affect verdicts");
    println!("/tone <label> [confidence]         feed one vocal tone sample");
    println!("/clear                             start the conversation over");
    println!("/quit                              leave");
}

/// Surface affect transitions in the log stream while the REPL owns stdout.
fn spawn_affect_logger(emitter: &EventEmitter) {
    let mut events = emitter.subscribe();
    drop(tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::AffectUpdate {
                    modality,
                    label,
                    confidence,
                    ..
                }) => info!(%modality, %label, confidence, "affect verdict changed"),
                Ok(SessionEvent::AffectCleared { modality, .. }) => {
                    info!(%modality, "affect verdict cleared");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }));
}
