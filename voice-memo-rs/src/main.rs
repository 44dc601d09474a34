//! voice-memo-rs: voice-driven personal assistant with spoken reminders.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voice_memo::clock::{Clock, SystemClock};
use voice_memo::config::Config;
use voice_memo::notifier::Notifier;
use voice_memo::router::Router;
use voice_memo::search::WebSearch;
use voice_memo::service::AssistantService;
use voice_memo::speech::{self, LineListener, SpeechOutput};
use voice_memo::store::Store;
use voice_memo::watcher::ReminderWatcher;

#[derive(Parser, Debug)]
#[command(name = "voice-memo-rs", about = "Voice assistant with spoken reminders and notes")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the assistant data file (overrides config)
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Handle a single command, print the reply and exit
    #[arg(short = 'e', long)]
    execute: Option<String>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr; the conversation owns stdout.
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(args.config.as_deref());
    let data_file = args
        .data_file
        .clone()
        .unwrap_or_else(|| config.storage.data_file());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(Store::open(data_file, clock.clone(), &config.assistant));
    let router = Router::new(store.clone(), clock.clone())
        .with_search(WebSearch::from_config(&config.search));

    if let Some(command) = args.execute.as_deref() {
        if let Some(reply) = router.handle(command) {
            println!("{}", reply.text);
        }
        return Ok(());
    }

    info!("voice-memo-rs starting (data file: {})", store.path().display());

    let speaker: Arc<dyn SpeechOutput> = speech::build_speaker(&config.speech);
    let shutdown = CancellationToken::new();

    let watcher = ReminderWatcher::new(store.clone(), speaker.clone(), clock, &config.reminders)
        .with_notifier(Notifier::new(config.feedback.notifications))
        .spawn(shutdown.clone());

    tokio::spawn({
        let shutdown = shutdown.clone();
        let speaker = speaker.clone();
        async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::warn!("Failed to listen for Ctrl-C: {e}");
                        return;
                    }
                    speaker.speak("Shutting down...").await;
                    shutdown.cancel();
                }
            }
        }
    });

    let listener = Box::new(LineListener::stdin(config.listen.timeout()));
    let mut service = AssistantService::new(router, speaker, listener);
    service.run(shutdown.clone()).await;

    shutdown.cancel();
    watcher.await?;
    store.flush();
    info!("voice-memo-rs stopped");

    // A stdin read may still be parked on the blocking pool; don't wait for it.
    std::process::exit(0)
}
