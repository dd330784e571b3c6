use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use companion::config::Settings;
use companion::driver::{Collaborators, Driver, Notice};
use companion::kernel::event::Event;
use companion::kernel::recognition::RecognitionSupervisor;
use companion::kernel::time::{Clock, SystemClock};
use companion::services::avatar::TracingAvatar;
use companion::services::backend::HttpBackend;
use companion::services::console::{pump_stdin, ConsoleFeed};
use companion::services::playback::CommandPlayer;
use companion::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("Companion booting...");

    let settings = Settings::load_default().context("loading configuration")?;
    tracing::info!("Backend: {}", settings.backend.base_url);

    let clock = SystemClock::new();
    let orchestrator = Orchestrator::new(settings.configuration(), clock.now());

    let backend = HttpBackend::new(&settings.backend).context("building backend client")?;
    let player = CommandPlayer::new(&settings.playback.command).context("configuring audio player")?;

    let feed = ConsoleFeed::new();
    let listening = feed.listening();

    let collaborators = Collaborators {
        backend: Arc::new(backend),
        player: Arc::new(player),
        avatar: Box::new(TracingAvatar::new()),
        recognition: RecognitionSupervisor::new(Box::new(feed)),
    };
    let (driver, handle) = Driver::new(orchestrator, collaborators, Box::new(clock));

    let mut notices = driver.notices();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(Notice::Alert(message)) => eprintln!("!! {}", message),
                Ok(Notice::Logged(entry)) => println!("{}", entry),
                Ok(Notice::Interim(Some(text))) => println!("   ... {}", text),
                Ok(Notice::Interim(None)) => {}
                Err(RecvError::Lagged(skipped)) => tracing::debug!("Skipped {} notices", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let shutdown = CancellationToken::new();
    tokio::spawn(pump_stdin(handle.clone(), listening, shutdown.clone()));

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    handle.send(Event::Start).await.context("driver queue closed")?;

    let orchestrator = driver.run(shutdown).await;
    let snapshot = orchestrator.telemetry.snapshot();
    tracing::info!(
        "Session over: {} turns accepted, {} completed, {} dropped",
        snapshot.turn_stats.accepted,
        snapshot.turn_stats.completed,
        snapshot.drop_stats.total
    );
    Ok(())
}
