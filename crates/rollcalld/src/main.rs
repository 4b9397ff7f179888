use anyhow::{Context, Result};
use rollcall_core::SystemClock;
use rollcall_store::SqliteStore;
use rollcalld::capture::CaptureLoop;
use rollcalld::config::Config;
use rollcalld::engine::Resolver;
use rollcalld::feed::{ProbeDecoder, ProbeFeed};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries feedback events; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::load()?;
    tracing::info!(
        db = %config.db_path.display(),
        threshold = config.match_threshold,
        cutoff = %config.cutoff,
        "configuration loaded"
    );

    let store = Arc::new(
        SqliteStore::open(&config.db_path)
            .context("opening attendance database")?
            .with_staff_prefix(config.staff_prefix.clone()),
    );
    let feed = ProbeFeed::open(config.feed.as_deref()).context("opening probe feed")?;

    let resolver = Resolver::new(
        feed,
        ProbeDecoder,
        store.clone(),
        store,
        Arc::new(SystemClock),
        config.match_settings(),
    )?;
    if resolver.registered() == 0 {
        tracing::warn!("no staff registered; every probe will be unrecognized");
    }

    let (feedback_tx, mut feedback_rx) = mpsc::channel(16);
    let (session, handle) = CaptureLoop::new(resolver, config.loop_config(), feedback_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = feedback_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode feedback"),
            }
        }
    });

    let mut running = tokio::spawn(session.run());
    let mut hangup = signal(SignalKind::hangup())?;
    let mut user1 = signal(SignalKind::user_defined1())?;

    tracing::info!("rollcalld ready");

    let outcome = loop {
        tokio::select! {
            joined = &mut running => break joined,
            _ = hangup.recv() => {
                tracing::info!("SIGHUP: refreshing registry");
                handle.refresh_registry().await;
            }
            _ = user1.recv() => {
                tracing::info!("SIGUSR1: capturing now");
                handle.capture_now().await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("rollcalld shutting down");
                handle.stop().await;
                break running.await;
            }
        }
    };

    let summary = outcome.context("capture session task")??;
    printer.await?;
    tracing::info!(
        attempts = summary.attempts,
        recorded = summary.recorded,
        already_recorded = summary.already_recorded,
        unrecognized = summary.unrecognized,
        "rollcalld stopped"
    );

    Ok(())
}
