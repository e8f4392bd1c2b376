//! studiflow-engine - StudiFlow scheduling and automation daemon
//!
//! Runs the publish loop, the weekly auto-schedule trigger and, optionally,
//! an automation session against simulated platform collaborators.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use studiflow_core::collaborators::{
    SimulatedPublisher, SimulatedTargeting, StaticContentSource,
};
use studiflow_core::executor::{RandomSource, ThreadRandom};
use studiflow_core::scheduler::PUBLISH_INTERVAL_SECS;
use studiflow_core::time::{Clock, SystemClock};
use studiflow_core::types::PostingScheduleUpdate;
use studiflow_core::{AutomationSessionManager, PostScheduler};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

/// Cadence of the weekly auto-schedule check.
const WEEKLY_CHECK_INTERVAL_SECS: u64 = 3600;

#[derive(Parser)]
#[command(name = "studiflow-engine", version, about = "StudiFlow engine daemon")]
struct Args {
    /// Start an automation session immediately
    #[arg(long)]
    auto_start: bool,
    /// Strategy for the automation session (overrides config.toml)
    #[arg(long)]
    strategy: Option<String>,
    /// Hashtag to target, repeatable (overrides config.toml)
    #[arg(long = "hashtag")]
    hashtags: Vec<String>,
    /// Override the number of auto-scheduled posts per week
    #[arg(long)]
    posts_per_week: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("studiflow_engine=info".parse()?)
                .add_directive("studiflow_core=info".parse()?),
        )
        .init();

    info!("studiflow-engine v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    // Load configuration
    let config = config::Config::load()?;
    info!("Config loaded from {:?}", config.config_path);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let random: Arc<dyn RandomSource> = Arc::new(ThreadRandom);

    // Simulated collaborators; a production deployment swaps in real
    // platform clients here.
    let publisher = Arc::new(SimulatedPublisher::new(random.clone()));
    let content = Arc::new(StaticContentSource::new(
        config.file.content.pending_ids.clone(),
    ));
    let targeting = Arc::new(SimulatedTargeting::new(random.clone()));

    let scheduler = Arc::new(PostScheduler::with_config(
        publisher,
        content,
        clock.clone(),
        config.file.schedule.clone(),
    ));
    if let Some(per_week) = args.posts_per_week {
        scheduler
            .update_posting_frequency(PostingScheduleUpdate {
                posts_per_week: Some(per_week),
                ..Default::default()
            })
            .await?;
    }
    scheduler
        .start_publish_loop(Duration::from_secs(PUBLISH_INTERVAL_SECS))
        .await;
    scheduler
        .start_weekly_loop(Duration::from_secs(WEEKLY_CHECK_INTERVAL_SECS))
        .await;

    let sessions = Arc::new(AutomationSessionManager::new(targeting, random, clock));

    if args.auto_start || config.file.automation.auto_start {
        let strategy = args
            .strategy
            .unwrap_or_else(|| config.file.automation.strategy.clone());
        let hashtags = if args.hashtags.is_empty() {
            config.file.automation.hashtags.clone()
        } else {
            args.hashtags
        };
        match sessions.start_session(&strategy, hashtags).await {
            Ok(session) => info!(session_id = %session.id, "Automation session running"),
            Err(e) => warn!(error = %e, "Could not start automation session"),
        }
    }

    info!("Engine ready");

    // Keep running
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    sessions.stop_session().await;
    sessions.shutdown().await;
    scheduler.stop().await;

    Ok(())
}
