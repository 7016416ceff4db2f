use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};

use uptime_mon::config::{Config, Settings};
use uptime_mon::monitoring::checker::DEFAULT_USER_AGENT;
use uptime_mon::monitoring::{CheckExecutor, CheckSet, HttpProber, MonitoringScheduler};
use uptime_mon::notifications::{LogNotifier, Notifier, WebhookNotifier};

/// Exit status when the configuration cannot be loaded at startup
const CONFIG_EXIT_CODE: u8 = 125;

#[derive(Debug, Parser)]
#[command(version, about = "Probe HTTP endpoints and alert on sustained failures")]
struct Cli {
    /// Config file; searched for in the standard locations when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log level, RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Validate the configuration, print it and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.log_level);

    let config = match Config::from_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return ExitCode::from(CONFIG_EXIT_CODE);
        }
    };

    if cli.check {
        println!("{config}");
        return ExitCode::SUCCESS;
    }

    match run(cli.config, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: Option<PathBuf>, config: Config) -> Result<()> {
    info!("Uptime Monitor {} started", env!("CARGO_PKG_VERSION"));

    let executor = Arc::new(build_executor(&config.settings)?);
    let check_set = config.check_set();
    info!("Found {} tests in config file", check_set.len());

    let (checks_tx, checks_rx) = watch::channel(Arc::new(check_set));
    let scheduler = MonitoringScheduler::new(executor);
    let scheduler_task = tokio::spawn(async move { scheduler.run(checks_rx).await });

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            _ = hangup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                reload(config_path.as_ref(), &config.settings, &checks_tx);
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    // Closing the channel stops the scheduler.
    drop(checks_tx);
    scheduler_task.await?;
    Ok(())
}

fn build_executor(settings: &Settings) -> Result<CheckExecutor> {
    let user_agent = settings.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let notifier: Arc<dyn Notifier> =
        match settings.webhook_url.as_deref().filter(|url| !url.is_empty()) {
            Some(url) => Arc::new(WebhookNotifier::new(url)?),
            None => {
                warn!("No webhook configured, alerts will only be logged");
                Arc::new(LogNotifier)
            }
        };

    Ok(CheckExecutor::new(Arc::new(HttpProber::new(user_agent)), notifier))
}

/// Swap in a freshly loaded check set, keeping the current one on any error
fn reload(path: Option<&PathBuf>, running: &Settings, checks: &watch::Sender<Arc<CheckSet>>) {
    match Config::from_config(path) {
        Ok(config) => {
            if config.settings.webhook_url != running.webhook_url
                || config.settings.user_agent != running.user_agent
            {
                warn!("webhook-url and user-agent changes take effect after a restart");
            }
            let check_set = config.check_set();
            info!("Reloaded configuration, found {} tests", check_set.len());
            checks.send_replace(Arc::new(check_set));
        }
        Err(e) => error!("Failed to reload config, keeping current tests: {}", e),
    }
}
