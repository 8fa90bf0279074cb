//! Cirrus masternode watchdog.
//!
//! Polls the mainchain and sidechain nodes on a fixed interval, alerts when
//! either is down or the federation member goes inactive, and periodically
//! sends a status report (optionally sweeping the wallet cross-chain).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::Notify;
use tracing::{info, warn};

use cirrus_api::NodeClient;
use cirrus_core::OperatorConfig;
use cirrus_monitor::{IntervalTicker, Monitor, Notifier};

#[derive(Parser, Debug)]
#[command(
    name = "cirrus-watchdog",
    version,
    about = "Monitor a Cirrus masternode and report over Discord"
)]
struct Args {
    /// Operator configuration file (default: <config dir>/cirrus/operator.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_format);

    let path = args.config.unwrap_or_else(OperatorConfig::default_path);
    let mut config = OperatorConfig::load(&path)
        .with_context(|| format!("Failed to load operator config from {}", path.display()))?;

    let m = &config.monitor;
    if config.wallet.password.is_empty() && (m.cross_chain.is_some() || m.ensure_staking) {
        config.wallet.password =
            rpassword::prompt_password(format!("Password for wallet '{}': ", config.wallet.name))
                .context("Failed to read password")?;
    }

    let timeout = config.nodes.timeout_secs.map(Duration::from_secs);
    let primary = NodeClient::with_timeout(&config.nodes.primary, timeout)
        .context("Invalid mainchain node URL")?;
    let secondary = NodeClient::with_timeout(&config.nodes.secondary, timeout)
        .context("Invalid sidechain node URL")?;
    let notifier = Notifier::from_config(&config.notify).context("Invalid notification settings")?;
    if notifier.is_empty() {
        warn!("No notification sinks configured; alerts will be dropped");
    }

    info!("Cirrus watchdog v{}", env!("CARGO_PKG_VERSION"));
    info!("mainchain: {}", primary.base_url());
    info!("sidechain: {}", secondary.base_url());
    info!("sinks: {}", notifier.len());

    let mut monitor = Monitor::new(&primary, &secondary, &config, &notifier);

    if args.once {
        let outcome = monitor.run_cycle().await;
        info!(
            primary = ?outcome.primary,
            secondary = ?outcome.secondary,
            inactive = ?outcome.inactive,
            "Cycle complete"
        );
        return Ok(());
    }

    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(Notify::new());

    let running_clone = Arc::clone(&running);
    let shutdown_clone = Arc::clone(&shutdown);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        warn!("received SIGINT, shutting down...");
        running_clone.store(false, Ordering::Relaxed);
        shutdown_clone.notify_one();
    });

    let mut ticker = IntervalTicker::with_shutdown(config.monitor.poll_interval(), shutdown);
    monitor.run(&mut ticker, &running).await;

    info!("Watchdog shutdown complete");
    Ok(())
}

/// Initialize tracing with the given level and output format.
///
/// `RUST_LOG` takes precedence over `level` when set.
fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["cirrus-watchdog"]).unwrap();
        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(args.log_level, "info");
        assert!(!args.once);
        assert!(args.config.is_none());
    }

    #[test]
    fn json_logging_and_single_cycle() {
        let args = Args::try_parse_from([
            "cirrus-watchdog", "--log-format", "json", "--once", "--config", "/etc/cirrus.toml",
        ])
        .unwrap();
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.once);
        assert_eq!(args.config, Some(PathBuf::from("/etc/cirrus.toml")));
        assert!(Args::try_parse_from(["cirrus-watchdog", "--log-format", "xml"]).is_err());
    }
}
