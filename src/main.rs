//! mergebot binary entry point

use anyhow::Context;
use clap::Parser;
use mergebot::config::Config;
use mergebot::cycle::Bot;
use mergebot::pipeline::ShellRunner;
use mergebot::platform::GitHubSource;
use mergebot::ticket::NoopTracker;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Continuously scans pull requests, rebuilds and merges approved ones
#[derive(Debug, Parser)]
#[command(name = "mergebot", version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "mergebot.toml")]
    config: PathBuf,

    /// Run a single cycle and exit (for cron-style supervision)
    #[arg(long)]
    once: bool,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// GitHub Enterprise host (uses github.com when absent)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let token = config.resolve_token().context("resolving API token")?;

    let platform = Arc::new(
        GitHubSource::new(&token, config.org.clone(), args.host.clone())
            .context("creating GitHub client")?,
    );
    let runner = Arc::new(ShellRunner::new(config.bot_name.clone()));
    let tracker = Arc::new(NoopTracker);

    let mut bot = Bot::new(config, platform, runner, tracker);

    if args.once {
        bot.cycle().await;
    } else {
        bot.run_forever().await;
    }

    Ok(())
}
