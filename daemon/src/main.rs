//! Verification sync daemon: runs the node, or checks a user's status from
//! the command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use ltc_client::{
    ApiClient, PollOutcome, PollerConfig, Session, StaticTokenProvider, VerificationPoller,
};
use ltc_node::{LtcNode, NodeConfig, StoreBackend};
use ltc_utils::{format_duration, init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "ltc-daemon", about = "Age-verification sync service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long, env = "LTC_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for LMDB storage.
    #[arg(long, env = "LTC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Storage backend: "lmdb" or "memory".
    #[arg(long, env = "LTC_STORE_BACKEND", value_parser = parse_backend)]
    store_backend: Option<StoreBackend>,

    /// API listen address.
    #[arg(long, env = "LTC_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// API port.
    #[arg(long, env = "PORT")]
    api_port: Option<u16>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "LTC_ENABLE_METRICS")]
    metrics: bool,

    /// Log level filter, e.g. "info" or "debug,ltc_rpc=trace".
    #[arg(long, env = "LTC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LTC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Manage the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Poll a user's verification status the way the web client does.
    Poll {
        /// Base URL of the API.
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        api_url: String,
        /// Firebase ID token of the user.
        #[arg(long, env = "LTC_ID_TOKEN")]
        token: String,
        #[arg(long, default_value_t = ltc_client::poller::MAX_ATTEMPTS)]
        attempts: u32,
        /// Seconds between attempts.
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node.
    Run,
    /// Validate the configuration and storage, then exit.
    Check,
    /// Print the effective configuration as TOML (secrets redacted).
    Config,
}

fn parse_backend(s: &str) -> Result<StoreBackend, String> {
    match s.to_ascii_lowercase().as_str() {
        "lmdb" => Ok(StoreBackend::Lmdb),
        "memory" => Ok(StoreBackend::Memory),
        other => Err(format!("unknown store backend: {other}")),
    }
}

/// Layer the config file, the environment secrets and the CLI flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            NodeConfig::from_toml_file(&path)
                .with_context(|| format!("failed to load config file {path}"))?
        }
        None => NodeConfig::default(),
    };
    config.apply_env_overrides();

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(backend) = cli.store_backend {
        config.store_backend = backend;
    }
    if let Some(addr) = &cli.listen_addr {
        config.listen_addr = addr.clone();
    }
    if let Some(port) = cli.api_port {
        config.api_port = port;
    }
    config.enable_metrics |= cli.metrics;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.validate()?;
    Ok(config)
}

fn redacted(config: &NodeConfig) -> NodeConfig {
    const HIDDEN: &str = "<redacted>";
    let mut shown = config.clone();
    let hide = |s: &mut String| {
        if !s.is_empty() {
            *s = HIDDEN.to_string();
        }
    };
    hide(&mut shown.persona.api_key);
    hide(&mut shown.firebase.api_key);
    hide(&mut shown.fcm.access_token);
    if let Some(secret) = shown.persona.webhook_secret.as_mut() {
        hide(secret);
    }
    shown
}

async fn poll(api_url: String, token: String, attempts: u32, interval: u64) -> anyhow::Result<()> {
    let api = ApiClient::new(api_url, Arc::new(StaticTokenProvider::new(token)))?;
    let session = Session::new();
    let snapshot = api.me().await.context("initial status lookup failed")?;
    session.identity_changed(Some(snapshot));

    let config = PollerConfig {
        max_attempts: attempts,
        interval: Duration::from_secs(interval),
    };
    let started = std::time::Instant::now();
    let outcome = VerificationPoller::with_config(Arc::new(api), session, config)
        .spawn()
        .outcome()
        .await;
    let elapsed = format_duration(started.elapsed());
    match outcome {
        PollOutcome::Verified => println!("verified ({elapsed})"),
        PollOutcome::Rejected => println!("rejected ({elapsed})"),
        PollOutcome::PendingReview => println!("still under review after {elapsed}"),
        PollOutcome::SignedOut => anyhow::bail!("token rejected or user not registered"),
        PollOutcome::Cancelled => anyhow::bail!("polling cancelled"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run => {
                tracing::info!(
                    "Starting node (API:{}:{}, store:{:?})",
                    config.listen_addr,
                    config.api_port,
                    config.store_backend,
                );
                let mut node = LtcNode::new(config)?;
                node.run().await?;
                tracing::info!("daemon exited cleanly");
            }
            NodeAction::Check => {
                LtcNode::new(config)?;
                println!("configuration and storage OK");
            }
            NodeAction::Config => {
                print!("{}", redacted(&config).to_toml_string());
            }
        },
        Command::Poll {
            api_url,
            token,
            attempts,
            interval,
        } => poll(api_url, token, attempts, interval).await?,
    }

    Ok(())
}
