// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ddi_agent::{
    bind9::{
        parse_key_file, ControlChannel, DaemonLauncher, HickoryUpdater, NamedLauncher,
        RecordUpdater, RndcControl, Supervisor,
    },
    compiler::{writer::ArtifactWriter, ConfigCompiler},
    config::AgentConfig,
    dhcp::DhcpHandler,
    dispatch::Dispatcher,
    dns::DnsHandler,
    intent::{FileIntentStore, IntentStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Node-local agent converging BIND9 and Kea with declarative intent
#[derive(Debug, Parser)]
#[command(name = "ddi-agent", version, about)]
struct Cli {
    /// Agent configuration file
    #[arg(short, long, default_value = "/etc/ddi-agent/config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Supervise the daemons and serve envelopes on stdin (default)
    Run,
    /// Validate the configuration and the persisted intent, then exit
    CheckConfig,
    /// Render the persisted intent into a directory without touching any daemon
    Render {
        /// Output directory
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("ddi-agent")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn init_tracing() {
    // RUST_LOG selects the filter (default info), RUST_LOG_FORMAT=json|text the format.
    // Logs go to stderr; stdout carries responses.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<()> {
    init_tracing();
    debug!(config = %cli.config.display(), "Logging initialized");

    let config = AgentConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::CheckConfig => check_config(&config).await,
        Command::Render { dir } => render(&config, dir).await,
    }
}

async fn check_config(config: &AgentConfig) -> Result<()> {
    if config.dhcp.enabled {
        config.dhcp.control_agent_url()?;
    }
    if config.dns.enabled {
        let path = &config.dns.rndc_key_file;
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read rndc key {}", path.display()))?;
        let key = parse_key_file(&text)?;
        if key.name != config.dns.rndc_key_name {
            anyhow::bail!(
                "rndc key file defines '{}' but dns.rndc-key-name is '{}'",
                key.name,
                config.dns.rndc_key_name
            );
        }
    }
    let store = FileIntentStore::open(&config.intent_path).await?;
    let intent = store.snapshot().await?;
    intent.ordered_views()?;
    println!(
        "configuration OK (intent revision {}, {} views, {} zones)",
        intent.revision,
        intent.views.len(),
        intent.zones.len()
    );
    Ok(())
}

async fn render(config: &AgentConfig, dir: PathBuf) -> Result<()> {
    let store = FileIntentStore::open(&config.intent_path).await?;
    let intent = store.snapshot().await?;
    let set = ConfigCompiler::new(&config.dns)
        .with_conf_dir(dir.clone())
        .compile_full(&intent)?;
    let changed = ArtifactWriter::new(&dir).write_all(&set).await?;
    info!(dir = %dir.display(), files = set.len(), changed = changed.len(), "Rendered intent");
    println!("{} files rendered into {}", set.len(), dir.display());
    Ok(())
}

/// Build the DNS handler and start supervising `named`.
async fn start_dns(
    config: &AgentConfig,
) -> Result<(Arc<DnsHandler>, Arc<Supervisor>, JoinHandle<()>)> {
    let store: Arc<dyn IntentStore> = Arc::new(FileIntentStore::open(&config.intent_path).await?);
    let control: Arc<dyn ControlChannel> = Arc::new(RndcControl::new(&config.dns));
    let updater: Arc<dyn RecordUpdater> = Arc::new(HickoryUpdater::new(config.dns.update_server));
    let handler = Arc::new(DnsHandler::new(
        &config.dns,
        store,
        Arc::clone(&control),
        updater,
    ));

    let launcher: Arc<dyn DaemonLauncher> = Arc::new(NamedLauncher::new(&config.dns));
    let supervisor = Arc::new(Supervisor::new(
        &config.dns,
        handler.clone(),
        launcher,
        control,
    ));

    // The health loop retries a failed first start.
    if let Err(e) = supervisor.start().await {
        error!(error = %e, "Initial start of named failed");
    }
    let health = supervisor.spawn_health_loop();
    Ok((handler, supervisor, health))
}

async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}

async fn run(config: AgentConfig) -> Result<()> {
    info!("Starting ddi-agent");

    let (dns, supervision) = if config.dns.enabled {
        let (handler, supervisor, health) = start_dns(&config).await?;
        (Some(handler), Some((supervisor, health)))
    } else {
        info!("DNS disabled");
        (None, None)
    };

    let dhcp = if config.dhcp.enabled {
        let handler = DhcpHandler::load(&config.dhcp)
            .await
            .context("Failed to load Kea configuration")?;
        Some(Arc::new(handler))
    } else {
        info!("DHCP disabled");
        None
    };

    let dispatcher = Dispatcher::new(dns, dhcp);
    info!("Serving envelopes on stdin");

    let served = tokio::select! {
        result = dispatcher.serve(tokio::io::stdin(), tokio::io::stdout()) => result.map(|_| ()),
        signal = shutdown_signal() => signal.map(|name| {
            info!(signal = name, "Received shutdown signal");
        }),
    };

    if let Some((supervisor, health)) = supervision {
        if let Err(e) = supervisor.stop().await {
            warn!(error = %e, "Failed to stop named");
        }
        supervisor.cancellation_token().cancel();
        if let Err(e) = health.await {
            warn!(error = %e, "Health loop ended abnormally");
        }
    }

    info!("ddi-agent stopped");
    served
}
