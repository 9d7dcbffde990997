//! LineCrypt peer
//!
//! Runs one device over UDP, or both roles in-process.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use peer::config::Config;
use peer::protocol::{Role, SecurityLevel, SeededRandom};
use peer::{ConsoleRenderer, Node, NodeSettings, Simulation, StdinToggle, UdpLineTransport};
use tokio::time::MissedTickBehavior;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// LineCrypt peer - DH secure-channel bootstrap over a line link.
#[derive(Parser, Debug)]
#[command(name = "linecrypt-peer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Print the simulation report as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one device over UDP; press Enter to toggle the security level
    Run {
        /// Device role (initiator or responder)
        #[arg(long)]
        role: Option<Role>,

        /// Local address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Address of the other device
        #[arg(long)]
        peer: Option<String>,

        /// Initial security level (cleartext or secured)
        #[arg(long)]
        level: Option<SecurityLevel>,
    },

    /// Run both roles in-process over an in-memory link
    Simulate {
        /// Number of ticks to run
        #[arg(long)]
        ticks: Option<u64>,

        /// Probability that a line is lost (0.0 to 1.0)
        #[arg(long)]
        drop_rate: Option<f64>,

        /// Ticks on which both devices press the toggle
        #[arg(long = "toggle-at", value_delimiter = ',')]
        toggle_at: Vec<u64>,

        /// Seed for key generation and link loss
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();
    apply_cli_overrides(&mut config, &cli.command);

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.node.log_level.to_lowercase()
    };
    let _log_guard = init_tracing(&filter, cli.log_file.as_deref())?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Run { .. } => run_device(&config).await?,
        Commands::Simulate { .. } => {
            let mut simulation = Simulation::new(&config)?;
            let report = simulation.run(config.simulation.ticks);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Folds command-line flags into the configuration.
fn apply_cli_overrides(config: &mut Config, command: &Commands) {
    match command {
        Commands::Run {
            role,
            bind,
            peer,
            level,
        } => {
            if let Some(role) = role {
                config.node.role = *role;
            }
            if let Some(bind) = bind {
                config.link.bind = bind.clone();
            }
            if let Some(peer) = peer {
                config.link.peer = peer.clone();
            }
            if let Some(level) = level {
                config.node.level = *level;
            }
        }
        Commands::Simulate {
            ticks,
            drop_rate,
            toggle_at,
            seed,
        } => {
            if let Some(ticks) = ticks {
                config.simulation.ticks = *ticks;
            }
            if let Some(drop_rate) = drop_rate {
                config.link.drop_rate = *drop_rate;
            }
            if !toggle_at.is_empty() {
                config.simulation.toggle_at = toggle_at.clone();
            }
            if seed.is_some() {
                config.handshake.seed = *seed;
            }
        }
        Commands::Config => {}
    }
}

/// Sets up the global subscriber. The returned guard flushes the log file on drop.
fn init_tracing(filter: &str, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

/// Runs one device until Ctrl-C.
async fn run_device(config: &Config) -> anyhow::Result<()> {
    let role = config.node.role;
    let bind: SocketAddr = config
        .link
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.link.bind))?;
    let peer: SocketAddr = config
        .link
        .peer
        .parse()
        .with_context(|| format!("Invalid peer address: {}", config.link.peer))?;

    let transport = UdpLineTransport::bind(bind, peer)
        .with_context(|| format!("Failed to bind UDP socket on {}", bind))?;
    let settings = NodeSettings::from_config(config, role)?;
    let mut node = Node::new(
        settings,
        transport,
        ConsoleRenderer::stdout(role),
        StdinToggle::spawn(),
    );
    let mut rng = match config.handshake.seed {
        Some(seed) => SeededRandom::from_seed(seed),
        None => SeededRandom::from_entropy(),
    };

    tracing::info!(
        role = %role,
        level = %node.level(),
        bind = %bind,
        peer = %peer,
        "Peer started; press Enter to toggle the security level"
    );

    let mut ticker = tokio::time::interval(config.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("Received shutdown signal");
                break;
            }
            instant = ticker.tick() => {
                node.tick(instant.into_std(), &mut rng);
            }
        }
    }

    let stats = node.router_stats();
    tracing::info!(
        ticks = node.ticks(),
        lines = stats.lines,
        plaintext = stats.plaintext,
        key_unavailable = stats.key_unavailable,
        state = ?node.engine().state(),
        "Peer stopped"
    );
    Ok(())
}
