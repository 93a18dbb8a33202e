use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;

use nakama_realtime::{ChannelJoinType, Conn, ConnConfig, ConnOptions, config};

mod commands;

#[derive(Parser)]
#[command(name = "realtime")]
#[command(about = "Talk to a realtime game server over one multiplexed WebSocket")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./realtime.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// WebSocket URL, e.g. ws://127.0.0.1:7350/ws
    #[arg(long, global = true)]
    url: Option<String>,

    /// Session token
    #[arg(long, global = true)]
    token: Option<String>,

    /// Wire format: protobuf or json
    #[arg(long, global = true)]
    format: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure a round trip
    Ping,

    /// Call a server RPC function
    Rpc(RpcArgs),

    /// Join a chat channel and print its messages until Ctrl-C
    Join(JoinArgs),

    /// Print every server push until Ctrl-C
    Listen,
}

#[derive(Parser)]
struct RpcArgs {
    /// RPC function id
    id: String,

    /// Payload, usually JSON
    payload: Option<String>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum JoinKind {
    Room,
    Dm,
    Group,
}

impl From<JoinKind> for ChannelJoinType {
    fn from(kind: JoinKind) -> Self {
        match kind {
            JoinKind::Room => ChannelJoinType::Room,
            JoinKind::Dm => ChannelJoinType::DirectMessage,
            JoinKind::Group => ChannelJoinType::Group,
        }
    }
}

#[derive(Parser)]
struct JoinArgs {
    /// Room name, user id or group id
    target: String,

    /// What `target` names
    #[arg(long, value_enum, default_value = "room")]
    kind: JoinKind,

    /// Keep messages in channel history
    #[arg(long)]
    persist: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.debug {
        "nakama_realtime=debug,realtime=debug,info"
    } else {
        "nakama_realtime=info,realtime=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = resolve_config(&cli)?;
    let options = ConnOptions::from_config(&config).context("invalid connection settings")?;
    let conn = Conn::connect(options)
        .await
        .context("failed to connect")?;
    info!(format = %conn.format(), "connected");

    let result = match cli.command {
        Commands::Ping => commands::ping(&conn).await,
        Commands::Rpc(args) => commands::rpc(&conn, &args.id, args.payload).await,
        Commands::Join(args) => {
            commands::join(&conn, &args.target, args.kind.into(), args.persist).await
        }
        Commands::Listen => commands::listen(&conn).await,
    };

    conn.close().await?;
    result
}

/// Layer the config file and env vars, then let explicit flags win.
fn resolve_config(cli: &Cli) -> Result<ConnConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::CONFIG_FILE));
    let mut config: ConnConfig = config::load_config(&path)
        .extract()
        .with_context(|| format!("failed to load {}", path.display()))?;

    if let Some(url) = &cli.url {
        config.url = Some(url.clone());
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(format) = &cli.format {
        config.format = format.clone();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(config::CONFIG_FILE);
        std::fs::write(&path, "url = \"ws://from-file/ws\"\nformat = \"json\"\n").unwrap();

        let cli = Cli::parse_from([
            "realtime",
            "--config",
            path.to_str().unwrap(),
            "--url",
            "ws://from-flag/ws",
            "ping",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.url.as_deref(), Some("ws://from-flag/ws"));
        assert_eq!(config.format, "json");
    }

    #[test]
    fn parses_join_args() {
        let cli = Cli::parse_from(["realtime", "join", "lobby", "--kind", "dm", "--persist"]);
        match cli.command {
            Commands::Join(args) => {
                assert_eq!(args.target, "lobby");
                assert!(args.persist);
                assert_eq!(
                    ChannelJoinType::from(args.kind),
                    ChannelJoinType::DirectMessage
                );
            }
            _ => panic!("wrong command"),
        }
    }
}
