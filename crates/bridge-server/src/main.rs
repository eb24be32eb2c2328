//! Screen bridge: entry point.
//!
//! This binary serves a small web app that lets a phone log in with a shared
//! passcode, watch a once-per-second capture of a desktop window, and type
//! messages into that window.
//!
//! # Usage
//!
//! ```text
//! bridge-server [OPTIONS]
//!
//! Options:
//!   --port <PORT>                 HTTP port [default: 3456]
//!   --bind <IP>                   Bind address [default: 0.0.0.0]
//!   --passcode <CODE>             Login passcode (empty disables login)
//!   --session-ttl-ms <MS>         Session lifetime [default: 86400000]
//!   --session-store <PATH>        Session snapshot [default: data/sessions.json]
//!   --cleanup-interval-secs <S>   Expired-session sweep period [default: 600]
//!   --stream-interval-ms <MS>     Capture period [default: 1000]
//!   --frame-path <PATH>           Latest frame [default: <tmp>/claude-bridge-latest-frame.jpg]
//!   --done-delay-ms <MS>          Delay before the done notification [default: 2000]
//!   --ntfy-topic <TOPIC>          ntfy topic [default: default-claude-bridge]
//!   --ntfy-server <URL>           ntfy server [default: https://ntfy.sh]
//!   --scripts-dir <DIR>           Helper scripts [default: scripts]
//!   --public-dir <DIR>            Web client files [default: public]
//!   --config <FILE>               Optional TOML config file
//! ```
//!
//! # Environment variable overrides
//!
//! Each option can also be set through an environment variable
//! (`BRIDGE_PORT`, `BRIDGE_PASSCODE`, `NTFY_TOPIC`, ...; see `--help`).
//! Precedence: command line, then environment, then the config file, then
//! the built-in default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bridge_server::domain::BridgeConfig;
use bridge_server::infrastructure::{load_config_file, run_bridge, FileConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Passcode-gated screen bridge.
///
/// Every option is optional so that unset values can fall through to the
/// config file and then to the built-in defaults.
#[derive(Debug, Default, Parser)]
#[command(
    name = "bridge-server",
    about = "Stream a desktop window to a phone and type messages into it",
    version
)]
struct Cli {
    /// HTTP port to listen on.
    #[arg(long, env = "BRIDGE_PORT")]
    port: Option<u16>,

    /// IP address to bind to.  `0.0.0.0` accepts LAN connections.
    #[arg(long, env = "BRIDGE_BIND")]
    bind: Option<String>,

    /// Shared login passcode.  When empty, every login is rejected.
    #[arg(long, env = "BRIDGE_PASSCODE", hide_env_values = true)]
    passcode: Option<String>,

    /// Session lifetime in milliseconds.
    #[arg(long, env = "BRIDGE_SESSION_TTL_MS")]
    session_ttl_ms: Option<u64>,

    /// Where the session snapshot is written.
    #[arg(long, env = "BRIDGE_SESSION_STORE")]
    session_store: Option<PathBuf>,

    /// How often expired sessions are swept, in seconds.
    #[arg(long, env = "BRIDGE_CLEANUP_INTERVAL_SECS")]
    cleanup_interval_secs: Option<u64>,

    /// Delay between frame captures while streaming, in milliseconds.
    #[arg(long, env = "BRIDGE_STREAM_INTERVAL_MS")]
    stream_interval_ms: Option<u64>,

    /// Fixed path of the latest captured frame.
    #[arg(long, env = "BRIDGE_FRAME_PATH")]
    frame_path: Option<PathBuf>,

    /// Delay between typing a message and the done notification.
    #[arg(long, env = "BRIDGE_DONE_DELAY_MS")]
    done_delay_ms: Option<u64>,

    /// ntfy topic for done notifications.
    #[arg(long, env = "NTFY_TOPIC")]
    ntfy_topic: Option<String>,

    /// ntfy server base URL.
    #[arg(long, env = "BRIDGE_NTFY_SERVER")]
    ntfy_server: Option<String>,

    /// Directory holding the helper scripts.
    #[arg(long, env = "BRIDGE_SCRIPTS_DIR")]
    scripts_dir: Option<PathBuf>,

    /// Directory served as the web client.
    #[arg(long, env = "BRIDGE_PUBLIC_DIR")]
    public_dir: Option<PathBuf>,

    /// Optional TOML config file supplying values not given here.
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges the CLI/env values over `file` and the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is not a valid IP address.
    fn into_bridge_config(self, file: FileConfig) -> anyhow::Result<BridgeConfig> {
        let defaults = BridgeConfig::default();

        let bind = self
            .bind
            .or(file.server.bind)
            .unwrap_or_else(|| defaults.bind_addr.ip().to_string());
        let port = self
            .port
            .or(file.server.port)
            .unwrap_or(defaults.bind_addr.port());
        let bind_addr: SocketAddr = format!("{bind}:{port}")
            .parse()
            .with_context(|| format!("invalid bind address: '{bind}:{port}'"))?;

        let millis = |cli: Option<u64>, file: Option<u64>, default: Duration| {
            cli.or(file).map(Duration::from_millis).unwrap_or(default)
        };

        Ok(BridgeConfig {
            bind_addr,
            passcode: self
                .passcode
                .or(file.auth.passcode)
                .unwrap_or(defaults.passcode),
            session_ttl: millis(
                self.session_ttl_ms,
                file.auth.session_ttl_ms,
                defaults.session_ttl,
            ),
            session_store_path: self
                .session_store
                .or(file.auth.session_store)
                .unwrap_or(defaults.session_store_path),
            session_cookie_name: file
                .auth
                .cookie_name
                .unwrap_or(defaults.session_cookie_name),
            cleanup_interval: self
                .cleanup_interval_secs
                .or(file.auth.cleanup_interval_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
            stream_interval: millis(
                self.stream_interval_ms,
                file.stream.interval_ms,
                defaults.stream_interval,
            ),
            frame_path: self
                .frame_path
                .or(file.stream.frame_path)
                .unwrap_or(defaults.frame_path),
            scripts_dir: self
                .scripts_dir
                .or(file.relay.scripts_dir)
                .unwrap_or(defaults.scripts_dir),
            public_dir: self
                .public_dir
                .or(file.server.public_dir)
                .unwrap_or(defaults.public_dir),
            done_delay: millis(
                self.done_delay_ms,
                file.relay.done_delay_ms,
                defaults.done_delay,
            ),
            ntfy_server: self
                .ntfy_server
                .or(file.relay.ntfy_server)
                .unwrap_or(defaults.ntfy_server),
            ntfy_topic: self
                .ntfy_topic
                .or(file.relay.ntfy_topic)
                .unwrap_or(defaults.ntfy_topic),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. `tracing_subscriber` is initialised; `RUST_LOG` controls the level
///    (default `info`).
/// 2. CLI arguments are parsed with `clap`, the optional config file is read,
///    and both are merged into a [`BridgeConfig`].
/// 3. [`run_bridge`] loads the session snapshot, starts the sweep task, and
///    serves HTTP until Ctrl+C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => load_config_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => FileConfig::default(),
    };
    let config = cli.into_bridge_config(file)?;
    info!("screen bridge starting: {config:?}");

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C; initiating graceful shutdown"),
            Err(e) => {
                // Without a signal handler, run until the process is killed.
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    run_bridge(config, shutdown).await?;

    info!("screen bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_server::infrastructure::config_file::{AuthSection, ServerSection, StreamSection};

    #[test]
    fn test_cli_without_arguments_leaves_everything_unset() {
        // Arrange / Act: parse with no arguments
        let cli = Cli::try_parse_from(["bridge-server"]).unwrap();

        // Assert: only the environment could have filled these
        if std::env::var_os("BRIDGE_PORT").is_none() {
            assert_eq!(cli.port, None);
        }
        if std::env::var_os("BRIDGE_CONFIG").is_none() {
            assert_eq!(cli.config, None);
        }
    }

    #[test]
    fn test_cli_port_override() {
        let cli = Cli::parse_from(["bridge-server", "--port", "9999"]);
        assert_eq!(cli.port, Some(9999));
    }

    #[test]
    fn test_cli_passcode_and_topic_override() {
        let cli = Cli::parse_from([
            "bridge-server",
            "--passcode",
            "abc123",
            "--ntfy-topic",
            "desk",
        ]);
        assert_eq!(cli.passcode.as_deref(), Some("abc123"));
        assert_eq!(cli.ntfy_topic.as_deref(), Some("desk"));
    }

    #[test]
    fn test_into_bridge_config_defaults() {
        // Arrange: nothing set anywhere
        let cli = Cli::default();

        // Act
        let config = cli.into_bridge_config(FileConfig::default()).unwrap();

        // Assert
        assert_eq!(config.bind_addr.port(), 3456);
        assert_eq!(config.bind_addr.ip().to_string(), "0.0.0.0");
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.stream_interval, Duration::from_millis(1_000));
        assert_eq!(config.done_delay, Duration::from_millis(2_000));
        assert_eq!(config.ntfy_url(), "https://ntfy.sh/default-claude-bridge");
        assert!(config.passcode.is_empty());
    }

    #[test]
    fn test_file_values_fill_unset_cli_options() {
        // Arrange
        let file = FileConfig {
            server: ServerSection {
                port: Some(8080),
                ..ServerSection::default()
            },
            auth: AuthSection {
                passcode: Some("from-file".to_string()),
                session_ttl_ms: Some(1_000),
                ..AuthSection::default()
            },
            stream: StreamSection {
                interval_ms: Some(250),
                ..StreamSection::default()
            },
            ..FileConfig::default()
        };

        // Act
        let config = Cli::default().into_bridge_config(file).unwrap();

        // Assert
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.passcode, "from-file");
        assert_eq!(config.session_ttl, Duration::from_millis(1_000));
        assert_eq!(config.stream_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_cli_values_win_over_file() {
        let file = FileConfig {
            server: ServerSection {
                port: Some(8080),
                ..ServerSection::default()
            },
            ..FileConfig::default()
        };
        let cli = Cli {
            port: Some(9090),
            ..Cli::default()
        };

        let config = cli.into_bridge_config(file).unwrap();

        assert_eq!(config.bind_addr.port(), 9090);
    }

    #[test]
    fn test_into_bridge_config_invalid_bind_returns_error() {
        // Arrange: provide an invalid IP address string
        let cli = Cli {
            bind: Some("not.an.ip".to_string()),
            ..Cli::default()
        };

        // Act
        let result = cli.into_bridge_config(FileConfig::default());

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }
}
