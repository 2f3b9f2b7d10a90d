//! tomo Daemon
//!
//! Terminal front-end for the tomo virtual pet. Drives the conductor from
//! stdin and renders the pet on stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local pet server, relaying signals to the default board
//! tomo-daemon --username rat
//!
//! # Send signals straight to the board over UDP
//! tomo-daemon --device-link udp --device-addr 192.168.1.50 --device-port 5005
//!
//! # With verbose logging
//! RUST_LOG=debug tomo-daemon
//! ```
//!
//! # Commands
//!
//! - `/login <name>`: start a session
//! - `/feed <path>`: feed the pet a photo
//! - `/logout`: end the session
//! - `/quit`: exit
//! - anything else: chat
//!
//! # Signals
//!
//! - SIGINT: graceful logout and exit

mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use tomo_conductor::{
    load_config, load_config_from_path, Conductor, ConductorError, ConfigOverrides,
    DeviceNotifier, HttpBackend, LinkKind, LoginOutcome, Services,
};

use crate::terminal::TerminalDisplay;

/// Terminal front-end for the tomo virtual pet
#[derive(Debug, Parser)]
#[command(name = "tomo-daemon", version, about)]
struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/tomo/conductor.toml)
    #[arg(long, env = "TOMO_CONFIG")]
    config: Option<PathBuf>,

    /// Log in as this user on startup
    #[arg(long)]
    username: Option<String>,

    /// Pet server base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Actuator address
    #[arg(long)]
    device_addr: Option<String>,

    /// Actuator port
    #[arg(long)]
    device_port: Option<u16>,

    /// How signals reach the actuator (udp, relay, disabled)
    #[arg(long)]
    device_link: Option<LinkKind>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend_url: self.backend_url.clone(),
            device_address: self.device_addr.clone(),
            device_port: self.device_port,
            device_link: self.device_link,
        }
    }
}

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login(String),
    Feed(PathBuf),
    Logout,
    Quit,
    Chat(String),
    Empty,
}

impl Command {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }

        let (head, rest) = trimmed
            .split_once(char::is_whitespace)
            .map_or((trimmed, ""), |(h, r)| (h, r.trim()));
        match head {
            "/login" => Self::Login(rest.to_string()),
            "/feed" => Self::Feed(PathBuf::from(rest)),
            "/logout" => Self::Logout,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Chat(line.to_string()),
        }
    }
}

async fn login(conductor: &Conductor, display: &TerminalDisplay, username: &str) {
    match conductor.login(username).await {
        Ok(LoginOutcome::Accepted { message, .. }) => {
            if !message.is_empty() {
                display.notice(&message);
            }
        }
        Ok(LoginOutcome::Rejected(reason)) => display.notice(&reason),
        Err(e) => display.notice(&e.to_string()),
    }
}

async fn feed(conductor: &Conductor, display: &TerminalDisplay, path: &Path) {
    if path.as_os_str().is_empty() {
        display.notice("usage: /feed <path>");
        return;
    }
    let image = match tokio::fs::read(path).await {
        Ok(image) => image,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read photo");
            display.notice(&format!("could not read {}: {e}", path.display()));
            return;
        }
    };
    let filename = path
        .file_name()
        .map_or_else(|| "photo".to_string(), |n| n.to_string_lossy().into_owned());

    if let Err(e) = conductor.feed(image, filename) {
        display.notice(&e.to_string());
    }
}

/// Handle one input line; returns `false` to stop
async fn handle_line(conductor: &Conductor, display: &TerminalDisplay, line: &str) -> bool {
    match Command::parse(line) {
        Command::Empty => {}
        Command::Login(name) => login(conductor, display, &name).await,
        Command::Feed(path) => feed(conductor, display, &path).await,
        Command::Logout => {
            conductor.logout();
            display.notice("logged out");
        }
        Command::Quit => return false,
        Command::Chat(text) => match conductor.chat(&text) {
            Ok(_) => {}
            Err(ConductorError::NoSession) => display.notice("log in first with /login <name>"),
            Err(e) => display.notice(&e.to_string()),
        },
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tomo_daemon=info".parse()?)
                .add_directive("tomo_conductor=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    }
    .context("Failed to load configuration")?;
    cli.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        backend = %config.backend_url,
        link = %config.device_link,
        device = %format!("{}:{}", config.device_address, config.device_port),
        "Starting tomo daemon"
    );

    let backend = Arc::new(
        HttpBackend::new(&config.backend_url, config.backend_timeout)
            .context("Failed to create HTTP client")?,
    );
    let link = config
        .device_link()
        .context("Failed to create device link")?;
    let notifier = DeviceNotifier::new(link, config.notifier_config());
    let display = TerminalDisplay::new();

    let conductor = Conductor::new(
        config.conductor_config(),
        Services::from_backend(backend),
        Arc::new(display.clone()),
        notifier,
        Arc::new(config.state_table()),
    );

    if let Some(ref username) = cli.username {
        login(&conductor, &display, username).await;
    } else {
        display.notice("log in with /login <name>");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("Failed to read stdin")? {
                    Some(line) => {
                        if !handle_line(&conductor, &display, &line).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    conductor.logout();
    info!("Shutdown complete");
    Ok(())
}
