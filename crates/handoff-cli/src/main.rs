//! Handoff: peer-to-peer terminal chat over WebRTC, signaled by hand.

#![forbid(unsafe_code)]

mod app;
mod clipboard;
mod commands;
mod console;
mod files;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use handoff_core::{RtcConnector, Session, SessionConfig, SignalingDocument};

use crate::app::{App, Flow};
use crate::clipboard::{ArboardClipboard, Clipboard};

#[derive(Parser, Debug)]
#[command(name = "handoff")]
#[command(about = "Peer-to-peer chat over WebRTC with copy-and-paste signaling")]
struct Args {
    /// Default log filter when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start an interactive chat session
    Chat(ChatArgs),

    /// Validate a saved signaling document and summarize it
    Inspect {
        /// Document file path
        path: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args, Debug)]
struct ChatArgs {
    /// JSON session config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// STUN/TURN server URL (repeatable)
    #[arg(long = "stun", env = "HANDOFF_STUN", value_delimiter = ',')]
    stun: Vec<String>,

    /// Use no ICE servers at all (host candidates only)
    #[arg(long)]
    no_stun: bool,

    /// How long each document waits for ICE candidates
    #[arg(long, env = "HANDOFF_GATHER_WINDOW_MS")]
    gather_window_ms: Option<u64>,

    /// Data channel label
    #[arg(long)]
    label: Option<String>,

    /// Directory for /save
    #[arg(long, env = "HANDOFF_SAVE_DIR", default_value = ".")]
    save_dir: PathBuf,

    /// Do not touch the system clipboard
    #[arg(long)]
    no_clipboard: bool,
}

impl ChatArgs {
    /// Defaults, then the config file, then flags.
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if self.no_stun {
            config.ice_servers.clear();
        } else if !self.stun.is_empty() {
            config.ice_servers = self.stun.clone();
        }
        if let Some(ms) = self.gather_window_ms {
            config.gather_window_ms = ms;
        }
        if let Some(label) = &self.label {
            config.channel_label = label.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn clipboard(&self) -> Option<Box<dyn Clipboard>> {
        if self.no_clipboard {
            return None;
        }
        match ArboardClipboard::new() {
            Ok(clipboard) => Some(Box::new(clipboard)),
            Err(e) => {
                warn!(error = %e, "clipboard unavailable");
                None
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    handoff_common::init_tracing_with_default(&args.log_level);

    match args.command {
        Command::Chat(chat) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(run_chat(chat))?;
        }
        Command::Inspect { path } => inspect(&path)?,
        Command::Version => {
            println!("handoff {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

async fn run_chat(args: ChatArgs) -> Result<()> {
    let config = args.session_config()?;
    info!(
        ice_servers = ?config.ice_servers,
        gather_window_ms = config.gather_window_ms,
        label = %config.channel_label,
        "starting chat session"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let session = Session::new(&config, Arc::new(RtcConnector::new(&config)), tx);
    let mut app = App::new(
        session,
        rx,
        args.clipboard(),
        args.save_dir.clone(),
        std::io::stdout(),
    );

    println!("handoff chat. Type /help for commands, /offer to start.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if app.handle_line(&line).await == Flow::Quit {
                        break;
                    }
                }
                None => break,
            },
            Some(event) = app.next_event() => app.handle_event(event),
        }
    }

    app.shutdown().await;
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let text = files::load_snapshot(path)?;
    let document = SignalingDocument::decode(&text)?;

    println!("type:       {}", document.kind);
    println!(
        "sdp:        {} bytes, {} lines",
        document.sdp.len(),
        document.sdp.lines().count()
    );
    println!("candidates: {}", document.ice_candidates.len());
    for (index, candidate) in document.ice_candidates.iter().enumerate() {
        let mid = candidate.sdp_mid.as_deref().unwrap_or("-");
        println!("  [{index}] mid={mid} {}", candidate.candidate);
    }
    Ok(())
}
