//! Agora CLI - terminal spectator for AI persona debates
//!
//! # Usage
//!
//! ```bash
//! # Start a debate and watch it live
//! agora start "Pineapple belongs on pizza" --turns 6
//!
//! # Watch an existing debate
//! agora watch 4f9f3b1e-...
//!
//! # Summarize a finished debate
//! agora summary 4f9f3b1e-...
//!
//! # Vote for a persona
//! agora vote 4f9f3b1e-... A
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use agora_client::{DebateTransport, DebateWatcher, HttpTransport, WatcherUpdate};
use agora_core::{persona, PersonaKey};

/// Agora - watch AI personas argue in real time
#[derive(Parser)]
#[command(
    name = "agora",
    version,
    about = "Agora CLI - spectate AI persona debates",
    long_about = "Spectate turn-based AI persona debates streamed live from an Agora server.\n\
                  Set AGORA_URL to point at a server (default http://localhost:8080)."
)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Server base URL (env: AGORA_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new debate and watch it live
    Start {
        /// The debate topic
        topic: String,
        /// Turn budget (6, 9, or 12)
        #[arg(long, default_value_t = 6)]
        turns: u32,
    },
    /// Watch an existing debate
    Watch {
        /// Debate ID
        id: Uuid,
    },
    /// Summarize a finished debate
    Summary {
        /// Debate ID
        id: Uuid,
    },
    /// Vote for a persona in a finished debate
    Vote {
        /// Debate ID
        id: Uuid,
        /// Persona key (A-H)
        persona: PersonaKey,
    },
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn speaker_line(key: PersonaKey, turn_number: u32) -> String {
    let p = persona(key);
    format!(
        "\n{} {} — turn {}",
        p.name.bold().cyan(),
        format!("({})", p.title).dimmed(),
        turn_number
    )
}

async fn watch(transport: HttpTransport, id: Uuid) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel(64);
    let watcher = DebateWatcher::new(transport.clone(), id, tx, cancel);
    let handle = tokio::spawn(watcher.run());

    // Streaming updates carry the full accumulated text; printing the delta
    // past what is already on screen gives the live typing effect.
    let mut printed = 0usize;
    let mut finished = false;
    while let Some(update) = rx.recv().await {
        match update {
            WatcherUpdate::Snapshot(snapshot) => {
                println!("{}", format!("Topic: {}", snapshot.topic).bold());
                let names: Vec<&str> = snapshot
                    .personas
                    .iter()
                    .map(|key| persona(*key).name)
                    .collect();
                println!(
                    "Roster: {}  ({} of {} turns done)",
                    names.join(", "),
                    snapshot.current_turn,
                    snapshot.total_turns
                );
                for message in &snapshot.messages {
                    println!("{}", speaker_line(message.persona, message.turn_number));
                    println!("{}", message.content);
                }
            }
            WatcherUpdate::SpeakerStarted {
                persona: key,
                turn_number,
            } => {
                println!("{}", speaker_line(key, turn_number));
                printed = 0;
            }
            WatcherUpdate::StreamingText { text, .. } => {
                print!("{}", &text[printed..]);
                std::io::stdout().flush().ok();
                printed = text.len();
            }
            WatcherUpdate::TurnCompleted { content, .. } => {
                println!("{}", &content[printed.min(content.len())..]);
                printed = 0;
            }
            WatcherUpdate::Completed => {
                finished = true;
                println!("\n{}", "The debate has concluded.".bold().green());
            }
            WatcherUpdate::Failed { message } => {
                println!("\n{} {}", "Debate failed:".bold().red(), message);
            }
        }
    }

    handle.await?.context("watching the debate failed")?;
    if finished {
        print_summary(&transport, id).await?;
    }
    Ok(())
}

async fn print_summary(transport: &HttpTransport, id: Uuid) -> Result<()> {
    let response = transport
        .summary(id)
        .await
        .context("fetching the summary failed")?;
    println!("\n{}", "Closing arguments, summarized:".bold());
    for (name, summary) in response.summary {
        println!("  {}: {}", name.bold().cyan(), summary);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let base_url = cli
        .url
        .or_else(|| std::env::var("AGORA_URL").ok())
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let transport = HttpTransport::new(&base_url);

    match cli.command {
        Commands::Start { topic, turns } => {
            let created = transport
                .start(&topic, turns)
                .await
                .context("creating the debate failed")?;
            println!("Debate {} created.", created.debate_uuid);
            watch(transport, created.debate_uuid).await?;
        }
        Commands::Watch { id } => {
            watch(transport, id).await?;
        }
        Commands::Summary { id } => {
            print_summary(&transport, id).await?;
        }
        Commands::Vote { id, persona: key } => {
            let response = transport
                .vote(id, key)
                .await
                .context("voting failed")?;
            println!(
                "Voted for {}. Current tallies:",
                persona(response.my_vote).name.bold().cyan()
            );
            for (persona_key, count) in response.votes {
                println!("  {}: {}", persona_key, count);
            }
        }
    }

    Ok(())
}
