use std::{fs, io::Write, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use nexchat::{
    providers::{http_client, spawn_catalog_refresh},
    ChatEvent, ChatMessage, ChatSession, Config, Notifier, Outcome, Sentiment, Status,
    TwitchConnection,
};

#[derive(Debug, Parser)]
#[command(name = "nexchat", version, about = "Watch a Twitch chat from the terminal")]
struct Cli {
    /// Channel name or twitch.tv URL. Falls back to the config file.
    channel: Option<String>,
    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Comma separated alert words, e.g. "pog, omg, hype".
    #[arg(long)]
    alerts: Option<String>,
    #[arg(long)]
    max_messages: Option<usize>,
    /// Ring the terminal bell on alert words.
    #[arg(long)]
    audio: bool,
    #[arg(long)]
    no_sentiment: bool,
    #[arg(long)]
    no_timestamps: bool,
    /// Print overlay markup instead of plain text.
    #[arg(long)]
    html: bool,
    /// Override the chat server (mainly for testing).
    #[arg(long)]
    server: Option<String>,
    /// Write the buffered messages as JSON on exit.
    #[arg(long)]
    export: Option<PathBuf>,
    /// Print chat statistics every N seconds (0 disables).
    #[arg(long, default_value_t = 60)]
    stats_every: u64,
}

struct Bell;

impl Notifier for Bell {
    fn ping(&self) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(channel) = &cli.channel {
        config.channel = channel.clone();
    }
    if let Some(alerts) = &cli.alerts {
        config.alerts = alerts.clone();
    }
    if let Some(max) = cli.max_messages {
        config.max_messages = max;
    }
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    config.audio_enabled |= cli.audio;
    config.sentiment_enabled &= !cli.no_sentiment;
    config.timestamps_enabled &= !cli.no_timestamps;
    Ok(config)
}

fn print_message<N: Notifier>(session: &ChatSession<N>, msg: &ChatMessage, html: bool) {
    let rendered = session.render(msg);
    let mood = match rendered.sentiment {
        Some(Sentiment::Positive) => "+ ",
        Some(Sentiment::Negative) => "- ",
        _ => "",
    };
    let time = if session.config().timestamps_enabled {
        format!("[{}] ", msg.time.with_timezone(&Local).format("%H:%M:%S"))
    } else {
        String::new()
    };
    let body = if html { &rendered.html } else { &msg.text };
    println!("{time}{mood}{}: {body}", msg.username);
}

fn print_stats<N: Notifier>(session: &ChatSession<N>) {
    let store = session.store();
    let now = Utc::now();
    if let Some(uptime) = store.uptime(now) {
        println!(
            "-- uptime {uptime} | {} msg/min | {} total",
            store.messages_per_minute(now),
            store.total()
        );
    } else {
        println!("-- {} total", store.total());
    }
    for (rank, (name, count)) in store.top_chatters(5).into_iter().enumerate() {
        println!("--   {}. {name} ({count})", rank + 1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    if config.channel.trim().is_empty() {
        bail!("no channel given; pass one as an argument or set \"channel\" in the config");
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ChatEvent>();
    let (catalog_tx, mut catalog_rx) = mpsc::unbounded_channel();
    let client = http_client();

    let mut session = ChatSession::new(config.clone(), Bell);
    let mut connection = TwitchConnection::new(config.server_url.clone(), events_tx);
    session.start(Utc::now());
    let channel = connection.connect(&config.channel).await;
    info!(channel = %channel, "watching chat");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut stats = tokio::time::interval(Duration::from_secs(cli.stats_every.max(1)));
    stats.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
            Some(event) = events_rx.recv() => {
                if let ChatEvent::Message(msg) = &event {
                    print_message(&session, msg, cli.html);
                }
                match session.handle_event(event) {
                    Outcome::RefreshCatalog { room_id } => {
                        spawn_catalog_refresh(client.clone(), room_id, catalog_tx.clone());
                    }
                    Outcome::StatusChanged(Status::Disconnected) => break,
                    Outcome::StatusChanged(Status::Error) => {
                        warn!(channel = %channel, "chat connection failed");
                        break;
                    }
                    _ => {}
                }
            }
            Some(catalog) = catalog_rx.recv() => {
                session.install_catalog(catalog);
            }
            _ = stats.tick(), if cli.stats_every > 0 => print_stats(&session),
            else => break,
        }
    }

    print_stats(&session);
    connection.disconnect().await;
    session.stop();

    if let Some(path) = &cli.export {
        let json = session.store().export_json().context("failed serializing messages")?;
        fs::write(path, json).with_context(|| format!("failed writing {}", path.display()))?;
        info!(path = %path.display(), messages = session.store().len(), "exported chat log");
    }

    Ok(())
}
