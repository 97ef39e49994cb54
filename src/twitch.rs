use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

use crate::error::DecodeError;
use crate::irc::{classify_line, normalize_channel, InboundLine};
use crate::models::{ChatMessage, Status};

pub const TWITCH_IRC_URL: &str = "wss://irc-ws.chat.twitch.tv:443";
pub const CAP_REQUEST: &str = "CAP REQ :twitch.tv/tags twitch.tv/commands";
pub const PONG: &str = "PONG :tmi.twitch.tv";

/// What the connection task hands to its host, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(ChatMessage),
    Status(Status),
    RoomState { room_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Closed,
    Failed,
}

impl Status {
    pub fn on(self, event: SocketEvent) -> Status {
        match event {
            SocketEvent::Opened => Status::Connected,
            SocketEvent::Closed => Status::Disconnected,
            SocketEvent::Failed => Status::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    Reply(&'static str),
    RoomState(String),
    Deliver(ChatMessage),
    Drop(DecodeError),
    Ignore,
}

/// Decides what to do with one inbound IRC line.
///
/// `PING` is answered in any state. Anything else arriving while not
/// connected is ignored.
pub fn handle_line(status: Status, line: &str) -> LineAction {
    match classify_line(line) {
        InboundLine::Ping => LineAction::Reply(PONG),
        _ if status != Status::Connected => LineAction::Ignore,
        InboundLine::RoomState { room_id } => LineAction::RoomState(room_id),
        InboundLine::Privmsg(Ok(msg)) => LineAction::Deliver(msg),
        InboundLine::Privmsg(Err(err)) => LineAction::Drop(err),
        InboundLine::Other => LineAction::Ignore,
    }
}

pub fn anonymous_nick() -> String {
    format!("justinfan{}", rand::thread_rng().gen_range(10000..99999))
}

pub fn handshake(channel: &str, nick: &str) -> [String; 3] {
    [
        CAP_REQUEST.to_owned(),
        format!("NICK {nick}"),
        format!("JOIN #{channel}"),
    ]
}

/// Read-only chat connection for one channel at a time.
pub struct TwitchConnection {
    server_url: String,
    events: mpsc::UnboundedSender<ChatEvent>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TwitchConnection {
    pub fn new(server_url: impl Into<String>, events: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self {
            server_url: server_url.into(),
            events,
            shutdown_tx: None,
            task: None,
        }
    }

    /// Joins `channel`, closing any previous connection first.
    /// Returns the normalized channel name.
    pub async fn connect(&mut self, channel: &str) -> String {
        self.disconnect().await;

        let channel = normalize_channel(channel);
        if channel.is_empty() {
            warn!("refusing to connect: channel is empty");
            let _ = self.events.send(ChatEvent::Status(Status::Error));
            return channel;
        }

        let (tx, rx) = broadcast::channel(1);
        self.shutdown_tx = Some(tx);
        self.task = Some(tokio::spawn(run_connection(
            self.server_url.clone(),
            channel.clone(),
            self.events.clone(),
            rx,
        )));
        channel
    }

    /// Closes the active connection, if any, and waits for its task to end.
    pub async fn disconnect(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(?err, "twitch connection task failed");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

async fn run_connection(
    url: String,
    channel: String,
    events: mpsc::UnboundedSender<ChatEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut status = Status::Disconnected;
    info!(channel = %channel, url = %url, "connecting to twitch chat");

    let connected = tokio::select! {
        biased;
        _ = shutdown.recv() => None,
        res = connect_async(url.as_str()) => Some(res),
    };
    let ws_stream = match connected {
        None => return,
        Some(Ok((ws_stream, _))) => ws_stream,
        Some(Err(err)) => {
            warn!(?err, channel = %channel, "failed to connect to twitch chat");
            transition(&mut status, SocketEvent::Failed, &events);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();

    let nick = anonymous_nick();
    for line in handshake(&channel, &nick) {
        if let Err(err) = write.send(Message::Text(line.into())).await {
            warn!(?err, "twitch handshake failed");
            transition(&mut status, SocketEvent::Failed, &events);
            return;
        }
    }
    info!(channel = %channel, nick = %nick, "joined twitch chat");
    transition(&mut status, SocketEvent::Opened, &events);

    'session: loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.recv() => None,
            frame = read.next() => Some(frame),
        };

        let Some(frame) = frame else {
            debug!(channel = %channel, "twitch connection shutting down");
            let _ = write.send(Message::Close(None)).await;
            transition(&mut status, SocketEvent::Closed, &events);
            break;
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                for line in text.as_str().split("\r\n").filter(|line| !line.is_empty()) {
                    match handle_line(status, line) {
                        LineAction::Reply(reply) => {
                            if let Err(err) = write.send(Message::Text(reply.into())).await {
                                warn!(?err, "failed to answer twitch ping");
                                transition(&mut status, SocketEvent::Failed, &events);
                                break 'session;
                            }
                        }
                        LineAction::RoomState(room_id) => {
                            debug!(room_id = %room_id, "twitch roomstate");
                            if events.send(ChatEvent::RoomState { room_id }).is_err() {
                                break 'session;
                            }
                        }
                        LineAction::Deliver(msg) => {
                            if events.send(ChatEvent::Message(msg)).is_err() {
                                warn!("chat receiver dropped; stopping twitch connection");
                                break 'session;
                            }
                        }
                        LineAction::Drop(err) => warn!(%err, line, "dropping undecodable chat line"),
                        LineAction::Ignore => {}
                    }
                }
            }
            Some(Ok(Message::Ping(payload))) => {
                let _ = write.send(Message::Pong(payload)).await;
            }
            Some(Ok(Message::Close(_))) | None => {
                info!(channel = %channel, "twitch chat closed");
                transition(&mut status, SocketEvent::Closed, &events);
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                warn!(?err, channel = %channel, "twitch websocket error");
                transition(&mut status, SocketEvent::Failed, &events);
                break;
            }
        }
    }
}

fn transition(status: &mut Status, event: SocketEvent, events: &mpsc::UnboundedSender<ChatEvent>) {
    *status = status.on(event);
    let _ = events.send(ChatEvent::Status(*status));
}
