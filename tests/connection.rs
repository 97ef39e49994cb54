use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

use nexchat::{ChatEvent, Status, TwitchConnection};

const ROOMSTATE: &str = "@emote-only=0;room-id=12345;subs-only=0 :tmi.twitch.tv ROOMSTATE #foo";
const HELLO: &str = "@color=#FF0000;display-name=Alice;emotes=25:11-15;id=m1;user-id=7 :alice!alice@alice.tmi.twitch.tv PRIVMSG #foo :hello chat Kappa";
const BROKEN: &str = "@emotes=broken :bob!bob@bob.tmi.twitch.tv PRIVMSG #foo :bad";
const SECOND: &str = ":carol!carol@carol.tmi.twitch.tv PRIVMSG #foo :second :)";

async fn listen() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (url, listener)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<tokio::net::TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn next_text(ws: &mut WebSocketStream<tokio::net::TcpStream>) -> Option<String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Some(text.to_string()),
            Some(Ok(_)) => continue,
            _ => return None,
        }
    }
}

async fn send(ws: &mut WebSocketStream<tokio::net::TcpStream>, text: String) {
    ws.send(Message::Text(text.into())).await.unwrap();
}

async fn collect_until_closed(rx: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = timeout(Duration::from_secs(5), rx.recv()).await {
        let done = matches!(
            event,
            ChatEvent::Status(Status::Disconnected | Status::Error)
        );
        events.push(event);
        if done {
            break;
        }
    }
    events
}

#[tokio::test]
async fn streams_chat_and_answers_pings() {
    let (url, listener) = listen().await;
    let server: JoinHandle<Vec<String>> = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let mut received = Vec::new();
        while received.len() < 3 {
            match next_text(&mut ws).await {
                Some(line) => received.push(line),
                None => return received,
            }
        }
        send(&mut ws, format!("{ROOMSTATE}\r\n{HELLO}\r\n")).await;
        send(&mut ws, "PING :tmi.twitch.tv\r\n".to_owned()).await;
        if let Some(line) = next_text(&mut ws).await {
            received.push(line);
        }
        send(&mut ws, format!("{BROKEN}\r\n{SECOND}\r\n")).await;
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
        received
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut connection = TwitchConnection::new(url, tx);
    let channel = connection.connect("https://www.twitch.tv/Foo/videos").await;
    assert_eq!(channel, "foo");

    let events = collect_until_closed(&mut rx).await;
    connection.disconnect().await;
    let received = server.await.unwrap();

    assert_eq!(received.len(), 4, "handshake plus exactly one pong: {received:?}");
    assert_eq!(received[0], "CAP REQ :twitch.tv/tags twitch.tv/commands");
    assert!(received[1].starts_with("NICK justinfan"));
    assert_eq!(received[2], "JOIN #foo");
    assert_eq!(received[3], "PONG :tmi.twitch.tv");

    assert_eq!(events.first(), Some(&ChatEvent::Status(Status::Connected)));
    assert_eq!(events.last(), Some(&ChatEvent::Status(Status::Disconnected)));
    assert!(events.contains(&ChatEvent::RoomState {
        room_id: "12345".to_owned()
    }));

    let messages: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            ChatEvent::Message(msg) => Some(msg),
            _ => None,
        })
        .collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].username, "Alice");
    assert_eq!(messages[0].text, "hello chat Kappa");
    assert_eq!(messages[0].emotes.get("11-15").map(String::as_str), Some("25"));
    assert_eq!(messages[1].username, "carol");
    assert_eq!(messages[1].text, "second :)");
}

#[tokio::test]
async fn unreachable_server_reports_error() {
    let (url, listener) = listen().await;
    drop(listener);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut connection = TwitchConnection::new(url, tx);
    connection.connect("foo").await;

    let events = collect_until_closed(&mut rx).await;
    assert_eq!(events, vec![ChatEvent::Status(Status::Error)]);
    connection.disconnect().await;
}

#[tokio::test]
async fn disconnect_is_idempotent_and_closes_socket() {
    let (url, listener) = listen().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let mut lines = 0;
        while next_text(&mut ws).await.is_some() {
            lines += 1;
        }
        lines
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut connection = TwitchConnection::new(url, tx);
    connection.disconnect().await;
    assert!(!connection.is_active());

    connection.connect("foo").await;
    let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(first, Some(ChatEvent::Status(Status::Connected)));

    connection.disconnect().await;
    connection.disconnect().await;
    assert!(!connection.is_active());

    let events = collect_until_closed(&mut rx).await;
    assert_eq!(events, vec![ChatEvent::Status(Status::Disconnected)]);
    assert_eq!(server.await.unwrap(), 3);
}

#[tokio::test]
async fn empty_channel_is_refused() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut connection = TwitchConnection::new("ws://127.0.0.1:9", tx);
    let channel = connection.connect("  twitch.tv/ ").await;
    assert!(channel.is_empty());
    assert_eq!(rx.recv().await, Some(ChatEvent::Status(Status::Error)));
    assert!(!connection.is_active());
}
