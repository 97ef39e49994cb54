use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::emotes::EmoteCatalog;
use crate::models::{ChatMessage, Sentiment, Status};
use crate::overlay::render_message;
use crate::sentiment::{detect_sentiment, sentiment_class};
use crate::store::ChatStore;
use crate::twitch::ChatEvent;

/// Plays the alert ping. Sound generation lives with the host.
pub trait Notifier {
    fn ping(&self);
}

/// A notifier that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Notifier for Silent {
    fn ping(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored { alert: bool },
    StatusChanged(Status),
    /// The room changed; the host should fetch a catalog for it.
    RefreshCatalog { room_id: String },
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub html: String,
    pub sentiment: Option<Sentiment>,
}

impl RenderedMessage {
    pub fn class(&self) -> &'static str {
        self.sentiment.map_or("", sentiment_class)
    }
}

/// Everything that changes while watching one channel. All mutation goes
/// through [`ChatSession::handle_event`] from a single task, in the order
/// events arrive.
pub struct ChatSession<N: Notifier = Silent> {
    config: Config,
    store: ChatStore,
    catalog: EmoteCatalog,
    status: Status,
    notifier: N,
}

impl<N: Notifier> ChatSession<N> {
    pub fn new(config: Config, notifier: N) -> Self {
        let mut store = ChatStore::new(config.max_messages);
        store.set_alerts(&config.alerts);
        Self {
            config,
            store,
            catalog: EmoteCatalog::default(),
            status: Status::Disconnected,
            notifier,
        }
    }

    /// Starts a fresh session: counters reset, previous channel's emotes gone.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.store.start(now);
        self.catalog = EmoteCatalog::default();
    }

    pub fn stop(&mut self) {
        self.store.stop();
        self.status = Status::Disconnected;
    }

    pub fn handle_event(&mut self, event: ChatEvent) -> Outcome {
        match event {
            ChatEvent::Message(msg) => {
                let alert = self.store.push(msg);
                if alert && self.config.audio_enabled {
                    self.notifier.ping();
                }
                Outcome::Stored { alert }
            }
            ChatEvent::Status(status) => {
                info!(%status, "chat status changed");
                self.status = status;
                if status != Status::Connected {
                    self.store.stop();
                }
                Outcome::StatusChanged(status)
            }
            ChatEvent::RoomState { room_id } => {
                if self.catalog.belongs_to(&room_id) {
                    debug!(room_id = %room_id, "emote catalog already requested");
                    return Outcome::Nothing;
                }
                self.catalog = EmoteCatalog::new(room_id.clone());
                Outcome::RefreshCatalog { room_id }
            }
        }
    }

    /// Swaps in a fetched catalog if it is for the current room.
    pub fn install_catalog(&mut self, catalog: EmoteCatalog) -> bool {
        let current = self.catalog.room_id();
        if current.is_none() || current != catalog.room_id() {
            warn!(
                room_id = ?catalog.room_id(),
                current = ?current,
                "discarding emote catalog for another room"
            );
            return false;
        }
        info!(room_id = ?current, emotes = catalog.len(), "emote catalog ready");
        self.catalog = catalog;
        true
    }

    pub fn render(&self, msg: &ChatMessage) -> RenderedMessage {
        RenderedMessage {
            html: render_message(&msg.text, &msg.emotes, &self.catalog, self.store.alerts()),
            sentiment: self
                .config
                .sentiment_enabled
                .then(|| detect_sentiment(&msg.text)),
        }
    }

    pub fn set_alerts(&mut self, list: &str) {
        self.config.alerts = list.to_owned();
        self.store.set_alerts(list);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn catalog(&self) -> &EmoteCatalog {
        &self.catalog
    }

    pub fn status(&self) -> Status {
        self.status
    }
}
