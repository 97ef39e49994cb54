//! Read-only Twitch chat ingestion: IRC-over-WebSocket connection, line
//! decoding, emote and alert overlays, and a bounded message buffer with
//! live statistics.

pub mod config;
pub mod emotes;
pub mod error;
pub mod irc;
pub mod models;
pub mod overlay;
pub mod providers;
pub mod sentiment;
pub mod session;
pub mod store;
pub mod tags;
pub mod twitch;

pub use config::Config;
pub use emotes::EmoteCatalog;
pub use models::{ChatMessage, Sentiment, Status};
pub use session::{ChatSession, Notifier, Outcome};
pub use store::ChatStore;
pub use twitch::{ChatEvent, TwitchConnection};
