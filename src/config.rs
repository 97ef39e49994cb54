use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store::DEFAULT_MAX_MESSAGES;
use crate::twitch::TWITCH_IRC_URL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub channel: String,
    /// Comma separated alert words.
    pub alerts: String,
    pub max_messages: usize,
    pub audio_enabled: bool,
    pub sentiment_enabled: bool,
    pub timestamps_enabled: bool,
    pub server_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: String::new(),
            alerts: "pog, omg, hype".to_owned(),
            max_messages: DEFAULT_MAX_MESSAGES,
            audio_enabled: false,
            sentiment_enabled: true,
            timestamps_enabled: true,
            server_url: TWITCH_IRC_URL.to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}
