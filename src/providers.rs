use futures_util::future::join_all;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::emotes::EmoteCatalog;
use crate::error::CatalogFetchError;

const USER_AGENT: &str = concat!("nexchat/", env!("CARGO_PKG_VERSION"));

/// Third-party emote sources consulted for every room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    BttvGlobal,
    BttvChannel,
    SevenTvGlobal,
    SevenTvChannel,
}

impl Provider {
    /// Merge order; later providers win on name clashes.
    pub const ALL: [Provider; 4] = [
        Provider::BttvGlobal,
        Provider::BttvChannel,
        Provider::SevenTvGlobal,
        Provider::SevenTvChannel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Provider::BttvGlobal => "bttv-global",
            Provider::BttvChannel => "bttv-channel",
            Provider::SevenTvGlobal => "7tv-global",
            Provider::SevenTvChannel => "7tv-channel",
        }
    }

    pub fn url(self, room_id: &str) -> String {
        match self {
            Provider::BttvGlobal => "https://api.betterttv.net/3/cached/emotes/global".to_owned(),
            Provider::BttvChannel => {
                format!("https://api.betterttv.net/3/cached/users/twitch/{room_id}")
            }
            Provider::SevenTvGlobal => "https://7tv.io/v3/emotes/global".to_owned(),
            Provider::SevenTvChannel => format!("https://7tv.io/v3/users/twitch/{room_id}"),
        }
    }

    /// Extracts `(name, image url)` pairs from a provider response.
    /// Unexpected shapes yield nothing rather than an error.
    pub fn parse(self, body: &Value) -> Vec<(String, String)> {
        match self {
            Provider::BttvGlobal => bttv_emotes(body.as_array()),
            Provider::BttvChannel => {
                let mut out = bttv_emotes(body.get("channelEmotes").and_then(Value::as_array));
                out.extend(bttv_emotes(
                    body.get("sharedEmotes").and_then(Value::as_array),
                ));
                out
            }
            Provider::SevenTvGlobal => {
                seventv_emotes(body.get("emotes").and_then(Value::as_array))
            }
            Provider::SevenTvChannel => seventv_emotes(
                body.pointer("/emote_set/emotes")
                    .and_then(Value::as_array),
            ),
        }
    }
}

fn bttv_emotes(list: Option<&Vec<Value>>) -> Vec<(String, String)> {
    list.into_iter()
        .flatten()
        .filter_map(|emote| {
            let id = emote.get("id")?.as_str()?;
            let code = emote.get("code")?.as_str()?;
            Some((
                code.to_owned(),
                format!("https://cdn.betterttv.net/emote/{id}/1x"),
            ))
        })
        .collect()
}

fn seventv_emotes(list: Option<&Vec<Value>>) -> Vec<(String, String)> {
    list.into_iter()
        .flatten()
        .filter_map(|emote| {
            let name = emote.get("name")?.as_str()?;
            let host = emote.pointer("/data/host/url")?.as_str()?;
            let host = if host.starts_with("//") {
                format!("https:{host}")
            } else {
                host.to_owned()
            };
            Some((name.to_owned(), format!("{host}/1x.webp")))
        })
        .collect()
}

pub fn http_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

pub async fn fetch_provider(
    client: &Client,
    provider: Provider,
    room_id: &str,
) -> Result<Vec<(String, String)>, CatalogFetchError> {
    let request_failed = |source| CatalogFetchError::Request {
        provider: provider.name(),
        source,
    };

    let res = client
        .get(provider.url(room_id))
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(request_failed)?;

    if !res.status().is_success() {
        return Err(CatalogFetchError::Status {
            provider: provider.name(),
            status: res.status(),
        });
    }

    let body: Value = res.json().await.map_err(request_failed)?;
    Ok(provider.parse(&body))
}

/// Builds the catalog for `room_id` from whichever providers succeeded.
pub fn merge_results<I>(room_id: &str, results: I) -> EmoteCatalog
where
    I: IntoIterator<Item = (Provider, Result<Vec<(String, String)>, CatalogFetchError>)>,
{
    let mut catalog = EmoteCatalog::new(room_id);
    for (provider, result) in results {
        match result {
            Ok(entries) => {
                info!(provider = provider.name(), count = entries.len(), "loaded emotes");
                catalog.extend(entries);
            }
            Err(err) => warn!(%err, "emote provider failed"),
        }
    }
    catalog
}

/// Fetches every provider concurrently; a failing provider only loses its
/// own entries.
pub async fn refresh_catalog(client: &Client, room_id: &str) -> EmoteCatalog {
    let fetches = Provider::ALL
        .iter()
        .map(|&provider| async move { (provider, fetch_provider(client, provider, room_id).await) });
    let results = join_all(fetches).await;
    merge_results(room_id, results)
}

/// Runs [`refresh_catalog`] in the background and sends the result to `tx`.
pub fn spawn_catalog_refresh(
    client: Client,
    room_id: String,
    tx: mpsc::UnboundedSender<EmoteCatalog>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let catalog = refresh_catalog(&client, &room_id).await;
        if tx.send(catalog).is_err() {
            warn!(room_id = %room_id, "session gone before emote catalog arrived");
        }
    })
}
