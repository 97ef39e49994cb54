use thiserror::Error;

/// A `PRIVMSG` line that could not be turned into a [`crate::models::ChatMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("line is not a PRIVMSG")]
    NotPrivmsg,
    #[error("missing message body separator")]
    MissingBody,
    #[error("malformed emote group `{0}`")]
    MalformedEmotes(String),
}

/// A single emote provider failed; the others are unaffected.
#[derive(Debug, Error)]
pub enum CatalogFetchError {
    #[error("{provider}: request failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider}: server returned {status}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
