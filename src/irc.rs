use std::collections::BTreeMap;

use chrono::Utc;

use crate::error::DecodeError;
use crate::models::{ChatMessage, DEFAULT_COLOR};
use crate::tags::{parse_tags, tag_value, TagMap};

/// What the connection layer should make of one raw IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    Ping,
    RoomState { room_id: String },
    Privmsg(Result<ChatMessage, DecodeError>),
    Other,
}

pub fn classify_line(line: &str) -> InboundLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.starts_with("PING") {
        return InboundLine::Ping;
    }

    let (tags, rest) = split_tags(line);
    match command(rest) {
        Some("ROOMSTATE") => {
            let tags = parse_tags(tags.unwrap_or_default());
            match tag_value(&tags, "room-id") {
                Some(id) if id.chars().all(|ch| ch.is_ascii_digit()) => InboundLine::RoomState {
                    room_id: id.to_owned(),
                },
                _ => InboundLine::Other,
            }
        }
        Some("PRIVMSG") => InboundLine::Privmsg(decode_privmsg(line)),
        _ => InboundLine::Other,
    }
}

/// Decodes a tagged `PRIVMSG` line into a [`ChatMessage`].
///
/// Everything after the first ` :` that follows the command is body text, so
/// a body that itself contains ` :` is kept whole.
pub fn decode_privmsg(line: &str) -> Result<ChatMessage, DecodeError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (tag_block, rest) = split_tags(line);
    let tags = tag_block.map(parse_tags).unwrap_or_default();

    let (head, body) = rest.split_once(" :").ok_or(DecodeError::MissingBody)?;
    if command(head) != Some("PRIVMSG") {
        return Err(DecodeError::NotPrivmsg);
    }

    let emotes = match tag_value(&tags, "emotes") {
        Some(raw) => parse_emotes(raw)?,
        None => BTreeMap::new(),
    };

    Ok(ChatMessage {
        id: owned_tag(&tags, "id"),
        user_id: owned_tag(&tags, "user-id"),
        username: username(&tags, head),
        color: tag_value(&tags, "color")
            .unwrap_or(DEFAULT_COLOR)
            .to_owned(),
        text: body.trim().to_owned(),
        emotes,
        time: Utc::now(),
    })
}

/// Parses the `emotes` tag: `id:0-4,6-10/id2:12-16`.
pub fn parse_emotes(raw: &str) -> Result<BTreeMap<String, String>, DecodeError> {
    let mut emotes = BTreeMap::new();
    for group in raw.split('/').filter(|group| !group.is_empty()) {
        let (id, ranges) = group
            .split_once(':')
            .ok_or_else(|| DecodeError::MalformedEmotes(group.to_owned()))?;
        for range in ranges.split(',').filter(|range| !range.is_empty()) {
            emotes.insert(range.to_owned(), id.to_owned());
        }
    }
    Ok(emotes)
}

/// Reduces user input like `https://www.twitch.tv/Shroud/videos` or `#Shroud`
/// to a bare channel login.
pub fn normalize_channel(input: &str) -> String {
    let mut value = input.trim();
    for prefix in ["https://", "http://"] {
        value = value.strip_prefix(prefix).unwrap_or(value);
    }
    value = value.strip_prefix("www.").unwrap_or(value);
    value = value.strip_prefix("twitch.tv/").unwrap_or(value);
    value = value.trim_start_matches('#');
    value
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn split_tags(line: &str) -> (Option<&str>, &str) {
    match line.strip_prefix('@') {
        Some(stripped) => match stripped.split_once(' ') {
            Some((tags, rest)) => (Some(tags), rest),
            None => (Some(stripped), ""),
        },
        None => (None, line),
    }
}

fn command(rest: &str) -> Option<&str> {
    let mut words = rest.split(' ').filter(|word| !word.is_empty());
    let first = words.next()?;
    if first.starts_with(':') {
        words.next()
    } else {
        Some(first)
    }
}

fn username(tags: &TagMap, head: &str) -> String {
    if let Some(name) = tag_value(tags, "display-name") {
        return name.to_owned();
    }
    head.strip_prefix(':')
        .and_then(|prefix| prefix.split_once('!'))
        .map(|(login, _)| login)
        .filter(|login| !login.is_empty())
        .unwrap_or("Unknown")
        .to_owned()
}

fn owned_tag(tags: &TagMap, key: &str) -> Option<String> {
    tag_value(tags, key).map(str::to_owned)
}
