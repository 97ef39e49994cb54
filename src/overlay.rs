//! Turns plain chat text into markup that can be inserted as HTML.
//!
//! Rendering runs three passes in a fixed order:
//!
//! 1. HTML-escape the text.
//! 2. Replace first-party emote ranges, highest start index first, so a
//!    replacement never moves a range that is still pending.
//! 3. Walk the remaining plain text token by token for third-party emotes
//!    and alert words.
//!
//! Ranges are measured by the chat server against the unescaped text, while
//! pass 2 applies them to the escaped one. Text with `& < > " '` before an
//! emote therefore renders slightly off. That matches what viewers already
//! see in the web overlay, so it is kept.

use std::collections::BTreeMap;

use crate::emotes::EmoteCatalog;

const EMOTE_CLASS: &str = "inline-block h-7 align-middle";
const ALERT_CLASS: &str = "bg-yellow-500 text-black px-1 rounded font-bold";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmoteRange {
    pub start: usize,
    pub end: usize,
}

impl EmoteRange {
    /// Parses `"start-end"`. Reversed or non-numeric ranges are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let (start, end) = raw.split_once('-')?;
        let start = start.trim().parse().ok()?;
        let end = end.trim().parse().ok()?;
        (start <= end).then_some(Self { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Markup(String),
}

pub fn render_message(
    text: &str,
    emotes: &BTreeMap<String, String>,
    catalog: &EmoteCatalog,
    alerts: &[String],
) -> String {
    let escaped = escape_html(text);
    substitute_ranges(&escaped, emotes)
        .into_iter()
        .map(|segment| match segment {
            Segment::Markup(markup) => markup,
            Segment::Text(text) => overlay_tokens(&text, catalog, alerts),
        })
        .collect()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn twitch_emote_url(id: &str) -> String {
    format!("https://static-cdn.jtvnw.net/emoticons/v2/{id}/default/dark/1.0")
}

fn substitute_ranges(escaped: &str, emotes: &BTreeMap<String, String>) -> Vec<Segment> {
    let mut ranges: Vec<(EmoteRange, &str)> = emotes
        .iter()
        .filter_map(|(raw, id)| EmoteRange::parse(raw).map(|range| (range, id.as_str())))
        .collect();
    ranges.sort_by(|a, b| b.0.start.cmp(&a.0.start));

    // `head` is the still-unsubstituted prefix in UTF-16 units; everything
    // after it is already final and collected back to front.
    let mut head: Vec<u16> = escaped.encode_utf16().collect();
    let mut tail = Vec::with_capacity(ranges.len() * 2 + 1);
    for (range, id) in ranges {
        let cut = range.start.min(head.len());
        let resume = range.end.saturating_add(1).min(head.len()).max(cut);
        tail.push(Segment::Text(String::from_utf16_lossy(&head[resume..])));
        tail.push(Segment::Markup(format!(
            r#"<img class="{EMOTE_CLASS}" src="{}" alt="emote">"#,
            escape_html(&twitch_emote_url(id))
        )));
        head.truncate(cut);
    }
    tail.push(Segment::Text(String::from_utf16_lossy(&head)));
    tail.reverse();
    tail
}

fn overlay_tokens(text: &str, catalog: &EmoteCatalog, alerts: &[String]) -> String {
    text.split(' ')
        .map(|word| overlay_token(word, catalog, alerts))
        .collect::<Vec<_>>()
        .join(" ")
}

fn overlay_token(word: &str, catalog: &EmoteCatalog, alerts: &[String]) -> String {
    if let Some(src) = catalog.get(word) {
        return format!(
            r#"<img class="{EMOTE_CLASS}" src="{}" alt="{word}" title="{word}">"#,
            escape_html(src)
        );
    }
    if contains_alert(word, alerts) {
        return format!(r#"<span class="{ALERT_CLASS}">{word}</span>"#);
    }
    word.to_owned()
}

/// Case-insensitive substring match against any non-empty alert word.
pub fn contains_alert(text: &str, alerts: &[String]) -> bool {
    let lower = text.to_lowercase();
    alerts
        .iter()
        .filter(|word| !word.is_empty())
        .any(|word| lower.contains(&word.to_lowercase()))
}
