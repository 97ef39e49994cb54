use std::collections::HashMap;

/// Tags of a single IRC line. A tag written without `=` has no value.
pub type TagMap = HashMap<String, Option<String>>;

/// Parses an IRC tag block (`key=value;key2=value2`, without the leading `@`).
///
/// Entries split on the first `=` only. This never fails: anything odd just
/// ends up as a key with no value.
pub fn parse_tags(block: &str) -> TagMap {
    let mut tags = TagMap::new();
    for pair in block.split(';') {
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((key, value)) => {
                tags.insert(key.to_owned(), Some(unescape_tag_value(value)));
            }
            None => {
                tags.insert(pair.to_owned(), None);
            }
        }
    }
    tags
}

/// Looks up a tag, treating an empty value the same as a missing one.
pub fn tag_value<'a>(tags: &'a TagMap, key: &str) -> Option<&'a str> {
    tags.get(key)
        .and_then(|value| value.as_deref())
        .filter(|value| !value.is_empty())
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some(':') => out.push(';'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
