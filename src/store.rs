use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::models::ChatMessage;
use crate::overlay::contains_alert;

pub const DEFAULT_MAX_MESSAGES: usize = 500;

/// Bounded chat buffer plus the live counters derived from it.
#[derive(Debug, Clone)]
pub struct ChatStore {
    messages: VecDeque<ChatMessage>,
    max_messages: usize,
    user_counts: HashMap<String, u64>,
    total: u64,
    started_at: Option<DateTime<Utc>>,
    alerts: Vec<String>,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl ChatStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_messages.min(1024)),
            max_messages: max_messages.max(1),
            user_counts: HashMap::new(),
            total: 0,
            started_at: None,
            alerts: Vec::new(),
        }
    }

    /// Clears the buffer and counters and stamps a new session.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.messages.clear();
        self.user_counts.clear();
        self.total = 0;
        self.started_at = Some(now);
    }

    /// Ends the session clock. Buffer and counters stay readable.
    pub fn stop(&mut self) {
        self.started_at = None;
    }

    /// Appends a message, evicting the oldest past `max_messages`.
    /// Returns whether the message hit an alert word.
    pub fn push(&mut self, msg: ChatMessage) -> bool {
        let alert = contains_alert(&msg.text, &self.alerts);
        self.total += 1;
        *self.user_counts.entry(msg.username.clone()).or_insert(0) += 1;
        self.messages.push_back(msg);
        if self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
        alert
    }

    /// Replaces the alert words from a comma separated list like `"pog, omg"`.
    pub fn set_alerts(&mut self, list: &str) {
        self.alerts = parse_alert_words(list);
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn set_max_messages(&mut self, max_messages: usize) {
        self.max_messages = max_messages.max(1);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn user_count(&self, username: &str) -> u64 {
        self.user_counts.get(username).copied().unwrap_or(0)
    }

    /// Messages from `user` (exact name) whose text contains `query`
    /// case-insensitively. Either filter may be omitted.
    pub fn filtered<'a>(
        &'a self,
        user: Option<&'a str>,
        query: Option<&str>,
    ) -> impl Iterator<Item = &'a ChatMessage> + 'a {
        let query = query
            .filter(|query| !query.is_empty())
            .map(str::to_lowercase);
        self.messages.iter().filter(move |msg| {
            user.map_or(true, |user| msg.username == user)
                && query
                    .as_deref()
                    .map_or(true, |query| msg.text.to_lowercase().contains(query))
        })
    }

    /// Most active chatters, busiest first. Ties are ordered by name.
    pub fn top_chatters(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut chatters: Vec<(&str, u64)> = self
            .user_counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        chatters.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        chatters.truncate(limit);
        chatters
    }

    /// Average rate since `start`, with elapsed time floored at six seconds.
    pub fn messages_per_minute(&self, now: DateTime<Utc>) -> u64 {
        let Some(started_at) = self.started_at else {
            return 0;
        };
        let elapsed_min = (now - started_at).num_milliseconds() as f64 / 60_000.0;
        (self.total as f64 / elapsed_min.max(0.1)).round() as u64
    }

    /// Session uptime as `HH:MM:SS`, or `None` when stopped.
    pub fn uptime(&self, now: DateTime<Utc>) -> Option<String> {
        let started_at = self.started_at?;
        let secs = (now - started_at).num_seconds().max(0);
        Some(format!(
            "{:02}:{:02}:{:02}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        ))
    }

    /// The current buffer as a pretty-printed JSON array.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.messages)
    }
}

pub fn parse_alert_words(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone, Utc};

    use super::{parse_alert_words, ChatStore};
    use crate::models::ChatMessage;

    fn msg(username: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: None,
            user_id: None,
            username: username.to_owned(),
            color: "#9147ff".to_owned(),
            text: text.to_owned(),
            emotes: BTreeMap::new(),
            time: Utc::now(),
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut store = ChatStore::new(3);
        for text in ["1", "2", "3", "4"] {
            store.push(msg("a", text));
        }
        let texts: Vec<_> = store.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["2", "3", "4"]);
        assert_eq!(store.total(), 4);
        assert_eq!(store.user_count("a"), 4);
    }

    #[test]
    fn start_resets_counters() {
        let mut store = ChatStore::new(10);
        store.push(msg("a", "hi"));
        store.start(Utc::now());
        assert!(store.is_empty());
        assert_eq!(store.total(), 0);
        assert_eq!(store.user_count("a"), 0);
        assert!(store.started_at().is_some());
        store.stop();
        assert!(store.started_at().is_none());
    }

    #[test]
    fn reports_alert_hits() {
        let mut store = ChatStore::new(10);
        store.set_alerts("pog, omg , ,hype");
        assert_eq!(store.alerts(), ["pog", "omg", "hype"]);
        assert!(store.push(msg("a", "OMG that play")));
        assert!(!store.push(msg("a", "nothing here")));
    }

    #[test]
    fn filters_by_user_and_query() {
        let mut store = ChatStore::new(10);
        store.push(msg("alice", "Hello chat"));
        store.push(msg("bob", "hello alice"));
        store.push(msg("alice", "gg"));

        assert_eq!(store.filtered(Some("alice"), None).count(), 2);
        assert_eq!(store.filtered(None, Some("HELLO")).count(), 2);
        assert_eq!(store.filtered(Some("alice"), Some("hello")).count(), 1);
        assert_eq!(store.filtered(None, Some("")).count(), 3);
    }

    #[test]
    fn ranks_top_chatters() {
        let mut store = ChatStore::new(10);
        for name in ["b", "a", "b", "c", "b", "a"] {
            store.push(msg(name, "x"));
        }
        assert_eq!(store.top_chatters(2), vec![("b", 3), ("a", 2)]);
        assert_eq!(store.top_chatters(5).len(), 3);
    }

    #[test]
    fn computes_rate_and_uptime() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut store = ChatStore::new(100);
        assert_eq!(store.messages_per_minute(start), 0);
        assert_eq!(store.uptime(start), None);

        store.start(start);
        for _ in 0..30 {
            store.push(msg("a", "x"));
        }
        assert_eq!(store.messages_per_minute(start + Duration::minutes(2)), 15);
        // Elapsed time is floored at 0.1 minutes.
        assert_eq!(store.messages_per_minute(start), 300);
        assert_eq!(
            store.uptime(start + Duration::seconds(3725)).as_deref(),
            Some("01:02:05")
        );
    }

    #[test]
    fn shrinking_capacity_trims_front() {
        let mut store = ChatStore::new(5);
        for text in ["1", "2", "3", "4"] {
            store.push(msg("a", text));
        }
        store.set_max_messages(2);
        let texts: Vec<_> = store.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["3", "4"]);
    }

    #[test]
    fn exports_camel_case_json() {
        let mut store = ChatStore::new(5);
        let mut m = msg("a", "hi");
        m.user_id = Some("42".to_owned());
        store.push(m);
        let json = store.export_json().unwrap();
        assert!(json.contains("\"userId\": \"42\""));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn parses_alert_list() {
        assert!(parse_alert_words(" , ").is_empty());
        assert_eq!(parse_alert_words("a,b"), vec!["a", "b"]);
    }
}
