use std::collections::HashMap;

/// Third-party emotes for exactly one channel, keyed by exact token text.
///
/// A catalog is never merged into another one. When the room changes the
/// session swaps in a freshly built catalog, so nothing from the previous
/// channel can resolve afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmoteCatalog {
    room_id: Option<String>,
    entries: HashMap<String, String>,
}

impl EmoteCatalog {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: Some(room_id.into()),
            entries: HashMap::new(),
        }
    }

    pub fn from_entries<I, K, V>(room_id: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut catalog = Self::new(room_id);
        catalog.extend(entries);
        catalog
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn belongs_to(&self, room_id: &str) -> bool {
        self.room_id.as_deref() == Some(room_id)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Later entries win over earlier ones with the same name.
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, src) in entries {
            self.entries.insert(name.into(), src.into());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
