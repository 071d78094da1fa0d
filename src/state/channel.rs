//! Per-channel records and the channel store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::casemap::CaseMapping;

/// Everything the engine knows about one joined channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Channel {
    /// Canonical key (case-folded name).
    pub key: String,
    /// Name as the server sent it.
    pub server_name: String,
    /// Current topic.
    pub topic: Option<String>,
    /// Who set the topic.
    pub topic_by: Option<String>,
    /// When the topic was set.
    pub topic_time: Option<DateTime<Utc>>,
    /// Channel creation time (`RPL_CREATIONTIME`).
    pub created: Option<DateTime<Utc>>,
    /// Set mode letters, no duplicates.
    pub mode: String,
    /// Parameters of list, always-param and param-when-set letters.
    pub mode_params: HashMap<char, Vec<String>>,
    /// Member nick → status mode letters (`"o"`, `"ov"`, `""`).
    pub users: HashMap<String, String>,
}

impl Channel {
    /// A fresh record keyed with RFC 1459 folding.
    pub fn new(name: &str) -> Self {
        Self::with_mapping(name, CaseMapping::default())
    }

    fn with_mapping(name: &str, mapping: CaseMapping) -> Self {
        Channel {
            key: mapping.to_lower(name),
            server_name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Channel records keyed by case-folded name.
#[derive(Clone, Debug, Default)]
pub struct ChannelStore {
    mapping: CaseMapping,
    channels: HashMap<String, Channel>,
}

impl ChannelStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the folding used for new lookups.
    pub fn set_case_mapping(&mut self, mapping: CaseMapping) {
        self.mapping = mapping;
    }

    /// Canonical key for `name`.
    pub fn key(&self, name: &str) -> String {
        self.mapping.to_lower(name)
    }

    /// Look up a channel by any casing of its name.
    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&self.key(name))
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Channel> {
        let key = self.key(name);
        self.channels.get_mut(&key)
    }

    /// Look up a channel, creating an empty record if absent.
    pub fn get_or_create(&mut self, name: &str) -> &mut Channel {
        let mapping = self.mapping;
        self.channels
            .entry(mapping.to_lower(name))
            .or_insert_with(|| Channel::with_mapping(name, mapping))
    }

    /// Drop the record for `name`.
    pub fn remove(&mut self, name: &str) -> Option<Channel> {
        let key = self.key(name);
        self.channels.remove(&key)
    }

    /// Remove `nick` from every channel, returning the names of channels
    /// it was in.
    pub fn remove_member(&mut self, nick: &str) -> Vec<String> {
        self.channels
            .values_mut()
            .filter_map(|chan| chan.users.remove(nick).map(|_| chan.server_name.clone()))
            .collect()
    }

    /// Move `old`'s membership to `new` everywhere, returning the names of
    /// affected channels.
    pub fn rename_member(&mut self, old: &str, new: &str) -> Vec<String> {
        let mut affected = Vec::new();
        for chan in self.channels.values_mut() {
            if let Some(status) = chan.users.remove(old) {
                chan.users.insert(new.to_string(), status);
                affected.push(chan.server_name.clone());
            }
        }
        affected
    }

    /// Names of every known channel.
    pub fn names(&self) -> Vec<String> {
        self.channels.values().map(|c| c.server_name.clone()).collect()
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Number of known channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channels are known.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut store = ChannelStore::new();
        store.get_or_create("#Rust[dev]");
        let chan = store.get("#rust{DEV}").unwrap();
        assert_eq!(chan.key, "#rust{dev}");
        assert_eq!(chan.server_name, "#Rust[dev]");
    }

    #[test]
    fn test_member_moves() {
        let mut store = ChannelStore::new();
        store.get_or_create("#a").users.insert("bob".into(), "v".into());
        store.get_or_create("#b").users.insert("bob".into(), String::new());
        store.get_or_create("#c");

        let mut renamed = store.rename_member("bob", "robert");
        renamed.sort();
        assert_eq!(renamed, vec!["#a", "#b"]);
        assert_eq!(store.get("#a").unwrap().users["robert"], "v");

        let mut removed = store.remove_member("robert");
        removed.sort();
        assert_eq!(removed, vec!["#a", "#b"]);
        assert!(store.remove_member("robert").is_empty());
    }
}
