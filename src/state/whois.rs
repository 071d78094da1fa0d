//! WHOIS reply aggregation.
//!
//! A WHOIS answer arrives as a burst of numerics (311, 312, 319, ...) ended by
//! `RPL_ENDOFWHOIS`. Fragments are merged per nick and handed out as one
//! [`WhoisInfo`] when the terminator arrives.

use std::collections::HashMap;

/// Merged result of one WHOIS (or WHO) query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WhoisInfo {
    pub nick: String,
    pub user: Option<String>,
    pub host: Option<String>,
    pub ip: Option<String>,
    pub realname: Option<String>,
    pub server: Option<String>,
    pub server_info: Option<String>,
    pub operator: Option<String>,
    pub idle: Option<String>,
    pub account: Option<String>,
    pub away: Option<String>,
    pub channels: Vec<String>,
    pub secure: bool,
}

impl WhoisInfo {
    fn new(nick: &str) -> Self {
        WhoisInfo {
            nick: nick.to_string(),
            ..Default::default()
        }
    }

    /// `user@host`, when both are known.
    pub fn host_mask(&self) -> Option<String> {
        match (&self.user, &self.host) {
            (Some(user), Some(host)) => Some(format!("{}@{}", user, host)),
            _ => None,
        }
    }
}

/// Pending WHOIS records keyed by nick.
#[derive(Clone, Debug, Default)]
pub struct WhoisAccumulator {
    pending: HashMap<String, WhoisInfo>,
}

impl WhoisAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `nick`, created on first use.
    pub fn entry(&mut self, nick: &str) -> &mut WhoisInfo {
        self.pending
            .entry(nick.to_string())
            .or_insert_with(|| WhoisInfo::new(nick))
    }

    /// Record for `nick` only if a query is already in flight.
    pub fn existing(&mut self, nick: &str) -> Option<&mut WhoisInfo> {
        self.pending.get_mut(nick)
    }

    /// Remove and return the record, or an empty one carrying just the nick.
    pub fn take(&mut self, nick: &str) -> WhoisInfo {
        self.pending
            .remove(nick)
            .unwrap_or_else(|| WhoisInfo::new(nick))
    }

    pub fn is_pending(&self, nick: &str) -> bool {
        self.pending.contains_key(nick)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
