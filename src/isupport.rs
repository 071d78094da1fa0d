//! Server capability table (`RPL_ISUPPORT`, 005).
//!
//! [`Supported`] starts from RFC 1459 defaults and is refined as the server
//! advertises `KEY=VALUE` tokens. It is rebuilt on every reconnect.

use std::collections::HashMap;

use tracing::debug;

use crate::casemap::CaseMapping;

/// How a channel mode letter treats its parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeCategory {
    /// Member status letter (`o`, `v`, ...). Always takes a nick.
    Prefix,
    /// Type A: list modes such as bans. Always takes a parameter.
    List,
    /// Type B: always takes a parameter (e.g. key).
    Always,
    /// Type C: takes a parameter only when set (e.g. limit).
    WhenSet,
    /// Type D: never takes a parameter.
    Boolean,
}

/// The four `CHANMODES` letter groups.
///
/// Groups are kept mutually exclusive: adding a letter to one group removes
/// it from the others.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChanModes {
    /// Type A letters.
    pub list: String,
    /// Type B letters.
    pub always: String,
    /// Type C letters.
    pub when_set: String,
    /// Type D letters.
    pub boolean: String,
}

impl ChanModes {
    /// Parse a `CHANMODES` value. Missing trailing groups are treated as empty.
    pub fn parse(value: &str) -> Self {
        let mut parts = value.splitn(4, ',');
        let mut next = || parts.next().unwrap_or("").to_string();
        ChanModes {
            list: next(),
            always: next(),
            when_set: next(),
            boolean: next(),
        }
    }

    fn group_mut(&mut self, category: ModeCategory) -> Option<&mut String> {
        match category {
            ModeCategory::List => Some(&mut self.list),
            ModeCategory::Always => Some(&mut self.always),
            ModeCategory::WhenSet => Some(&mut self.when_set),
            ModeCategory::Boolean => Some(&mut self.boolean),
            ModeCategory::Prefix => None,
        }
    }

    /// Add `letter` to `category`, removing it from every other group.
    pub fn insert(&mut self, category: ModeCategory, letter: char) {
        for group in [&mut self.list, &mut self.always, &mut self.when_set, &mut self.boolean] {
            group.retain(|c| c != letter);
        }
        if let Some(group) = self.group_mut(category) {
            group.push(letter);
        }
    }

    /// Append every group of `other` positionally.
    pub fn merge(&mut self, other: &ChanModes) {
        let groups = [
            (ModeCategory::List, &other.list),
            (ModeCategory::Always, &other.always),
            (ModeCategory::WhenSet, &other.when_set),
            (ModeCategory::Boolean, &other.boolean),
        ];
        for (category, letters) in groups {
            for letter in letters.chars() {
                self.insert(category, letter);
            }
        }
    }

    /// Which group `letter` belongs to, if any.
    pub fn category(&self, letter: char) -> Option<ModeCategory> {
        if self.list.contains(letter) {
            Some(ModeCategory::List)
        } else if self.always.contains(letter) {
            Some(ModeCategory::Always)
        } else if self.when_set.contains(letter) {
            Some(ModeCategory::WhenSet)
        } else if self.boolean.contains(letter) {
            Some(ModeCategory::Boolean)
        } else {
            None
        }
    }
}

/// Parsed `PREFIX` token: mode letters paired with display symbols.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixSpec {
    /// `(mode letter, symbol)` pairs, highest rank first.
    pub pairs: Vec<(char, char)>,
}

impl PrefixSpec {
    /// Parse `(ov)@+` or `(ov)(@+)`.
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.strip_prefix('(')?;
        let (letters, symbols) = rest.split_once(')')?;
        let symbols = symbols
            .strip_prefix('(')
            .map(|s| s.trim_end_matches(')'))
            .unwrap_or(symbols);

        Some(PrefixSpec {
            pairs: letters.chars().zip(symbols.chars()).collect(),
        })
    }
}

/// Split `a:1,b:2` style lists. Entries with a missing or unparsable number
/// yield `None` for the number.
fn keyed_numbers(value: &str) -> impl Iterator<Item = (&str, Option<u32>)> {
    value.split(',').filter(|p| !p.is_empty()).map(|part| {
        match part.split_once(':') {
            Some((key, num)) => (key, num.parse().ok()),
            None => (part, None),
        }
    })
}

/// Capabilities and limits advertised by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Supported {
    /// `CHANNELLEN`.
    pub channel_length: u32,
    /// `CHANLIMIT`: channel prefixes → max joined channels.
    pub channel_limit: HashMap<String, u32>,
    /// `IDCHAN`: channel prefix → id length.
    pub id_length: HashMap<String, u32>,
    /// `CHANMODES` groups, with prefix letters mirrored into `always`.
    pub chan_modes: ChanModes,
    /// `CHANTYPES`.
    pub channel_types: String,
    /// `KICKLEN`, 0 when unknown.
    pub kick_length: u32,
    /// `MAXLIST`: mode letters → max entries.
    pub max_list: HashMap<String, u32>,
    /// `TARGMAX`: command → max targets, 0 when unlimited.
    pub max_targets: HashMap<String, u32>,
    /// `MODES`: max parametrised modes per command.
    pub modes: u32,
    /// `NICKLEN`.
    pub nick_length: u32,
    /// `TOPICLEN`, 0 when unknown.
    pub topic_length: u32,
    /// User mode alphabet from `RPL_MYINFO`.
    pub user_modes: String,
    /// `CASEMAPPING`.
    pub case_mapping: CaseMapping,
    /// Mode letter → display symbol (`o` → `@`).
    pub prefix_for_mode: HashMap<char, char>,
    /// Display symbol → mode letter (`@` → `o`).
    pub mode_for_prefix: HashMap<char, char>,
}

impl Default for Supported {
    fn default() -> Self {
        Self::new("&#")
    }
}

impl Supported {
    /// RFC 1459 defaults with the given channel type prefixes.
    pub fn new(channel_types: &str) -> Self {
        let mut supported = Supported {
            channel_length: 200,
            channel_limit: HashMap::new(),
            id_length: HashMap::new(),
            chan_modes: ChanModes {
                list: "b".to_string(),
                always: "k".to_string(),
                when_set: "l".to_string(),
                boolean: "imnpst".to_string(),
            },
            channel_types: channel_types.to_string(),
            kick_length: 0,
            max_list: HashMap::new(),
            max_targets: HashMap::new(),
            modes: 3,
            nick_length: 9,
            topic_length: 0,
            user_modes: String::new(),
            case_mapping: CaseMapping::Rfc1459,
            prefix_for_mode: HashMap::new(),
            mode_for_prefix: HashMap::new(),
        };
        supported.add_prefix('o', '@');
        supported.add_prefix('v', '+');
        supported
    }

    fn add_prefix(&mut self, letter: char, symbol: char) {
        self.prefix_for_mode.insert(letter, symbol);
        self.mode_for_prefix.insert(symbol, letter);
        self.chan_modes.insert(ModeCategory::Always, letter);
    }

    /// Whether `target` names a channel under the advertised `CHANTYPES`.
    pub fn is_channel(&self, target: &str) -> bool {
        target
            .chars()
            .next()
            .is_some_and(|c| self.channel_types.contains(c))
    }

    /// Category lookup: prefix, then list, always, when-set, boolean.
    pub fn category(&self, letter: char) -> Option<ModeCategory> {
        if self.prefix_for_mode.contains_key(&letter) {
            return Some(ModeCategory::Prefix);
        }
        self.chan_modes.category(letter)
    }

    /// Apply the token list of one `RPL_ISUPPORT` reply.
    ///
    /// The first argument (our nick) and a trailing human-readable argument
    /// are skipped.
    pub fn apply_isupport(&mut self, args: &[String]) {
        let Some((_, mut tokens)) = args.split_first() else {
            return;
        };
        if let Some((last, rest)) = tokens.split_last() {
            if last.contains(' ') {
                tokens = rest;
            }
        }

        for token in tokens {
            if let Some((key, value)) = token.split_once('=') {
                self.apply_token(key, value);
            }
        }
    }

    /// Apply a single `KEY=VALUE` token. Unknown keys are ignored.
    pub fn apply_token(&mut self, key: &str, value: &str) {
        match key {
            "CHANLIMIT" => {
                for (prefixes, limit) in keyed_numbers(value) {
                    if let Some(limit) = limit {
                        self.channel_limit.insert(prefixes.to_string(), limit);
                    }
                }
            }
            "CHANMODES" => self.chan_modes.merge(&ChanModes::parse(value)),
            "CHANTYPES" => self.channel_types = value.to_string(),
            "CHANNELLEN" => set_number(&mut self.channel_length, key, value),
            "IDCHAN" => {
                for (prefix, len) in keyed_numbers(value) {
                    if let Some(len) = len {
                        self.id_length.insert(prefix.to_string(), len);
                    }
                }
            }
            "KICKLEN" => set_number(&mut self.kick_length, key, value),
            "MAXLIST" => {
                for (letters, max) in keyed_numbers(value) {
                    if let Some(max) = max {
                        self.max_list.insert(letters.to_string(), max);
                    }
                }
            }
            "MODES" => set_number(&mut self.modes, key, value),
            "NICKLEN" => set_number(&mut self.nick_length, key, value),
            "PREFIX" => match PrefixSpec::parse(value) {
                Some(spec) => {
                    for (letter, symbol) in spec.pairs {
                        self.add_prefix(letter, symbol);
                    }
                }
                None => debug!(value, "malformed PREFIX token"),
            },
            "TARGMAX" => {
                for (command, max) in keyed_numbers(value) {
                    self.max_targets
                        .insert(command.to_ascii_uppercase(), max.unwrap_or(0));
                }
            }
            "TOPICLEN" => set_number(&mut self.topic_length, key, value),
            "CASEMAPPING" => match CaseMapping::parse(value) {
                Some(mapping) => self.case_mapping = mapping,
                None => debug!(value, "unknown CASEMAPPING, keeping current"),
            },
            "STATUSMSG" | "EXCEPTS" | "INVEX" => {}
            _ => {}
        }
    }
}

fn set_number(field: &mut u32, key: &str, value: &str) {
    match value.parse() {
        Ok(n) => *field = n,
        Err(_) => debug!(key, value, "non-numeric ISUPPORT value"),
    }
}
