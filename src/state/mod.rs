//! Derived protocol state: who we are, which channels we are in, and
//! in-flight WHOIS queries.
//!
//! Nothing here performs I/O; the session dispatcher mutates these stores in
//! response to inbound messages, one message at a time.

mod channel;
mod whois;

pub use self::channel::{Channel, ChannelStore};
pub use self::whois::{WhoisAccumulator, WhoisInfo};

/// Bytes available for payload once the server has prepended
/// `:nick!user@host PRIVMSG target :` to a 512-byte line.
const LINE_BUDGET: usize = 497;

/// The engine's own identity on the network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    /// Current nick.
    pub nick: String,
    /// First nick the server confirmed; set once.
    pub original_nick: Option<String>,
    /// `user@host` as the server reports it.
    pub host_mask: String,
    max_line_length: usize,
}

impl Identity {
    /// Identity with `nick` and no known host mask.
    pub fn new(nick: &str) -> Self {
        let mut identity = Identity {
            nick: nick.to_string(),
            ..Default::default()
        };
        identity.update_max_line_length();
        identity
    }

    /// Change nick and recompute the payload budget.
    pub fn set_nick(&mut self, nick: &str) {
        self.nick = nick.to_string();
        self.update_max_line_length();
    }

    /// Change host mask and recompute the payload budget.
    pub fn set_host_mask(&mut self, host_mask: &str) {
        self.host_mask = host_mask.to_string();
        self.update_max_line_length();
    }

    fn update_max_line_length(&mut self) {
        self.max_line_length = LINE_BUDGET
            .saturating_sub(self.nick.len())
            .saturating_sub(self.host_mask.len());
    }

    /// Payload bytes left before subtracting the target length.
    #[inline]
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}
