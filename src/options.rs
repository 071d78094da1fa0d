//! Engine configuration.
//!
//! [`Options`] is read once at construction. The only runtime mutation is the
//! channel list, which tracks channels joined or parted through the engine so
//! they are rejoined after a reconnect.

use std::time::Duration;

/// `WEBIRC` gateway credentials.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebIrc {
    pub pass: String,
    pub host: String,
    pub ip: String,
}

/// Connection and behaviour settings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    /// Server host name or address.
    pub server: String,
    pub port: u16,
    /// Requested nick.
    pub nick: String,
    pub user_name: String,
    pub real_name: String,
    /// Server password (`PASS`), or the SASL password when `sasl` is set.
    pub password: Option<String>,
    /// Authenticate with SASL PLAIN.
    pub sasl: bool,
    pub webirc: Option<WebIrc>,

    /// Use TLS.
    pub secure: bool,
    /// Accept certificates from an unknown issuer.
    pub self_signed: bool,
    /// Accept expired certificates.
    pub cert_expired: bool,
    pub local_address: Option<String>,
    pub local_port: Option<u16>,

    /// Reconnect attempts before giving up; `None` retries forever.
    pub retry_count: Option<u32>,
    /// Milliseconds to wait between reconnect attempts.
    pub retry_delay: u64,

    /// Release at most one outbound line per `flood_protection_delay`.
    pub flood_protection: bool,
    /// Milliseconds between released lines.
    pub flood_protection_delay: u64,
    /// Upper bound on one outbound message payload.
    pub message_split: usize,

    /// Connect as soon as the client runs.
    pub auto_connect: bool,
    /// Rejoin a channel after being kicked from it.
    pub auto_rejoin: bool,
    /// Channels joined after the MOTD; an entry may carry a key after a space.
    pub channels: Vec<String>,
    /// Default `CHANTYPES` until the server advertises its own.
    pub channel_prefixes: String,
    /// Surface ignorable error numerics as `error` events.
    pub show_errors: bool,

    /// Milliseconds of silence before sending a PING.
    pub ping_interval: u64,
    /// Milliseconds to wait for any traffic after that PING.
    pub ping_timeout: u64,
    /// Default QUIT message.
    pub quit_message: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            server: String::new(),
            port: 6667,
            nick: String::new(),
            user_name: "slirc".to_string(),
            real_name: "slirc-client".to_string(),
            password: None,
            sasl: false,
            webirc: None,
            secure: false,
            self_signed: false,
            cert_expired: false,
            local_address: None,
            local_port: None,
            retry_count: None,
            retry_delay: 2000,
            flood_protection: false,
            flood_protection_delay: 1000,
            message_split: 512,
            auto_connect: true,
            auto_rejoin: false,
            channels: Vec::new(),
            channel_prefixes: "&#".to_string(),
            show_errors: false,
            ping_interval: 15_000,
            ping_timeout: 8_000,
            quit_message: "slirc-client says goodbye".to_string(),
        }
    }
}

impl Options {
    /// Defaults for `server` and `nick`.
    pub fn new(server: impl Into<String>, nick: impl Into<String>) -> Self {
        Options {
            server: server.into(),
            nick: nick.into(),
            ..Default::default()
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    pub fn flood_protection_delay(&self) -> Duration {
        Duration::from_millis(self.flood_protection_delay)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout)
    }
}
