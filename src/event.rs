//! Typed notifications emitted by the engine.
//!
//! Every [`Event`] is published under its base topic ([`Event::topic`]); the
//! dispatcher additionally publishes some events under channel-qualified
//! topics such as `join#rust` or `message#rust` so callers can subscribe to a
//! single channel.

use std::collections::HashMap;

use crate::ctcp::CtcpKind;
use crate::message::Message;
use crate::mode::ModeChange;
use crate::state::WhoisInfo;

/// One entry of a `LIST` reply.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelListEntry {
    pub name: String,
    pub users: String,
    pub topic: String,
}

/// A notification produced by the engine.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Socket established and registration lines sent.
    Connect,
    /// Server accepted registration (`RPL_WELCOME`).
    Registered { nick: String },
    /// Retry ceiling reached; no further reconnects.
    Abort { retry_count: u32 },
    /// Transport-level failure.
    NetError { error: String },
    Join { channel: String, nick: String },
    Part {
        channel: String,
        nick: String,
        reason: Option<String>,
    },
    Kick {
        channel: String,
        nick: String,
        by: Option<String>,
        reason: Option<String>,
    },
    Quit {
        nick: String,
        reason: Option<String>,
        channels: Vec<String>,
    },
    Kill {
        nick: String,
        reason: Option<String>,
        channels: Vec<String>,
    },
    Nick {
        old: String,
        new: String,
        channels: Vec<String>,
    },
    /// One applied mode letter; published as `+mode` or `-mode`.
    Mode {
        channel: String,
        by: Option<String>,
        change: ModeChange,
    },
    Topic {
        channel: String,
        topic: String,
        nick: Option<String>,
    },
    /// Full member map after `RPL_ENDOFNAMES`.
    Names {
        channel: String,
        users: HashMap<String, String>,
    },
    Message {
        from: Option<String>,
        to: String,
        text: String,
    },
    Notice {
        from: Option<String>,
        to: Option<String>,
        text: String,
    },
    /// A PRIVMSG addressed to our own nick.
    Pm { from: Option<String>, text: String },
    /// A PRIVMSG we sent.
    SelfMessage { target: String, text: String },
    Ctcp {
        from: Option<String>,
        to: String,
        text: String,
        kind: CtcpKind,
    },
    CtcpVersion { from: Option<String>, to: String },
    Action {
        from: Option<String>,
        to: String,
        text: String,
    },
    Whois(WhoisInfo),
    ChannelListStart,
    ChannelListItem(ChannelListEntry),
    ChannelList(Vec<ChannelListEntry>),
    Motd(String),
    Ping(String),
    Pong(String),
    Invite { channel: String, from: Option<String> },
    Opered,
    /// Server `ERROR` or an error numeric worth surfacing.
    Error(Message),
    /// Every inbound message, after dispatch.
    Raw(Message),
}

impl Event {
    /// Base topic this event is published under.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::Connect => "connect",
            Event::Registered { .. } => "registered",
            Event::Abort { .. } => "abort",
            Event::NetError { .. } => "netError",
            Event::Join { .. } => "join",
            Event::Part { .. } => "part",
            Event::Kick { .. } => "kick",
            Event::Quit { .. } => "quit",
            Event::Kill { .. } => "kill",
            Event::Nick { .. } => "nick",
            Event::Mode { change, .. } if change.adding => "+mode",
            Event::Mode { .. } => "-mode",
            Event::Topic { .. } => "topic",
            Event::Names { .. } => "names",
            Event::Message { .. } => "message",
            Event::Notice { .. } => "notice",
            Event::Pm { .. } => "pm",
            Event::SelfMessage { .. } => "selfMessage",
            Event::Ctcp { .. } => "ctcp",
            Event::CtcpVersion { .. } => "ctcp-version",
            Event::Action { .. } => "action",
            Event::Whois(_) => "whois",
            Event::ChannelListStart => "channellist_start",
            Event::ChannelListItem(_) => "channellist_item",
            Event::ChannelList(_) => "channellist",
            Event::Motd(_) => "motd",
            Event::Ping(_) => "ping",
            Event::Pong(_) => "pong",
            Event::Invite { .. } => "invite",
            Event::Opered => "opered",
            Event::Error(_) => "error",
            Event::Raw(_) => "raw",
        }
    }
}
