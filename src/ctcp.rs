//! CTCP (Client-To-Client Protocol) framing.
//!
//! CTCP requests travel inside PRIVMSG/NOTICE text wrapped in `\x01` bytes:
//! `\x01VERSION\x01`, `\x01ACTION waves\x01`.

use std::fmt;

/// The CTCP delimiter byte.
pub const DELIM: char = '\x01';

/// Which message type carried the CTCP payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CtcpKind {
    /// Carried by PRIVMSG (a request).
    Privmsg,
    /// Carried by NOTICE (a reply).
    Notice,
}

impl CtcpKind {
    /// Lowercase name used in event topics.
    pub fn as_str(self) -> &'static str {
        match self {
            CtcpKind::Privmsg => "privmsg",
            CtcpKind::Notice => "notice",
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded CTCP body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// Body without delimiters.
    pub text: &'a str,
    /// First word (`VERSION`, `ACTION`, `PING`, ...).
    pub command: &'a str,
    /// Everything after the first space.
    pub params: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Decode `text` if it opens with `\x01` and contains a closing `\x01`.
    pub fn parse(text: &'a str) -> Option<Self> {
        let body = text.strip_prefix(DELIM)?;
        let end = body.find(DELIM)?;
        let body = &body[..end];

        let (command, params) = match body.split_once(' ') {
            Some((command, params)) => (command, Some(params)),
            None => (body, None),
        };

        Some(Ctcp {
            text: body,
            command,
            params,
        })
    }
}

/// Wrap `text` in CTCP delimiters.
pub fn wrap(text: &str) -> String {
    format!("{}{}{}", DELIM, text, DELIM)
}
