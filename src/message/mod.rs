//! Tokenized inbound messages.
//!
//! [`Message::parse`] turns one raw line into an owned, structured message:
//! sender identity, a normalized command and the ordered argument list.

mod nom_parser;

pub use self::nom_parser::RawLine;

use std::fmt;

use crate::error::MessageParseError;
use crate::prefix::Prefix;
use crate::response::{self, Response};

/// Normalized command identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// A numeric reply with a symbolic name.
    Response(Response),
    /// A numeric reply the engine has no name for.
    Numeric(u16),
    /// A command word, upper-cased.
    Word(String),
}

impl Command {
    fn normalize(raw: &str) -> Self {
        if raw.len() == 3 && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(code) = raw.parse::<u16>() {
                return match Response::from_code(code) {
                    Some(resp) => Command::Response(resp),
                    None => Command::Numeric(code),
                };
            }
        }
        Command::Word(raw.to_ascii_uppercase())
    }

    /// The numeric code, if this is a reply.
    pub fn code(&self) -> Option<u16> {
        match self {
            Command::Response(r) => Some(r.code()),
            Command::Numeric(n) => Some(*n),
            Command::Word(_) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Response(r) => f.write_str(r.name()),
            Command::Numeric(n) => write!(f, "{:03}", n),
            Command::Word(w) => f.write_str(w),
        }
    }
}

/// Coarse classification of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandType {
    /// A command word.
    Normal,
    /// A non-error numeric.
    Reply,
    /// A numeric in the 400-599 range.
    Error,
}

/// A structured inbound message.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    /// Sender, absent for lines without a prefix.
    pub prefix: Option<Prefix>,
    /// Normalized command.
    pub command: Command,
    /// Ordered arguments; the last one may contain spaces.
    pub args: Vec<String>,
    /// The original line, terminator stripped.
    pub raw: String,
}

impl Message {
    /// Tokenize a single line.
    pub fn parse(line: &str) -> Result<Self, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let raw = RawLine::parse(line)?;

        Ok(Message {
            prefix: raw.prefix.map(Prefix::parse),
            command: Command::normalize(raw.command),
            args: raw.params.iter().map(|p| p.to_string()).collect(),
            raw: line.to_string(),
        })
    }

    /// Sender nick, if the line came from a user.
    pub fn nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Argument at `idx`, if present.
    #[inline]
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }

    /// Whether this message is a command word, a reply or an error reply.
    pub fn command_type(&self) -> CommandType {
        match self.command.code() {
            Some(code) if response::is_error_code(code) => CommandType::Error,
            Some(_) => CommandType::Reply,
            None => CommandType::Normal,
        }
    }

    /// Whether this is the given numeric reply.
    #[inline]
    pub fn is(&self, resp: Response) -> bool {
        self.command == Command::Response(resp)
    }
}

impl std::str::FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}
