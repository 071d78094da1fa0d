//! IRC message prefix (source) parsing.

use std::fmt;

/// The source of an inbound message.
///
/// A prefix is either a server name (`irc.example.net`) or a user mask
/// (`nick!user@host`, where `user` and `host` are optional).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Prefix {
    /// Server-originated line.
    Server(String),
    /// User-originated line.
    Nickname {
        /// Sender nick.
        nick: String,
        /// Ident, when present.
        user: Option<String>,
        /// Host, when present.
        host: Option<String>,
    },
}

impl Prefix {
    /// Split a raw prefix string.
    ///
    /// Names containing a `.` but no `!`/`@` are treated as servers.
    pub fn parse(raw: &str) -> Self {
        let (nick_user, host) = match raw.split_once('@') {
            Some((left, host)) => (left, Some(host.to_string())),
            None => (raw, None),
        };
        let (nick, user) = match nick_user.split_once('!') {
            Some((nick, user)) => (nick, Some(user.to_string())),
            None => (nick_user, None),
        };

        if user.is_none() && host.is_none() && nick.contains('.') {
            return Prefix::Server(raw.to_string());
        }

        Prefix::Nickname {
            nick: nick.to_string(),
            user,
            host,
        }
    }

    /// Sender nick, absent for server-originated lines.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname { nick, .. } => Some(nick),
            Prefix::Server(_) => None,
        }
    }

    /// Sender ident.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname { user, .. } => user.as_deref(),
            Prefix::Server(_) => None,
        }
    }

    /// Sender host.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::Nickname { host, .. } => host.as_deref(),
            Prefix::Server(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::Nickname { nick, user, host } => {
                f.write_str(nick)?;
                if let Some(user) = user {
                    write!(f, "!{}", user)?;
                }
                if let Some(host) = host {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}
