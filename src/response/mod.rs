//! IRC numeric reply codes the engine understands.
//!
//! Only numerics that the dispatcher reacts to (or deliberately ignores) get
//! a symbolic name. Anything else is carried as a bare number by
//! [`Command::Numeric`](crate::message::Command::Numeric).
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

use std::fmt;

macro_rules! responses {
    ($($(#[$doc:meta])* $name:ident = $code:literal,)*) => {
        /// IRC server response code.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        #[non_exhaustive]
        pub enum Response {
            $($(#[$doc])* $name = $code,)*
        }

        impl Response {
            /// Look up a numeric. Returns `None` for codes without a symbolic name.
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)*
                    _ => None,
                }
            }

            /// The symbolic name, e.g. `RPL_WELCOME`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                }
            }
        }
    };
}

responses! {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 002 - Your host is running version
    RPL_YOURHOST = 2,
    /// 003 - Server creation date
    RPL_CREATED = 3,
    /// 004 - Server info (name, version, user modes, channel modes)
    RPL_MYINFO = 4,
    /// 005 - Server supported features (ISUPPORT)
    RPL_ISUPPORT = 5,
    /// 042 - Your unique ID
    RPL_YOURID = 42,
    /// 250 - Highest connection count
    RPL_STATSCONN = 250,
    /// 251 - Luser client count
    RPL_LUSERCLIENT = 251,
    /// 252 - Luser operator count
    RPL_LUSEROP = 252,
    /// 253 - Luser unknown connections
    RPL_LUSERUNKNOWN = 253,
    /// 254 - Luser channel count
    RPL_LUSERCHANNELS = 254,
    /// 255 - Luser local info
    RPL_LUSERME = 255,
    /// 265 - Local users
    RPL_LOCALUSERS = 265,
    /// 266 - Global users
    RPL_GLOBALUSERS = 266,
    /// 301 - User is away
    RPL_AWAY = 301,
    /// 303 - ISON reply
    RPL_ISON = 303,
    /// 311 - WHOIS user info
    RPL_WHOISUSER = 311,
    /// 312 - WHOIS server
    RPL_WHOISSERVER = 312,
    /// 313 - WHOIS operator status
    RPL_WHOISOPERATOR = 313,
    /// 315 - End of WHO
    RPL_ENDOFWHO = 315,
    /// 317 - WHOIS idle time
    RPL_WHOISIDLE = 317,
    /// 318 - End of WHOIS
    RPL_ENDOFWHOIS = 318,
    /// 319 - WHOIS channels
    RPL_WHOISCHANNELS = 319,
    /// 321 - List start
    RPL_LISTSTART = 321,
    /// 322 - List entry
    RPL_LIST = 322,
    /// 323 - List end
    RPL_LISTEND = 323,
    /// 324 - Channel mode
    RPL_CHANNELMODEIS = 324,
    /// 329 - Channel creation time
    RPL_CREATIONTIME = 329,
    /// 330 - WHOIS account name
    RPL_WHOISACCOUNT = 330,
    /// 331 - No topic set
    RPL_NOTOPIC = 331,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 333 - Topic set by/time
    RPL_TOPICWHOTIME = 333,
    /// 341 - Inviting user to channel
    RPL_INVITING = 341,
    /// 352 - WHO reply
    RPL_WHOREPLY = 352,
    /// 353 - NAMES reply
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 372 - MOTD line
    RPL_MOTD = 372,
    /// 375 - MOTD start
    RPL_MOTDSTART = 375,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 378 - WHOIS connecting host
    RPL_WHOISHOST = 378,
    /// 381 - You are now an operator
    RPL_YOUREOPER = 381,
    /// 396 - Displayed host changed
    RPL_VISIBLEHOST = 396,
    /// 401 - No such nick/channel
    ERR_NOSUCHNICK = 401,
    /// 422 - MOTD file missing
    ERR_NOMOTD = 422,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 462 - Already registered
    ERR_ALREADYREGISTRED = 462,
    /// 474 - Banned from channel
    ERR_BANNEDFROMCHAN = 474,
    /// 491 - No O-lines for your host
    ERR_NOOPERHOST = 491,
    /// 501 - Unknown user mode flag
    ERR_UMODEUNKNOWNFLAG = 501,
    /// 671 - WHOIS secure connection
    RPL_WHOISSECURE = 671,
    /// 900 - Logged in as account
    RPL_LOGGEDIN = 900,
    /// 903 - SASL authentication succeeded
    RPL_SASLSUCCESS = 903,
    /// 904 - SASL authentication failed
    ERR_SASLFAIL = 904,
    /// 905 - SASL message too long
    ERR_SASLTOOLONG = 905,
    /// 906 - SASL aborted
    ERR_SASLABORTED = 906,
}

impl Response {
    /// The numeric value.
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether this numeric belongs to the error range (400-599).
    #[inline]
    pub fn is_error(self) -> bool {
        is_error_code(self.code())
    }
}

/// Whether a numeric belongs to the error range (400-599).
#[inline]
pub fn is_error_code(code: u16) -> bool {
    (400..600).contains(&code)
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}
