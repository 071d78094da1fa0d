//! # slirc-client
//!
//! A client-side IRC engine: connection lifecycle, protocol state tracking
//! and flood-safe outbound traffic.
//!
//! ## Features
//!
//! - Tracks channels, topics, modes and member status from server traffic
//! - ISUPPORT (RPL_ISUPPORT) driven mode categories and limits
//! - WHOIS aggregation into a single record
//! - SASL PLAIN, WEBIRC and server passwords
//! - Flood protection and length-aware message splitting
//! - Reconnect with a bounded retry count and liveness pings
//! - Optional Tokio integration (TCP/TLS) behind the `tokio` feature
//!
//! The protocol core ([`Session`]) performs no I/O, so it can be driven line
//! by line. [`Client`] wraps it with a socket, timers and a request channel.

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Driving a session by hand
//!
//! ```rust
//! use slirc_client::{Event, Options, Session};
//!
//! let mut session = Session::new(Options::new("irc.example.net", "bob"));
//! session.on("join", |event| {
//!     if let Event::Join { channel, nick } = event {
//!         println!("{} joined {}", nick, channel);
//!     }
//! });
//!
//! session.on_connected();
//! session.handle_line(":irc.example.net 001 bob :Welcome bob!b@host");
//! session.handle_line(":bob!b@host JOIN #rust");
//! assert!(session.channel("#rust").is_some());
//! ```
//!
//! ### Parsing IRC messages
//!
//! ```rust
//! use slirc_client::{Message, Response};
//!
//! let msg: Message = ":irc.example.net 001 bob :Welcome".parse().unwrap();
//! assert!(msg.is(Response::RPL_WELCOME));
//! assert_eq!(msg.arg(0), Some("bob"));
//! ```

pub mod bus;
pub mod casemap;
pub mod ctcp;
pub mod error;
pub mod event;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod options;
pub mod outbound;
pub mod prefix;
pub mod response;
pub mod sasl;
pub mod session;
pub mod state;

#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod client;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod line;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod liveness;
#[cfg(feature = "tokio")]
#[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
pub mod transport;

pub use self::bus::{EventBus, Flow, SubscriptionId};
pub use self::casemap::{irc_eq, irc_to_lower, CaseMapping};
pub use self::ctcp::CtcpKind;
pub use self::error::{ClientError, MessageParseError};
pub use self::event::Event;
pub use self::isupport::{ModeCategory, Supported};
pub use self::message::{Command, Message};
pub use self::options::{Options, WebIrc};
pub use self::prefix::Prefix;
pub use self::response::Response;
pub use self::session::Session;
pub use self::state::{Channel, WhoisInfo};

#[cfg(feature = "tokio")]
pub use self::client::{Client, ClientHandle};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
