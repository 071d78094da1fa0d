//! Sans-IO protocol session.
//!
//! [`Session`] owns every piece of derived protocol state and the outbound
//! queue. It consumes inbound lines and application requests, mutates its
//! stores, publishes [`Event`]s on its bus and leaves framed lines in the
//! outbound queue for whoever owns the socket. It performs no I/O and keeps
//! no timers, so it can be driven from tests line by line.
//!
//! # Example
//!
//! ```
//! use slirc_client::{Options, Session};
//!
//! let mut session = Session::new(Options::new("irc.example.net", "bob"));
//! session.on_connected();
//! let lines = session.drain_outbound();
//! assert_eq!(lines, vec!["NICK bob\r\n", "USER slirc 8 * slirc-client\r\n"]);
//!
//! session.handle_line(":irc.example.net 001 bob :Welcome bob!b@host");
//! assert!(session.is_registered());
//! ```

mod dispatch;

use tracing::{debug, info, trace, warn};

use crate::bus::{EventBus, Flow, SubscriptionId};
use crate::ctcp::{self, CtcpKind};
use crate::event::{ChannelListEntry, Event};
use crate::isupport::Supported;
use crate::message::Message;
use crate::options::Options;
use crate::outbound::{self, OutboundQueue};
use crate::state::{Channel, ChannelStore, Identity, WhoisAccumulator, WhoisInfo};

/// Protocol state for one engine instance.
#[derive(Debug)]
pub struct Session {
    options: Options,
    identity: Identity,
    supported: Supported,
    channels: ChannelStore,
    whois: WhoisAccumulator,
    outbound: OutboundQueue,
    bus: EventBus,
    motd: String,
    channel_list: Vec<ChannelListEntry>,
    nick_mod: u32,
    pending_self_whois: bool,
    pending_joins: Vec<String>,
    registered: bool,
    closing: bool,
}

impl Session {
    pub fn new(options: Options) -> Self {
        Session {
            identity: Identity::new(&options.nick),
            supported: Supported::new(&options.channel_prefixes),
            channels: ChannelStore::new(),
            whois: WhoisAccumulator::new(),
            outbound: OutboundQueue::new(options.flood_protection),
            bus: EventBus::new(),
            motd: String::new(),
            channel_list: Vec::new(),
            nick_mod: 0,
            pending_self_whois: false,
            pending_joins: Vec::new(),
            registered: false,
            closing: false,
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Current nick.
    pub fn nick(&self) -> &str {
        &self.identity.nick
    }

    pub fn supported(&self) -> &Supported {
        &self.supported
    }

    pub fn channels(&self) -> &ChannelStore {
        &self.channels
    }

    /// Look up a joined channel by any casing of its name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Whether `RPL_WELCOME` has been seen on the current connection.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Whether an intentional disconnect is in progress.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Subscribe to every event matching `pattern`.
    pub fn on<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.bus.on(pattern, handler)
    }

    /// Subscribe to the first event matching `pattern`.
    pub fn once<F>(&mut self, pattern: &str, handler: F) -> SubscriptionId
    where
        F: FnOnce(&Event) + Send + 'static,
    {
        self.bus.once(pattern, handler)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.bus.off(id)
    }

    /// Publish an event produced outside the dispatcher (transport errors,
    /// retry exhaustion).
    pub fn emit(&mut self, event: Event) {
        self.bus.emit(&event);
    }

    /// Publish under the base topic, `prefix + channel` and its lowercase
    /// form when that differs. Each subscription sees the event once.
    fn emit_for_channel(&mut self, event: Event, prefix: &str, channel: &str) {
        let mut topics = vec![event.topic().to_string()];
        topics.extend(channel_topics(prefix, channel));
        self.bus.publish_all(&topics, &event);
    }

    // ---- connection lifecycle hooks -------------------------------------

    /// Reset per-connection state and queue the registration burst.
    ///
    /// Sends `WEBIRC` when configured, then `CAP REQ sasl` or `PASS`, then
    /// `NICK` and `USER`, and emits `connect`.
    pub fn on_connected(&mut self) {
        self.supported = Supported::new(&self.options.channel_prefixes);
        self.channels = ChannelStore::new();
        self.whois.clear();
        self.outbound.clear();
        self.motd.clear();
        self.channel_list.clear();
        self.pending_self_whois = false;
        self.pending_joins.clear();
        self.nick_mod = 0;
        self.registered = false;
        self.closing = false;

        if let Some(webirc) = self.options.webirc.clone() {
            if !webirc.pass.is_empty() && !webirc.host.is_empty() && !webirc.ip.is_empty() {
                let user = self.options.user_name.clone();
                self.send(&[
                    "WEBIRC",
                    webirc.pass.as_str(),
                    user.as_str(),
                    webirc.host.as_str(),
                    webirc.ip.as_str(),
                ]);
            }
        }

        if self.options.sasl {
            self.send(&["CAP", "REQ", "sasl"]);
        } else if let Some(password) = self.options.password.clone() {
            self.send(&["PASS", password.as_str()]);
        }

        let nick = self.options.nick.clone();
        let user = self.options.user_name.clone();
        let real = self.options.real_name.clone();
        self.send(&["NICK", nick.as_str()]);
        self.send(&["USER", user.as_str(), "8", "*", real.as_str()]);

        self.identity.set_nick(&nick);
        info!(nick = %nick, "registering");
        self.emit(Event::Connect);
    }

    /// Tokenize and dispatch one inbound line. Unparsable lines are logged
    /// and dropped.
    pub fn handle_line(&mut self, line: &str) {
        trace!(line, "<<");
        match Message::parse(line) {
            Ok(msg) => self.handle_message(msg),
            Err(e) => debug!(error = %e, line, "dropping unparsable line"),
        }
    }

    /// Dispatch a tokenized message, then publish it as `raw`.
    pub fn handle_message(&mut self, msg: Message) {
        self.dispatch(&msg);
        self.emit(Event::Raw(msg));
    }

    // ---- outbound -------------------------------------------------------

    /// Frame `args` and queue them through the flood-protected path.
    ///
    /// Dropped once an intentional disconnect has begun.
    pub fn send<S: AsRef<str>>(&mut self, args: &[S]) {
        if self.closing {
            trace!("dropping send while closing");
            return;
        }
        let line = outbound::frame(args);
        trace!(line = line.trim_end(), ">>");
        self.outbound.enqueue(line);
    }

    /// Release one flood-protected line.
    pub fn tick(&mut self) -> bool {
        self.outbound.tick()
    }

    /// Framed lines ready for the wire.
    pub fn drain_outbound(&mut self) -> Vec<String> {
        self.outbound.drain_ready()
    }

    pub fn has_outbound(&self) -> bool {
        self.outbound.has_ready()
    }

    /// Liveness probe.
    pub fn ping(&mut self, token: &str) {
        self.send(&["PING", token]);
    }

    // ---- application operations ----------------------------------------

    /// Join `channel`, which may carry a key after a space. Once the server
    /// confirms, the entry is remembered for rejoin after reconnect.
    pub fn join(&mut self, channel: &str) {
        self.pending_joins.push(channel.to_string());
        self.send_join(channel);
    }

    fn send_join(&mut self, entry: &str) {
        let mut args = vec!["JOIN"];
        args.extend(entry.split(' ').filter(|s| !s.is_empty()));
        self.send(&args);
    }

    /// Leave `channel` and stop rejoining it.
    pub fn part(&mut self, channel: &str, message: Option<&str>) {
        self.options
            .channels
            .retain(|entry| !first_word(entry).eq_ignore_ascii_case(channel));
        match message {
            Some(message) => self.send(&["PART", channel, message]),
            None => self.send(&["PART", channel]),
        }
    }

    /// Send a PRIVMSG, split to fit the line budget.
    pub fn say(&mut self, target: &str, text: &str) {
        self.speak("PRIVMSG", target, text);
    }

    /// Send a NOTICE, split to fit the line budget.
    pub fn notice(&mut self, target: &str, text: &str) {
        self.speak("NOTICE", target, text);
    }

    /// Send each line of `text` as a CTCP ACTION.
    pub fn action(&mut self, channel: &str, text: &str) {
        let lines: Vec<String> = outbound::text_lines(text)
            .map(|line| ctcp::wrap(&format!("ACTION {}", line)))
            .collect();
        for line in lines {
            self.say(channel, &line);
        }
    }

    /// Send a CTCP request (`Privmsg`) or reply (`Notice`).
    pub fn ctcp(&mut self, target: &str, kind: CtcpKind, text: &str) {
        let body = ctcp::wrap(text);
        match kind {
            CtcpKind::Privmsg => self.say(target, &body),
            CtcpKind::Notice => self.notice(target, &body),
        }
    }

    fn speak(&mut self, command: &str, target: &str, text: &str) {
        let max = self
            .identity
            .max_line_length()
            .saturating_sub(target.len())
            .min(self.options.message_split);

        for line in outbound::text_lines(text) {
            for segment in outbound::split_long_lines(line, max) {
                self.send(&[command, target, segment.as_str()]);
                if command == "PRIVMSG" {
                    self.emit(Event::SelfMessage {
                        target: target.to_string(),
                        text: segment,
                    });
                }
            }
        }
    }

    /// Query WHOIS for `nick`; `callback` fires once with the merged record.
    pub fn whois<F>(&mut self, nick: &str, callback: Option<F>)
    where
        F: FnOnce(&WhoisInfo) + Send + 'static,
    {
        if let Some(callback) = callback {
            let wanted = nick.to_string();
            let mut callback = Some(callback);
            self.bus.on_until("whois", move |event| match event {
                Event::Whois(info) if info.nick.eq_ignore_ascii_case(&wanted) => {
                    if let Some(callback) = callback.take() {
                        callback(info);
                    }
                    Flow::Unsubscribe
                }
                _ => Flow::Continue,
            });
        }
        self.send(&["WHOIS", nick]);
    }

    /// Request the channel list, optionally filtered.
    pub fn list(&mut self, filters: &[&str]) {
        let mut args = vec!["LIST"];
        args.extend_from_slice(filters);
        self.send(&args);
    }

    /// Queue QUIT and mark the connection as intentionally closing.
    ///
    /// With flood protection the backlog is released first and QUIT skips
    /// the queue.
    pub fn disconnect(&mut self, message: Option<&str>) {
        if self.closing {
            return;
        }
        let message = message.unwrap_or(&self.options.quit_message).to_string();
        if self.outbound.flood_protection() {
            self.outbound.flush_pending();
            self.outbound.send_immediate(outbound::frame(&["QUIT", message.as_str()]));
        } else {
            self.send(&["QUIT", message.as_str()]);
        }
        self.closing = true;
        info!(nick = %self.identity.nick, "disconnecting");
    }

    /// The channel list configured for autojoin, including channels
    /// joined through [`Session::join`].
    pub fn autojoin_channels(&self) -> &[String] {
        &self.options.channels
    }

    fn autojoin(&mut self) {
        let entries = self.options.channels.clone();
        for entry in entries {
            self.send_join(&entry);
        }
    }

    fn log_error(&self, msg: &Message) {
        if self.options.show_errors {
            warn!(command = %msg.command, args = ?msg.args, "server error reply");
        } else {
            debug!(command = %msg.command, "server error reply");
        }
    }
}

fn first_word(entry: &str) -> &str {
    entry.split(' ').next().unwrap_or(entry)
}

/// `prefix + channel`, plus the lowercase form when it differs.
fn channel_topics(prefix: &str, channel: &str) -> Vec<String> {
    let mut topics = vec![format!("{}{}", prefix, channel)];
    let lower = channel.to_lowercase();
    if lower != channel {
        topics.push(format!("{}{}", prefix, lower));
    }
    topics
}
