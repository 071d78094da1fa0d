//! Inbound command and numeric dispatch.
//!
//! Every handler bails out quietly when an argument it needs is missing or
//! refers to a channel we do not track.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{channel_topics, first_word, Session};
use crate::ctcp::{Ctcp, CtcpKind};
use crate::event::{ChannelListEntry, Event};
use crate::message::{Command, CommandType, Message};
use crate::mode::parse_mode_changes;
use crate::response::Response;
use crate::sasl;
use crate::state::WhoisInfo;

fn timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn owned(arg: Option<&str>) -> Option<String> {
    arg.map(str::to_string)
}

impl Session {
    pub(super) fn dispatch(&mut self, msg: &Message) {
        match &msg.command {
            Command::Response(resp) => self.dispatch_response(*resp, msg),
            Command::Word(word) => self.dispatch_word(word, msg),
            Command::Numeric(_) => self.unhandled(msg),
        }
    }

    fn dispatch_word(&mut self, word: &str, msg: &Message) {
        match word {
            "PING" => {
                let token = msg.arg(0).unwrap_or_default().to_string();
                self.send(&["PONG", token.as_str()]);
                self.emit(Event::Ping(token));
            }
            "PONG" => {
                let token = msg.args.last().cloned().unwrap_or_default();
                self.emit(Event::Pong(token));
            }
            "NOTICE" => self.on_notice(msg),
            "PRIVMSG" | "CPRIVMSG" => self.on_privmsg(msg),
            "MODE" => self.on_mode(msg),
            "JOIN" => self.on_join(msg),
            "PART" => self.on_part(msg),
            "NICK" => self.on_nick(msg),
            "KICK" => self.on_kick(msg),
            "KILL" => self.on_kill(msg),
            "QUIT" => self.on_quit(msg),
            "TOPIC" => self.on_topic(msg),
            "INVITE" => {
                let Some(channel) = msg.arg(1) else { return };
                self.emit(Event::Invite {
                    channel: channel.to_string(),
                    from: owned(msg.nick()),
                });
            }
            "CAP" => self.on_cap(msg),
            "AUTHENTICATE" => self.on_authenticate(msg),
            "ERROR" => {
                warn!(reason = ?msg.arg(0), "server sent ERROR");
                self.emit(Event::Error(msg.clone()));
            }
            _ => self.unhandled(msg),
        }
    }

    fn dispatch_response(&mut self, resp: Response, msg: &Message) {
        use Response::*;

        match resp {
            RPL_WELCOME => self.on_welcome(msg),
            RPL_MYINFO => {
                if let Some(modes) = msg.arg(3) {
                    self.supported.user_modes = modes.to_string();
                }
            }
            RPL_ISUPPORT => {
                self.supported.apply_isupport(&msg.args);
                self.channels.set_case_mapping(self.supported.case_mapping);
            }
            RPL_YOURHOST | RPL_CREATED | RPL_LUSERCLIENT | RPL_LUSEROP | RPL_LUSERUNKNOWN
            | RPL_LUSERCHANNELS | RPL_LUSERME | RPL_LOCALUSERS | RPL_GLOBALUSERS
            | RPL_STATSCONN | RPL_VISIBLEHOST | RPL_YOURID | RPL_INVITING | RPL_LOGGEDIN
            | RPL_ISON | RPL_ENDOFWHO | RPL_NOTOPIC => {
                debug!(reply = resp.name(), "ignored numeric");
            }

            RPL_MOTDSTART => {
                self.motd.clear();
                self.push_motd(msg);
            }
            RPL_MOTD => self.push_motd(msg),
            RPL_ENDOFMOTD | ERR_NOMOTD => {
                self.push_motd(msg);
                let motd = self.motd.clone();
                self.emit(Event::Motd(motd));
                self.autojoin();
            }

            RPL_NAMREPLY => self.on_names(msg),
            RPL_ENDOFNAMES => self.on_end_of_names(msg),
            RPL_TOPIC => {
                let (Some(name), Some(topic)) = (msg.arg(1), msg.arg(2)) else { return };
                if let Some(channel) = self.channels.get_mut(name) {
                    channel.topic = Some(topic.to_string());
                }
            }
            RPL_TOPICWHOTIME => self.on_topic_who_time(msg),
            RPL_CHANNELMODEIS => {
                let (Some(name), Some(modes)) = (msg.arg(1), msg.arg(2)) else { return };
                let params = msg.args.get(3..).unwrap_or_default();
                if let Some(channel) = self.channels.get_mut(name) {
                    channel.reset_modes(&self.supported, modes, params);
                }
            }
            RPL_CREATIONTIME => {
                let (Some(name), Some(time)) = (msg.arg(1), msg.arg(2)) else { return };
                if let Some(channel) = self.channels.get_mut(name) {
                    channel.created = timestamp(time);
                }
            }

            RPL_WHOISUSER => self.whois_fields(msg, |info, args| {
                info.user = args.get(2).cloned();
                info.host = args.get(3).cloned();
                info.realname = args.get(5).cloned();
            }),
            RPL_WHOISSERVER => self.whois_fields(msg, |info, args| {
                info.server = args.get(2).cloned();
                info.server_info = args.get(3).cloned();
            }),
            RPL_WHOISOPERATOR => self.whois_fields(msg, |info, args| {
                info.operator = args.get(2).cloned();
            }),
            RPL_WHOISIDLE => self.whois_fields(msg, |info, args| {
                info.idle = args.get(2).cloned();
            }),
            RPL_WHOISCHANNELS => self.whois_fields(msg, |info, args| {
                info.channels = args
                    .get(2)
                    .map(|list| list.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default();
            }),
            RPL_WHOISACCOUNT => self.whois_fields(msg, |info, args| {
                info.account = args.get(2).cloned();
            }),
            RPL_WHOISHOST => self.on_whois_host(msg),
            RPL_WHOISSECURE => self.whois_fields(msg, |info, _| info.secure = true),
            RPL_AWAY => {
                let (Some(nick), Some(away)) = (msg.arg(1), msg.arg(2)) else { return };
                if let Some(info) = self.whois.existing(nick) {
                    info.away = Some(away.to_string());
                }
            }
            RPL_ENDOFWHOIS => {
                let Some(nick) = msg.arg(1) else { return };
                let info = self.whois.take(nick);
                self.finish_whois(info);
            }
            RPL_WHOREPLY => self.on_who_reply(msg),

            RPL_LISTSTART => {
                self.channel_list.clear();
                self.emit(Event::ChannelListStart);
            }
            RPL_LIST => {
                let entry = ChannelListEntry {
                    name: msg.arg(1).unwrap_or_default().to_string(),
                    users: msg.arg(2).unwrap_or_default().to_string(),
                    topic: msg.arg(3).unwrap_or_default().to_string(),
                };
                self.channel_list.push(entry.clone());
                self.emit(Event::ChannelListItem(entry));
            }
            RPL_LISTEND => {
                let list = self.channel_list.clone();
                self.emit(Event::ChannelList(list));
            }

            RPL_SASLSUCCESS => {
                info!("SASL authentication succeeded");
                self.send(&["CAP", "END"]);
            }
            ERR_SASLFAIL | ERR_SASLTOOLONG | ERR_SASLABORTED => {
                warn!(reply = resp.name(), "SASL authentication failed");
                self.emit(Event::Error(msg.clone()));
                self.send(&["CAP", "END"]);
            }
            RPL_YOUREOPER => self.emit(Event::Opered),

            ERR_NICKNAMEINUSE => self.on_nick_in_use(),
            ERR_ALREADYREGISTRED | ERR_UMODEUNKNOWNFLAG => self.log_error(msg),
            ERR_ERRONEUSNICKNAME | ERR_BANNEDFROMCHAN => {
                self.log_error(msg);
                self.emit(Event::Error(msg.clone()));
            }
            ERR_NOOPERHOST => {
                if self.options.show_errors {
                    self.log_error(msg);
                    self.emit(Event::Error(msg.clone()));
                }
            }
            _ => self.unhandled(msg),
        }
    }

    fn unhandled(&mut self, msg: &Message) {
        if msg.command_type() == CommandType::Error {
            self.emit(Event::Error(msg.clone()));
            self.log_error(msg);
        } else {
            debug!(command = %msg.command, "unhandled message");
        }
    }

    // ---- registration ---------------------------------------------------

    fn on_welcome(&mut self, msg: &Message) {
        let Some(nick) = msg.arg(0) else { return };

        self.identity.set_nick(nick);
        if self.identity.original_nick.is_none() {
            self.identity.original_nick = Some(nick.to_string());
        }
        if let Some(mask) = msg.arg(1).and_then(|text| text.split_whitespace().last()) {
            self.identity.set_host_mask(mask);
        }
        self.registered = true;
        info!(nick = %nick, "registered");

        self.emit(Event::Registered {
            nick: nick.to_string(),
        });

        self.pending_self_whois = true;
        self.send(&["WHOIS", nick]);
    }

    fn on_nick_in_use(&mut self) {
        self.nick_mod += 1;
        let nick = format!("{}{}", self.options.nick, self.nick_mod);
        debug!(nick = %nick, "nickname in use, retrying");
        self.send(&["NICK", nick.as_str()]);
        self.identity.set_nick(&nick);
    }

    fn on_cap(&mut self, msg: &Message) {
        let Some(sub) = msg.arg(1) else { return };
        let has_sasl = msg
            .arg(2)
            .is_some_and(|caps| caps.split_whitespace().any(|c| c.eq_ignore_ascii_case("sasl")));
        if !has_sasl {
            return;
        }

        if sub.eq_ignore_ascii_case("ACK") {
            self.send(&["AUTHENTICATE", "PLAIN"]);
        } else if sub.eq_ignore_ascii_case("NAK") {
            warn!("server refused the sasl capability");
            self.send(&["CAP", "END"]);
        }
    }

    fn on_authenticate(&mut self, msg: &Message) {
        if msg.arg(0) != Some("+") {
            return;
        }
        let encoded = sasl::encode_plain(
            &self.options.nick,
            &self.options.user_name,
            self.options.password.as_deref().unwrap_or_default(),
        );
        for payload in sasl::authenticate_payloads(&encoded) {
            self.send(&["AUTHENTICATE", payload.as_str()]);
        }
    }

    fn push_motd(&mut self, msg: &Message) {
        if let Some(line) = msg.arg(1) {
            self.motd.push_str(line);
        }
        self.motd.push('\n');
    }

    // ---- channels -------------------------------------------------------

    fn on_names(&mut self, msg: &Message) {
        let (Some(name), Some(list)) = (msg.arg(2), msg.arg(3)) else { return };
        let Some(channel) = self.channels.get_mut(name) else { return };

        for token in list.split_whitespace() {
            let mut status = String::new();
            let mut nick = token;
            while let Some(c) = nick.chars().next() {
                let Some(letter) = self.supported.mode_for_prefix.get(&c) else {
                    break;
                };
                status.push(*letter);
                nick = &nick[c.len_utf8()..];
            }
            if nick.is_empty() {
                continue;
            }
            channel.users.insert(nick.to_string(), status);
        }
    }

    fn on_end_of_names(&mut self, msg: &Message) {
        let Some(name) = msg.arg(1) else { return };
        let Some(channel) = self.channels.get(name) else { return };

        let event = Event::Names {
            channel: name.to_string(),
            users: channel.users.clone(),
        };
        let topics = [event.topic().to_string(), format!("names{}", name)];
        self.bus.publish_all(&topics, &event);
        self.send(&["MODE", name]);
    }

    fn on_topic_who_time(&mut self, msg: &Message) {
        let Some(name) = msg.arg(1) else { return };
        let Some(channel) = self.channels.get_mut(name) else { return };

        channel.topic_by = owned(msg.arg(2));
        channel.topic_time = msg.arg(3).and_then(timestamp);
        let event = Event::Topic {
            channel: name.to_string(),
            topic: channel.topic.clone().unwrap_or_default(),
            nick: channel.topic_by.clone(),
        };
        self.emit(event);
    }

    fn on_topic(&mut self, msg: &Message) {
        let Some(name) = msg.arg(0) else { return };
        let topic = msg.arg(1).unwrap_or_default();

        self.emit(Event::Topic {
            channel: name.to_string(),
            topic: topic.to_string(),
            nick: owned(msg.nick()),
        });

        if let Some(channel) = self.channels.get_mut(name) {
            channel.topic = Some(topic.to_string());
            channel.topic_by = owned(msg.nick());
            channel.topic_time = Some(Utc::now());
        }
    }

    fn on_mode(&mut self, msg: &Message) {
        let (Some(target), Some(modes)) = (msg.arg(0), msg.arg(1)) else { return };
        let params = msg.args.get(2..).unwrap_or_default();

        let changes = match self.channels.get_mut(target) {
            Some(channel) => {
                let changes = parse_mode_changes(&self.supported, modes, params);
                for change in &changes {
                    channel.apply_mode(change);
                }
                changes
            }
            None => {
                debug!(target, modes, "mode change for untracked target");
                return;
            }
        };

        for change in changes {
            self.emit(Event::Mode {
                channel: target.to_string(),
                by: owned(msg.nick()),
                change,
            });
        }
    }

    fn is_me(&self, nick: &str) -> bool {
        self.supported.case_mapping.eq(&self.identity.nick, nick)
    }

    fn on_join(&mut self, msg: &Message) {
        let (Some(name), Some(nick)) = (msg.arg(0), msg.nick()) else { return };

        if self.is_me(nick) {
            self.channels.remove(name);
            self.channels.get_or_create(name);
            self.confirm_join(name);
            debug!(channel = %name, "joined");
        } else if let Some(channel) = self.channels.get_mut(name) {
            channel.users.insert(nick.to_string(), String::new());
        }

        let event = Event::Join {
            channel: name.to_string(),
            nick: nick.to_string(),
        };
        self.emit_for_channel(event, "join", name);
    }

    /// Remember a channel joined through [`Session::join`] once the server
    /// confirms it.
    fn confirm_join(&mut self, name: &str) {
        let Some(pos) = self
            .pending_joins
            .iter()
            .position(|entry| first_word(entry).eq_ignore_ascii_case(name))
        else {
            return;
        };
        let entry = self.pending_joins.remove(pos);
        if !self.options.channels.contains(&entry) {
            self.options.channels.push(entry);
        }
    }

    fn on_part(&mut self, msg: &Message) {
        let (Some(name), Some(nick)) = (msg.arg(0), msg.nick()) else { return };

        if self.is_me(nick) {
            self.channels.remove(name);
            debug!(channel = %name, "left");
        } else if let Some(channel) = self.channels.get_mut(name) {
            channel.users.remove(nick);
        }

        let event = Event::Part {
            channel: name.to_string(),
            nick: nick.to_string(),
            reason: owned(msg.arg(1)),
        };
        self.emit_for_channel(event, "part", name);
    }

    fn on_kick(&mut self, msg: &Message) {
        let (Some(name), Some(victim)) = (msg.arg(0), msg.arg(1)) else { return };

        let rejoin = if self.is_me(victim) {
            self.channels.remove(name);
            info!(channel = %name, by = ?msg.nick(), "kicked");
            self.options.auto_rejoin
        } else {
            if let Some(channel) = self.channels.get_mut(name) {
                channel.users.remove(victim);
            }
            false
        };

        let event = Event::Kick {
            channel: name.to_string(),
            nick: victim.to_string(),
            by: owned(msg.nick()),
            reason: owned(msg.arg(2)),
        };
        self.emit_for_channel(event, "kick", name);

        if rejoin {
            let entry = self
                .options
                .channels
                .iter()
                .find(|entry| first_word(entry).eq_ignore_ascii_case(name))
                .cloned()
                .unwrap_or_else(|| name.to_string());
            self.send_join(&entry);
        }
    }

    fn on_quit(&mut self, msg: &Message) {
        let Some(nick) = msg.nick() else { return };

        let channels = if self.is_me(nick) {
            let names = self.channels.names();
            self.channels.clear();
            names
        } else {
            self.channels.remove_member(nick)
        };

        self.emit(Event::Quit {
            nick: nick.to_string(),
            reason: owned(msg.arg(0)),
            channels,
        });
    }

    fn on_kill(&mut self, msg: &Message) {
        let Some(victim) = msg.arg(0) else { return };
        let channels = self.channels.remove_member(victim);
        self.emit(Event::Kill {
            nick: victim.to_string(),
            reason: owned(msg.arg(1)),
            channels,
        });
    }

    fn on_nick(&mut self, msg: &Message) {
        let (Some(old), Some(new)) = (msg.nick(), msg.arg(0)) else { return };

        if self.is_me(old) {
            self.identity.set_nick(new);
            info!(old = %old, new = %new, "nick changed");
        }
        let channels = self.channels.rename_member(old, new);

        self.emit(Event::Nick {
            old: old.to_string(),
            new: new.to_string(),
            channels,
        });
    }

    // ---- messaging ------------------------------------------------------

    fn on_privmsg(&mut self, msg: &Message) {
        let Some(to) = msg.arg(0) else { return };
        let text = msg.arg(1).unwrap_or_default();
        let from = owned(msg.nick());

        if let Some(ctcp) = Ctcp::parse(text) {
            self.on_ctcp(from, to, ctcp, CtcpKind::Privmsg);
            return;
        }

        let event = Event::Message {
            from: from.clone(),
            to: to.to_string(),
            text: text.to_string(),
        };
        let mut topics = vec![event.topic().to_string()];
        if self.supported.is_channel(to) {
            topics.push("message#".to_string());
            topics.extend(channel_topics("message", to));
        }
        self.bus.publish_all(&topics, &event);

        if to.eq_ignore_ascii_case(&self.identity.nick) {
            self.emit(Event::Pm {
                from,
                text: text.to_string(),
            });
        }
    }

    fn on_notice(&mut self, msg: &Message) {
        let to = msg.arg(0);
        let text = msg.arg(1).unwrap_or_default();
        let from = owned(msg.nick());

        if let (Some(ctcp), Some(to)) = (Ctcp::parse(text), to) {
            self.on_ctcp(from, to, ctcp, CtcpKind::Notice);
            return;
        }

        self.emit(Event::Notice {
            from,
            to: owned(to),
            text: text.to_string(),
        });
    }

    fn on_ctcp(&mut self, from: Option<String>, to: &str, ctcp: Ctcp<'_>, kind: CtcpKind) {
        let event = Event::Ctcp {
            from: from.clone(),
            to: to.to_string(),
            text: ctcp.text.to_string(),
            kind,
        };
        let topics = [event.topic().to_string(), format!("ctcp-{}", kind)];
        self.bus.publish_all(&topics, &event);

        if kind == CtcpKind::Privmsg && ctcp.text == "VERSION" {
            self.emit(Event::CtcpVersion {
                from: from.clone(),
                to: to.to_string(),
            });
        }

        if ctcp.command == "ACTION" {
            if let Some(params) = ctcp.params {
                self.emit(Event::Action {
                    from: from.clone(),
                    to: to.to_string(),
                    text: params.to_string(),
                });
            }
        }

        if ctcp.command == "PING" && kind == CtcpKind::Privmsg && ctcp.params.is_some() {
            if let Some(from) = from {
                self.ctcp(&from, CtcpKind::Notice, ctcp.text);
            }
        }
    }

    // ---- whois ----------------------------------------------------------

    fn whois_fields<F>(&mut self, msg: &Message, fill: F)
    where
        F: FnOnce(&mut WhoisInfo, &[String]),
    {
        let Some(nick) = msg.arg(1) else { return };
        fill(self.whois.entry(nick), msg.args.as_slice());
    }

    fn on_whois_host(&mut self, msg: &Message) {
        let (Some(nick), Some(text)) = (msg.arg(1), msg.arg(2)) else { return };
        let Some((host, ip)) = text
            .strip_prefix("is connecting from ")
            .and_then(|rest| rest.trim_end().rsplit_once(char::is_whitespace))
        else {
            return;
        };
        if host.is_empty() || ip.is_empty() {
            return;
        }
        let info = self.whois.entry(nick);
        info.host = Some(host.to_string());
        info.ip = Some(ip.to_string());
    }

    /// WHO replies carry no per-nick terminator, so each one is emitted as a
    /// complete record right away.
    fn on_who_reply(&mut self, msg: &Message) {
        let Some(nick) = msg.arg(5) else { return };
        let realname = msg.arg(7).and_then(|field| {
            let name = field
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start();
            (!name.is_empty()).then(|| name.to_string())
        });

        let info = self.whois.entry(nick);
        info.user = owned(msg.arg(2));
        info.host = owned(msg.arg(3));
        info.server = owned(msg.arg(4));
        info.realname = realname;

        let info = self.whois.take(nick);
        self.finish_whois(info);
    }

    fn finish_whois(&mut self, info: WhoisInfo) {
        if self.pending_self_whois && self.is_me(&info.nick) {
            self.pending_self_whois = false;
            let nick = info.nick.clone();
            self.identity.set_nick(&nick);
            if let Some(mask) = info.host_mask() {
                debug!(host_mask = %mask, "adopted host mask");
                self.identity.set_host_mask(&mask);
            }
        }
        self.emit(Event::Whois(info));
    }
}
