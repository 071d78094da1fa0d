//! Dispatcher behaviour, driven line by line against a `Session`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use slirc_client::{CtcpKind, Event, ModeCategory, Options, Session, WhoisInfo};

const SERVER: &str = "irc.example.net";

fn session_with(opts: Options) -> Session {
    let mut session = Session::new(opts);
    session.on_connected();
    session.handle_line(":irc.example.net 001 bob :Welcome to the network bob!b@host.example");
    session.drain_outbound();
    session
}

fn registered() -> Session {
    session_with(Options::new(SERVER, "bob"))
}

fn record(session: &mut Session, pattern: &str) -> Arc<Mutex<Vec<Event>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session.on(pattern, move |event| sink.lock().unwrap().push(event.clone()));
    seen
}

fn users(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(n, s)| (n.to_string(), s.to_string()))
        .collect()
}

#[test]
fn welcome_adopts_nick_and_requests_self_whois() {
    let mut session = Session::new(Options::new(SERVER, "bob"));
    let seen = record(&mut session, "registered");
    session.on_connected();
    session.drain_outbound();

    session.handle_line(":irc.example.net 001 bob_ :Welcome bob_!b@host.example");

    assert_eq!(session.nick(), "bob_");
    assert_eq!(session.identity().original_nick.as_deref(), Some("bob_"));
    assert_eq!(session.identity().host_mask, "bob_!b@host.example");
    assert_eq!(session.drain_outbound(), vec!["WHOIS bob_\r\n"]);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Event::Registered {
            nick: "bob_".to_string()
        }]
    );
}

#[test]
fn names_reply_builds_member_map() {
    let mut session = registered();
    let names = record(&mut session, "names");
    let per_channel = record(&mut session, "names#chan");

    session.handle_line(":bob!b@host.example JOIN #chan");
    session.handle_line(":irc.example.net 353 bob = #chan :@alice bob");
    session.handle_line(":irc.example.net 366 bob #chan :End of /NAMES list.");

    let expected = users(&[("alice", "o"), ("bob", "")]);
    assert_eq!(session.channel("#chan").unwrap().users, expected);

    let event = Event::Names {
        channel: "#chan".to_string(),
        users: expected,
    };
    assert_eq!(*names.lock().unwrap(), vec![event.clone()]);
    assert_eq!(*per_channel.lock().unwrap(), vec![event]);
    assert_eq!(session.drain_outbound(), vec!["MODE #chan\r\n"]);
}

#[test]
fn names_for_unknown_channel_is_ignored() {
    let mut session = registered();
    let names = record(&mut session, "names");
    session.handle_line(":irc.example.net 353 bob = #nowhere :@alice");
    session.handle_line(":irc.example.net 366 bob #nowhere :End of /NAMES list.");
    assert!(names.lock().unwrap().is_empty());
    assert!(session.channel("#nowhere").is_none());
}

#[test]
fn prefix_token_maps_both_ways() {
    let mut session = registered();
    session.handle_line(
        ":irc.example.net 005 bob PREFIX=(qov)(~@+) CHANMODES=eIb,k,l,imnpst :are supported by this server",
    );

    let supported = session.supported();
    assert_eq!(supported.mode_for_prefix.get(&'@'), Some(&'o'));
    assert_eq!(supported.prefix_for_mode.get(&'o'), Some(&'@'));
    assert_eq!(supported.mode_for_prefix.get(&'~'), Some(&'q'));
    assert!(supported.chan_modes.always.contains('o'));
    assert_eq!(supported.category('q'), Some(ModeCategory::Prefix));
    assert_eq!(supported.category('e'), Some(ModeCategory::List));
}

#[test]
fn casemapping_drives_channel_keys() {
    let mut session = registered();
    session.handle_line(":irc.example.net 005 bob CASEMAPPING=rfc1459 :are supported by this server");
    session.handle_line(":bob!b@host.example JOIN #Foo[1]");
    assert!(session.channel("#foo{1}").is_some());
}

#[test]
fn nick_collision_appends_counter() {
    let mut session = Session::new(Options::new(SERVER, "bob"));
    session.on_connected();
    session.drain_outbound();

    session.handle_line(":irc.example.net 433 * bob :Nickname is already in use");
    session.handle_line(":irc.example.net 433 * bob1 :Nickname is already in use");

    assert_eq!(session.drain_outbound(), vec!["NICK bob1\r\n", "NICK bob2\r\n"]);
    assert_eq!(session.nick(), "bob2");
}

#[test]
fn mode_changes_update_channel_and_emit() {
    let mut session = registered();
    let added = record(&mut session, "+mode");
    let removed = record(&mut session, "-mode");

    session.handle_line(":bob!b@host.example JOIN #chan");
    session.handle_line(":irc.example.net 353 bob = #chan :alice bob");
    session.handle_line(":alice!a@h MODE #chan +okl-i bob sekrit 10");

    let channel = session.channel("#chan").unwrap();
    assert_eq!(channel.users["bob"], "o");
    assert!(channel.mode.contains('k') && channel.mode.contains('l'));
    assert_eq!(channel.mode_params[&'k'], vec!["sekrit"]);
    assert_eq!(channel.mode_params[&'l'], vec!["10"]);
    assert_eq!(added.lock().unwrap().len(), 3);
    assert_eq!(removed.lock().unwrap().len(), 1);

    session.handle_line(":alice!a@h MODE #chan -kl sekrit");
    let channel = session.channel("#chan").unwrap();
    assert!(!channel.mode.contains('k'));
    assert!(!channel.mode.contains('l'));
    assert!(channel.mode_params.is_empty());
}

#[test]
fn list_modes_accumulate_and_remove_by_value() {
    let mut session = registered();
    session.handle_line(":bob!b@host.example JOIN #chan");
    session.handle_line(":op!o@h MODE #chan +bb *!*@a *!*@b");
    session.handle_line(":op!o@h MODE #chan -b *!*@nope");
    assert_eq!(
        session.channel("#chan").unwrap().mode_params[&'b'],
        vec!["*!*@a", "*!*@b"]
    );

    session.handle_line(":op!o@h MODE #chan -bb *!*@a *!*@b");
    let channel = session.channel("#chan").unwrap();
    assert!(!channel.mode.contains('b'));
    assert!(!channel.mode_params.contains_key(&'b'));
}

#[test]
fn join_variants_are_published() {
    let mut session = registered();
    let exact = record(&mut session, "join#Rust");
    let lower = record(&mut session, "join#rust");
    let any = record(&mut session, "join");

    session.handle_line(":bob!b@host.example JOIN #Rust");
    session.handle_line(":alice!a@h JOIN #Rust");

    assert_eq!(exact.lock().unwrap().len(), 2);
    assert_eq!(lower.lock().unwrap().len(), 2);
    assert_eq!(any.lock().unwrap().len(), 2);
    assert!(session.channel("#rust").unwrap().users.contains_key("alice"));
}

#[test]
fn confirmed_join_is_remembered_and_part_forgets() {
    let mut session = registered();
    session.join("#later key");
    assert_eq!(session.drain_outbound(), vec!["JOIN #later key\r\n"]);
    assert!(session.autojoin_channels().is_empty());

    session.handle_line(":bob!b@host.example JOIN #later");
    assert_eq!(session.autojoin_channels(), ["#later key".to_string()]);

    session.part("#later", Some("bye now"));
    assert_eq!(session.drain_outbound(), vec!["PART #later :bye now\r\n"]);
    assert!(session.autojoin_channels().is_empty());
}

#[test]
fn autojoin_after_motd() {
    let mut opts = Options::new(SERVER, "bob");
    opts.channels = vec!["#one".to_string(), "#two key".to_string()];
    let mut session = session_with(opts);
    let motd = record(&mut session, "motd");

    session.handle_line(":irc.example.net 375 bob :- irc.example.net Message of the Day -");
    session.handle_line(":irc.example.net 372 bob :- hello");
    session.handle_line(":irc.example.net 376 bob :End of /MOTD command.");

    assert_eq!(session.drain_outbound(), vec!["JOIN #one\r\n", "JOIN #two key\r\n"]);
    match &motd.lock().unwrap()[0] {
        Event::Motd(text) => assert!(text.contains("- hello")),
        other => panic!("unexpected {:?}", other),
    };
}

#[test]
fn part_kick_quit_maintain_membership() {
    let mut session = registered();
    let quits = record(&mut session, "quit");
    session.handle_line(":bob!b@host.example JOIN #a");
    session.handle_line(":bob!b@host.example JOIN #b");
    session.handle_line(":irc.example.net 353 bob = #a :alice carol bob");
    session.handle_line(":irc.example.net 353 bob = #b :alice bob");

    session.handle_line(":carol!c@h PART #a :later");
    assert!(!session.channel("#a").unwrap().users.contains_key("carol"));

    session.handle_line(":alice!a@h QUIT :gone");
    match &quits.lock().unwrap()[0] {
        Event::Quit { nick, channels, .. } => {
            assert_eq!(nick, "alice");
            let mut channels = channels.clone();
            channels.sort();
            assert_eq!(channels, vec!["#a", "#b"]);
        }
        other => panic!("unexpected {:?}", other),
    }

    session.handle_line(":op!o@h KICK #b bob :out");
    assert!(session.channel("#b").is_none());
    assert!(session.drain_outbound().is_empty());
}

#[test]
fn self_quit_lists_channels_before_clearing() {
    let mut session = registered();
    let quits = record(&mut session, "quit");
    session.handle_line(":bob!b@host.example JOIN #a");
    session.handle_line(":bob!b@host.example QUIT :bye");

    assert!(session.channels().is_empty());
    match &quits.lock().unwrap()[0] {
        Event::Quit { channels, .. } => assert_eq!(channels, &vec!["#a".to_string()]),
        other => panic!("unexpected {:?}", other),
    };
}

#[test]
fn auto_rejoin_after_kick() {
    let mut opts = Options::new(SERVER, "bob");
    opts.auto_rejoin = true;
    let mut session = session_with(opts);
    session.handle_line(":bob!b@host.example JOIN #a");
    session.handle_line(":op!o@h KICK #a bob :out");
    assert_eq!(session.drain_outbound(), vec!["JOIN #a\r\n"]);
}

#[test]
fn auto_rejoin_keeps_channel_key() {
    let mut opts = Options::new(SERVER, "bob");
    opts.auto_rejoin = true;
    opts.channels.push("#Secret hunter2".to_string());
    let mut session = session_with(opts);
    session.handle_line(":bob!b@host.example JOIN #secret");
    session.handle_line(":op!o@h KICK #secret bob :out");
    assert_eq!(session.drain_outbound(), vec!["JOIN #Secret hunter2\r\n"]);
}

#[test]
fn nick_change_renames_everywhere() {
    let mut session = registered();
    session.handle_line(":bob!b@host.example JOIN #a");
    session.handle_line(":irc.example.net 353 bob = #a :@alice bob");
    session.handle_line(":alice!a@h NICK alicia");
    assert_eq!(session.channel("#a").unwrap().users["alicia"], "o");

    session.handle_line(":bob!b@host.example NICK robert");
    assert_eq!(session.nick(), "robert");
}

#[test]
fn channel_message_topics() {
    let mut session = registered();
    let any = record(&mut session, "message");
    let any_channel = record(&mut session, "message#");
    let exact = record(&mut session, "message#Rust");
    let lower = record(&mut session, "message#rust");
    let pm = record(&mut session, "pm");

    session.handle_line(":alice!a@h PRIVMSG #Rust :hello there");
    session.handle_line(":alice!a@h PRIVMSG bob :psst");

    assert_eq!(any.lock().unwrap().len(), 2);
    assert_eq!(any_channel.lock().unwrap().len(), 1);
    assert_eq!(exact.lock().unwrap().len(), 1);
    assert_eq!(lower.lock().unwrap().len(), 1);
    assert_eq!(
        *pm.lock().unwrap(),
        vec![Event::Pm {
            from: Some("alice".to_string()),
            text: "psst".to_string()
        }]
    );
}

#[test]
fn wildcard_subscription_sees_each_message_once() {
    let mut session = registered();
    let seen = record(&mut session, "message#*");
    session.handle_line(":alice!a@h PRIVMSG #a :one");
    session.handle_line(":alice!a@h PRIVMSG #b :two");
    session.handle_line(":alice!a@h PRIVMSG #Rust :three");
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn ctcp_routing_and_ping_reply() {
    let mut session = registered();
    let ctcp = record(&mut session, "ctcp-privmsg");
    let actions = record(&mut session, "action");
    let versions = record(&mut session, "ctcp-version");
    let messages = record(&mut session, "message");

    session.handle_line(":alice!a@h PRIVMSG #a :\u{1}ACTION waves\u{1}");
    session.handle_line(":alice!a@h PRIVMSG bob :\u{1}VERSION\u{1}");
    session.handle_line(":alice!a@h PRIVMSG bob :\u{1}PING 12345\u{1}");

    assert!(messages.lock().unwrap().is_empty());
    assert_eq!(ctcp.lock().unwrap().len(), 3);
    assert_eq!(versions.lock().unwrap().len(), 1);
    assert_eq!(
        *actions.lock().unwrap(),
        vec![Event::Action {
            from: Some("alice".to_string()),
            to: "#a".to_string(),
            text: "waves".to_string()
        }]
    );
    assert_eq!(session.drain_outbound(), vec!["NOTICE alice :\u{1}PING 12345\u{1}\r\n"]);
}

#[test]
fn ctcp_notice_is_typed() {
    let mut session = registered();
    let replies = record(&mut session, "ctcp-notice");
    session.handle_line(":alice!a@h NOTICE bob :\u{1}VERSION slirc 1.0\u{1}");
    match &replies.lock().unwrap()[0] {
        Event::Ctcp { kind, text, .. } => {
            assert_eq!(*kind, CtcpKind::Notice);
            assert_eq!(text, "VERSION slirc 1.0");
        }
        other => panic!("unexpected {:?}", other),
    };
}

#[test]
fn whois_replies_merge_into_one_record() {
    let mut session = registered();
    let got: Arc<Mutex<Option<WhoisInfo>>> = Arc::new(Mutex::new(None));
    let sink = got.clone();
    session.whois("alice", Some(move |info: &WhoisInfo| {
        *sink.lock().unwrap() = Some(info.clone());
    }));
    assert_eq!(session.drain_outbound(), vec!["WHOIS alice\r\n"]);

    session.handle_line(":irc.example.net 311 bob alice ali host.a * :Alice A");
    session.handle_line(":irc.example.net 312 bob alice hub.example.net :The hub");
    session.handle_line(":irc.example.net 319 bob alice :@#a +#b");
    session.handle_line(":irc.example.net 330 bob alice alice_acct :is logged in as");
    session.handle_line(":irc.example.net 301 bob alice :out to lunch");
    session.handle_line(":irc.example.net 671 bob alice :is using a secure connection");
    session.handle_line(":irc.example.net 318 bob alice :End of /WHOIS list.");

    let info = got.lock().unwrap().clone().unwrap();
    assert_eq!(info.nick, "alice");
    assert_eq!(info.user.as_deref(), Some("ali"));
    assert_eq!(info.host.as_deref(), Some("host.a"));
    assert_eq!(info.realname.as_deref(), Some("Alice A"));
    assert_eq!(info.server.as_deref(), Some("hub.example.net"));
    assert_eq!(info.channels, vec!["@#a", "+#b"]);
    assert_eq!(info.account.as_deref(), Some("alice_acct"));
    assert_eq!(info.away.as_deref(), Some("out to lunch"));
    assert!(info.secure);
}

#[test]
fn away_without_whois_record_is_dropped() {
    let mut session = registered();
    let whois = record(&mut session, "whois");
    session.handle_line(":irc.example.net 301 bob alice :out to lunch");
    session.handle_line(":irc.example.net 318 bob alice :End of /WHOIS list.");
    match &whois.lock().unwrap()[0] {
        Event::Whois(info) => {
            assert_eq!(info.nick, "alice");
            assert_eq!(info.away, None);
        }
        other => panic!("unexpected {:?}", other),
    };
}

#[test]
fn who_reply_emits_immediately() {
    let mut session = registered();
    let whois = record(&mut session, "whois");
    session.handle_line(":irc.example.net 352 bob #a ali host.a irc.example.net alice H :0 Alice A");
    match &whois.lock().unwrap()[0] {
        Event::Whois(info) => {
            assert_eq!(info.nick, "alice");
            assert_eq!(info.realname.as_deref(), Some("Alice A"));
            assert_eq!(info.server.as_deref(), Some("irc.example.net"));
        }
        other => panic!("unexpected {:?}", other),
    };
}

#[test]
fn sasl_exchange() {
    let mut opts = Options::new(SERVER, "bob");
    opts.sasl = true;
    opts.user_name = "bobuser".to_string();
    opts.password = Some("hunter2".to_string());
    let mut session = Session::new(opts);
    let errors = record(&mut session, "error");
    session.on_connected();
    session.drain_outbound();

    session.handle_line(":irc.example.net CAP * ACK :sasl");
    assert_eq!(session.drain_outbound(), vec!["AUTHENTICATE PLAIN\r\n"]);

    session.handle_line("AUTHENTICATE +");
    assert_eq!(
        session.drain_outbound(),
        vec!["AUTHENTICATE Ym9iAGJvYnVzZXIAaHVudGVyMg==\r\n"]
    );

    session.handle_line(":irc.example.net 904 bob :SASL authentication failed");
    assert_eq!(session.drain_outbound(), vec!["CAP END\r\n"]);
    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[test]
fn ping_is_answered() {
    let mut session = registered();
    session.handle_line("PING :irc.example.net");
    assert_eq!(session.drain_outbound(), vec!["PONG irc.example.net\r\n"]);
}

#[test]
fn topic_and_creation_time() {
    let mut session = registered();
    let topics = record(&mut session, "topic");
    session.handle_line(":bob!b@host.example JOIN #a");
    session.handle_line(":irc.example.net 332 bob #a :Rust talk");
    session.handle_line(":irc.example.net 333 bob #a alice!a@h 1700000000");
    session.handle_line(":irc.example.net 329 bob #a 1600000000");

    let channel = session.channel("#a").unwrap();
    assert_eq!(channel.topic.as_deref(), Some("Rust talk"));
    assert_eq!(channel.topic_by.as_deref(), Some("alice!a@h"));
    assert_eq!(channel.topic_time.map(|t| t.timestamp()), Some(1_700_000_000));
    assert_eq!(channel.created.map(|t| t.timestamp()), Some(1_600_000_000));
    assert_eq!(topics.lock().unwrap().len(), 1);
}

#[test]
fn channel_list_sequence() {
    let mut session = registered();
    let list = record(&mut session, "channellist");
    let items = record(&mut session, "channellist_item");
    session.handle_line(":irc.example.net 321 bob Channel :Users  Name");
    session.handle_line(":irc.example.net 322 bob #a 12 :talk");
    session.handle_line(":irc.example.net 322 bob #b 3 :quiet");
    session.handle_line(":irc.example.net 323 bob :End of /LIST");

    assert_eq!(items.lock().unwrap().len(), 2);
    match &list.lock().unwrap()[0] {
        Event::ChannelList(entries) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].name, "#a");
            assert_eq!(entries[1].users, "3");
        }
        other => panic!("unexpected {:?}", other),
    };
}

#[test]
fn error_numerics_surface() {
    let mut session = registered();
    let errors = record(&mut session, "error");
    session.handle_line(":irc.example.net 474 bob #a :Cannot join channel (+b)");
    session.handle_line(":irc.example.net 401 bob nobody :No such nick/channel");
    session.handle_line(":irc.example.net 462 bob :You may not reregister");
    assert_eq!(errors.lock().unwrap().len(), 2);
}

#[test]
fn long_messages_are_split() {
    let mut session = registered();
    let own = record(&mut session, "selfMessage");
    let text = "word ".repeat(200);
    session.say("#a", text.trim_end());

    let lines = session.drain_outbound();
    assert!(lines.len() > 1);
    for line in &lines {
        assert!(line.len() <= 512);
        assert!(line.starts_with("PRIVMSG #a :"));
    }
    assert_eq!(own.lock().unwrap().len(), lines.len());
}

#[test]
fn carriage_return_starts_a_new_message() {
    let mut session = registered();
    session.say("#a", "hi\rQUIT :x");
    assert_eq!(
        session.drain_outbound(),
        vec!["PRIVMSG #a hi\r\n", "PRIVMSG #a :QUIT :x\r\n"]
    );
}

#[test]
fn raw_follows_every_line() {
    let mut session = registered();
    let raw = record(&mut session, "raw");
    session.handle_line(":alice!a@h PRIVMSG #a :hi");
    session.handle_line(":irc.example.net 999 bob :mystery");
    assert_eq!(raw.lock().unwrap().len(), 2);
}
