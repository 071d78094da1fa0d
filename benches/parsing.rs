//! Benchmarks for tokenizing, dispatching and outbound splitting.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use slirc_client::outbound::{frame, split_long_lines};
use slirc_client::{Message, Options, Session};

/// Simple PING message
const SIMPLE_MESSAGE: &str = "PING :irc.example.com";

/// Message with prefix
const PREFIX_MESSAGE: &str = ":nick!user@host PRIVMSG #channel :Hello, world!";

/// Message with IRCv3 tags
const TAGGED_MESSAGE: &str = "@time=2023-01-01T00:00:00.000Z;msgid=abc123 :nick!user@host PRIVMSG #channel :Hello with tags!";

/// Numeric response
const NUMERIC_RESPONSE: &str = ":irc.server.net 001 nickname :Welcome to the IRC Network nickname!user@host";

/// Large NAMES reply
const NAMES_REPLY: &str = ":irc.server.net 353 bench = #channel :@alice +bob carol dave @erin frank +grace heidi ivan judy mallory niaj olivia peggy rupert sybil trent victor walter";

fn benchmark_tokenizing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Tokenizing");

    for (name, line) in [
        ("simple_ping", SIMPLE_MESSAGE),
        ("with_prefix", PREFIX_MESSAGE),
        ("with_tags", TAGGED_MESSAGE),
        ("numeric_response", NUMERIC_RESPONSE),
    ] {
        group.bench_with_input(BenchmarkId::new("parse", name), line, |b, s| {
            b.iter(|| {
                let msg: Message = black_box(s).parse().unwrap();
                black_box(msg)
            })
        });
    }

    group.finish();
}

fn registered_session() -> Session {
    let mut session = Session::new(Options::new("irc.server.net", "bench"));
    session.on_connected();
    session.handle_line(":irc.server.net 001 bench :Welcome bench!b@host");
    session.handle_line(":bench!b@host JOIN #channel");
    session.drain_outbound();
    session
}

fn benchmark_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dispatch");

    group.bench_function("privmsg", |b| {
        let mut session = registered_session();
        session.on("message#channel", |event| {
            black_box(event);
        });
        b.iter(|| session.handle_line(black_box(PREFIX_MESSAGE)))
    });

    group.bench_function("names_reply", |b| {
        let mut session = registered_session();
        b.iter(|| session.handle_line(black_box(NAMES_REPLY)))
    });

    group.bench_function("mode_change", |b| {
        let mut session = registered_session();
        session.handle_line(NAMES_REPLY);
        b.iter(|| {
            session.handle_line(black_box(":alice!a@h MODE #channel +ov-k bob carol key"));
            session.handle_line(black_box(":alice!a@h MODE #channel -ov bob carol"));
        })
    });

    group.finish();
}

fn benchmark_outbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("Outbound");
    let long_text = "lorem ipsum dolor sit amet ".repeat(80);

    group.bench_function("split_long_lines", |b| {
        b.iter(|| black_box(split_long_lines(black_box(&long_text), 400)))
    });

    group.bench_function("frame", |b| {
        b.iter(|| black_box(frame(&["PRIVMSG", "#channel", black_box("Hello, world!")])))
    });

    group.bench_function("say_split", |b| {
        let mut session = registered_session();
        b.iter(|| {
            session.say("#channel", black_box(&long_text));
            black_box(session.drain_outbound())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_tokenizing,
    benchmark_dispatch,
    benchmark_outbound,
);

criterion_main!(benches);
