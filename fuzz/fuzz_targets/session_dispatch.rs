//! Fuzz target for the dispatcher
//!
//! Every input line is fed to a registered session; no sequence of lines may
//! panic or leave an unterminated outbound line behind.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::{Options, Session};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    let mut session = Session::new(Options::new("irc.example.net", "fuzz"));
    session.on_connected();
    session.handle_line(":irc.example.net 001 fuzz :Welcome fuzz!f@host");
    session.handle_line(":fuzz!f@host JOIN #fuzz");

    for line in input.lines().take(64) {
        session.handle_line(line);
    }

    for line in session.drain_outbound() {
        assert!(line.ends_with("\r\n"));
    }
});
