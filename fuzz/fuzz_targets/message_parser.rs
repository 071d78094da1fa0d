//! Fuzz target for IRC line tokenizing
//!
//! Feeds arbitrary input to the tokenizer and the CTCP and prefix parsers,
//! which must never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    // Only fuzz valid UTF-8 strings to focus on protocol-level issues
    if let Ok(input) = str::from_utf8(data) {
        if input.is_empty() || input.len() > 8191 {
            return;
        }

        if let Ok(msg) = input.parse::<slirc_client::Message>() {
            let _ = msg.nick();
            let _ = msg.command_type();
        }
        let _ = slirc_client::ctcp::Ctcp::parse(input);
        let _ = slirc_client::Prefix::parse(input);
    }
});
