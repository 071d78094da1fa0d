//! Property tests for line splitting, the flood queue and mode round-trips.

use proptest::prelude::*;
use slirc_client::isupport::Supported;
use slirc_client::mode::parse_mode_changes;
use slirc_client::outbound::{split_long_lines, OutboundQueue};
use slirc_client::Channel;

fn words(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::string::string_regex(&format!("[a-z0-9]{{1,{}}}", max - 1)).unwrap(),
        1..60,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn split_segments_fit_and_rejoin(max in 8usize..80, words in words(8)) {
        let text = words.join(" ");
        let segments = split_long_lines(&text, max);

        prop_assert!(segments.iter().all(|s| s.len() <= max));
        prop_assert!(segments.iter().all(|s| !s.is_empty()));
        prop_assert_eq!(segments.join(" "), text);
    }

    #[test]
    fn split_without_spaces_hard_cuts(max in 1usize..64, len in 0usize..400) {
        let text = "x".repeat(len);
        let segments = split_long_lines(&text, max);

        prop_assert_eq!(segments.len(), (len + max - 1) / max);
        prop_assert!(segments.iter().all(|s| s.len() <= max));
        prop_assert_eq!(segments.concat(), text);
    }

    #[test]
    fn split_respects_char_boundaries(max in 1usize..16, text in "\\PC{0,80}") {
        for segment in split_long_lines(&text, max) {
            // Every segment is valid UTF-8 by construction; a panic above
            // would mean a cut landed inside a code point.
            prop_assert!(!segment.is_empty());
        }
    }

    #[test]
    fn flood_queue_releases_one_per_tick(n in 1usize..50) {
        let mut queue = OutboundQueue::new(true);
        for i in 0..n {
            queue.enqueue(format!("PRIVMSG #a {}\r\n", i));
        }

        let mut released = Vec::new();
        let mut ticks = 0;
        while queue.tick() {
            ticks += 1;
            let ready = queue.drain_ready();
            prop_assert_eq!(ready.len(), 1);
            released.extend(ready);
        }

        // The k-th line goes out on tick k, i.e. (k - 1) intervals after the first.
        prop_assert_eq!(ticks, n);
        let expected: Vec<String> = (0..n).map(|i| format!("PRIVMSG #a {}\r\n", i)).collect();
        prop_assert_eq!(released, expected);
    }

    #[test]
    fn mode_add_then_remove_restores_channel(
        letter in prop::sample::select(vec!['k', 'i', 'm', 'n', 's', 't']),
        param in "[a-z]{1,8}",
    ) {
        let supported = Supported::default();
        let mut channel = Channel::new("#a");
        channel.mode = "n".to_string();
        let before = channel.clone();
        if channel.mode.contains(letter) {
            return Ok(());
        }

        let args = vec![param];
        for change in parse_mode_changes(&supported, &format!("+{}", letter), &args) {
            channel.apply_mode(&change);
        }
        prop_assert!(channel.mode.contains(letter));
        for change in parse_mode_changes(&supported, &format!("-{}", letter), &args) {
            channel.apply_mode(&change);
        }
        prop_assert_eq!(channel, before);
    }

    #[test]
    fn list_mode_round_trip(masks in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let supported = Supported::default();
        let mut channel = Channel::new("#a");
        let before = channel.clone();

        let plus = format!("+{}", "b".repeat(masks.len()));
        let minus = format!("-{}", "b".repeat(masks.len()));
        for change in parse_mode_changes(&supported, &plus, &masks) {
            channel.apply_mode(&change);
        }
        prop_assert_eq!(channel.mode_params[&'b'].len(), masks.len());
        for change in parse_mode_changes(&supported, &minus, &masks) {
            channel.apply_mode(&change);
        }
        prop_assert_eq!(channel, before);
    }
}
