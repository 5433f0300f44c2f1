#![no_main]

use analyst_git::{SectionSource, escape_line, parse_sources, unescape_line};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        for source in parse_sources(text) {
            // Every recovered delimiter must parse back to itself
            let line = source.delimiter();
            assert_eq!(SectionSource::parse_delimiter(&line), Some(source));
        }
        for line in text.lines() {
            let escaped = escape_line(line);
            assert!(SectionSource::parse_delimiter(&escaped).is_none());
            assert_eq!(unescape_line(&escaped), line);
        }
    }
});
