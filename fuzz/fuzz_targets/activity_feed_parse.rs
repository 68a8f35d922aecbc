#![no_main]

use herald_core::is_issue_key;
use herald_jira::parse_activity_feed;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(entries) = parse_activity_feed(&raw) {
        for entry in entries {
            assert!(!entry.id.is_empty());
            if let Some(key) = entry.issue_key() {
                assert!(is_issue_key(key));
            }
        }
    }
});
