#![no_main]

use libfuzzer_sys::fuzz_target;
use taskline_session::PersistedSession;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        // Arbitrary stored text must never panic the restore path
        if let Some(record) = PersistedSession::parse(raw) {
            // A parsed record must survive being written back
            if let Ok(rewritten) = serde_json::to_string(&record) {
                assert_eq!(PersistedSession::parse(&rewritten), Some(record));
            }
        }
    }
});
