//! Fuzz target for extension message decoding.
//!
//! Anything that decodes must encode back to the same bytes.

#![no_main]

use gittorrent_protocol::ExtensionMessage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = ExtensionMessage::decode(data) {
        assert_eq!(message.encode().as_ref(), data);
    }
});
