//! Fuzz target for the repository directory codec.

#![no_main]

use gittorrent_dht::codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(directory) = codec::decode(data) {
        // Whatever decodes must survive a re-encode.
        let encoded = codec::encode(&directory).expect("decoded directory re-encodes");
        assert_eq!(codec::decode(&encoded).ok(), Some(directory));
    }
});
