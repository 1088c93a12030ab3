//! Fuzz target for the pkt-line reader.

#![no_main]

use gittorrent_git::pktline::PacketReader;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut reader = PacketReader::new(Cursor::new(data));

    // Bounded so crafted input cannot loop forever.
    for _ in 0..100 {
        match reader.read_packet() {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
});
