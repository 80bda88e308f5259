//! Fuzz target for the session frame decoder
//!
//! # Strategy
//!
//! - Arbitrary bytes fed to `read_frame` as a frame stream
//! - Keeps reading while frames decode, so multi-frame prefixes get coverage
//!
//! # Invariants
//!
//! - `read_frame` returns a frame or an error; it NEVER panics
//! - Allocation per frame is bounded by the 64 KiB wire ceiling

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflex_protocol::transport::Session;

fuzz_target!(|data: &[u8]| {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    rt.block_on(async {
        let Ok(mut session) = Session::new(&[0u8; 32]) else {
            return;
        };
        let mut input = data;
        // Garbage fails AEAD on the first frame almost always; the loop
        // covers the rare prefix that happens to parse.
        while session.read_frame(&mut input).await.is_ok() {}
    });
});
