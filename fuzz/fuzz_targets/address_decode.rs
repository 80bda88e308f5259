//! Fuzz target for address record decoding
//!
//! # Strategy
//!
//! - Arbitrary bytes through `TargetAddr::decode`
//!
//! # Invariants
//!
//! - Decoding never panics
//! - Anything that decodes re-encodes to the identical record

#![no_main]

use libfuzzer_sys::fuzz_target;
use reflex_protocol::transport::TargetAddr;

fuzz_target!(|data: &[u8]| {
    if let Ok(addr) = TargetAddr::decode(data) {
        let encoded = addr.encode().expect("decoded record must re-encode");
        assert_eq!(encoded, data);
    }
});
