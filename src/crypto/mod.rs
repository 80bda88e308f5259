//! Reflex Protocol - Key Agreement
//!
//! X25519 keypair generation, contributory Diffie-Hellman, and HKDF-SHA256
//! session key derivation. The handshake drivers in [`crate::proxy`] use
//! this module to turn a 32-byte public key exchange into the session key
//! that drives the AEAD framing in [`crate::transport`].

mod keys;

pub use keys::{derive_session_key, Keypair, SessionKey, SharedSecret};
