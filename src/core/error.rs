//! Error types for the Reflex protocol.

use thiserror::Error;

/// Errors in the key agreement layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// DH produced the all-zero shared secret (non-contributory peer key).
    #[error("degenerate shared secret (non-contributory peer key)")]
    DegenerateSharedSecret,

    /// HKDF expansion failed.
    #[error("session key derivation failed")]
    KeyDerivationFailed,
}

/// Errors in the framed session layer.
///
/// A session that reports `Io`, `DecryptFail` or `Protocol` is poisoned:
/// every later operation fails with [`Closed`](SessionError::Closed).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport read/write failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// AEAD authentication failed (invalid tag, corrupted or replayed stream).
    #[error("frame decryption failed")]
    DecryptFail,

    /// Malformed frame, morph header, or address record.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A frame counter reached its final value; the session must terminate.
    #[error("nonce counter exhausted - session must terminate")]
    NonceExhausted,

    /// Payload does not fit in a single frame.
    #[error("payload of {size} bytes exceeds the frame limit")]
    FrameTooLarge {
        /// Offending payload length.
        size: usize,
    },

    /// Invalid session construction parameters.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation on a closed or poisoned session.
    #[error("session is closed")]
    Closed,
}

/// Errors in the proxy layer (handshake drivers, relay, dialer).
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Session-layer failure.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Key agreement failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Transport I/O failure outside the framed session.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection did not start with the Reflex magic.
    #[error("connection is not a reflex handshake")]
    BadMagic,

    /// A handshake phase exceeded its deadline.
    #[error("handshake phase timed out")]
    HandshakeTimeout,

    /// All dial attempts to the upstream server failed.
    #[error("dial failed after {attempts} attempts: {last}")]
    DialFailed {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        last: std::io::Error,
    },

    /// Named profile not present in the registry.
    #[error("unknown traffic profile: {0}")]
    UnknownProfile(String),

    /// External cancellation observed before the session was live.
    #[error("cancelled")]
    Cancelled,
}

/// Top-level Reflex errors.
#[derive(Debug, Error)]
pub enum ReflexError {
    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Proxy error.
    #[error("proxy error: {0}")]
    Proxy(#[from] ProxyError),
}
