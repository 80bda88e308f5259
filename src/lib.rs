//! # Reflex Protocol
//!
//! Reflex is a secure, traffic-obfuscating tunnel protocol deployed as a
//! proxy inbound/outbound pair. It relays arbitrary TCP byte streams through
//! an encrypted framed channel whose on-the-wire packet-size and
//! inter-packet-timing distributions mimic a cover application (a video
//! service, a conference call), so passive traffic analysis cannot trivially
//! fingerprint the tunnel. It provides:
//!
//! - **Security**: X25519 key agreement, ChaCha20-Poly1305 framing,
//!   counter-nonce replay protection
//! - **Cover**: statistical traffic morphing with peer-steerable one-shot
//!   overrides
//! - **Deniability**: failed handshakes answered with an nginx-shaped 403
//! - **Simplicity**: fixed cryptographic suite, no negotiation
//!
//! ## Feature Flags
//!
//! - `crypto` (default): key agreement and AEAD primitives
//! - `morph` (default): traffic profiles (weighted size/delay sampling)
//! - `transport` (default): framed sessions over async streams
//! - `proxy` (default): handshake drivers, relay, fallback decoy, config
//!
//! ## Modules
//!
//! - [`core`]: constants and error types (always included)
//! - [`crypto`]: key agreement (requires `crypto` feature)
//! - [`morph`]: traffic profiles (requires `morph` feature)
//! - [`transport`]: framed session layer (requires `transport` feature)
//! - [`proxy`]: handshake, relay, fallback (requires `proxy` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use reflex_protocol::transport::{FrameType, Session};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! // Both peers derive the same 32-byte key during the handshake.
//! let key = [0x42u8; 32];
//! let mut sender = Session::new(&key).unwrap();
//! let mut receiver = Session::new(&key).unwrap();
//!
//! let mut wire = Vec::new();
//! sender
//!     .write_frame(&mut wire, FrameType::Data, b"hello tunnel")
//!     .await
//!     .unwrap();
//!
//! let frame = receiver.read_frame(&mut wire.as_slice()).await.unwrap();
//! assert_eq!(frame.frame_type, FrameType::Data);
//! assert_eq!(frame.payload, b"hello tunnel");
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Key agreement (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Traffic morphing profiles (feature-gated)
#[cfg(feature = "morph")]
#[cfg_attr(docsrs, doc(cfg(feature = "morph")))]
pub mod morph;

// Framed session layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Proxy roles (feature-gated)
#[cfg(feature = "proxy")]
#[cfg_attr(docsrs, doc(cfg(feature = "proxy")))]
pub mod proxy;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core constants and errors
    pub use crate::core::*;

    // Key agreement (when enabled)
    #[cfg(feature = "crypto")]
    pub use crate::crypto::{derive_session_key, Keypair, SessionKey, SharedSecret};

    // Traffic profiles (when enabled)
    #[cfg(feature = "morph")]
    pub use crate::morph::{registry, DelayBucket, SizeBucket, TrafficProfile};

    // Session layer (when enabled)
    #[cfg(feature = "transport")]
    pub use crate::transport::{
        Frame, FrameType, Session, SessionReader, SessionWriter, TargetAddr,
    };

    // Proxy roles (when enabled)
    #[cfg(feature = "proxy")]
    pub use crate::proxy::{
        relay, Inbound, InboundConfig, Outbound, OutboundConfig, Shutdown,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{ProxyError, ReflexError, SessionError};

#[cfg(feature = "transport")]
pub use crate::transport::{Frame, FrameType, Session, TargetAddr};
