//! Reflex Protocol - Framed Session Layer
//!
//! This module turns a raw byte stream into an authenticated, replay-proof,
//! traffic-morphed frame channel:
//!
//! - **Frame codec**: [`Frame`], [`FrameType`] and the
//!   `length ∥ type ∥ ciphertext` wire form
//! - **Session**: [`Session`] with per-direction counter nonces,
//!   morph/demorph, and control-frame handling
//! - **Split halves**: [`SessionReader`] / [`SessionWriter`] so the two
//!   relay flows each own one direction without locking
//! - **Address records**: [`TargetAddr`], the payload of the first Data
//!   frame after a handshake
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Proxy Layer                  │
//! │   handshake drivers, relay, fallback    │
//! ├─────────────────────────────────────────┤
//! │         Session Layer                   │  ← This module
//! │   framing, AEAD, morphing, addresses    │
//! ├─────────────────────────────────────────┤
//! │         Key Agreement                   │
//! ├─────────────────────────────────────────┤
//! │              TCP                        │
//! └─────────────────────────────────────────┘
//! ```

mod address;
mod frame;
mod session;

pub use address::TargetAddr;
pub use frame::{Frame, FrameType};
pub use session::{Session, SessionReader, SessionWriter};
