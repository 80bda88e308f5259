//! Protocol constants for Reflex.
//!
//! These values are fixed by the wire protocol and MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// HANDSHAKE
// =============================================================================

/// Magic prefix identifying a Reflex connection ("RFXL", big-endian u32).
pub const MAGIC: u32 = 0x5246_584C;

/// Length of the magic prefix on the wire.
pub const MAGIC_SIZE: usize = 4;

/// X25519 public key size.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 private key size.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// HKDF salt size for session key derivation.
pub const SALT_SIZE: usize = 16;

/// Session key size (ChaCha20-Poly1305).
pub const SESSION_KEY_SIZE: usize = 32;

/// HKDF info string giving domain separation from any other use of the
/// shared secret.
pub const HKDF_INFO: &[u8] = b"reflex-session";

/// Deadline for each inbound handshake read phase (peer public key, first
/// address frame). Expiry diverts to the decoy response.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// FRAMING
// =============================================================================

/// Poly1305 authentication tag size.
pub const AEAD_TAG_SIZE: usize = 16;

/// ChaCha20-Poly1305 nonce size.
pub const AEAD_NONCE_SIZE: usize = 12;

/// Frame header size (length u16 + type u8).
pub const FRAME_HEADER_SIZE: usize = 3;

/// Morph header size (big-endian payload length prefix).
pub const MORPH_HEADER_SIZE: usize = 2;

/// Maximum ciphertext length carried by one frame (u16 length field).
pub const MAX_FRAME_CIPHERTEXT: usize = u16::MAX as usize;

/// Maximum plaintext length carried by one frame.
pub const MAX_FRAME_PLAINTEXT: usize = MAX_FRAME_CIPHERTEXT - AEAD_TAG_SIZE;

/// Maximum Data payload when morphing (morph header must also fit).
pub const MAX_DATA_PAYLOAD: usize = MAX_FRAME_PLAINTEXT - MORPH_HEADER_SIZE;

/// Minimum length of an address record (family + port, zero-length addr).
pub const MIN_ADDRESS_RECORD: usize = 4;

// =============================================================================
// ADDRESS FAMILIES
// =============================================================================

/// IPv4 address family (4 address bytes).
pub const ADDR_FAMILY_IPV4: u8 = 0x01;

/// Domain address family (u8 length prefix).
pub const ADDR_FAMILY_DOMAIN: u8 = 0x03;

/// IPv6 address family (16 address bytes).
pub const ADDR_FAMILY_IPV6: u8 = 0x04;

// =============================================================================
// RELAY
// =============================================================================

/// Upstream read buffer size; each filled buffer becomes one Data frame.
pub const RELAY_BUFFER_SIZE: usize = 8192;

/// Number of TCP connect attempts made by the outbound dialer.
pub const DIAL_ATTEMPTS: u32 = 5;

/// Base delay for the outbound dialer's exponential backoff.
pub const DIAL_BASE_DELAY: Duration = Duration::from_millis(100);
