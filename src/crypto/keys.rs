//! X25519 key agreement and session key derivation.
//!
//! A Reflex handshake exchanges raw X25519 public keys in the clear; the
//! session key is derived from the shared secret with HKDF-SHA256 under the
//! fixed info string [`HKDF_INFO`](crate::core::HKDF_INFO).

use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::core::{
    CryptoError, HKDF_INFO, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SALT_SIZE, SESSION_KEY_SIZE,
};

/// An ephemeral X25519 keypair for one handshake.
///
/// The private key is zeroized on drop.
#[derive(Clone)]
pub struct Keypair {
    /// Private key (32 bytes) - zeroized on drop
    private: [u8; PRIVATE_KEY_SIZE],
    /// Public key (32 bytes)
    public: [u8; PUBLIC_KEY_SIZE],
}

impl Keypair {
    /// Generate a new random keypair from the system CSPRNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            private: secret.to_bytes(),
            public: public.to_bytes(),
        }
    }

    /// Create a keypair from existing key material.
    pub fn from_bytes(private: [u8; PRIVATE_KEY_SIZE], public: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self { private, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.public
    }

    /// Compute the X25519 shared secret with a peer's public key.
    ///
    /// Rejects a non-contributory (all-zero) result, which a malicious peer
    /// can force by sending a small-subgroup point.
    pub fn diffie_hellman(
        &self,
        peer_public: &[u8; PUBLIC_KEY_SIZE],
    ) -> Result<SharedSecret, CryptoError> {
        let secret = StaticSecret::from(self.private);
        let public = PublicKey::from(*peer_public);
        let shared = secret.diffie_hellman(&public);
        if !shared.was_contributory() {
            return Err(CryptoError::DegenerateSharedSecret);
        }
        Ok(SharedSecret(*shared.as_bytes()))
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

/// A raw X25519 shared secret.
///
/// Zeroized on drop; only useful as input to [`derive_session_key`].
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Get the raw secret bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// A derived session key for AEAD framing.
///
/// Zeroized on drop.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; SESSION_KEY_SIZE],
}

impl SessionKey {
    /// Create a session key from raw bytes.
    pub fn from_bytes(key: [u8; SESSION_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the 32-byte session key from a DH shared secret.
///
/// HKDF-SHA256 with the caller-supplied salt and the fixed info string
/// `"reflex-session"`. Both peers must pass the same salt; until a
/// negotiated handshake salt exists this is 16 zero bytes.
pub fn derive_session_key(
    shared: &SharedSecret,
    salt: &[u8; SALT_SIZE],
) -> Result<SessionKey, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt.as_slice()), shared.as_bytes());
    let mut okm = [0u8; SESSION_KEY_SIZE];
    hk.expand(HKDF_INFO, &mut okm)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(SessionKey::from_bytes(okm))
}
