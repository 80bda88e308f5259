//! Host-facing configuration surface.
//!
//! The surrounding proxy host parses its own config format and hands these
//! structs to [`Inbound`](crate::proxy::Inbound) /
//! [`Outbound`](crate::proxy::Outbound). Client identifiers are opaque to
//! the core: no identity crosses the wire, binding users to connections is
//! the host's concern.

use serde::Deserialize;

/// One authorized client entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Opaque client identifier.
    pub id: String,
}

/// Fallback destination for traffic that fails the handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    /// Local TCP port of the decoy site.
    pub dest: u32,
}

/// Inbound (server role) configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundConfig {
    /// Authorized clients.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
    /// Optional fallback destination.
    #[serde(default)]
    pub fallback: Option<FallbackConfig>,
    /// Optional named traffic profile (registry name, e.g. "youtube").
    #[serde(default)]
    pub profile: Option<String>,
}

/// Outbound (client role) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OutboundConfig {
    /// Reflex server host.
    pub address: String,
    /// Reflex server port.
    pub port: u16,
    /// Optional named traffic profile (must match the server's).
    #[serde(default)]
    pub profile: Option<String>,
}
