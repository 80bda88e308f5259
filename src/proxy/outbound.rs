//! Outbound connection handler (client role).

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::core::ProxyError;
use crate::morph::{registry, TrafficProfile};
use crate::transport::TargetAddr;

use super::config::OutboundConfig;
use super::handshake;
use super::relay::{relay, Shutdown};

/// Tunnels local links through a remote Reflex server.
pub struct Outbound {
    address: String,
    port: u16,
    profile: Option<Arc<TrafficProfile>>,
}

impl Outbound {
    /// Build a handler from host configuration.
    ///
    /// Fails if the named traffic profile is not registered.
    pub fn new(config: &OutboundConfig) -> Result<Self, ProxyError> {
        let profile = match &config.profile {
            Some(name) => Some(
                registry::lookup(name).ok_or_else(|| ProxyError::UnknownProfile(name.clone()))?,
            ),
            None => None,
        };
        Ok(Self {
            address: config.address.clone(),
            port: config.port,
            profile,
        })
    }

    /// Tunnel one local link to `target` through the Reflex server.
    ///
    /// Dials with exponential backoff, handshakes, sends the destination as
    /// the first Data frame, then relays until either side closes or
    /// `shutdown` fires. Unlike the inbound role there is no decoy: errors
    /// propagate to the caller.
    pub async fn handle<L>(
        &self,
        link: L,
        target: &TargetAddr,
        shutdown: Shutdown,
    ) -> Result<(), ProxyError>
    where
        L: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream =
            handshake::dial_with_backoff((self.address.as_str(), self.port)).await?;
        let session = handshake::initiate(&mut stream, target, self.profile.clone()).await?;
        debug!(server = %self.address, port = self.port, %target, "tunnel established");

        relay(session, stream, link, shutdown).await
    }
}
