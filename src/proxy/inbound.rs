//! Inbound connection handler (server role).

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::core::ProxyError;
use crate::morph::{registry, TrafficProfile};
use crate::transport::TargetAddr;

use super::config::{FallbackConfig, InboundConfig};
use super::fallback;
use super::handshake;
use super::relay::{relay, Shutdown};

/// Handles accepted connections: handshake, upstream dial, relay.
///
/// One handler serves many connections; per-connection state lives in the
/// session. The host owns the listener and calls
/// [`handle`](Inbound::handle) once per accepted stream.
pub struct Inbound {
    clients: Vec<String>,
    fallback: Option<FallbackConfig>,
    profile: Option<Arc<TrafficProfile>>,
}

impl Inbound {
    /// Build a handler from host configuration.
    ///
    /// Fails if the named traffic profile is not registered.
    pub fn new(config: &InboundConfig) -> Result<Self, ProxyError> {
        let profile = match &config.profile {
            Some(name) => Some(
                registry::lookup(name).ok_or_else(|| ProxyError::UnknownProfile(name.clone()))?,
            ),
            None => None,
        };
        Ok(Self {
            clients: config.clients.iter().map(|c| c.id.clone()).collect(),
            fallback: config.fallback.clone(),
            profile,
        })
    }

    /// Authorized client identifiers, for the host's account binding.
    pub fn clients(&self) -> &[String] {
        &self.clients
    }

    /// Fallback destination, for the host's non-Reflex traffic handling.
    pub fn fallback(&self) -> Option<&FallbackConfig> {
        self.fallback.as_ref()
    }

    /// Serve one accepted connection end-to-end.
    ///
    /// Runs the inbound handshake; on success dials the requested
    /// destination and relays until either side closes or `shutdown` fires.
    /// Any pre-session failure answers with the decoy 403 before the
    /// connection is dropped, so probes see an ordinary web server.
    pub async fn handle<S>(&self, mut stream: S, shutdown: Shutdown) -> Result<(), ProxyError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let handshake = match handshake::accept(&mut stream, self.profile.clone()).await {
            Ok(handshake) => handshake,
            Err(err) => {
                warn!(error = %err, "inbound handshake failed, serving decoy");
                let _ = fallback::write_decoy(&mut stream).await;
                return Err(err);
            }
        };

        let upstream = match &handshake.target {
            TargetAddr::Ip(addr) => TcpStream::connect(*addr).await?,
            TargetAddr::Domain(host, port) => TcpStream::connect((host.as_str(), *port)).await?,
        };
        debug!(target = %handshake.target, "upstream dialed, relaying");

        relay(handshake.session, stream, upstream, shutdown).await
    }
}
