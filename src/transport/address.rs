//! Destination address records.
//!
//! The first Data frame after a handshake carries the tunnel destination:
//!
//! ```text
//! +--------+------------------+----------------+
//! | Family | Address          | Port           |
//! | 1 byte | family-dependent | 2 bytes (BE16) |
//! +--------+------------------+----------------+
//! ```
//!
//! Families: `0x01` IPv4 (4 address bytes), `0x04` IPv6 (16 bytes), `0x03`
//! domain name with a one-byte length prefix.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::core::{
    ADDR_FAMILY_DOMAIN, ADDR_FAMILY_IPV4, ADDR_FAMILY_IPV6, MIN_ADDRESS_RECORD, SessionError,
};

/// The destination a tunnel relays to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// Literal IP address and port.
    Ip(SocketAddr),
    /// Hostname (resolved by the dialer) and port.
    Domain(String, u16),
}

impl TargetAddr {
    /// Encode the address record for the first Data frame.
    ///
    /// Fails only for a domain name longer than 255 bytes.
    pub fn encode(&self) -> Result<Vec<u8>, SessionError> {
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                let mut buf = Vec::with_capacity(1 + 4 + 2);
                buf.push(ADDR_FAMILY_IPV4);
                buf.extend_from_slice(&addr.ip().octets());
                buf.extend_from_slice(&addr.port().to_be_bytes());
                Ok(buf)
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                let mut buf = Vec::with_capacity(1 + 16 + 2);
                buf.push(ADDR_FAMILY_IPV6);
                buf.extend_from_slice(&addr.ip().octets());
                buf.extend_from_slice(&addr.port().to_be_bytes());
                Ok(buf)
            }
            TargetAddr::Domain(host, port) => {
                let len = u8::try_from(host.len()).map_err(|_| {
                    SessionError::Config(format!("domain name of {} bytes too long", host.len()))
                })?;
                let mut buf = Vec::with_capacity(2 + host.len() + 2);
                buf.push(ADDR_FAMILY_DOMAIN);
                buf.push(len);
                buf.extend_from_slice(host.as_bytes());
                buf.extend_from_slice(&port.to_be_bytes());
                Ok(buf)
            }
        }
    }

    /// Decode an address record from the first Data frame's payload.
    pub fn decode(payload: &[u8]) -> Result<Self, SessionError> {
        if payload.len() < MIN_ADDRESS_RECORD {
            return Err(SessionError::Protocol(format!(
                "address record of {} bytes too short",
                payload.len()
            )));
        }

        match payload[0] {
            ADDR_FAMILY_IPV4 => {
                let rest = &payload[1..];
                if rest.len() != 4 + 2 {
                    return Err(SessionError::Protocol(
                        "ipv4 address record length mismatch".into(),
                    ));
                }
                let octets: [u8; 4] = rest[..4]
                    .try_into()
                    .map_err(|_| SessionError::Protocol("ipv4 address truncated".into()))?;
                let port = u16::from_be_bytes([rest[4], rest[5]]);
                Ok(TargetAddr::Ip(SocketAddr::new(
                    IpAddr::V4(Ipv4Addr::from(octets)),
                    port,
                )))
            }
            ADDR_FAMILY_IPV6 => {
                let rest = &payload[1..];
                if rest.len() != 16 + 2 {
                    return Err(SessionError::Protocol(
                        "ipv6 address record length mismatch".into(),
                    ));
                }
                let octets: [u8; 16] = rest[..16]
                    .try_into()
                    .map_err(|_| SessionError::Protocol("ipv6 address truncated".into()))?;
                let port = u16::from_be_bytes([rest[16], rest[17]]);
                Ok(TargetAddr::Ip(SocketAddr::new(
                    IpAddr::V6(Ipv6Addr::from(octets)),
                    port,
                )))
            }
            ADDR_FAMILY_DOMAIN => {
                if payload.len() < 2 {
                    return Err(SessionError::Protocol("domain record truncated".into()));
                }
                let len = payload[1] as usize;
                let rest = &payload[2..];
                if rest.len() != len + 2 {
                    return Err(SessionError::Protocol(
                        "domain record length mismatch".into(),
                    ));
                }
                let host = std::str::from_utf8(&rest[..len])
                    .map_err(|_| SessionError::Protocol("domain name is not utf-8".into()))?;
                let port = u16::from_be_bytes([rest[len], rest[len + 1]]);
                Ok(TargetAddr::Domain(host.to_owned(), port))
            }
            family => Err(SessionError::Protocol(format!(
                "unknown address family 0x{family:02x}"
            ))),
        }
    }

    /// The destination port.
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => addr.fmt(f),
            TargetAddr::Domain(host, port) => write!(f, "{host}:{port}"),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}
