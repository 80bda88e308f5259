//! Reflex Protocol - Proxy Layer
//!
//! The glue between a live session and the surrounding proxy host:
//!
//! - **Handshake drivers**: [`handshake::accept`] / [`handshake::initiate`]
//!   for the two peer roles, with bounded deadlines
//! - **Relay**: [`relay`] pumping frames between a session and an upstream
//!   link, with cooperative [`Shutdown`]
//! - **Fallback**: [`fallback::write_decoy`], the nginx-shaped 403 served
//!   to anything that fails the handshake
//! - **Handlers**: [`Inbound`] / [`Outbound`], one per configured role
//! - **Config**: the serde structs the host hands in
//!
//! The host keeps the listener, the routing, and the account binding; the
//! core keeps everything that touches the wire.

pub mod config;
pub mod fallback;
pub mod handshake;
mod inbound;
mod outbound;
mod relay;

pub use config::{ClientConfig, FallbackConfig, InboundConfig, OutboundConfig};
pub use handshake::InboundHandshake;
pub use inbound::Inbound;
pub use outbound::Outbound;
pub use relay::{relay, Shutdown};
