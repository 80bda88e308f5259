//! Local port forwarder through a Reflex server.
//!
//! Accepts plain TCP connections on a local port and tunnels each one to a
//! fixed destination through the Reflex server:
//!
//! ```text
//! cargo run --bin reflex-forward -- 127.0.0.1:1080 127.0.0.1:8080 example.com:80 youtube
//! ```
//!
//! Arguments: local listen address, Reflex server address, destination
//! (host:port), optional profile name.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use reflex_protocol::proxy::{Outbound, OutboundConfig, Shutdown};
use reflex_protocol::transport::TargetAddr;

fn parse_target(value: &str) -> Option<TargetAddr> {
    if let Ok(addr) = value.parse() {
        return Some(TargetAddr::Ip(addr));
    }
    let (host, port) = value.rsplit_once(':')?;
    Some(TargetAddr::Domain(host.to_owned(), port.parse().ok()?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reflex_protocol=debug".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [listen_addr, server_arg, target_arg, rest @ ..] = args.as_slice() else {
        eprintln!("usage: reflex-forward <listen> <server> <target> [profile]");
        std::process::exit(2);
    };

    let (server_host, server_port) = server_arg
        .rsplit_once(':')
        .ok_or("server must be host:port")?;
    let target = parse_target(target_arg).ok_or("target must be host:port")?;

    let outbound = Arc::new(Outbound::new(&OutboundConfig {
        address: server_host.to_owned(),
        port: server_port.parse()?,
        profile: rest.first().cloned(),
    })?);

    let listener = TcpListener::bind(listen_addr).await?;
    info!(addr = %listener.local_addr()?, %target, "forwarding through reflex");

    loop {
        let (socket, peer) = listener.accept().await?;
        let outbound = Arc::clone(&outbound);
        let target = target.clone();
        tokio::spawn(async move {
            if let Err(err) = outbound.handle(socket, &target, Shutdown::none()).await {
                warn!(%peer, error = %err, "tunnel ended with error");
            }
        });
    }
}
