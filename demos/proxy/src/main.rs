//! Runnable Reflex inbound server.
//!
//! Listens for Reflex handshakes, relays each session to its requested
//! destination, and serves the nginx decoy to anything else:
//!
//! ```text
//! cargo run --bin reflex-server -- 127.0.0.1:8080 youtube
//! ```
//!
//! Probe it with `curl http://127.0.0.1:8080/` to see the 403 decoy, or
//! point `reflex-forward` at it for a real tunnel.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use reflex_protocol::proxy::{Inbound, InboundConfig, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reflex_protocol=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let bind_addr = args.next().unwrap_or_else(|| "127.0.0.1:8080".into());
    let profile = args.next();

    let config = InboundConfig {
        clients: Vec::new(),
        fallback: None,
        profile,
    };
    let inbound = Arc::new(Inbound::new(&config)?);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "reflex inbound listening");

    let (shutdown_tx, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shutdown_tx.send_replace(true);
        }
    });

    loop {
        let mut accept_shutdown = shutdown.clone();
        tokio::select! {
            () = accept_shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        error!(error = %err, "accept failed");
                        continue;
                    }
                };
                let inbound = Arc::clone(&inbound);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if let Err(err) = inbound.handle(socket, shutdown).await {
                        warn!(%peer, error = %err, "connection ended with error");
                    }
                });
            }
        }
    }

    Ok(())
}
