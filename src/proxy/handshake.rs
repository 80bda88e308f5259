//! Handshake drivers for both peer roles.
//!
//! The handshake is deliberately thin: a 4-byte magic, one X25519 public
//! key in each direction, then the first Data frame carries the tunnel
//! destination. Everything after the magic check rides on a bounded
//! deadline so slow-lorry probes fall into the decoy path instead of
//! pinning a connection slot.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::debug;

use crate::core::{
    DIAL_ATTEMPTS, DIAL_BASE_DELAY, HANDSHAKE_TIMEOUT, MAGIC, MAGIC_SIZE, ProxyError,
    PUBLIC_KEY_SIZE, SALT_SIZE, SessionError,
};
use crate::crypto::{derive_session_key, Keypair};
use crate::morph::TrafficProfile;
use crate::transport::{FrameType, Session, TargetAddr};

/// Outcome of a successful inbound handshake.
pub struct InboundHandshake {
    /// The live session, profile attached.
    pub session: Session,
    /// Destination parsed from the first Data frame.
    pub target: TargetAddr,
}

/// Bound a handshake read phase by [`HANDSHAKE_TIMEOUT`].
async fn read_phase<T, E, F>(fut: F) -> Result<T, ProxyError>
where
    F: Future<Output = Result<T, E>>,
    ProxyError: From<E>,
{
    match timeout(HANDSHAKE_TIMEOUT, fut).await {
        Ok(result) => result.map_err(ProxyError::from),
        Err(_) => Err(ProxyError::HandshakeTimeout),
    }
}

/// Run the inbound (server role) side of the handshake.
///
/// Reads the magic and the client's public key, answers with a fresh server
/// key, derives the session, and requires the first frame to be a Data frame
/// holding a valid address record. Any failure - wrong magic, timeout, bad
/// first frame - is the caller's cue to emit the decoy response.
pub async fn accept<S>(
    stream: &mut S,
    profile: Option<Arc<TrafficProfile>>,
) -> Result<InboundHandshake, ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut magic = [0u8; MAGIC_SIZE];
    read_phase(stream.read_exact(&mut magic)).await?;
    if u32::from_be_bytes(magic) != MAGIC {
        return Err(ProxyError::BadMagic);
    }

    let mut client_public = [0u8; PUBLIC_KEY_SIZE];
    read_phase(stream.read_exact(&mut client_public)).await?;

    let keypair = Keypair::generate();
    stream.write_all(keypair.public_key()).await?;
    stream.flush().await?;

    let shared = keypair.diffie_hellman(&client_public)?;
    let key = derive_session_key(&shared, &[0u8; SALT_SIZE])?;
    let mut session = Session::new(key.as_bytes())?;
    if let Some(profile) = profile {
        session.attach_profile(profile);
    }

    // The first frame must carry the destination.
    let frame = read_phase(session.read_frame(stream)).await?;
    if frame.frame_type != FrameType::Data {
        return Err(ProxyError::Session(SessionError::Protocol(format!(
            "first frame must be Data, got {:?}",
            frame.frame_type
        ))));
    }
    let target = TargetAddr::decode(&frame.payload)?;

    debug!(%target, "inbound handshake complete");
    Ok(InboundHandshake { session, target })
}

/// Run the outbound (client role) side of the handshake on a connected
/// stream, sending `target` as the first Data frame.
pub async fn initiate<S>(
    stream: &mut S,
    target: &TargetAddr,
    profile: Option<Arc<TrafficProfile>>,
) -> Result<Session, ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let keypair = Keypair::generate();
    let mut hello = [0u8; MAGIC_SIZE + PUBLIC_KEY_SIZE];
    hello[..MAGIC_SIZE].copy_from_slice(&MAGIC.to_be_bytes());
    hello[MAGIC_SIZE..].copy_from_slice(keypair.public_key());
    stream.write_all(&hello).await?;
    stream.flush().await?;

    let mut server_public = [0u8; PUBLIC_KEY_SIZE];
    read_phase(stream.read_exact(&mut server_public)).await?;

    let shared = keypair.diffie_hellman(&server_public)?;
    let key = derive_session_key(&shared, &[0u8; SALT_SIZE])?;
    let mut session = Session::new(key.as_bytes())?;
    if let Some(profile) = profile {
        session.attach_profile(profile);
    }

    let record = target.encode()?;
    session
        .write_frame(stream, FrameType::Data, &record)
        .await?;

    debug!(%target, "outbound handshake complete");
    Ok(session)
}

/// Dial the Reflex server with exponential backoff: five attempts starting
/// at a 100 ms delay, doubling between attempts.
pub async fn dial_with_backoff<A>(addr: A) -> Result<TcpStream, ProxyError>
where
    A: ToSocketAddrs + Clone,
{
    let mut delay = DIAL_BASE_DELAY;
    let mut last_err: Option<io::Error> = None;

    for attempt in 0..DIAL_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
        match TcpStream::connect(addr.clone()).await {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                debug!(attempt, error = %err, "dial attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(ProxyError::DialFailed {
        attempts: DIAL_ATTEMPTS,
        last: last_err.unwrap_or_else(|| io::Error::other("no dial attempts made")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Frame;

    /// Drive both roles over an in-memory duplex pipe.
    #[tokio::test]
    async fn test_handshake_both_roles() {
        let (mut client_side, mut server_side) = tokio::io::duplex(4096);
        let target = TargetAddr::Ip("10.1.2.3:443".parse().unwrap());

        let client_target = target.clone();
        let client = tokio::spawn(async move {
            initiate(&mut client_side, &client_target, None)
                .await
                .map(|session| (session, client_side))
        });

        let handshake = accept(&mut server_side, None).await.unwrap();
        assert_eq!(handshake.target, target);

        let (mut client_session, mut client_side) = client.await.unwrap().unwrap();

        // The derived keys agree: frames flow both ways.
        let mut server_session = handshake.session;
        client_session
            .write_frame(&mut client_side, FrameType::Data, b"ping")
            .await
            .unwrap();
        let frame = server_session.read_frame(&mut server_side).await.unwrap();
        assert_eq!(frame, Frame::new(FrameType::Data, b"ping".to_vec()));

        server_session
            .write_frame(&mut server_side, FrameType::Data, b"pong")
            .await
            .unwrap();
        let frame = client_session.read_frame(&mut client_side).await.unwrap();
        assert_eq!(frame.payload, b"pong");
    }

    #[tokio::test]
    async fn test_accept_rejects_bad_magic() {
        let (mut client_side, mut server_side) = tokio::io::duplex(4096);

        tokio::spawn(async move {
            // An HTTP probe, not a Reflex hello.
            let _ = client_side.write_all(b"GET / HTTP/1.1\r\n\r\n").await;
        });

        let result = accept(&mut server_side, None).await;
        assert!(matches!(result, Err(ProxyError::BadMagic)));
    }

    #[tokio::test]
    async fn test_accept_rejects_wrong_first_frame() {
        let (mut client_side, mut server_side) = tokio::io::duplex(4096);

        let client = tokio::spawn(async move {
            let keypair = Keypair::generate();
            client_side.write_all(&MAGIC.to_be_bytes()).await.unwrap();
            client_side.write_all(keypair.public_key()).await.unwrap();

            let mut server_public = [0u8; PUBLIC_KEY_SIZE];
            client_side.read_exact(&mut server_public).await.unwrap();

            let shared = keypair.diffie_hellman(&server_public).unwrap();
            let key = derive_session_key(&shared, &[0u8; SALT_SIZE]).unwrap();
            let mut session = Session::new(key.as_bytes()).unwrap();

            // Padding instead of the address-bearing Data frame.
            session
                .write_frame(&mut client_side, FrameType::Padding, &[0u8; 4])
                .await
                .unwrap();
        });

        let result = accept(&mut server_side, None).await;
        assert!(matches!(
            result,
            Err(ProxyError::Session(SessionError::Protocol(_)))
        ));
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_rejects_garbage_address_record() {
        let (mut client_side, mut server_side) = tokio::io::duplex(4096);

        let client = tokio::spawn(async move {
            let keypair = Keypair::generate();
            client_side.write_all(&MAGIC.to_be_bytes()).await.unwrap();
            client_side.write_all(keypair.public_key()).await.unwrap();

            let mut server_public = [0u8; PUBLIC_KEY_SIZE];
            client_side.read_exact(&mut server_public).await.unwrap();

            let shared = keypair.diffie_hellman(&server_public).unwrap();
            let key = derive_session_key(&shared, &[0u8; SALT_SIZE]).unwrap();
            let mut session = Session::new(key.as_bytes()).unwrap();

            session
                .write_frame(&mut client_side, FrameType::Data, &[0xEE, 0xEE])
                .await
                .unwrap();
        });

        let result = accept(&mut server_side, None).await;
        assert!(matches!(
            result,
            Err(ProxyError::Session(SessionError::Protocol(_)))
        ));
        client.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_times_out_on_silent_peer() {
        let (client_side, mut server_side) = tokio::io::duplex(4096);

        let accept_task = tokio::spawn(async move {
            accept(&mut server_side, None).await
        });

        // The peer connects but never sends a byte; virtual time runs past
        // the deadline.
        let result = accept_task.await.unwrap();
        assert!(matches!(result, Err(ProxyError::HandshakeTimeout)));
        drop(client_side);
    }

    #[tokio::test]
    async fn test_dial_backoff_reports_last_error() {
        // Port 1 on localhost refuses connections.
        let started = std::time::Instant::now();
        let result = dial_with_backoff("127.0.0.1:1").await;
        match result {
            Err(ProxyError::DialFailed { attempts, .. }) => {
                assert_eq!(attempts, DIAL_ATTEMPTS)
            }
            other => panic!("expected DialFailed, got {other:?}"),
        }
        // Four backoff sleeps: 100 + 200 + 400 + 800 ms.
        assert!(started.elapsed() >= std::time::Duration::from_millis(1500));
    }
}
