//! Bidirectional relay between a session and an upstream link.
//!
//! Two flows share one split session: the request flow turns upstream reads
//! into Data frames, the response flow dispatches incoming frames back to
//! the upstream link. Each flow exclusively owns one session direction, so
//! no lock guards the counters.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::core::{ProxyError, RELAY_BUFFER_SIZE, SessionError};
use crate::transport::{FrameType, Session, SessionReader, SessionWriter};

/// Cooperative shutdown signal for relays.
///
/// Cloned into every relay of a host; firing the paired sender interrupts
/// pending I/O and morph sleeps at the next await point.
#[derive(Clone)]
pub struct Shutdown(Option<watch::Receiver<bool>>);

impl Shutdown {
    /// Create a signal and its sender handle. `send(true)` - or dropping the
    /// sender - stops every relay holding the signal.
    pub fn channel() -> (watch::Sender<bool>, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (tx, Shutdown(Some(rx)))
    }

    /// A signal that never fires, for standalone relays.
    pub fn none() -> Shutdown {
        Shutdown(None)
    }

    /// Resolves when shutdown is signalled.
    pub async fn cancelled(&mut self) {
        match &mut self.0 {
            None => std::future::pending().await,
            Some(rx) => loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            },
        }
    }
}

/// Pump frames between an established session and its upstream link until
/// either side finishes.
///
/// Upstream EOF sends a Close frame to the peer and then awaits the peer's
/// own Close; a received Close ends the relay immediately. When one flow
/// errors the other is cancelled rather than awaited - it would otherwise
/// block on a dead connection. On shutdown both flows stop at their next
/// await point and the relay returns `Ok(())`. Both streams' write sides
/// are shut down before returning.
pub async fn relay<T, U>(
    session: Session,
    transport: T,
    upstream: U,
    mut shutdown: Shutdown,
) -> Result<(), ProxyError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let (session_reader, session_writer) = session.into_split();
    let (mut transport_read, mut transport_write) = tokio::io::split(transport);
    let (mut upstream_read, mut upstream_write) = tokio::io::split(upstream);

    let result = {
        let request = request_flow(session_writer, &mut upstream_read, &mut transport_write);
        let response = response_flow(session_reader, &mut transport_read, &mut upstream_write);
        tokio::pin!(request, response);

        tokio::select! {
            () = shutdown.cancelled() => {
                debug!("relay stopped by shutdown signal");
                Ok(())
            }
            result = &mut request => match result {
                // Upstream finished and the Close went out; drain the
                // response flow until the peer closes too.
                Ok(()) => tokio::select! {
                    () = shutdown.cancelled() => Ok(()),
                    result = &mut response => result,
                },
                Err(err) => Err(err),
            },
            result = &mut response => result,
        }
    };

    let _ = transport_write.shutdown().await;
    let _ = upstream_write.shutdown().await;
    result.map_err(ProxyError::from)
}

/// Upstream bytes → Data frames.
async fn request_flow<U, W>(
    mut writer: SessionWriter,
    upstream: &mut U,
    transport: &mut W,
) -> Result<(), SessionError>
where
    U: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = upstream.read(&mut buf).await?;
        if n == 0 {
            writer.write_frame(transport, FrameType::Close, b"").await?;
            trace!("upstream eof, close sent");
            return Ok(());
        }
        match writer.write_frame(transport, FrameType::Data, &buf[..n]).await {
            Ok(()) => trace!(bytes = n, "request data relayed"),
            Err(SessionError::NonceExhausted) => {
                // Counter space is spent; the final value still carries the
                // Close that terminates the session cleanly.
                writer.write_frame(transport, FrameType::Close, b"").await?;
                debug!("write counter exhausted, session closed");
                return Ok(());
            }
            Err(err) => return Err(err),
        }
    }
}

/// Incoming frames → upstream bytes, control frames → profile overrides.
async fn response_flow<R, U>(
    mut reader: SessionReader,
    transport: &mut R,
    upstream: &mut U,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
    U: AsyncWrite + Unpin,
{
    loop {
        let frame = match reader.read_frame(transport).await {
            Ok(frame) => frame,
            // A peer that has sent or received Close may simply drop the
            // transport; end-of-stream here is a normal termination.
            Err(SessionError::Io(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                trace!("transport closed by peer");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        match frame.frame_type {
            FrameType::Data => {
                upstream.write_all(&frame.payload).await?;
                upstream.flush().await?;
            }
            FrameType::Padding | FrameType::Timing => {
                trace!(frame_type = ?frame.frame_type, "control frame");
                reader.handle_control_frame(&frame);
            }
            FrameType::Close => {
                trace!("peer closed session");
                return Ok(());
            }
        }
    }
}
