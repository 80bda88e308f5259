//! AEAD-framed session with traffic morphing.
//!
//! A session owns one ChaCha20-Poly1305 instance keyed with the 32-byte
//! session key and two independent 64-bit frame counters, one per direction.
//! The 12-byte nonce for counter `c` is `0x00000000 ∥ be_u64(c)`; because
//! nonces advance monotonically and are never reset, a byte-exact replay
//! decrypts under the wrong counter and fails authentication - that is the
//! stream's replay defense.
//!
//! With a [`TrafficProfile`] attached, Data frames are morphed on the way
//! out: the plaintext becomes `be_u16(len) ∥ payload ∥ random padding` sized
//! to a sampled target, and the writer sleeps for a sampled delay after each
//! frame so inter-packet gaps match the cover application. Control frames
//! and Close are never morphed.

use std::sync::Arc;
use std::time::Duration;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::{
    AEAD_NONCE_SIZE, AEAD_TAG_SIZE, FRAME_HEADER_SIZE, MAX_DATA_PAYLOAD, MAX_FRAME_PLAINTEXT,
    MORPH_HEADER_SIZE, SESSION_KEY_SIZE, SessionError,
};
use crate::morph::TrafficProfile;

use super::frame::{encode_header, Frame, FrameType};

/// Lifecycle state of one session direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HalfState {
    /// Frames flow.
    Ready,
    /// A Close frame was sent or received.
    Closed,
    /// An I/O, decryption, or protocol failure invalidated the direction.
    Poisoned,
    /// The frame counter reached its final value.
    Exhausted,
}

impl HalfState {
    fn ensure_ready(self) -> Result<(), SessionError> {
        match self {
            HalfState::Ready => Ok(()),
            HalfState::Closed | HalfState::Poisoned => Err(SessionError::Closed),
            HalfState::Exhausted => Err(SessionError::NonceExhausted),
        }
    }
}

/// Build the 12-byte counter nonce: four zero bytes then the counter BE64.
fn counter_nonce(counter: u64) -> [u8; AEAD_NONCE_SIZE] {
    let mut nonce = [0u8; AEAD_NONCE_SIZE];
    nonce[4..].copy_from_slice(&counter.to_be_bytes());
    nonce
}

/// The receiving direction of a session.
///
/// Owns the read counter; safe to drive from a different task than the
/// paired [`SessionWriter`].
pub struct SessionReader {
    cipher: ChaCha20Poly1305,
    counter: u64,
    profile: Option<Arc<TrafficProfile>>,
    state: HalfState,
}

impl SessionReader {
    /// Read and decrypt one frame.
    ///
    /// Any decryption, protocol, or I/O failure poisons this direction: the
    /// session cannot be resynchronized and the caller must tear it down.
    /// The read counter is only advanced by a successful decryption.
    pub async fn read_frame<R>(&mut self, r: &mut R) -> Result<Frame, SessionError>
    where
        R: AsyncRead + Unpin,
    {
        self.state.ensure_ready()?;
        match self.read_frame_inner(r).await {
            Ok(frame) => {
                if frame.frame_type == FrameType::Close {
                    self.state = HalfState::Closed;
                }
                Ok(frame)
            }
            Err(err) => {
                self.state = HalfState::Poisoned;
                Err(err)
            }
        }
    }

    async fn read_frame_inner<R>(&mut self, r: &mut R) -> Result<Frame, SessionError>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        r.read_exact(&mut header).await?;
        let length = u16::from_be_bytes([header[0], header[1]]) as usize;
        let frame_type = FrameType::from_byte(header[2]).ok_or_else(|| {
            SessionError::Protocol(format!("unknown frame type 0x{:02x}", header[2]))
        })?;
        if length < AEAD_TAG_SIZE {
            return Err(SessionError::Protocol(format!(
                "ciphertext of {length} bytes shorter than the tag"
            )));
        }

        let mut ciphertext = vec![0u8; length];
        r.read_exact(&mut ciphertext).await?;

        let nonce = counter_nonce(self.counter);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| SessionError::DecryptFail)?;

        // Counters never wrap: the direction ends with the final value.
        match self.counter.checked_add(1) {
            Some(next) => self.counter = next,
            None => self.state = HalfState::Exhausted,
        }

        let payload = if self.profile.is_some() && frame_type == FrameType::Data {
            demorph(&plaintext)?
        } else {
            plaintext
        };

        Ok(Frame::new(frame_type, payload))
    }

    /// Apply a Padding or Timing control frame to the attached profile.
    ///
    /// Padding payloads of at least four bytes set a one-shot size override
    /// (`be_u32` bytes); Timing payloads set a one-shot delay override
    /// (`be_u32` milliseconds). Shorter payloads and non-control frames are
    /// ignored, as is everything when no profile is attached.
    pub fn handle_control_frame(&self, frame: &Frame) {
        let Some(profile) = &self.profile else {
            return;
        };
        if frame.payload.len() < 4 {
            return;
        }
        let value = u32::from_be_bytes([
            frame.payload[0],
            frame.payload[1],
            frame.payload[2],
            frame.payload[3],
        ]);
        match frame.frame_type {
            FrameType::Padding => profile.set_next_size(value as usize),
            FrameType::Timing => profile.set_next_delay(Duration::from_millis(u64::from(value))),
            _ => {}
        }
    }

    /// Whether this direction is still usable.
    pub fn is_ready(&self) -> bool {
        self.state == HalfState::Ready
    }
}

/// The sending direction of a session.
///
/// Owns the write counter; safe to drive from a different task than the
/// paired [`SessionReader`].
pub struct SessionWriter {
    cipher: ChaCha20Poly1305,
    counter: u64,
    profile: Option<Arc<TrafficProfile>>,
    state: HalfState,
}

impl SessionWriter {
    /// Encrypt and write one frame, morphing Data when a profile is attached.
    ///
    /// For morphed Data the call sleeps for a sampled delay *after* the
    /// write; the delay shapes inter-packet gaps, not first-byte latency.
    /// An I/O failure poisons this direction (the header and ciphertext must
    /// land together or not at all). `FrameTooLarge` and `NonceExhausted`
    /// are reported before any byte is written and leave the session usable
    /// - the latter still admits a final Close frame.
    pub async fn write_frame<W>(
        &mut self,
        w: &mut W,
        frame_type: FrameType,
        payload: &[u8],
    ) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        self.state.ensure_ready()?;
        match self.write_frame_inner(w, frame_type, payload).await {
            Ok(()) => {
                if frame_type == FrameType::Close {
                    self.state = HalfState::Closed;
                }
                Ok(())
            }
            Err(
                err @ (SessionError::NonceExhausted | SessionError::FrameTooLarge { .. }),
            ) => Err(err),
            Err(err) => {
                self.state = HalfState::Poisoned;
                Err(err)
            }
        }
    }

    async fn write_frame_inner<W>(
        &mut self,
        w: &mut W,
        frame_type: FrameType,
        payload: &[u8],
    ) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        // The final counter value is reserved so a Close frame can always
        // terminate the session cleanly.
        if self.counter == u64::MAX && frame_type != FrameType::Close {
            return Err(SessionError::NonceExhausted);
        }

        let morph = frame_type == FrameType::Data && self.profile.is_some();
        let plaintext = if morph {
            if payload.len() > MAX_DATA_PAYLOAD {
                return Err(SessionError::FrameTooLarge {
                    size: payload.len(),
                });
            }
            // Sampled target, clamped so the ciphertext still fits the u16
            // length field.
            let target = self
                .profile
                .as_ref()
                .map(|p| p.sample_size())
                .unwrap_or_default()
                .min(MAX_FRAME_PLAINTEXT);
            morph_payload(payload, target)
        } else {
            if payload.len() > MAX_FRAME_PLAINTEXT {
                return Err(SessionError::FrameTooLarge {
                    size: payload.len(),
                });
            }
            payload.to_vec()
        };

        let nonce = counter_nonce(self.counter);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| SessionError::Protocol("aead seal failed".into()))?;
        if self.counter < u64::MAX {
            self.counter += 1;
        }

        let header = encode_header(ciphertext.len() as u16, frame_type);
        w.write_all(&header).await?;
        w.write_all(&ciphertext).await?;
        w.flush().await?;

        if morph {
            if let Some(profile) = &self.profile {
                let delay = profile.sample_delay();
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    /// Ask the peer to pad its next Data frame to `size` bytes.
    pub async fn send_size_hint<W>(&mut self, w: &mut W, size: u32) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        self.write_frame(w, FrameType::Padding, &size.to_be_bytes())
            .await
    }

    /// Ask the peer to delay its next Data frame by `millis` milliseconds.
    pub async fn send_delay_hint<W>(&mut self, w: &mut W, millis: u32) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        self.write_frame(w, FrameType::Timing, &millis.to_be_bytes())
            .await
    }

    /// Whether this direction is still usable.
    pub fn is_ready(&self) -> bool {
        self.state == HalfState::Ready
    }
}

/// Pad `payload` into a morphed plaintext of `max(2 + len, target)` bytes.
fn morph_payload(payload: &[u8], target: usize) -> Vec<u8> {
    let total = target.max(MORPH_HEADER_SIZE + payload.len());
    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    buf.extend_from_slice(payload);

    let pad = total - buf.len();
    if pad > 0 {
        let mut padding = vec![0u8; pad];
        OsRng.fill_bytes(&mut padding);
        buf.extend_from_slice(&padding);
    }
    buf
}

/// Recover the payload from a morphed plaintext.
fn demorph(plaintext: &[u8]) -> Result<Vec<u8>, SessionError> {
    if plaintext.len() < MORPH_HEADER_SIZE {
        return Err(SessionError::Protocol("morph header truncated".into()));
    }
    let actual = u16::from_be_bytes([plaintext[0], plaintext[1]]) as usize;
    if actual + MORPH_HEADER_SIZE > plaintext.len() {
        return Err(SessionError::Protocol(format!(
            "morph length {actual} exceeds plaintext of {} bytes",
            plaintext.len()
        )));
    }
    Ok(plaintext[MORPH_HEADER_SIZE..MORPH_HEADER_SIZE + actual].to_vec())
}

/// A live Reflex session: AEAD framing plus optional traffic morphing.
///
/// Created from a 32-byte session key after the handshake; lives for one
/// TCP connection. [`into_split`](Session::into_split) separates the two
/// directions so a relay can drive them from concurrent tasks without a
/// shared lock - each half owns its counter by construction.
pub struct Session {
    reader: SessionReader,
    writer: SessionWriter,
}

impl Session {
    /// Create a session from a 32-byte key.
    ///
    /// Rejects any other key length with a configuration error.
    pub fn new(key: &[u8]) -> Result<Self, SessionError> {
        if key.len() != SESSION_KEY_SIZE {
            return Err(SessionError::Config(format!(
                "session key must be {SESSION_KEY_SIZE} bytes, got {}",
                key.len()
            )));
        }
        let cipher = ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| SessionError::Config("invalid session key".into()))?;
        Ok(Self {
            reader: SessionReader {
                cipher: cipher.clone(),
                counter: 0,
                profile: None,
                state: HalfState::Ready,
            },
            writer: SessionWriter {
                cipher,
                counter: 0,
                profile: None,
                state: HalfState::Ready,
            },
        })
    }

    /// Create a session with a traffic profile attached.
    pub fn with_profile(key: &[u8], profile: Arc<TrafficProfile>) -> Result<Self, SessionError> {
        let mut session = Self::new(key)?;
        session.attach_profile(profile);
        Ok(session)
    }

    /// Attach a traffic profile; both directions share it.
    pub fn attach_profile(&mut self, profile: Arc<TrafficProfile>) {
        self.reader.profile = Some(Arc::clone(&profile));
        self.writer.profile = Some(profile);
    }

    /// The attached traffic profile, if any.
    pub fn profile(&self) -> Option<&Arc<TrafficProfile>> {
        self.writer.profile.as_ref()
    }

    /// Encrypt and write one frame. See [`SessionWriter::write_frame`].
    pub async fn write_frame<W>(
        &mut self,
        w: &mut W,
        frame_type: FrameType,
        payload: &[u8],
    ) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        self.writer.write_frame(w, frame_type, payload).await
    }

    /// Read and decrypt one frame. See [`SessionReader::read_frame`].
    pub async fn read_frame<R>(&mut self, r: &mut R) -> Result<Frame, SessionError>
    where
        R: AsyncRead + Unpin,
    {
        self.reader.read_frame(r).await
    }

    /// Apply a control frame to the attached profile.
    pub fn handle_control_frame(&self, frame: &Frame) {
        self.reader.handle_control_frame(frame);
    }

    /// Split into independently-owned directions for concurrent relaying.
    pub fn into_split(self) -> (SessionReader, SessionWriter) {
        (self.reader, self.writer)
    }
}
