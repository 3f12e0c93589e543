//! Parley wire format — the framing every byte on the wire goes through.
//!
//! Frames are newline-delimited UTF-8 lines with a bounded length. Every
//! server-originated frame is three `|`-separated parts:
//!
//!   chat   `senderName|senderId|cipheredBody`
//!   event  `#join|sessionId|announcement` or `#leave|sessionId|announcement`
//!
//! Event kind tokens carry the reserved `#` prefix; a display name may not
//! start with `#` or contain `|`, so the first part always disambiguates.
//! The client's first line on a fresh connection is its display name, and
//! the literal line `#exit` requests graceful departure.
//!
//! Oversize frames are rejected with [`FrameError::Oversize`], never
//! truncated.

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Field delimiter. Reserved — must never appear in a display name.
pub const DELIM: char = '|';

/// Prefix reserved for control tokens. Display names may not start with it.
pub const CONTROL_PREFIX: char = '#';

/// Literal frame a client sends to request graceful departure.
pub const EXIT_TOKEN: &str = "#exit";

/// Maximum frame length in bytes, excluding the newline.
pub const MAX_FRAME_LEN: usize = 200;

/// Maximum display name length in bytes.
pub const MAX_NAME_LEN: usize = 32;

/// Longest decimal rendering of a session id (u64).
const MAX_ID_DIGITS: usize = 20;

/// Upper bound on a relayed frame's length as seen by a receiver.
///
/// The server accepts bodies up to `max_frame_len`, then wraps
/// `name|id|` framing around them, so a receiver's read limit must allow
/// for the name, the id digits, and the two delimiters on top of the body.
pub fn max_relayed_len(max_frame_len: usize, max_name_len: usize) -> usize {
    max_frame_len + max_name_len + MAX_ID_DIGITS + 2
}

// ── Frames ────────────────────────────────────────────────────────────────────

/// Join or leave announcement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Join,
    Leave,
}

impl EventKind {
    /// The reserved wire token for this kind.
    pub fn token(self) -> &'static str {
        match self {
            EventKind::Join => "#join",
            EventKind::Leave => "#leave",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "#join" => Some(EventKind::Join),
            "#leave" => Some(EventKind::Leave),
            _ => None,
        }
    }
}

/// One parsed wire frame.
///
/// `Chat.body` is whatever travelled on the wire — for server-relayed chat
/// that is the ciphered text; decoding is the receiver's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Chat {
        sender: String,
        sender_id: u64,
        body: String,
    },
    Event {
        kind: EventKind,
        session_id: u64,
        text: String,
    },
}

impl Frame {
    /// Parse one line (without its newline) into a frame.
    pub fn parse(line: &str) -> Result<Frame, FrameError> {
        let mut parts = line.splitn(3, DELIM);
        let first = parts.next().unwrap_or_default();
        let (id_part, rest) = match (parts.next(), parts.next()) {
            (Some(id), Some(rest)) => (id, rest),
            _ => return Err(FrameError::MissingDelimiter),
        };
        let id: u64 = id_part
            .parse()
            .map_err(|_| FrameError::BadSessionId(id_part.to_string()))?;

        if let Some(stripped) = first.strip_prefix(CONTROL_PREFIX) {
            let kind = EventKind::from_token(first)
                .ok_or_else(|| FrameError::UnknownEvent(stripped.to_string()))?;
            Ok(Frame::Event {
                kind,
                session_id: id,
                text: rest.to_string(),
            })
        } else {
            Ok(Frame::Chat {
                sender: first.to_string(),
                sender_id: id,
                body: rest.to_string(),
            })
        }
    }

    /// Serialize to wire bytes, newline included.
    pub fn encode(&self) -> Bytes {
        let line = match self {
            Frame::Chat {
                sender,
                sender_id,
                body,
            } => format!("{sender}{DELIM}{sender_id}{DELIM}{body}\n"),
            Frame::Event {
                kind,
                session_id,
                text,
            } => format!("{}{DELIM}{session_id}{DELIM}{text}\n", kind.token()),
        };
        Bytes::from(line)
    }
}

/// Validate a display name against the protocol's reserved characters.
pub fn validate_name(name: &str, max_len: usize) -> Result<(), FrameError> {
    if name.is_empty() || name.len() > max_len {
        return Err(FrameError::BadName(name.to_string()));
    }
    if name.contains(DELIM) || name.starts_with(CONTROL_PREFIX) {
        return Err(FrameError::BadName(name.to_string()));
    }
    Ok(())
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when reading or interpreting wire frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is missing the expected delimiters")]
    MissingDelimiter,

    #[error("session id is not a decimal integer: {0:?}")]
    BadSessionId(String),

    #[error("unknown event token: #{0}")]
    UnknownEvent(String),

    #[error("invalid display name: {0:?}")]
    BadName(String),

    #[error("frame length {len} exceeds maximum {max}")]
    Oversize { len: usize, max: usize },

    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

// ── Reader ────────────────────────────────────────────────────────────────────

/// Accumulates socket bytes and yields complete frames.
///
/// Enforces the maximum frame length while a line is still being buffered,
/// so an oversize sender errors out before it can exhaust memory. After an
/// `Oversize` error the stream position is undefined — callers terminate
/// the connection.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_len(inner, MAX_FRAME_LEN)
    }

    pub fn with_max_len(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(max_len + 1),
            max_len,
        }
    }

    /// Read the next frame line, without its newline.
    ///
    /// Returns `Ok(None)` when the peer closed the connection. A partial
    /// line at EOF is discarded — the peer vanished mid-frame.
    pub async fn next_line(&mut self) -> Result<Option<String>, FrameError> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                if pos > self.max_len {
                    return Err(FrameError::Oversize {
                        len: pos,
                        max: self.max_len,
                    });
                }
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                let text = std::str::from_utf8(&line)
                    .map_err(|_| FrameError::InvalidUtf8)?
                    .to_string();
                return Ok(Some(text));
            }

            if self.buf.len() > self.max_len {
                return Err(FrameError::Oversize {
                    len: self.buf.len(),
                    max: self.max_len,
                });
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if !self.buf.is_empty() {
                    self.buf.advance(self.buf.len());
                }
                return Ok(None);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
