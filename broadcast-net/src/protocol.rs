//! The stream protocol "protocol".
//!
//! Connections are established with the ALPN [`ALPN`], so only broadcast nodes
//! complete the TLS handshake with each other. QUIC only announces a new
//! bidirectional stream to the accepting side once the opener has written to
//! it, so every stream starts with a short exchange:
//!
//! 1. the **opening** side sends a JSON [`ProtocolHeader`] (newline-terminated)
//! 2. the **accepting** side checks the protocol tag and answers with [`ACK`]
//! 3. from then on the stream carries newline-delimited UTF-8 messages
//!
//! ```text
//! opener                               acceptor
//!   │ {"protocol":"/broadcast/1.0.0"}\n  │
//!   │ ─────────────────────────────────► │
//!   │                              ack\n │
//!   │ ◄───────────────────────────────── │
//!   │ hello\n                            │
//!   │ ─────────────────────────────────► │
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Application protocol identifier. Both ends must agree on this exact tag.
pub const PROTOCOL_ID: &str = "/broadcast/1.0.0";

/// ALPN negotiated during the QUIC handshake; same tag as [`PROTOCOL_ID`].
pub const ALPN: &[u8] = PROTOCOL_ID.as_bytes();

/// Line sent back by the accepting side once the header is accepted.
pub const ACK: &str = "ack";

/// Either side of the header exchange gives up after this long.
pub const HANDSHAKE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// First message on every stream, identifying what the stream is for.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProtocolHeader {
    pub protocol: String,
}

impl ProtocolHeader {
    pub fn broadcast() -> Self {
        Self {
            protocol: PROTOCOL_ID.to_string(),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.protocol == PROTOCOL_ID
    }
}

/// Read one line, without its line terminator.
///
/// A closed stream is an error here: this is only used while a reply is still
/// owed.
pub async fn next_string<R>(reader: &mut R) -> Result<String, HandshakeError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(HandshakeError::Closed);
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Read one line and parse it as JSON.
pub async fn next_json<T, R>(reader: &mut R) -> Result<T, HandshakeError>
where
    T: serde::de::DeserializeOwned,
    R: AsyncBufRead + Unpin,
{
    let line = next_string(reader).await?;
    Ok(serde_json::from_str(&line)?)
}

/// Write `text` followed by a newline and flush.
pub async fn write_line<W>(writer: &mut W, text: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Opening side: announce the broadcast protocol and wait for the ACK.
pub async fn request_stream<R, W>(reader: &mut R, writer: &mut W) -> Result<(), HandshakeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    within_handshake_timeout(async {
        let header = serde_json::to_string(&ProtocolHeader::broadcast())?;
        write_line(writer, &header).await?;

        let ack = next_string(reader).await?;
        if ack != ACK {
            return Err(HandshakeError::MissingAck(ack));
        }
        Ok(())
    })
    .await
}

/// Accepting side: read the header, reject unknown protocols, ACK ours.
pub async fn accept_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
) -> Result<ProtocolHeader, HandshakeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    within_handshake_timeout(async {
        let header: ProtocolHeader = next_json(reader).await?;
        if !header.is_supported() {
            tracing::warn!("Rejecting stream for protocol {}", header.protocol);
            return Err(HandshakeError::UnsupportedProtocol(header.protocol));
        }

        write_line(writer, ACK).await?;
        Ok(header)
    })
    .await
}

async fn within_handshake_timeout<T>(
    exchange: impl std::future::Future<Output = Result<T, HandshakeError>>,
) -> Result<T, HandshakeError> {
    tokio::time::timeout(HANDSHAKE_TIMEOUT, exchange)
        .await
        .unwrap_or_else(|_| Err(HandshakeError::Timeout(HANDSHAKE_TIMEOUT)))
}

/// Errors while setting up a stream
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("expected ACK, got: {0}")]
    MissingAck(String),

    #[error("stream closed during handshake")]
    Closed,

    #[error("no handshake reply within {0:?}")]
    Timeout(std::time::Duration),

    #[error("invalid protocol header: {source}")]
    Header {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
