/// Errors while opening the outbound stream to a peer
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("peer {peer} has no address book entry")]
    UnknownPeer { peer: broadcast_net::PeerId },

    #[error("failed to dial peer {peer}: {source}")]
    Dial {
        peer: broadcast_net::PeerId,
        source: eyre::Error,
    },

    #[error("failed to open stream: {source}")]
    Stream { source: eyre::Error },

    #[error("stream handshake failed: {source}")]
    Handshake {
        #[from]
        source: broadcast_net::HandshakeError,
    },
}

/// Errors that end the broadcaster
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("failed to read local input: {source}")]
    Input { source: std::io::Error },
}
