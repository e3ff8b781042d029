//! Dialing a known peer.

use crate::ConnectError;

/// Open one broadcast stream to `peer` and attach it.
///
/// The peer's dial address comes from the address book; resolving the
/// locator beforehand is the caller's job. The connection stays open for as
/// long as the returned stream's halves are alive.
#[tracing::instrument(skip(endpoint, book, ctx), fields(peer = %peer))]
pub async fn connect(
    endpoint: &iroh::Endpoint,
    book: &crate::AddressBook,
    peer: broadcast_net::PeerId,
    ctx: &crate::NodeContext,
) -> Result<std::sync::Arc<crate::PeerStream>, ConnectError> {
    let entry = book.get(&peer).ok_or(ConnectError::UnknownPeer { peer })?;

    let addr = iroh::NodeAddr::new(peer.node_id())
        .with_direct_addresses([entry.dial_address.socket_addr()]);

    let conn = endpoint
        .connect(addr, broadcast_net::ALPN)
        .await
        .map_err(|e| ConnectError::Dial {
            peer,
            source: eyre::Error::from(e),
        })?;

    let (mut send, recv) = conn.open_bi().await.map_err(|e| ConnectError::Stream {
        source: eyre::Error::from(e),
    })?;

    let mut recv = tokio::io::BufReader::new(recv);
    broadcast_net::protocol::request_stream(&mut recv, &mut send).await?;

    let stream = ctx
        .attach(
            Box::new(recv),
            Box::new(send),
            Some(peer),
            crate::Direction::Outbound,
        )
        .await;
    tracing::info!(stream = %stream.id(), "Connected to {}", entry.dial_address);
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_peer_is_rejected_before_dialing() {
        let endpoint = broadcast_net::bind_endpoint(
            broadcast_net::secret::generate(),
            &broadcast_net::EndpointConfig::default(),
        )
        .await
        .unwrap();
        let ctx = crate::NodeContext::new(
            std::sync::Arc::new(crate::Display::new(crate::testing::Transcript::new())),
            broadcast_net::Graceful::new(),
        );
        let peer = broadcast_net::PeerId::from(broadcast_net::secret::generate().public());

        let err = connect(&endpoint, &crate::AddressBook::new(), peer, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::UnknownPeer { peer: p } if p == peer));
        assert!(ctx.registry.is_empty().await);

        endpoint.close().await;
    }
}
