//! Accepting peers that dial us.

/// Accept connections until shutdown or until the endpoint closes.
///
/// Each connection gets its own task, so a slow handshake never holds up the
/// next peer.
pub async fn accept_loop(endpoint: iroh::Endpoint, ctx: crate::NodeContext) {
    loop {
        tokio::select! {
            _ = ctx.graceful.cancelled() => {
                tracing::debug!("Accept loop shutting down");
                break;
            }
            incoming = endpoint.accept() => {
                let Some(incoming) = incoming else {
                    tracing::info!("Endpoint closed, no more connections");
                    break;
                };

                let ctx2 = ctx.clone();
                ctx.graceful.spawn(async move {
                    if let Err(e) = handle_connection(incoming, ctx2).await {
                        tracing::warn!("Connection error: {e:?}");
                    }
                });
            }
        }
    }
}

/// Register every broadcast stream a connected peer opens.
///
/// Each stream is handshaken in its own task. Returns once the peer closes the connection (or shutdown is requested).
async fn handle_connection(
    incoming: iroh::endpoint::Incoming,
    ctx: crate::NodeContext,
) -> eyre::Result<()> {
    let conn = incoming.await?;
    let peer = conn
        .remote_node_id()
        .map(broadcast_net::PeerId::from)
        .map_err(|e| eyre::eyre!("could not identify remote node: {e}"))?;
    tracing::debug!(%peer, "Connection established");

    loop {
        let accepted = tokio::select! {
            _ = ctx.graceful.cancelled() => break,
            accepted = conn.accept_bi() => accepted,
        };

        let (send, recv) = match accepted {
            Ok(streams) => streams,
            Err(e) => {
                tracing::debug!(%peer, "Connection ended: {e}");
                break;
            }
        };

        // a stream that never finishes its handshake must not hold up the next one
        let ctx2 = ctx.clone();
        ctx.graceful.spawn(async move {
            tokio::select! {
                _ = ctx2.graceful.cancelled() => {}
                handled = handle_stream(recv, send, Some(peer), &ctx2) => match handled {
                    Ok(stream) => {
                        tracing::info!(%peer, stream = %stream.id(), "Got a new stream");
                    }
                    Err(e) => tracing::warn!(%peer, "Rejected stream: {e}"),
                },
            }
        });
    }

    Ok(())
}

/// Run the acceptor side of the handshake and attach the stream.
///
/// A stream asking for another protocol is dropped without reply and never
/// reaches the registry.
pub async fn handle_stream<R, W>(
    recv: R,
    mut send: W,
    peer: Option<broadcast_net::PeerId>,
    ctx: &crate::NodeContext,
) -> Result<std::sync::Arc<crate::PeerStream>, broadcast_net::HandshakeError>
where
    R: tokio::io::AsyncRead + Send + Unpin + 'static,
    W: tokio::io::AsyncWrite + Send + Unpin + 'static,
{
    let mut recv = tokio::io::BufReader::new(recv);
    broadcast_net::protocol::accept_stream(&mut recv, &mut send).await?;

    Ok(ctx
        .attach(
            Box::new(recv),
            Box::new(send),
            peer,
            crate::Direction::Inbound,
        )
        .await)
}
