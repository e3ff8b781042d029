use crate::registry::{BoxedReader, BoxedWriter, Direction, PeerStream, StreamRegistry};

/// Runtime state shared by every task of a node.
///
/// Cheap to clone; all clones point at the same registry, display and
/// supervisor.
#[derive(Clone)]
pub struct NodeContext {
    pub registry: std::sync::Arc<StreamRegistry>,
    pub display: std::sync::Arc<crate::Display>,
    pub graceful: broadcast_net::Graceful,
}

impl NodeContext {
    pub fn new(display: std::sync::Arc<crate::Display>, graceful: broadcast_net::Graceful) -> Self {
        Self {
            registry: std::sync::Arc::new(StreamRegistry::new()),
            display,
            graceful,
        }
    }

    /// Register a freshly opened stream and start its reader loop.
    ///
    /// Inbound and outbound streams both end up here once their handshake is
    /// done, so the two directions behave identically afterwards.
    pub async fn attach(
        &self,
        reader: BoxedReader,
        writer: BoxedWriter,
        peer: Option<broadcast_net::PeerId>,
        direction: Direction,
    ) -> std::sync::Arc<PeerStream> {
        let stream = self
            .registry
            .register(PeerStream::new(peer, direction, writer))
            .await;

        self.graceful
            .spawn(crate::reader::read_loop(stream.id(), reader, self.clone()));
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Transcript;
    use crate::testing::eventually;

    #[tokio::test]
    async fn attached_stream_is_read_and_written() {
        let transcript = Transcript::new();
        let ctx = NodeContext::new(
            std::sync::Arc::new(crate::Display::new(transcript.clone())),
            broadcast_net::Graceful::new(),
        );

        let (local, remote) = tokio::io::duplex(1024);
        let (local_read, local_write) = tokio::io::split(local);
        let (remote_read, mut remote_write) = tokio::io::split(remote);

        let stream = ctx
            .attach(
                Box::new(tokio::io::BufReader::new(local_read)),
                Box::new(local_write),
                None,
                Direction::Inbound,
            )
            .await;
        assert_eq!(ctx.registry.len().await, 1);

        // peer -> display
        broadcast_net::protocol::write_line(&mut remote_write, "from peer")
            .await
            .unwrap();
        // display <- registry writer
        stream.send_line("to peer").await.unwrap();
        let mut remote_read = tokio::io::BufReader::new(remote_read);
        assert_eq!(
            broadcast_net::protocol::next_string(&mut remote_read)
                .await
                .unwrap(),
            "to peer"
        );

        eventually(|| {
            let transcript = transcript.clone();
            async move { transcript.count_lines("from peer") == 1 }
        })
        .await;

        // closing the peer side ends the reader loop, which unregisters
        drop(remote_write);
        drop(remote_read);
        eventually(|| {
            let registry = ctx.registry.clone();
            async move { registry.is_empty().await }
        })
        .await;

        ctx.graceful.shutdown().await.unwrap();
        assert_eq!(transcript.count_lines("from peer"), 1);
    }
}
