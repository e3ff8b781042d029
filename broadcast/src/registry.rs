//! The stream registry.
//!
//! Holds one [`PeerStream`] per open stream, in registration order. The lock
//! guards the collection only: callers take a [`StreamRegistry::snapshot`] and
//! do their I/O after the lock is released, so a broadcast in flight never
//! holds up a peer registering, and vice versa.

use tokio::io::AsyncWriteExt;

/// Write half of a peer stream, before buffering.
pub type BoxedWriter = Box<dyn tokio::io::AsyncWrite + Send + Unpin>;

/// Read half of a peer stream, already line buffered.
pub type BoxedReader = Box<dyn tokio::io::AsyncBufRead + Send + Unpin>;

/// Registry-unique stream id, assigned on registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which side opened the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Shared write side of one stream to one peer.
///
/// The read side is owned by the stream's reader loop and is not kept here.
pub struct PeerStream {
    id: StreamId,
    peer: Option<broadcast_net::PeerId>,
    direction: Direction,
    writer: tokio::sync::Mutex<tokio::io::BufWriter<BoxedWriter>>,
}

impl PeerStream {
    pub fn new(
        peer: Option<broadcast_net::PeerId>,
        direction: Direction,
        writer: BoxedWriter,
    ) -> Self {
        Self {
            id: StreamId(0),
            peer,
            direction,
            writer: tokio::sync::Mutex::new(tokio::io::BufWriter::new(writer)),
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn peer(&self) -> Option<broadcast_net::PeerId> {
        self.peer
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Write `message` plus a newline and flush immediately.
    pub async fn send_line(&self, message: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(message.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }

    /// Close the write half; the peer's reader sees end of stream.
    pub async fn close(&self) -> std::io::Result<()> {
        self.writer.lock().await.shutdown().await
    }
}

impl std::fmt::Debug for PeerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerStream")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of open peer streams.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: tokio::sync::RwLock<Vec<std::sync::Arc<PeerStream>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `stream` an id and append it.
    pub async fn register(&self, mut stream: PeerStream) -> std::sync::Arc<PeerStream> {
        stream.id = StreamId(
            self.next_id
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        );
        let stream = std::sync::Arc::new(stream);
        self.streams.write().await.push(stream.clone());

        tracing::debug!(
            stream = %stream.id,
            peer = ?stream.peer,
            direction = ?stream.direction,
            "Registered stream"
        );
        stream
    }

    /// Drop `id` from the registry. Returns false if it was already gone.
    pub async fn remove(&self, id: StreamId) -> bool {
        let mut streams = self.streams.write().await;
        let before = streams.len();
        streams.retain(|stream| stream.id != id);
        let removed = streams.len() != before;
        if removed {
            tracing::debug!(stream = %id, remaining = streams.len(), "Removed stream");
        }
        removed
    }

    /// The streams registered right now, in registration order.
    pub async fn snapshot(&self) -> Vec<std::sync::Arc<PeerStream>> {
        self.streams.read().await.clone()
    }

    /// Run `f` over a snapshot of the registry.
    ///
    /// Streams registered while `f` runs are not visited.
    pub async fn for_each<F, Fut>(&self, mut f: F)
    where
        F: FnMut(std::sync::Arc<PeerStream>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        for stream in self.snapshot().await {
            f(stream).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
