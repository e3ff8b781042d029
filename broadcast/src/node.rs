//! A running broadcast node: endpoint, address book and tasks.

use eyre::WrapErr;

pub struct Node {
    endpoint: iroh::Endpoint,
    peer_id: broadcast_net::PeerId,
    port: u16,
    book: std::sync::Arc<crate::AddressBook>,
    ctx: crate::NodeContext,
    destinations: std::sync::Mutex<Vec<crate::Locator>>,
}

impl Node {
    /// Bring a node up: bind, start accepting, then dial `config.dest`.
    ///
    /// Any failure here is fatal and names the step that failed. The
    /// destination locator is checked before anything is bound.
    pub async fn start(
        config: crate::NodeConfig,
        display: std::sync::Arc<crate::Display>,
    ) -> eyre::Result<Self> {
        Self::start_supervised(config, display, broadcast_net::Graceful::new()).await
    }

    /// [`Node::start`] with the node's tasks spawned through `graceful`.
    ///
    /// If dialing the destination fails, `graceful` has been shut down and
    /// the endpoint closed by the time this returns.
    pub(crate) async fn start_supervised(
        config: crate::NodeConfig,
        display: std::sync::Arc<crate::Display>,
        graceful: broadcast_net::Graceful,
    ) -> eyre::Result<Self> {
        let book = std::sync::Arc::new(crate::AddressBook::new());
        let dest = config
            .dest
            .as_deref()
            .map(|dest| crate::resolve(&book, dest).wrap_err_with(|| format!("invalid destination {dest:?}")))
            .transpose()?;

        let secret_key = config
            .key
            .load()
            .await
            .wrap_err("failed to load node key")?;

        let endpoint = broadcast_net::bind_endpoint(secret_key, &config.endpoint())
            .await
            .wrap_err_with(|| format!("failed to listen on port {}", config.port))?;
        let port = broadcast_net::local_port(&endpoint)
            .ok_or_else(|| eyre::eyre!("endpoint has no IPv4 socket"))?;

        let ctx = crate::NodeContext::new(display, graceful);
        ctx.graceful
            .spawn(crate::inbound::accept_loop(endpoint.clone(), ctx.clone()));

        let node = Node {
            peer_id: broadcast_net::PeerId::from(endpoint.node_id()),
            endpoint,
            port,
            book,
            ctx,
            destinations: std::sync::Mutex::new(Vec::new()),
        };
        tracing::info!(peer = %node.peer_id, port, "Node listening");

        if let Some((peer, _)) = dest
            && let Err(e) = node.connect(peer).await
        {
            if let Err(stop) = node.shutdown().await {
                tracing::warn!("Failed to stop node after connect error: {stop:?}");
            }
            return Err(eyre::Error::from(e).wrap_err(format!("failed to connect to {peer}")));
        }

        Ok(node)
    }

    /// Open a stream to a peer already in the address book.
    pub async fn connect(
        &self,
        peer: broadcast_net::PeerId,
    ) -> Result<std::sync::Arc<crate::PeerStream>, crate::ConnectError> {
        let stream = crate::outbound::connect(&self.endpoint, &self.book, peer, &self.ctx).await?;

        if let Some(entry) = self.book.get(&peer) {
            self.destinations
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(crate::Locator::from_entry(peer, &entry));
        }
        Ok(stream)
    }

    pub fn peer_id(&self) -> broadcast_net::PeerId {
        self.peer_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn context(&self) -> &crate::NodeContext {
        &self.ctx
    }

    pub fn address_book(&self) -> &crate::AddressBook {
        &self.book
    }

    /// The locator other nodes on this machine can dial.
    pub fn locator(&self) -> crate::Locator {
        crate::Locator::for_local_node(self.peer_id, self.port)
    }

    pub fn destinations(&self) -> Vec<crate::Locator> {
        self.destinations
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Startup text for the operator.
    pub fn banner(&self) -> String {
        let mut banner = format!(
            "Listening on 0.0.0.0:{}\nNode id: {}\nTo connect, run: broadcast -d {}\n",
            self.port,
            self.peer_id,
            self.locator()
        );
        for dest in self.destinations() {
            banner.push_str(&format!("Connected to {dest}\n"));
        }
        banner
    }

    /// Broadcast `input` until it ends, fails, or `shutdown` resolves, then
    /// shut the node down.
    pub async fn run<R, S>(&self, input: R, shutdown: S) -> eyre::Result<()>
    where
        R: tokio::io::AsyncBufRead + Send + Unpin + 'static,
        S: std::future::Future<Output = ()>,
    {
        let broadcaster = self
            .ctx
            .graceful
            .spawn(crate::broadcaster::run(input, self.ctx.clone()));

        let result = tokio::select! {
            joined = broadcaster => match joined {
                Ok(result) => result.wrap_err("broadcaster failed"),
                Err(e) => Err(eyre::Error::from(e).wrap_err("broadcaster panicked")),
            },
            _ = shutdown => {
                tracing::info!("Shutdown requested");
                Ok(())
            }
        };

        self.shutdown().await?;
        result
    }

    /// Close every stream, stop all tasks and close the endpoint.
    pub async fn shutdown(&self) -> eyre::Result<()> {
        self.ctx
            .registry
            .for_each(|stream| async move {
                if let Err(e) = stream.close().await {
                    tracing::debug!(stream = %stream.id(), "Failed to close stream: {e}");
                }
            })
            .await;

        let stopped = self.ctx.graceful.shutdown().await;
        self.endpoint.close().await;
        tracing::info!("Node stopped");
        stopped
    }
}
