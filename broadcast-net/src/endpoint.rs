/// How a node's iroh endpoint is bound.
#[derive(Debug, Clone, Default)]
pub struct EndpointConfig {
    /// UDP port on 0.0.0.0; 0 lets the OS pick one.
    pub port: u16,
    /// Use n0's public relays and discovery. When off, peers are only
    /// reachable through the direct address in their locator.
    pub relay: bool,
}

/// Create the iroh endpoint a node listens and dials with.
///
/// The endpoint only accepts connections negotiating [`crate::ALPN`].
pub async fn bind_endpoint(
    secret_key: iroh::SecretKey,
    config: &EndpointConfig,
) -> eyre::Result<iroh::Endpoint> {
    let bind_addr = std::net::SocketAddrV4::new(std::net::Ipv4Addr::UNSPECIFIED, config.port);

    let builder = iroh::Endpoint::builder()
        .secret_key(secret_key)
        .alpns(vec![crate::ALPN.to_vec()])
        .bind_addr_v4(bind_addr);

    let builder = if config.relay {
        builder.discovery_n0()
    } else {
        builder.relay_mode(iroh::RelayMode::Disabled)
    };

    match builder.bind().await {
        Ok(ep) => {
            tracing::info!(
                "Endpoint bound: {} on {:?}",
                crate::PeerId::from(ep.node_id()),
                ep.bound_sockets()
            );
            Ok(ep)
        }
        // https://github.com/n0-computer/iroh/issues/2741
        Err(e) => Err(eyre::eyre!("failed to bind to iroh network: {e:?}")),
    }
}

/// The IPv4 UDP port the endpoint actually listens on.
pub fn local_port(endpoint: &iroh::Endpoint) -> Option<u16> {
    endpoint
        .bound_sockets()
        .into_iter()
        .find(std::net::SocketAddr::is_ipv4)
        .map(|addr| addr.port())
}
