//! Command line and the node configuration derived from it.

use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(name = "broadcast")]
#[command(about = "Type lines, reach every directly connected peer")]
pub struct Cli {
    /// UDP port to listen on; 0 picks a free one
    #[arg(long = "sp", visible_alias = "source-port", env = "BROADCAST_PORT", default_value_t = 0)]
    pub source_port: u16,

    /// Locator of a peer to dial at startup, as printed by that peer
    #[arg(short, long, env = "BROADCAST_DEST")]
    pub dest: Option<String>,

    /// Derive the node key from the listen port, so the id is stable across runs
    #[arg(long)]
    pub debug: bool,

    /// Load the node key from this file, creating it on first use
    #[arg(long, env = "BROADCAST_KEY_FILE", conflicts_with = "debug")]
    pub key_file: Option<PathBuf>,

    /// Use public relays and discovery instead of direct addresses only
    #[arg(long)]
    pub relay: bool,
}

/// Where the node's secret key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Random,
    PortSeed(u16),
    File(PathBuf),
}

impl KeySource {
    pub async fn load(&self) -> Result<iroh::SecretKey, broadcast_net::KeyError> {
        match self {
            KeySource::Random => Ok(broadcast_net::secret::generate()),
            KeySource::PortSeed(port) => {
                tracing::warn!("Using a key derived from port {port}, do not use outside testing");
                Ok(broadcast_net::secret::from_port_seed(*port))
            }
            KeySource::File(path) => broadcast_net::secret::read_or_create(path).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub port: u16,
    pub dest: Option<String>,
    pub key: KeySource,
    pub relay: bool,
}

impl NodeConfig {
    pub fn endpoint(&self) -> broadcast_net::EndpointConfig {
        broadcast_net::EndpointConfig {
            port: self.port,
            relay: self.relay,
        }
    }
}

impl From<Cli> for NodeConfig {
    fn from(cli: Cli) -> Self {
        let key = match (cli.key_file, cli.debug) {
            (Some(path), _) => KeySource::File(path),
            (None, true) => KeySource::PortSeed(cli.source_port),
            (None, false) => KeySource::Random,
        };

        Self {
            port: cli.source_port,
            // an empty value (e.g. BROADCAST_DEST="") means listen only
            dest: cli.dest.filter(|d| !d.trim().is_empty()),
            key,
            relay: cli.relay,
        }
    }
}
