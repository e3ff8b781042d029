//! # broadcast-net
//!
//! Transport plumbing shared by every broadcast node.
//!
//! Peers talk over [iroh](https://docs.rs/iroh) QUIC connections. Each peer is
//! identified by its Ed25519 public key, written as an ID52: a 52-character
//! BASE32_DNSSEC string that is DNS and URL safe.
//!
//! ## What lives here
//!
//! - [`PeerId`]: the peer identity and its ID52 text form
//! - [`secret`]: local key material (random, port-seeded, or file backed)
//! - [`bind_endpoint`]: the iroh endpoint every node listens and dials with
//! - [`protocol`]: the per-stream protocol header and ACK exchange
//! - [`Graceful`]: supervised task spawning with a shared cancellation signal
//!
//! ## Quick Start
//!
//! ```
//! let secret_key = broadcast_net::secret::from_port_seed(4001);
//! let peer = broadcast_net::PeerId::from(secret_key.public());
//!
//! let id52 = peer.id52();
//! assert_eq!(id52.len(), 52);
//! assert_eq!(id52.parse::<broadcast_net::PeerId>().unwrap(), peer);
//! ```

mod endpoint;
mod graceful;
mod id52;
pub mod protocol;
pub mod secret;

pub use endpoint::{EndpointConfig, bind_endpoint, local_port};
pub use graceful::Graceful;
pub use id52::{ParseId52Error, PeerId};
pub use protocol::{ACK, ALPN, HandshakeError, PROTOCOL_ID, ProtocolHeader};
pub use secret::KeyError;
