//! # broadcast
//!
//! A peer-to-peer line broadcaster. Every line typed on one node is written to
//! every peer currently connected to it, and every line received from a peer
//! is printed locally.
//!
//! ## Running
//!
//! ```bash
//! # first console: listen and print this node's locator
//! broadcast --sp 4001
//!
//! # second console: dial the first node
//! broadcast --sp 4002 -d /ip4/127.0.0.1/udp/4001/quic-v1/ipfs/<id52>
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   stdin ──► Broadcaster ──► StreamRegistry ──► PeerStream (writer) ──► peer
//!                                   ▲
//!   inbound accept ─────────────────┤
//!   outbound connect ───────────────┘
//!
//!   peer ──► PeerStream (reader) ──► Reader loop ──► Display ──► stdout
//! ```
//!
//! Each stream has exactly one reader (its reader loop) and one writer (the
//! broadcaster). The [`StreamRegistry`] is the only state shared between task
//! families; it guards the collection, never the stream I/O.

pub mod broadcaster;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod inbound;
pub mod locator;
pub mod node;
pub mod outbound;
pub mod reader;
pub mod registry;

#[cfg(test)]
mod testing;

pub use broadcaster::Delivery;
pub use config::{Cli, KeySource, NodeConfig};
pub use context::NodeContext;
pub use display::Display;
pub use error::{BroadcastError, ConnectError};
pub use locator::{AddressBook, AddressEntry, DialAddress, Locator, LocatorError, Retention, resolve};
pub use node::Node;
pub use registry::{Direction, PeerStream, StreamId, StreamRegistry};
