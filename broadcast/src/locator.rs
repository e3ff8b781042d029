//! Peer locators and the address book.
//!
//! A locator tells an operator-supplied node both where a peer is and who it
//! is:
//!
//! ```text
//! /ip4/127.0.0.1/udp/4001/quic-v1/ipfs/<id52>
//! └──────── dial address ───────┘└ identity ┘
//! ```
//!
//! [`resolve`] splits the two, decodes the identity and records
//! identity → dial address in the [`AddressBook`], which the outbound
//! connector later reads to dial the peer.

use broadcast_net::PeerId;

/// How long an address book entry is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Never expired or evicted; the node only knows addresses it was given.
    Permanent,
}

/// A routable network address with the identity segment removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialAddress {
    text: String,
    socket_addr: std::net::SocketAddr,
}

impl DialAddress {
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        self.socket_addr
    }

    fn parse(segments: &[&str]) -> Result<Self, LocatorError> {
        let [ip_protocol, ip, transport, port, rest @ ..] = segments else {
            return Err(LocatorError::Malformed(format!(
                "expected /ip4|ip6/<ip>/udp|tcp/<port>, got /{}",
                segments.join("/")
            )));
        };

        let ip: std::net::IpAddr = match *ip_protocol {
            "ip4" => ip
                .parse::<std::net::Ipv4Addr>()
                .map_err(|_| LocatorError::InvalidIp(ip.to_string()))?
                .into(),
            "ip6" => ip
                .parse::<std::net::Ipv6Addr>()
                .map_err(|_| LocatorError::InvalidIp(ip.to_string()))?
                .into(),
            other => return Err(LocatorError::UnsupportedProtocol(other.to_string())),
        };

        if !matches!(*transport, "udp" | "tcp") {
            return Err(LocatorError::UnsupportedProtocol(transport.to_string()));
        }

        let port: u16 = port
            .parse()
            .map_err(|_| LocatorError::InvalidPort(port.to_string()))?;

        match rest {
            [] | ["quic"] | ["quic-v1"] => {}
            [other, ..] => return Err(LocatorError::UnsupportedProtocol(other.to_string())),
        }

        Ok(DialAddress {
            text: format!("/{}", segments.join("/")),
            socket_addr: std::net::SocketAddr::new(ip, port),
        })
    }
}

impl std::fmt::Display for DialAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// A parsed peer locator. Displays exactly as it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    text: String,
    peer: PeerId,
    dial_address: DialAddress,
}

impl Locator {
    /// Locator under which a node listening on `port` can be dialed locally.
    pub fn for_local_node(peer: PeerId, port: u16) -> Self {
        let socket_addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
        let dial_text = format!("/ip4/127.0.0.1/udp/{port}/quic-v1");
        Locator {
            text: format!("{dial_text}/ipfs/{}", peer.id52()),
            peer,
            dial_address: DialAddress {
                text: dial_text,
                socket_addr,
            },
        }
    }

    /// Rebuild the locator for an address book entry.
    pub fn from_entry(peer: PeerId, entry: &AddressEntry) -> Self {
        Locator {
            text: format!("{}/ipfs/{}", entry.dial_address, peer.id52()),
            peer,
            dial_address: entry.dial_address.clone(),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn dial_address(&self) -> &DialAddress {
        &self.dial_address
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::str::FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(LocatorError::Empty);
        }

        let Some(body) = text.strip_prefix('/') else {
            return Err(LocatorError::Malformed(format!(
                "locator must start with '/': {text}"
            )));
        };

        let segments: Vec<&str> = body.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(LocatorError::Malformed(format!(
                "empty segment in locator: {text}"
            )));
        }

        let identity_at = segments
            .iter()
            .position(|segment| matches!(*segment, "ipfs" | "p2p"))
            .ok_or(LocatorError::MissingIdentity)?;
        let identity = segments
            .get(identity_at + 1)
            .ok_or(LocatorError::MissingIdentity)?;
        if segments.len() > identity_at + 2 {
            return Err(LocatorError::TrailingSegments(
                segments[identity_at + 2..].join("/"),
            ));
        }

        let peer: PeerId = identity
            .parse()
            .map_err(|source| LocatorError::InvalidIdentity { source })?;

        if identity_at == 0 {
            return Err(LocatorError::MissingAddress);
        }
        let dial_address = DialAddress::parse(&segments[..identity_at])?;

        Ok(Locator {
            text: text.to_string(),
            peer,
            dial_address,
        })
    }
}

/// One address book record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    pub dial_address: DialAddress,
    pub retention: Retention,
}

/// Where known peers can be dialed, keyed by identity.
#[derive(Debug, Default)]
pub struct AddressBook {
    entries: std::sync::RwLock<std::collections::HashMap<PeerId, AddressEntry>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) how to reach `peer`.
    pub fn insert(&self, peer: PeerId, entry: AddressEntry) {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(peer, entry);
    }

    pub fn get(&self, peer: &PeerId) -> Option<AddressEntry> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(peer)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse `locator` and record its peer in `book` with permanent retention.
pub fn resolve(book: &AddressBook, locator: &str) -> Result<(PeerId, AddressEntry), LocatorError> {
    let locator: Locator = locator.parse()?;
    let entry = AddressEntry {
        dial_address: locator.dial_address.clone(),
        retention: Retention::Permanent,
    };

    tracing::debug!(peer = %locator.peer, address = %entry.dial_address, "Added peer to address book");
    book.insert(locator.peer, entry.clone());
    Ok((locator.peer, entry))
}

/// Errors when parsing a peer locator
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    #[error("empty locator")]
    Empty,

    #[error("malformed locator: {0}")]
    Malformed(String),

    #[error("unsupported address protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("locator has no /ipfs/<peer-id> segment")]
    MissingIdentity,

    #[error("locator has no network address before the peer id")]
    MissingAddress,

    #[error("invalid peer id: {source}")]
    InvalidIdentity { source: broadcast_net::ParseId52Error },

    #[error("unexpected segments after the peer id: {0}")]
    TrailingSegments(String),
}
