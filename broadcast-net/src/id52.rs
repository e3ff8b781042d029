/// Identity of a peer on the broadcast network.
///
/// Wraps the peer's Ed25519 public key (its iroh node id). The text form is the
/// ID52 encoding: the 32 key bytes in BASE32_DNSSEC, always 52 lowercase
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(iroh::PublicKey);

const ID52_LEN: usize = 52;

impl PeerId {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, ParseId52Error> {
        iroh::PublicKey::from_bytes(bytes)
            .map(PeerId)
            .map_err(|e| ParseId52Error::InvalidKey(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// ID52 text form of this identity.
    pub fn id52(&self) -> String {
        data_encoding::BASE32_DNSSEC.encode(self.0.as_bytes())
    }

    /// The iroh node id used to dial this peer.
    pub fn node_id(&self) -> iroh::NodeId {
        self.0
    }
}

impl From<iroh::PublicKey> for PeerId {
    fn from(key: iroh::PublicKey) -> Self {
        PeerId(key)
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id52())
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerId({})", self.id52())
    }
}

impl std::str::FromStr for PeerId {
    type Err = ParseId52Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ID52_LEN {
            return Err(ParseId52Error::InvalidLength {
                expected: ID52_LEN,
                got: s.len(),
            });
        }

        let decoded = data_encoding::BASE32_DNSSEC
            .decode(s.as_bytes())
            .map_err(|e| ParseId52Error::InvalidEncoding(e.to_string()))?;

        let bytes: [u8; 32] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| ParseId52Error::InvalidLength {
                expected: 32,
                got: decoded.len(),
            })?;

        PeerId::from_bytes(&bytes)
    }
}

/// Errors when parsing ID52 strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseId52Error {
    #[error("ID52 must be {expected} characters, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("ID52 is not valid BASE32_DNSSEC: {0}")]
    InvalidEncoding(String),

    #[error("ID52 does not decode to an Ed25519 public key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id52_round_trip() {
        let peer = PeerId::from(crate::secret::from_port_seed(7).public());
        let text = peer.id52();

        assert_eq!(text.len(), 52);
        assert!(text.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_eq!(text.parse::<PeerId>().unwrap(), peer);
        assert_eq!(peer.to_string(), text);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "abc".parse::<PeerId>().unwrap_err();
        assert_eq!(err, ParseId52Error::InvalidLength { expected: 52, got: 3 });
    }

    #[test]
    fn rejects_characters_outside_alphabet() {
        // 'w'..'z' are not part of the BASE32_DNSSEC alphabet
        let text = "w".repeat(52);
        assert!(matches!(
            text.parse::<PeerId>(),
            Err(ParseId52Error::InvalidEncoding(_))
        ));
    }
}
