//! Local key material.
//!
//! A node's identity is an Ed25519 key pair. The secret half comes from one of
//! three places: fresh OS randomness, a seed derived from the listen port (so
//! the node id is the same on every run, handy while testing by hand), or a
//! hex encoded key file that is created on first use.

use rand::{RngCore, SeedableRng};

/// Generate a fresh key from the operating system's secure RNG.
pub fn generate() -> iroh::SecretKey {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    iroh::SecretKey::from_bytes(&bytes)
}

/// Deterministic key derived from `port`.
///
/// Never use this outside local testing: anyone who knows the port knows the
/// key.
pub fn from_port_seed(port: u16) -> iroh::SecretKey {
    let mut rng = rand::rngs::StdRng::seed_from_u64(u64::from(port));
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    iroh::SecretKey::from_bytes(&bytes)
}

/// Reads an existing secret key or creates a new one if none exists.
///
/// The file holds the 32 secret bytes as lowercase hex; surrounding whitespace
/// is ignored.
#[tracing::instrument]
pub async fn read_or_create(path: &std::path::Path) -> Result<iroh::SecretKey, KeyError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => {
            let key = decode_hex_key(contents.trim())?;
            tracing::info!("Loaded existing key: {}", crate::PeerId::from(key.public()));
            Ok(key)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No existing key found, generating new one");
            let key = generate();
            let encoded = data_encoding::HEXLOWER.encode(&key.to_bytes());

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| KeyError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
            tokio::fs::write(path, format!("{encoded}\n"))
                .await
                .map_err(|source| KeyError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;

            tracing::info!("Generated and saved new key: {}", crate::PeerId::from(key.public()));
            Ok(key)
        }
        Err(source) => Err(KeyError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn decode_hex_key(text: &str) -> Result<iroh::SecretKey, KeyError> {
    let bytes = data_encoding::HEXLOWER_PERMISSIVE
        .decode(text.as_bytes())
        .map_err(|e| KeyError::InvalidHex(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
    Ok(iroh::SecretKey::from_bytes(&bytes))
}

/// Errors while obtaining local key material
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("key file is not valid hex: {0}")]
    InvalidHex(String),

    #[error("secret key must be 32 bytes, got {0}")]
    InvalidLength(usize),
}
