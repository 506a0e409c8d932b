use sha2::{Digest, Sha256};

/// Length of every identifier handed out by the engine.
pub const ID_LEN: usize = 20;

/// Derive a stable 20-character identifier from a canonical key.
///
/// The key is hashed with SHA-256 and the first 10 bytes are hex encoded,
/// so the same key yields the same id across rebuilds and processes.
pub fn id_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..ID_LEN / 2])
}

/// Canonical key for an entry below a collection root.
pub fn item_key(collection_id: &str, rel_path: &str) -> String {
    let rel = rel_path.trim_matches('/');
    format!("{collection_id}/{rel}")
}
