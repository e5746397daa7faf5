//! Deterministic chunk identifiers.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Source identity used when a document carries no `source_file`.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Derive the id of the `chunk_index`-th chunk of `source`.
///
/// The id is the first 16 bytes of `SHA-256("{source}:{chunk_index}")` rendered
/// as a hyphenated UUID, which every supported store accepts as a point id.
/// It depends only on its two inputs, never on chunk content.
pub fn chunk_id(source: &str, chunk_index: usize) -> String {
    let digest = Sha256::digest(format!("{source}:{chunk_index}").as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_id() {
        assert_eq!(chunk_id("AAPL/10-K.html", 3), chunk_id("AAPL/10-K.html", 3));
    }

    #[test]
    fn different_inputs_differ() {
        let a = chunk_id("AAPL/10-K.html", 0);
        assert_ne!(a, chunk_id("AAPL/10-K.html", 1));
        assert_ne!(a, chunk_id("MSFT/10-K.html", 0));
        // "a:11" vs "a1:1" style collisions are ruled out by the separator
        assert_ne!(chunk_id("a", 11), chunk_id("a1", 1));
    }

    #[test]
    fn id_is_uuid_shaped() {
        let id = chunk_id(UNKNOWN_SOURCE, 0);
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(id.len(), 36);
    }
}
