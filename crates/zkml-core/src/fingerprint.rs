//! Versioned, domain-separated content digests.
//!
//! Compatibility between graphs, settings, keys, and proofs is bound by
//! embedding these digests in the artifacts and checking them explicitly
//! at `setup`, `prove`, `verify`, and `aggregate` boundaries.

use blake3::Hasher;

/// Digest `chunks` under a fixed domain string, length-prefixing each chunk
/// so concatenation ambiguity cannot collide two distinct inputs.
#[must_use]
pub fn content_digest(domain: &str, chunks: &[&[u8]]) -> [u8; 32] {
    let mut h = Hasher::new();
    h.update(&(domain.len() as u32).to_le_bytes());
    h.update(domain.as_bytes());
    for c in chunks {
        h.update(&(c.len() as u64).to_le_bytes());
        h.update(c);
    }
    *h.finalize().as_bytes()
}

/// Circuit fingerprint binding a graph encoding to a settings digest.
#[must_use]
pub fn circuit_fingerprint(graph_fingerprint: &[u8; 32], settings_digest: &[u8; 32]) -> [u8; 32] {
    content_digest("zkml/circuit/v1", &[graph_fingerprint, settings_digest])
}
