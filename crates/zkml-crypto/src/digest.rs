//! Digests over quantized tensors.
//!
//! Values are mapped into [`Fq`](crate::field::Fq) and hashed in their
//! canonical little-endian encoding, so the digest a verifier recomputes
//! from opened circuit values is bit-identical to the one forward
//! execution committed to. Wire-stable; bump the version string on any
//! format change.

use blake3::Hasher;

use crate::field::Fq;

fn hash_values(domain: &str, values: &[i64], extra: Option<u64>) -> [u8; 32] {
    let mut h = Hasher::new();
    h.update(&(domain.len() as u32).to_le_bytes());
    h.update(domain.as_bytes());
    if let Some(x) = extra {
        h.update(&x.to_le_bytes());
    }
    h.update(&(values.len() as u64).to_le_bytes());
    for &v in values {
        h.update(&Fq::from_i64(v).to_le_bytes());
    }
    *h.finalize().as_bytes()
}

/// Public-instance digest of one quantized input/output tensor.
#[must_use]
pub fn instance_digest(values: &[i64]) -> [u8; 32] {
    hash_values("zkml/instance/v1", values, None)
}

/// Trace-leaf digest for the output tensor of node `idx`.
///
/// Binds the node id so two nodes with equal outputs commit differently.
#[must_use]
pub fn trace_leaf_digest(idx: u32, values: &[i64]) -> [u8; 32] {
    hash_values("zkml/trace-leaf/v1", values, Some(u64::from(idx)))
}

/// Digest over an ordered list of instance digests.
#[must_use]
pub fn instances_digest(instances: &[[u8; 32]]) -> [u8; 32] {
    let mut h = Hasher::new();
    h.update(b"zkml/instances/v1");
    h.update(&(instances.len() as u64).to_le_bytes());
    for d in instances {
        h.update(d);
    }
    *h.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_digest_sensitive_to_values_and_length() {
        assert_ne!(instance_digest(&[1, 2, 3]), instance_digest(&[1, 2, 4]));
        assert_ne!(instance_digest(&[1, 2]), instance_digest(&[1, 2, 0]));
        assert_ne!(instance_digest(&[-1]), instance_digest(&[1]));
    }

    #[test]
    fn leaf_digest_binds_node_id() {
        assert_ne!(trace_leaf_digest(0, &[5]), trace_leaf_digest(1, &[5]));
    }

    #[test]
    fn instance_and_leaf_domains_differ() {
        // Same payload, different roles: must not collide.
        assert_ne!(instance_digest(&[7]), trace_leaf_digest(0, &[7]));
    }
}
