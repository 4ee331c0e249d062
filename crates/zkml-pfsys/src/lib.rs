//! zkml-pfsys — the proof system: SRS, keys, prover, verifier.
//!
//! The scheme commits to the full quantized execution trace with a
//! Merkle tree, derives query positions by Fiat–Shamir, and opens the
//! queried nodes together with their direct inputs so the verifier can
//! re-execute exactly those constraints. Public instances are digests of
//! the quantized input and output tensors.
//!
//! Everything is content-bound: keys embed the circuit fingerprint and
//! the SRS digest, proofs embed the fingerprint, and verification
//! *rejects* (returns `Ok(false)`) on any proof-side inconsistency while
//! reserving errors for unusable inputs such as a mismatched SRS.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all)]

/// Proving/verifying key generation and persistence.
pub mod keys;
/// Constraint-satisfaction check without proof generation.
pub mod mock;
/// Proof generation.
pub mod prover;
/// Structured reference string generation and persistence.
pub mod srs;
/// Proof verification.
pub mod verifier;

pub use keys::{load_pk, load_vk, save_pk, save_vk, setup, ProvingKey, VerifyingKey, KEY_FORMAT_VERSION};
pub use mock::mock;
pub use prover::{make_transcript, prove, NUM_QUERIES, PROOF_DOMAIN};
pub use srs::{gen_srs, Srs, SRS_FORMAT_VERSION};
pub use verifier::verify;

use zkml_core::Error;
use zkml_graph::GraphError;

/// Lift a graph failure into the lifecycle error taxonomy.
pub(crate) fn lift(e: GraphError) -> Error {
    match e {
        GraphError::Core(c) => c,
        other => Error::Graph(other.to_string()),
    }
}
