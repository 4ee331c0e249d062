//! zkml-crypto — the crypto substrate the proving lifecycle calls into.
//!
//! - [`field`]: 64-bit prime field used for canonical encodings of
//!   quantized values.
//! - [`transcript`]: domain-separated Fiat–Shamir transcripts; Blake3 for
//!   the native strategy, Keccak-256 for the EVM-compatible one.
//! - [`merkle`]: Merkle commitments with authentication paths over
//!   32-byte leaves.
//! - [`digest`]: instance and trace-leaf digests over quantized tensors.
//!
//! The exact instance hash and rounding convention are pluggable
//! primitives from the engine's point of view; this crate fixes one
//! choice and the rest of the workspace applies it consistently.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all)]

/// Instance/trace digests over quantized field encodings.
pub mod digest;
/// Minimal prime-field wrapper for canonical value encodings.
pub mod field;
/// Merkle commitments with authentication paths.
pub mod merkle;
/// Fiat–Shamir transcript trait and implementations.
pub mod transcript;

pub use digest::{instance_digest, instances_digest, trace_leaf_digest};
pub use field::{Fq, GOLDILOCKS};
pub use merkle::{verify_path, MerklePath, MerkleTree};
pub use transcript::{
    challenge_indices, Blake3Transcript, KeccakTranscript, Transcript,
};
