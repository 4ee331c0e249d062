//! Proof artifact shared across the prover, verifier, aggregator, and CLI.
//!
//! [`ProofArtifact`] is intentionally minimal: it pins the transcript
//! strategy and proof mode, the circuit fingerprint it was produced for,
//! the public instances, the opaque `proof_bytes`, and a free-form `meta`
//! JSON value for lightweight diagnostics.
//!
//! `meta` is for human/ops diagnostics only (timings, parameter echoes).
//! If a value matters at runtime, promote it into a stable, typed field.

use serde::{Deserialize, Serialize};

use crate::types::{ProofMode, TranscriptType};

/// Serialized proof produced by the prover.
///
/// **Invariants**
/// - `fingerprint` must match the circuit fingerprint embedded in the
///   verification key; verifiers reject mismatches.
/// - `instances` are input digests followed by output digests, in graph
///   order; the verification key fixes the expected counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofArtifact {
    /// Fiat–Shamir strategy the proof was produced under.
    pub transcript: TranscriptType,
    /// Whether the proof is self-contained or accumulation-friendly.
    pub mode: ProofMode,
    /// Circuit fingerprint (graph + settings) the proof is bound to.
    pub fingerprint: [u8; 32],
    /// Public instances: one digest per graph input, then per graph output.
    pub instances: Vec<[u8; 32]>,
    /// Opaque, scheme-specific encoding of the proof.
    pub proof_bytes: Vec<u8>,
    /// Free-form metadata for debugging/observability.
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl ProofArtifact {
    /// Construct a new [`ProofArtifact`].
    #[must_use]
    pub fn new(
        transcript: TranscriptType,
        mode: ProofMode,
        fingerprint: [u8; 32],
        instances: Vec<[u8; 32]>,
        proof_bytes: Vec<u8>,
        meta: serde_json::Value,
    ) -> Self {
        Self {
            transcript,
            mode,
            fingerprint,
            instances,
            proof_bytes,
            meta,
        }
    }

    /// Proof bytes as a slice.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.proof_bytes
    }

    /// Hex rendering of the proof bytes (used by `print-proof-hex`).
    #[must_use]
    pub fn hex(&self) -> String {
        hex::encode(&self.proof_bytes)
    }

    /// Whether this proof is eligible for aggregation.
    #[inline]
    #[must_use]
    pub fn is_aggregatable(&self) -> bool {
        self.mode == ProofMode::Accum
    }
}
