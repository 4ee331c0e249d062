//! Canonical data types shared across the zkml workspace.
//!
//! `Settings` is the load-bearing artifact here: two compiler runs with an
//! identical graph and identical `Settings` must produce bit-identical
//! circuits, so everything that influences layout lives in this struct and
//! is covered by its digest.

use serde::{Deserialize, Serialize};

use crate::fingerprint::content_digest;

/// Hard ceiling on the log2 row count any circuit or SRS may use.
pub const MAX_LOGROWS: u32 = 26;

/// Smallest circuit size we will lay out; avoids degenerate tiny domains.
pub const MIN_LOGROWS: u32 = 6;

/// Rows reserved for system bookkeeping on top of the constraint count.
pub const RESERVED_ROWS: u64 = 8;

/// Fiat–Shamir hashing strategy used to derive proof challenges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptType {
    /// Blake3-based transcript, optimized for off-chain verification.
    Native,
    /// Keccak-256 transcript, cheap to evaluate inside an EVM verifier.
    Evm,
}

impl std::fmt::Display for TranscriptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Evm => write!(f, "evm"),
        }
    }
}

/// Whether a proof is self-contained or carries the accumulator structure
/// required for later recursive aggregation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProofMode {
    /// Self-contained proof; verifies directly, not eligible for aggregation.
    Single,
    /// Accumulation-friendly proof; embeds the binding the aggregator folds.
    Accum,
}

impl std::fmt::Display for ProofMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Accum => write!(f, "accum"),
        }
    }
}

/// What the calibration search optimizes for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationTarget {
    /// Minimize resource usage (rows), then maximize scale.
    #[default]
    Resources,
    /// Minimize quantization error, then minimize resource usage.
    Accuracy,
}

/// Proving hyper-parameters for a single run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunArgs {
    /// Log2 denominator of the fixed-point representation used when quantizing.
    pub scale: u32,
    /// Bit width budget for quantized intermediate values.
    pub bits: u32,
    /// Ceiling on the log2 row count the caller will accept for this run.
    pub logrows: u32,
    /// Mean-absolute-error tolerance for calibration on dequantized outputs.
    pub tolerance: f64,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            scale: 7,
            bits: 16,
            logrows: 17,
            tolerance: 0.05,
        }
    }
}

/// Serialized description of a circuit's per-operator scales, shapes, and
/// resource budget: sufficient (with the original graph) to regenerate an
/// identical constraint system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Hyper-parameters the circuit was compiled under. `run_args.logrows`
    /// holds the *chosen* budget after compilation, not the caller's ceiling.
    pub run_args: RunArgs,
    /// Per-node fixed-point scale, indexed by node id.
    pub node_scales: Vec<u32>,
    /// Per-node output dimensions, indexed by node id.
    pub node_dims: Vec<Vec<usize>>,
    /// Scales of the graph output tensors, in output order.
    pub model_output_scales: Vec<u32>,
    /// Total number of constraint rows the circuit occupies.
    pub num_constraints: u64,
    /// Bit width actually required by the largest observed intermediate.
    pub required_bits: u32,
    /// Objective the settings were calibrated under.
    pub calibration_target: CalibrationTarget,
    /// Fingerprint of the canonical encoding of the originating graph.
    pub model_fingerprint: [u8; 32],
}

impl Settings {
    /// Stable digest over the canonical CBOR encoding of these settings.
    ///
    /// Embedded in keys and proofs so compatibility is bound by content,
    /// never by filename convention.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        let bytes = crate::io::to_cbor(self).unwrap_or_default();
        content_digest("zkml/settings/v1", &[&bytes])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_settings() -> Settings {
        Settings {
            run_args: RunArgs::default(),
            node_scales: vec![7, 7],
            node_dims: vec![vec![1, 4], vec![4]],
            model_output_scales: vec![7],
            num_constraints: 8,
            required_bits: 12,
            calibration_target: CalibrationTarget::Resources,
            model_fingerprint: [3u8; 32],
        }
    }

    #[test]
    fn settings_digest_is_stable_and_content_sensitive() {
        let s = dummy_settings();
        assert_eq!(s.digest(), s.digest());

        let mut s2 = s.clone();
        s2.run_args.scale = 8;
        assert_ne!(s.digest(), s2.digest());
    }

    #[test]
    fn settings_serde_roundtrip() {
        let s = dummy_settings();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
        assert_eq!(s.digest(), back.digest());
    }
}
