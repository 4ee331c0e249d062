//! Error taxonomy for the proving lifecycle.
//!
//! Structural/precondition failures surface here with enough context to
//! diagnose (offending node id, required vs available resources). Proof
//! *rejection* is not represented in this enum: verifiers return
//! `Ok(false)` for a well-formed-but-wrong proof and reserve errors for
//! inputs that cannot be used at all.

use thiserror::Error;

/// Shared lifecycle errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No row budget within the configured ceiling fits the constraints.
    #[error("resource budget exceeded: need 2^{needed} rows, ceiling is 2^{ceiling}")]
    ResourceExceeded {
        /// Smallest log2 row count that would fit the circuit.
        needed: u32,
        /// Largest log2 row count the caller allowed.
        ceiling: u32,
    },

    /// The SRS is too small for the requested circuit size.
    #[error("setup failed: circuit needs 2^{needed} rows but SRS provides 2^{available}")]
    SrsTooSmall {
        /// Log2 rows required by the settings.
        needed: u32,
        /// Log2 rows the SRS supports.
        available: u32,
    },

    /// The settings artifact does not describe the supplied graph.
    #[error("settings fingerprint {settings} does not match graph fingerprint {graph}")]
    SettingsMismatch {
        /// Hex fingerprint recorded in the settings.
        settings: String,
        /// Hex fingerprint of the supplied graph.
        graph: String,
    },

    /// Witness tensor shapes disagree with the circuit layout.
    #[error("witness mismatch at input {index}: expected shape {expected:?}, got {got:?}")]
    WitnessMismatch {
        /// Index of the offending input tensor.
        index: usize,
        /// Shape the settings/key expect.
        expected: Vec<usize>,
        /// Shape found in the witness.
        got: Vec<usize>,
    },

    /// The proving key was not derived from the supplied settings.
    #[error("proving key settings digest {key} does not match supplied settings digest {settings}")]
    ProvingKeyMismatch {
        /// Hex digest embedded in the key.
        key: String,
        /// Hex digest of the supplied settings.
        settings: String,
    },

    /// A key is bound to a different SRS than the one supplied.
    #[error("key is bound to SRS digest {key} but the supplied SRS has digest {srs}")]
    SrsMismatch {
        /// Hex digest embedded in the key.
        key: String,
        /// Hex digest of the supplied SRS.
        srs: String,
    },

    /// Graph execution failed while building or checking a trace.
    #[error("graph execution failed: {0}")]
    Graph(String),

    /// Artifact read/write failure.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact encoding/decoding failure.
    #[error("codec: {0}")]
    Codec(String),
}

impl Error {
    /// Build a `Codec` error from any displayable codec failure.
    #[must_use]
    pub fn codec(e: impl std::fmt::Display) -> Self {
        Self::Codec(e.to_string())
    }
}

/// Short hex rendering used in error context.
#[must_use]
pub fn short_hex(digest: &[u8; 32]) -> String {
    hex::encode(&digest[..8])
}
