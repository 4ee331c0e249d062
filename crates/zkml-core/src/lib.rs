//! zkml-core — shared types, error taxonomy, and artifact I/O.
//!
//! This crate defines the **stable boundary** used across zkml crates:
//! - canonical data types (`RunArgs`, `Settings`, `ProofArtifact`, …),
//! - the error taxonomy shared by every lifecycle operation,
//! - JSON/CBOR artifact I/O with extension auto-detection, and
//! - content fingerprints binding graphs, settings, and keys together.
//!
//! Artifacts (settings, keys, SRS, proofs) are produced once and treated
//! as immutable, content-addressed files; no component mutates another
//! component's artifact in place.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all)]

/// Proof artifact type (opaque proof bytes, transcript/mode tags, instances).
pub mod artifact;
/// Error taxonomy shared across the proving lifecycle.
pub mod error;
/// Content fingerprints (versioned, domain-separated digests).
pub mod fingerprint;
/// JSON/CBOR/bincode helpers and auto-detecting read/write APIs.
pub mod io;
/// Canonical core data types shared across the workspace.
pub mod types;

pub use artifact::*;
pub use error::*;
pub use fingerprint::*;
pub use io::*;
pub use types::*;

/// Commonly-used items for quick imports.
pub mod prelude {
    pub use crate::{
        artifact::ProofArtifact,
        error::Error,
        types::{CalibrationTarget, ProofMode, RunArgs, Settings, TranscriptType},
    };
}
