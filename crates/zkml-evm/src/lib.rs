//! zkml-evm — deployable verifier artifacts and a local interpreter.
//!
//! `create-evm-verifier` bakes a verifying key, its SRS digest binding,
//! and the settings into a self-contained bytecode program plus a
//! human-readable assembly listing. `verify-evm` runs that program
//! locally against a proof file, reproducing exactly the decision the
//! deployed contract would make.
//!
//! On-chain circuits are capped harder than native ones: exporting a
//! verifier for a circuit above [`EVM_MAX_LOGROWS`] is refused.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all)]

/// Bytecode container format: magic, opcodes, operand framing.
pub mod bytecode;
/// Verifier program assembly (single and aggregate).
pub mod export;
/// Local execution of exported verifier programs.
pub mod interpreter;

pub use bytecode::{Instruction, Opcode, Program, BYTECODE_VERSION, MAGIC};
pub use export::{export_aggregate_verifier, export_verifier, VerifierArtifact, EVM_MAX_LOGROWS};
pub use interpreter::execute;

use thiserror::Error as ThisError;

/// Errors raised while exporting or executing verifier artifacts.
#[derive(Debug, ThisError)]
pub enum ExportError {
    /// The circuit is too large to verify on-chain.
    #[error("circuit uses 2^{logrows} rows; EVM verifiers support at most 2^{max}")]
    CircuitTooLarge {
        /// Log2 row count of the circuit.
        logrows: u32,
        /// The on-chain ceiling.
        max: u32,
    },

    /// The bytecode is structurally invalid.
    #[error("malformed verifier bytecode: {0}")]
    Malformed(String),

    /// The proof supplied as calldata does not decode.
    #[error("calldata does not decode as a proof artifact: {0}")]
    BadCalldata(String),

    /// A lifecycle error from the embedded verifier.
    #[error(transparent)]
    Core(#[from] zkml_core::Error),

    /// An aggregation error from the embedded aggregate verifier.
    #[error(transparent)]
    Aggregate(#[from] zkml_aggregate::AggregateError),
}
