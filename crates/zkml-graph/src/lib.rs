//! zkml-graph — typed op graph, quantized execution, and calibration.
//!
//! A graph file (already lowered from its source format by an external
//! loader) is a flat list of operator declarations. This crate builds the
//! validated [`OpGraph`] from it, propagates shapes and fixed-point scales
//! per operator, renders the inspection table, runs the quantized forward
//! pass that witness generation and proving share, and searches the scale
//! space during calibration.
//!
//! The quantized evaluation rules here are the single source of truth for
//! circuit semantics: forward execution, the mock prover, the prover's
//! trace builder, and the verifier's sampled re-execution all call into
//! [`op::OpKind::eval_quantized`].

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs, clippy::all)]

/// Scale calibration search.
pub mod calibrate;
/// Graph-level error taxonomy.
pub mod error;
/// Quantized forward execution and witness generation.
pub mod forward;
/// Graph model: declarations, validation, table rendering, compilation.
pub mod model;
/// Graph nodes (one operator instance each).
pub mod node;
/// The closed operator vocabulary and its propagation/evaluation rules.
pub mod op;
/// Fixed-point quantization helpers.
pub mod quantize;

pub use calibrate::{calibrate, CalibrationReport};
pub use error::GraphError;
pub use forward::{execute_f64, execute_quantized, forward, InputData, Witness};
pub use model::{GraphFile, NodeDecl, OpGraph, GRAPH_FORMAT_VERSION, MAX_COMPOSED_SCALE};
pub use node::Node;
pub use op::OpKind;
