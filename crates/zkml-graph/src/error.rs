//! Graph-level errors.
//!
//! Node ids reference `idx` order. A cycle can only manifest as a node
//! referencing itself or a later node, since ids are assigned in
//! declaration order; [`GraphError::NonTopological`] is therefore the
//! cycle-detection failure.

use thiserror::Error;

/// Errors raised while building or executing a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Shape propagation failed for a node.
    #[error("invalid dimensions used for node {0} ({1})")]
    InvalidDims(usize, String),

    /// An operator received the wrong number of inputs for its kind.
    #[error("wrong number of inputs for node {idx} ({op}): expected {expected}, got {got}")]
    InvalidInputCount {
        /// Offending node id.
        idx: usize,
        /// Operator name.
        op: String,
        /// Inputs the operator kind requires.
        expected: usize,
        /// Inputs the declaration supplied.
        got: usize,
    },

    /// A node references itself or a later node.
    #[error("node {idx} references node {input}, which is not an earlier node (cycle or forward reference)")]
    NonTopological {
        /// Offending node id.
        idx: usize,
        /// The out-of-order reference.
        input: usize,
    },

    /// A requested node is missing in the graph.
    #[error("a requested node is missing in the graph: {0}")]
    MissingNode(usize),

    /// The graph declares no input nodes.
    #[error("graph has no input nodes")]
    NoInputs,

    /// Division nodes only support positive constant divisors.
    #[error("division by a non-positive constant in node {0}")]
    InvalidDivisor(usize),

    /// A quantized intermediate overflowed the accumulator width.
    #[error("quantized value overflowed the accumulator width at node {0}")]
    ValueOverflow(usize),

    /// A node's composed fixed-point scale left the 64-bit value domain.
    #[error("node {idx} composes fixed-point scale {scale}, above the supported maximum {max}")]
    ScaleOverflow {
        /// Offending node id.
        idx: usize,
        /// The composed scale.
        scale: u32,
        /// Largest representable scale.
        max: u32,
    },

    /// Wrong number of input tensors supplied for execution.
    #[error("wrong number of input tensors: expected {expected}, got {got}")]
    InputCount {
        /// Inputs the graph declares.
        expected: usize,
        /// Tensors supplied.
        got: usize,
    },

    /// A lifecycle-level error surfaced during a graph operation.
    #[error(transparent)]
    Core(#[from] zkml_core::Error),

    /// An input tensor's element count disagrees with the declared shape.
    #[error("input tensor {index} has {got} elements, expected {expected} for shape {dims:?}")]
    InputShape {
        /// Index of the offending input tensor.
        index: usize,
        /// Element count the declared shape requires.
        expected: usize,
        /// Element count supplied.
        got: usize,
        /// The declared shape.
        dims: Vec<usize>,
    },
}
