//! Quantized forward execution and witness generation.
//!
//! [`execute_quantized`] produces the full per-node trace the prover
//! commits to; [`forward`] wraps it into the on-disk [`Witness`] with
//! public-instance digests. [`execute_f64`] is the float reference used
//! by calibration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use zkml_core::{short_hex, Error, Settings};
use zkml_crypto::instance_digest;

use crate::error::GraphError;
use crate::model::OpGraph;
use crate::quantize::{dequantize_vec, quantize_vec};

/// Input tensors as stored in a data file, row-major, one entry per
/// `Input` node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    /// Unquantized input tensors.
    pub input_data: Vec<Vec<f64>>,
}

/// A witness: the model run a proof attests to.
///
/// Inputs are kept unquantized so the prover can rebuild the exact
/// trace; digests over the quantized tensors are the public instances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Witness {
    /// Unquantized input tensors, one per `Input` node.
    pub input_data: Vec<Vec<f64>>,
    /// Declared shapes of the input tensors.
    pub input_shapes: Vec<Vec<usize>>,
    /// Dequantized output tensors, one per output node.
    pub output_data: Vec<Vec<f64>>,
    /// Public-instance digests of the quantized inputs.
    pub input_digests: Vec<[u8; 32]>,
    /// Public-instance digests of the quantized outputs.
    pub output_digests: Vec<[u8; 32]>,
}

impl Witness {
    /// All public-instance digests: inputs first, then outputs.
    #[must_use]
    pub fn instances(&self) -> Vec<[u8; 32]> {
        let mut out = self.input_digests.clone();
        out.extend_from_slice(&self.output_digests);
        out
    }
}

/// Run the quantized forward pass, returning the output tensor of every
/// node in id order.
///
/// `inputs` are already quantized at the run scale, one tensor per
/// `Input` node in declaration order.
pub fn execute_quantized(
    graph: &OpGraph,
    inputs: &[Vec<i64>],
) -> Result<Vec<Vec<i64>>, GraphError> {
    if inputs.len() != graph.input_ids.len() {
        return Err(GraphError::InputCount {
            expected: graph.input_ids.len(),
            got: inputs.len(),
        });
    }
    let run_scale = graph.nodes[graph.input_ids[0]].out_scale;
    let mut trace: Vec<Vec<i64>> = Vec::with_capacity(graph.nodes.len());
    let mut next_input = 0usize;
    for node in &graph.nodes {
        let out = if node.opkind.is_input() {
            let tensor = &inputs[next_input];
            next_input += 1;
            node.opkind.eval_quantized(
                node.idx,
                &[(tensor.as_slice(), node.out_dims.as_slice(), node.out_scale)],
                node.out_scale,
                run_scale,
            )?
        } else {
            let gathered: Vec<(&[i64], &[usize], u32)> = node
                .inputs
                .iter()
                .map(|&i| {
                    (
                        trace[i].as_slice(),
                        graph.nodes[i].out_dims.as_slice(),
                        graph.nodes[i].out_scale,
                    )
                })
                .collect();
            node.opkind
                .eval_quantized(node.idx, &gathered, node.out_scale, run_scale)?
        };
        trace.push(out);
    }
    Ok(trace)
}

/// Run the float forward pass, returning every node's output in id
/// order. Reference semantics for calibration error measurement.
pub fn execute_f64(graph: &OpGraph, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, GraphError> {
    if inputs.len() != graph.input_ids.len() {
        return Err(GraphError::InputCount {
            expected: graph.input_ids.len(),
            got: inputs.len(),
        });
    }
    let mut trace: Vec<Vec<f64>> = Vec::with_capacity(graph.nodes.len());
    let mut next_input = 0usize;
    for node in &graph.nodes {
        let out = if node.opkind.is_input() {
            let tensor = &inputs[next_input];
            next_input += 1;
            tensor.clone()
        } else {
            let gathered: Vec<(&[f64], &[usize])> = node
                .inputs
                .iter()
                .map(|&i| (trace[i].as_slice(), graph.nodes[i].out_dims.as_slice()))
                .collect();
            node.opkind.eval_f64(node.idx, &gathered)?
        };
        trace.push(out);
    }
    Ok(trace)
}

fn check_input_shapes(graph: &OpGraph, data: &InputData) -> Result<(), GraphError> {
    let shapes = graph.input_shapes();
    if data.input_data.len() != shapes.len() {
        return Err(GraphError::InputCount {
            expected: shapes.len(),
            got: data.input_data.len(),
        });
    }
    for (index, (tensor, dims)) in data.input_data.iter().zip(shapes.iter()).enumerate() {
        let expected: usize = dims.iter().product();
        if tensor.len() != expected {
            return Err(GraphError::InputShape {
                index,
                expected,
                got: tensor.len(),
                dims: dims.clone(),
            });
        }
    }
    Ok(())
}

/// Quantize `data` at the settings scale, run the graph, and assemble
/// the witness.
///
/// Fails with a settings mismatch when `settings` was compiled from a
/// different graph.
pub fn forward(
    graph: &OpGraph,
    settings: &Settings,
    data: &InputData,
) -> Result<Witness, GraphError> {
    let graph_fp = graph.fingerprint()?;
    if settings.model_fingerprint != graph_fp {
        return Err(Error::SettingsMismatch {
            settings: short_hex(&settings.model_fingerprint),
            graph: short_hex(&graph_fp),
        }
        .into());
    }
    check_input_shapes(graph, data)?;

    let scale = settings.run_args.scale;
    let quantized: Vec<Vec<i64>> = data
        .input_data
        .iter()
        .map(|t| quantize_vec(t, scale))
        .collect();
    let trace = execute_quantized(graph, &quantized)?;

    let input_digests: Vec<[u8; 32]> = quantized.iter().map(|t| instance_digest(t)).collect();
    let output_digests: Vec<[u8; 32]> = graph
        .output_ids
        .iter()
        .map(|&i| instance_digest(&trace[i]))
        .collect();
    let output_data: Vec<Vec<f64>> = graph
        .output_ids
        .iter()
        .map(|&i| dequantize_vec(&trace[i], graph.nodes[i].out_scale))
        .collect();
    debug!(
        inputs = input_digests.len(),
        outputs = output_digests.len(),
        "generated witness"
    );

    Ok(Witness {
        input_data: data.input_data.clone(),
        input_shapes: graph.input_shapes(),
        output_data,
        input_digests,
        output_digests,
    })
}
