//! Graph model: declarations on disk, the validated graph, and
//! compilation into circuit [`Settings`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tabled::Table;
use tracing::debug;

use zkml_core::{
    content_digest, CalibrationTarget, Error, RunArgs, Settings, MAX_LOGROWS, MIN_LOGROWS,
    RESERVED_ROWS,
};

use crate::error::GraphError;
use crate::node::Node;
use crate::op::OpKind;

/// On-disk graph file format version.
pub const GRAPH_FORMAT_VERSION: u16 = 1;

/// Largest composed fixed-point scale a node may reach. Values live in
/// `i64`, so a scale at or past the bit width cannot represent even 1.0.
pub const MAX_COMPOSED_SCALE: u32 = 63;

/// One operator declaration as stored in a graph file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDecl {
    /// The operator.
    pub op: OpKind,
    /// Ids of earlier nodes feeding this one.
    #[serde(default)]
    pub inputs: Vec<usize>,
}

/// A graph file: versioned flat list of declarations in topological
/// order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphFile {
    /// Format version, currently [`GRAPH_FORMAT_VERSION`].
    pub version: u16,
    /// Operator declarations, id = position.
    pub nodes: Vec<NodeDecl>,
}

impl GraphFile {
    /// Read a graph file (JSON or CBOR by extension).
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file: Self = zkml_core::read_auto(path)?;
        if file.version != GRAPH_FORMAT_VERSION {
            return Err(Error::codec(format!(
                "unsupported graph format version {} (expected {GRAPH_FORMAT_VERSION})",
                file.version
            )));
        }
        Ok(file)
    }
}

/// A validated operator graph with resolved shapes, scales, and wiring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpGraph {
    /// Nodes in topological (declaration) order.
    pub nodes: Vec<Node>,
    /// Ids of `Input` nodes, in declaration order.
    pub input_ids: Vec<usize>,
    /// Ids of output nodes (nodes no other node consumes), in id order.
    pub output_ids: Vec<usize>,
}

impl OpGraph {
    /// Validate declarations and resolve every node's shape and scale.
    ///
    /// Fails on wrong arity, forward/self references, shape errors, a
    /// composed scale past [`MAX_COMPOSED_SCALE`], or a graph without
    /// inputs. Output nodes are the sinks: nodes that no other node
    /// consumes.
    pub fn new(decls: &[NodeDecl], run_scale: u32) -> Result<Self, GraphError> {
        let mut nodes: Vec<Node> = Vec::with_capacity(decls.len());
        let mut consumed = vec![false; decls.len()];

        for (idx, decl) in decls.iter().enumerate() {
            let expected = decl.op.num_inputs();
            if decl.inputs.len() != expected {
                return Err(GraphError::InvalidInputCount {
                    idx,
                    op: decl.op.as_string().to_string(),
                    expected,
                    got: decl.inputs.len(),
                });
            }
            let mut in_dims = Vec::with_capacity(expected);
            let mut in_scales = Vec::with_capacity(expected);
            for &input in &decl.inputs {
                if input >= idx {
                    return Err(GraphError::NonTopological { idx, input });
                }
                consumed[input] = true;
                in_dims.push(nodes[input].out_dims.clone());
                in_scales.push(nodes[input].out_scale);
            }
            let out_dims = decl.op.out_dims(idx, &in_dims)?;
            let out_scale = decl.op.out_scale(&in_scales, run_scale);
            // Mul/MatMul sum their input scales, so chains compose
            // unboundedly; cap at the value domain here so every
            // downstream shift amount is in range.
            if out_scale > MAX_COMPOSED_SCALE {
                return Err(GraphError::ScaleOverflow {
                    idx,
                    scale: out_scale,
                    max: MAX_COMPOSED_SCALE,
                });
            }
            nodes.push(Node {
                opkind: decl.op.clone(),
                out_scale,
                inputs: decl.inputs.clone(),
                out_dims,
                idx,
            });
        }

        let input_ids: Vec<usize> = nodes
            .iter()
            .filter(|n| n.opkind.is_input())
            .map(|n| n.idx)
            .collect();
        if input_ids.is_empty() {
            return Err(GraphError::NoInputs);
        }
        let output_ids: Vec<usize> = (0..nodes.len()).filter(|&i| !consumed[i]).collect();

        Ok(Self { nodes, input_ids, output_ids })
    }

    /// Render the per-node inspection table.
    #[must_use]
    pub fn table(&self) -> String {
        Table::new(&self.nodes).to_string()
    }

    /// Canonical serialized form of the graph (CBOR).
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        zkml_core::to_cbor(self)
    }

    /// Content fingerprint of the graph structure.
    pub fn fingerprint(&self) -> Result<[u8; 32], Error> {
        let bytes = self.canonical_bytes()?;
        Ok(content_digest("zkml/graph/v1", &[&bytes]))
    }

    /// Declared shapes of the `Input` nodes, in declaration order.
    #[must_use]
    pub fn input_shapes(&self) -> Vec<Vec<usize>> {
        self.input_ids
            .iter()
            .map(|&i| self.nodes[i].out_dims.clone())
            .collect()
    }

    /// Scales of the output nodes, in id order.
    #[must_use]
    pub fn output_scales(&self) -> Vec<u32> {
        self.output_ids
            .iter()
            .map(|&i| self.nodes[i].out_scale)
            .collect()
    }

    /// Total constraint count: one row per output element per node.
    #[must_use]
    pub fn num_constraints(&self) -> u64 {
        self.nodes
            .iter()
            .map(|n| n.out_dims.iter().product::<usize>() as u64)
            .sum()
    }

    /// Compile the graph into circuit settings.
    ///
    /// Sizes the circuit to the smallest `logrows` that fits every
    /// constraint plus the reserved system rows, clamped below by
    /// [`MIN_LOGROWS`]. The run's `logrows` acts as a ceiling, itself
    /// capped at [`MAX_LOGROWS`].
    pub fn compile(
        &self,
        run_args: &RunArgs,
        calibration_target: CalibrationTarget,
    ) -> Result<Settings, Error> {
        let num_constraints = self.num_constraints();
        let needed = MIN_LOGROWS.max(ceil_log2(num_constraints + RESERVED_ROWS));
        let ceiling = run_args.logrows.min(MAX_LOGROWS);
        if needed > ceiling {
            return Err(Error::ResourceExceeded { needed, ceiling });
        }
        debug!(num_constraints, logrows = needed, "compiled graph");

        let mut args = *run_args;
        args.logrows = needed;
        Ok(Settings {
            run_args: args,
            node_scales: self.nodes.iter().map(|n| n.out_scale).collect(),
            node_dims: self.nodes.iter().map(|n| n.out_dims.clone()).collect(),
            model_output_scales: self.output_scales(),
            num_constraints,
            required_bits: run_args.bits,
            calibration_target,
            model_fingerprint: self.fingerprint()?,
        })
    }
}

/// Smallest `k` with `2^k >= n`. `ceil_log2(0) == 0`.
fn ceil_log2(n: u64) -> u32 {
    if n <= 1 {
        0
    } else {
        64 - (n - 1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_decls() -> Vec<NodeDecl> {
        vec![
            NodeDecl { op: OpKind::Input { dims: vec![1, 3, 2, 2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Pad { pads: [[1, 1], [1, 1]] }, inputs: vec![0] },
            NodeDecl {
                op: OpKind::SumPool { kernel: [2, 2], stride: [1, 1] },
                inputs: vec![1],
            },
            NodeDecl { op: OpKind::Reshape { dims: vec![3, 3, 3] }, inputs: vec![2] },
        ]
    }

    #[test]
    fn scenario_shapes_scales_and_wiring() {
        let graph = OpGraph::new(&scenario_decls(), 7).unwrap();
        let rows: Vec<_> = graph
            .nodes
            .iter()
            .map(|n| {
                (
                    n.opkind.as_string(),
                    n.out_scale,
                    n.inputs.clone(),
                    n.out_dims.clone(),
                    n.idx,
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("Input", 7, vec![], vec![1, 3, 2, 2], 0),
                ("Pad", 7, vec![0], vec![1, 3, 4, 4], 1),
                ("SumPool", 7, vec![1], vec![1, 3, 3, 3], 2),
                ("Reshape", 7, vec![2], vec![3, 3, 3], 3),
            ]
        );
        assert_eq!(graph.input_ids, vec![0]);
        assert_eq!(graph.output_ids, vec![3]);
        assert_eq!(graph.num_constraints(), 12 + 48 + 27 + 27);
    }

    #[test]
    fn scenario_compiles_to_minimal_logrows() {
        let graph = OpGraph::new(&scenario_decls(), 7).unwrap();
        let settings = graph
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        // 114 constraints + 8 reserved rows fit in 2^7.
        assert_eq!(settings.run_args.logrows, 7);
        assert_eq!(settings.num_constraints, 114);
        assert_eq!(settings.node_scales, vec![7, 7, 7, 7]);
        assert_eq!(settings.model_output_scales, vec![7]);
    }

    #[test]
    fn logrows_ceiling_enforced() {
        let graph = OpGraph::new(&scenario_decls(), 7).unwrap();
        let args = RunArgs { logrows: 6, ..RunArgs::default() };
        let err = graph
            .compile(&args, CalibrationTarget::Resources)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ResourceExceeded { needed: 7, ceiling: 6 }
        ));
    }

    #[test]
    fn forward_reference_rejected() {
        let decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Add, inputs: vec![0, 2] },
            NodeDecl { op: OpKind::Relu, inputs: vec![1] },
        ];
        let err = OpGraph::new(&decls, 7).unwrap_err();
        assert!(matches!(err, GraphError::NonTopological { idx: 1, input: 2 }));
    }

    #[test]
    fn arity_mismatch_rejected() {
        let decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Add, inputs: vec![0] },
        ];
        let err = OpGraph::new(&decls, 7).unwrap_err();
        assert!(matches!(
            err,
            GraphError::InvalidInputCount { idx: 1, expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn deep_mul_chain_scale_rejected_at_construction() {
        // Each self-Mul doubles the scale: 7, 14, 28, 56, 112.
        let mut decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![1] }, inputs: vec![] },
            NodeDecl { op: OpKind::Const { values: vec![0.5], dims: vec![1] }, inputs: vec![] },
        ];
        for i in 2..7 {
            decls.push(NodeDecl { op: OpKind::Mul, inputs: vec![i - 1, i - 1] });
        }
        decls.push(NodeDecl { op: OpKind::Add, inputs: vec![0, 6] });
        let err = OpGraph::new(&decls, 7).unwrap_err();
        assert!(matches!(
            err,
            GraphError::ScaleOverflow { idx: 5, scale: 112, max: MAX_COMPOSED_SCALE }
        ));
    }

    #[test]
    fn scale_at_cap_accepted() {
        let decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![1] }, inputs: vec![] },
            NodeDecl { op: OpKind::Mul, inputs: vec![0, 0] },
        ];
        // 21 + 21 = 42 stays inside the cap; 32 + 32 = 64 does not.
        assert!(OpGraph::new(&decls, 21).is_ok());
        assert!(matches!(
            OpGraph::new(&decls, 32).unwrap_err(),
            GraphError::ScaleOverflow { idx: 1, scale: 64, .. }
        ));
    }

    #[test]
    fn graph_without_inputs_rejected() {
        let decls = vec![NodeDecl {
            op: OpKind::Const { values: vec![1.0], dims: vec![1] },
            inputs: vec![],
        }];
        assert!(matches!(
            OpGraph::new(&decls, 7).unwrap_err(),
            GraphError::NoInputs
        ));
    }

    #[test]
    fn fingerprint_tracks_structure() {
        let g1 = OpGraph::new(&scenario_decls(), 7).unwrap();
        let g2 = OpGraph::new(&scenario_decls(), 7).unwrap();
        assert_eq!(g1.fingerprint().unwrap(), g2.fingerprint().unwrap());

        let mut decls = scenario_decls();
        decls[1] = NodeDecl { op: OpKind::Pad { pads: [[0, 0], [0, 0]] }, inputs: vec![0] };
        decls[3] = NodeDecl { op: OpKind::Flatten, inputs: vec![2] };
        let g3 = OpGraph::new(&decls, 7).unwrap();
        assert_ne!(g1.fingerprint().unwrap(), g3.fingerprint().unwrap());
    }

    #[test]
    fn table_lists_every_node() {
        let graph = OpGraph::new(&scenario_decls(), 7).unwrap();
        let table = graph.table();
        for name in ["Input", "Pad", "SumPool", "Reshape"] {
            assert!(table.contains(name), "missing {name} in:\n{table}");
        }
    }

    #[test]
    fn ceil_log2_boundaries() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(3), 2);
        assert_eq!(ceil_log2(64), 6);
        assert_eq!(ceil_log2(65), 7);
    }
}
