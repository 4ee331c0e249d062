//! Mock proving: run the circuit semantics without producing a proof.
//!
//! Useful after calibration to confirm that real data flows through the
//! compiled circuit within its bit budget before paying for setup and
//! proving.

use tracing::info;

use zkml_core::{Error, Settings};
use zkml_graph::quantize::{quantize_vec, required_bits};
use zkml_graph::{execute_quantized, forward, InputData, OpGraph};

use crate::lift;

/// Execute `data` through the compiled circuit and check that every
/// constraint is satisfiable within the settings' bit budget.
pub fn mock(graph: &OpGraph, settings: &Settings, data: &InputData) -> Result<(), Error> {
    // Shape, fingerprint, and overflow checks all live in the forward pass.
    forward(graph, settings, data).map_err(lift)?;

    let scale = settings.run_args.scale;
    let quantized: Vec<Vec<i64>> = data
        .input_data
        .iter()
        .map(|t| quantize_vec(t, scale))
        .collect();
    let trace = execute_quantized(graph, &quantized).map_err(lift)?;

    let mut max_abs = 0i64;
    let mut widest_node = 0usize;
    for (i, tensor) in trace.iter().enumerate() {
        for &v in tensor {
            if v.saturating_abs() > max_abs {
                max_abs = v.saturating_abs();
                widest_node = i;
            }
        }
    }
    let bits = required_bits(max_abs);
    if bits > settings.run_args.bits {
        return Err(Error::Graph(format!(
            "node {widest_node} needs {bits} bits, budget is {} (recalibrate or raise --bits)",
            settings.run_args.bits
        )));
    }
    info!(
        nodes = trace.len(),
        max_bits = bits,
        budget = settings.run_args.bits,
        "mock run satisfied all constraints"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkml_core::{CalibrationTarget, RunArgs};
    use zkml_graph::{NodeDecl, OpKind};

    fn graph() -> OpGraph {
        let decls = vec![
            NodeDecl { op: OpKind::Input { dims: vec![2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Mul, inputs: vec![0, 0] },
        ];
        OpGraph::new(&decls, 7).unwrap()
    }

    #[test]
    fn in_budget_run_passes() {
        let g = graph();
        let settings = g
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        let data = InputData { input_data: vec![vec![0.5, -0.5]] };
        mock(&g, &settings, &data).unwrap();
    }

    #[test]
    fn bit_budget_violation_reported() {
        let g = graph();
        let args = RunArgs { bits: 8, ..RunArgs::default() };
        let settings = g.compile(&args, CalibrationTarget::Resources).unwrap();
        // 4.0 squared at scale 14 is far past 8 bits.
        let data = InputData { input_data: vec![vec![4.0, 4.0]] };
        assert!(matches!(
            mock(&g, &settings, &data).unwrap_err(),
            Error::Graph(_)
        ));
    }

    #[test]
    fn wrong_shape_reported() {
        let g = graph();
        let settings = g
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .unwrap();
        let data = InputData { input_data: vec![vec![0.5]] };
        assert!(mock(&g, &settings, &data).is_err());
    }
}
