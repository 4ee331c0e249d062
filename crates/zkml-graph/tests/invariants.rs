//! Invariants for quantization and quantized execution.
//!
//! These tests treat:
//! - the **quantizer** as authoritative for the fixed-point encoding
//!   (round-half-away, error bounded by half an ulp), and
//! - the **quantized forward pass** as a projection of the float pass
//!   whose error stays within the per-operand rounding budget.

use proptest::prelude::*;
use zkml_graph::quantize::{dequantize_value, quantize_value, required_bits};
use zkml_graph::{execute_f64, execute_quantized, forward, InputData, NodeDecl, OpGraph, OpKind};
use zkml_core::{CalibrationTarget, RunArgs};

fn add_graph(scale: u32) -> OpGraph {
    let decls = vec![
        NodeDecl { op: OpKind::Input { dims: vec![4] }, inputs: vec![] },
        NodeDecl { op: OpKind::Input { dims: vec![4] }, inputs: vec![] },
        NodeDecl { op: OpKind::Add, inputs: vec![0, 1] },
    ];
    OpGraph::new(&decls, scale).expect("valid graph")
}

// Keep CI predictable while still exercising a wide range.
prop_compose! {
    fn arb_scale()(scale in 2u32..=11) -> u32 { scale }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, // good CI/runtime balance
        .. ProptestConfig::default()
    })]

    // Property: dequantize(quantize(x)) is within half an ulp of x.
    #[test]
    fn quantize_roundtrip_error_is_half_ulp(
        x in -1e6f64..=1e6,
        scale in arb_scale(),
    ) {
        let ulp = f64::powi(2.0, -(scale as i32));
        let back = dequantize_value(quantize_value(x, scale), scale);
        prop_assert!((back - x).abs() <= ulp / 2.0 + f64::EPSILON * x.abs());
    }

    // Property: required_bits is monotone in magnitude and admits the value.
    #[test]
    fn required_bits_admits_the_value(q in -1_000_000_000i64..=1_000_000_000) {
        let bits = required_bits(q.abs());
        prop_assert!(bits >= 1 && bits <= 64);
        if bits < 64 {
            prop_assert!(q.abs() < 1i64 << (bits - 1), "q={q} bits={bits}");
        }
        prop_assert!(required_bits(q.abs()) <= required_bits(q.abs().saturating_add(1)));
    }

    // Property: quantized addition tracks float addition within the
    // rounding budget of its two operands.
    #[test]
    fn quantized_add_tracks_float_add(
        a in proptest::collection::vec(-100.0f64..=100.0, 4),
        b in proptest::collection::vec(-100.0f64..=100.0, 4),
        scale in arb_scale(),
    ) {
        let graph = add_graph(scale);
        let qa: Vec<i64> = a.iter().map(|&x| quantize_value(x, scale)).collect();
        let qb: Vec<i64> = b.iter().map(|&x| quantize_value(x, scale)).collect();

        let qtrace = execute_quantized(&graph, &[qa, qb]).expect("quantized pass");
        let ftrace = execute_f64(&graph, &[a, b]).expect("float pass");

        let ulp = f64::powi(2.0, -(scale as i32));
        for (q, f) in qtrace[2].iter().zip(ftrace[2].iter()) {
            let got = dequantize_value(*q, scale);
            prop_assert!((got - f).abs() <= ulp, "got={got} want={f} scale={scale}");
        }
    }

    // Property: witness generation is a pure function of graph + data.
    #[test]
    fn witness_generation_is_deterministic(
        a in proptest::collection::vec(-10.0f64..=10.0, 4),
        b in proptest::collection::vec(-10.0f64..=10.0, 4),
    ) {
        let graph = add_graph(7);
        let settings = graph
            .compile(&RunArgs::default(), CalibrationTarget::Resources)
            .expect("compile");
        let data = InputData { input_data: vec![a, b] };
        let w1 = forward(&graph, &settings, &data).expect("forward");
        let w2 = forward(&graph, &settings, &data).expect("forward");
        prop_assert_eq!(w1.instances(), w2.instances());
        prop_assert_eq!(w1.output_data, w2.output_data);
    }
}

/// Negative test: a tensor that overflows the accumulator is an error,
/// not a silent wrap.
#[test]
fn overflow_is_reported_not_wrapped() {
    let graph = OpGraph::new(
        &[
            NodeDecl { op: OpKind::Input { dims: vec![2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Input { dims: vec![2] }, inputs: vec![] },
            NodeDecl { op: OpKind::Mul, inputs: vec![0, 1] },
        ],
        7,
    )
    .expect("valid graph");
    let big = vec![i64::MAX / 2, 1];
    let err = execute_quantized(&graph, &[big.clone(), big]).unwrap_err();
    assert!(matches!(err, zkml_graph::GraphError::ValueOverflow(2)));
}
