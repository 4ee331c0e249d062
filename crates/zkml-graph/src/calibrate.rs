//! Scale calibration.
//!
//! Sweeps candidate run scales, replaying the supplied calibration
//! batches through both the quantized and the float forward pass, and
//! picks the settings the target prefers: `Resources` minimizes circuit
//! size (largest scale on ties), `Accuracy` minimizes quantization
//! error (smallest circuit on ties).
//!
//! Calibration degrades gracefully: when no candidate meets the bit
//! budget or the tolerance, the best available candidate is still
//! returned and the shortfall is reported in the result and the log.

use std::ops::RangeInclusive;

use tracing::{debug, warn};

use zkml_core::{CalibrationTarget, RunArgs, Settings};

use crate::error::GraphError;
use crate::forward::{execute_f64, execute_quantized};
use crate::model::{NodeDecl, OpGraph};
use crate::quantize::{dequantize_value, quantize_vec, required_bits};

/// Run scales tried during calibration.
pub const CALIBRATION_SCALES: RangeInclusive<u32> = 2..=11;

/// Outcome of a calibration sweep.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationReport {
    /// The selected, compiled settings.
    pub settings: Settings,
    /// The selected run scale.
    pub scale: u32,
    /// Mean absolute output error of the selected candidate.
    pub best_error: f64,
    /// Whether `best_error` is within the run tolerance.
    pub tolerance_met: bool,
}

struct Candidate {
    scale: u32,
    settings: Settings,
    error: f64,
    bits: u32,
}

/// Sweep [`CALIBRATION_SCALES`] and select settings for `target`.
///
/// `batches` holds representative input sets, one tensor per `Input`
/// node each. Scales whose circuit exceeds the `logrows` ceiling or
/// whose trace overflows are skipped; an error is returned only when no
/// scale survives at all.
pub fn calibrate(
    decls: &[NodeDecl],
    base: &RunArgs,
    target: CalibrationTarget,
    batches: &[Vec<Vec<f64>>],
) -> Result<CalibrationReport, GraphError> {
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut last_failure: Option<GraphError> = None;

    for scale in CALIBRATION_SCALES {
        match evaluate_scale(decls, base, target, batches, scale) {
            Ok(c) => {
                debug!(scale, error = c.error, bits = c.bits, logrows = c.settings.run_args.logrows, "calibration candidate");
                candidates.push(c);
            }
            Err(e) => {
                debug!(scale, error = %e, "calibration scale skipped");
                last_failure = Some(e);
            }
        }
    }

    if candidates.is_empty() {
        return Err(last_failure.unwrap_or(GraphError::NoInputs));
    }

    let within_bits: Vec<&Candidate> =
        candidates.iter().filter(|c| c.bits <= base.bits).collect();
    let pool: Vec<&Candidate> = if within_bits.is_empty() {
        warn!(
            bits = base.bits,
            "no calibration candidate fits the bit budget; relaxing"
        );
        candidates.iter().collect()
    } else {
        within_bits
    };

    let best = select(&pool, target);
    let tolerance_met = best.error <= base.tolerance;
    if !tolerance_met {
        warn!(
            error = best.error,
            tolerance = base.tolerance,
            scale = best.scale,
            "calibration tolerance not met; returning best candidate"
        );
    }

    Ok(CalibrationReport {
        settings: best.settings.clone(),
        scale: best.scale,
        best_error: best.error,
        tolerance_met,
    })
}

fn evaluate_scale(
    decls: &[NodeDecl],
    base: &RunArgs,
    target: CalibrationTarget,
    batches: &[Vec<Vec<f64>>],
    scale: u32,
) -> Result<Candidate, GraphError> {
    let graph = OpGraph::new(decls, scale)?;

    let mut abs_error_sum = 0.0;
    let mut error_terms = 0usize;
    let mut max_abs: i64 = 0;

    for batch in batches {
        let quantized: Vec<Vec<i64>> = batch.iter().map(|t| quantize_vec(t, scale)).collect();
        let q_trace = execute_quantized(&graph, &quantized)?;
        let f_trace = execute_f64(&graph, batch)?;

        for tensor in &q_trace {
            for &v in tensor {
                max_abs = max_abs.max(v.saturating_abs());
            }
        }
        for &out in &graph.output_ids {
            let out_scale = graph.nodes[out].out_scale;
            for (&q, &f) in q_trace[out].iter().zip(f_trace[out].iter()) {
                abs_error_sum += (dequantize_value(q, out_scale) - f).abs();
                error_terms += 1;
            }
        }
    }

    let error = if error_terms == 0 {
        0.0
    } else {
        abs_error_sum / error_terms as f64
    };
    let bits = required_bits(max_abs);

    let args = RunArgs { scale, ..*base };
    let mut settings = graph.compile(&args, target)?;
    settings.required_bits = bits;

    Ok(Candidate { scale, settings, error, bits })
}

/// Pick the winner from a non-empty pool. Ascending scan with strict
/// improvement keeps ties deterministic.
fn select<'a>(pool: &[&'a Candidate], target: CalibrationTarget) -> &'a Candidate {
    let mut best = pool[0];
    for &c in &pool[1..] {
        let better = match target {
            CalibrationTarget::Resources => {
                let (a, b) = (c.settings.run_args.logrows, best.settings.run_args.logrows);
                a < b || (a == b && c.scale > best.scale)
            }
            CalibrationTarget::Accuracy => {
                c.error < best.error
                    || (c.error == best.error
                        && c.settings.run_args.logrows < best.settings.run_args.logrows)
            }
        };
        if better {
            best = c;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpKind;

    fn decls() -> Vec<NodeDecl> {
        vec![
            NodeDecl { op: OpKind::Input { dims: vec![2, 2] }, inputs: vec![] },
            NodeDecl {
                op: OpKind::Const {
                    values: vec![0.5, 0.25, -0.125, 1.0],
                    dims: vec![2, 2],
                },
                inputs: vec![],
            },
            NodeDecl { op: OpKind::MatMul, inputs: vec![0, 1] },
            NodeDecl { op: OpKind::Sigmoid, inputs: vec![2] },
        ]
    }

    fn batches() -> Vec<Vec<Vec<f64>>> {
        vec![
            vec![vec![0.3, -0.7, 0.9, 0.1]],
            vec![vec![-1.2, 0.4, 0.0, 2.5]],
        ]
    }

    #[test]
    fn accuracy_prefers_finer_scales() {
        let base = RunArgs::default();
        let acc = calibrate(&decls(), &base, CalibrationTarget::Accuracy, &batches()).unwrap();
        let res = calibrate(&decls(), &base, CalibrationTarget::Resources, &batches()).unwrap();
        assert!(acc.best_error <= res.best_error);
        assert_eq!(acc.settings.calibration_target, CalibrationTarget::Accuracy);
    }

    #[test]
    fn resources_picks_smallest_circuit() {
        let base = RunArgs::default();
        let report =
            calibrate(&decls(), &base, CalibrationTarget::Resources, &batches()).unwrap();
        // Constraint count is scale-independent here, so every candidate
        // compiles to the same logrows and the largest scale inside the
        // bit budget wins the tie. The matmul dominates the trace at
        // 2.5 * 4^scale, so 16 bits admits scales up to 6.
        assert_eq!(report.scale, 6);
        assert_eq!(report.settings.required_bits, 15);
    }

    #[test]
    fn tolerance_shortfall_still_returns_settings() {
        let base = RunArgs { tolerance: 0.0, ..RunArgs::default() };
        let report =
            calibrate(&decls(), &base, CalibrationTarget::Accuracy, &batches()).unwrap();
        assert!(!report.tolerance_met);
        assert!(report.best_error > 0.0);
    }

    #[test]
    fn report_is_deterministic() {
        let base = RunArgs::default();
        let a = calibrate(&decls(), &base, CalibrationTarget::Accuracy, &batches()).unwrap();
        let b = calibrate(&decls(), &base, CalibrationTarget::Accuracy, &batches()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn all_scales_exceeding_ceiling_is_an_error() {
        let base = RunArgs { logrows: 5, ..RunArgs::default() };
        // MIN_LOGROWS is 6, so a ceiling of 5 can never fit.
        assert!(calibrate(&decls(), &base, CalibrationTarget::Resources, &batches()).is_err());
    }

    #[test]
    fn calibrated_settings_carry_measured_bits() {
        let base = RunArgs::default();
        let report =
            calibrate(&decls(), &base, CalibrationTarget::Resources, &batches()).unwrap();
        assert!(report.settings.required_bits >= 2);
        assert!(report.settings.required_bits <= base.bits);
    }
}
