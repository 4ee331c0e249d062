//! The closed operator vocabulary.
//!
//! Each [`OpKind`] carries its static attributes and knows how to
//! propagate shapes ([`OpKind::out_dims`]) and fixed-point scales
//! ([`OpKind::out_scale`]), and how to evaluate itself both over
//! quantized integers ([`OpKind::eval_quantized`], the circuit
//! semantics) and over floats ([`OpKind::eval_f64`], the calibration
//! reference).
//!
//! Scale rules:
//! - `Input`/`Const` and `Sigmoid` produce values at the run scale.
//! - `Add`/`Sub` homogenize operands to the larger input scale.
//! - `Mul`/`MatMul` produce the sum of input scales.
//! - Everything else inherits the scale of its first input.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::quantize::{dequantize_value, quantize_value};

/// One operator in the graph vocabulary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OpKind {
    /// A model input placeholder with a declared shape.
    Input {
        /// Tensor shape.
        dims: Vec<usize>,
    },
    /// A constant tensor baked into the graph.
    Const {
        /// Unquantized values, row-major.
        values: Vec<f64>,
        /// Tensor shape.
        dims: Vec<usize>,
    },
    /// Elementwise addition.
    Add,
    /// Elementwise subtraction.
    Sub,
    /// Elementwise (Hadamard) multiplication.
    Mul,
    /// 2D matrix multiplication.
    MatMul,
    /// Zero padding of the two trailing spatial dimensions.
    Pad {
        /// `[[top, bottom], [left, right]]` padding amounts.
        pads: [[usize; 2]; 2],
    },
    /// Windowed sum pooling over the two trailing spatial dimensions.
    SumPool {
        /// Pooling window `[h, w]`.
        kernel: [usize; 2],
        /// Window stride `[h, w]`.
        stride: [usize; 2],
    },
    /// Sum pooling over the entire spatial extent.
    GlobalSumPool,
    /// Shape change preserving element count and order.
    Reshape {
        /// Target shape.
        dims: Vec<usize>,
    },
    /// Collapse to a rank-1 tensor.
    Flatten,
    /// Sum of all elements, producing a single value.
    Sum,
    /// Elementwise rectifier, `max(x, 0)`.
    Relu,
    /// Elementwise logistic function via a dequantize/requantize lookup.
    Sigmoid,
    /// Elementwise division by a positive constant.
    Div {
        /// The constant divisor.
        divisor: f64,
    },
}

impl OpKind {
    /// Bare operator name, as shown in the graph table.
    #[must_use]
    pub fn as_string(&self) -> &'static str {
        match self {
            Self::Input { .. } => "Input",
            Self::Const { .. } => "Const",
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::MatMul => "MatMul",
            Self::Pad { .. } => "Pad",
            Self::SumPool { .. } => "SumPool",
            Self::GlobalSumPool => "GlobalSumPool",
            Self::Reshape { .. } => "Reshape",
            Self::Flatten => "Flatten",
            Self::Sum => "Sum",
            Self::Relu => "Relu",
            Self::Sigmoid => "Sigmoid",
            Self::Div { .. } => "Div",
        }
    }

    /// Number of graph inputs this operator kind requires.
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        match self {
            Self::Input { .. } | Self::Const { .. } => 0,
            Self::Add | Self::Sub | Self::Mul | Self::MatMul => 2,
            _ => 1,
        }
    }

    /// Whether this node is a model input placeholder.
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input { .. })
    }

    /// Propagate the output shape from input shapes.
    pub fn out_dims(&self, idx: usize, in_dims: &[Vec<usize>]) -> Result<Vec<usize>, GraphError> {
        match self {
            Self::Input { dims } | Self::Reshape { dims } => {
                if let Self::Reshape { .. } = self {
                    let in_len: usize = in_dims[0].iter().product();
                    let out_len: usize = dims.iter().product();
                    if in_len != out_len {
                        return Err(GraphError::InvalidDims(
                            idx,
                            format!("reshape {:?} -> {dims:?} changes element count", in_dims[0]),
                        ));
                    }
                }
                Ok(dims.clone())
            }
            Self::Const { values, dims } => {
                let len: usize = dims.iter().product();
                if len != values.len() {
                    return Err(GraphError::InvalidDims(
                        idx,
                        format!("constant has {} values for shape {dims:?}", values.len()),
                    ));
                }
                Ok(dims.clone())
            }
            Self::Add | Self::Sub | Self::Mul => {
                if in_dims[0] != in_dims[1] {
                    return Err(GraphError::InvalidDims(
                        idx,
                        format!("elementwise shapes differ: {:?} vs {:?}", in_dims[0], in_dims[1]),
                    ));
                }
                Ok(in_dims[0].clone())
            }
            Self::MatMul => {
                let (a, b) = (&in_dims[0], &in_dims[1]);
                if a.len() != 2 || b.len() != 2 || a[1] != b[0] {
                    return Err(GraphError::InvalidDims(
                        idx,
                        format!("matmul shapes incompatible: {a:?} x {b:?}"),
                    ));
                }
                Ok(vec![a[0], b[1]])
            }
            Self::Pad { pads } => {
                let d = &in_dims[0];
                if d.len() < 2 {
                    return Err(GraphError::InvalidDims(
                        idx,
                        format!("pad needs at least 2 dims, got {d:?}"),
                    ));
                }
                let mut out = d.clone();
                let n = d.len();
                out[n - 2] += pads[0][0] + pads[0][1];
                out[n - 1] += pads[1][0] + pads[1][1];
                Ok(out)
            }
            Self::SumPool { kernel, stride } => {
                let d = &in_dims[0];
                if d.len() < 2 {
                    return Err(GraphError::InvalidDims(
                        idx,
                        format!("pooling needs at least 2 dims, got {d:?}"),
                    ));
                }
                let n = d.len();
                let (h, w) = (d[n - 2], d[n - 1]);
                if kernel[0] == 0
                    || kernel[1] == 0
                    || stride[0] == 0
                    || stride[1] == 0
                    || h < kernel[0]
                    || w < kernel[1]
                {
                    return Err(GraphError::InvalidDims(
                        idx,
                        format!("pooling window {kernel:?}/{stride:?} does not fit {d:?}"),
                    ));
                }
                let mut out = d.clone();
                out[n - 2] = (h - kernel[0]) / stride[0] + 1;
                out[n - 1] = (w - kernel[1]) / stride[1] + 1;
                Ok(out)
            }
            Self::GlobalSumPool => {
                let d = &in_dims[0];
                if d.len() < 2 {
                    return Err(GraphError::InvalidDims(
                        idx,
                        format!("pooling needs at least 2 dims, got {d:?}"),
                    ));
                }
                let mut out = d.clone();
                let n = d.len();
                out[n - 2] = 1;
                out[n - 1] = 1;
                Ok(out)
            }
            Self::Flatten => Ok(vec![in_dims[0].iter().product()]),
            Self::Sum => Ok(vec![1]),
            Self::Relu | Self::Sigmoid | Self::Div { .. } => Ok(in_dims[0].clone()),
        }
    }

    /// Propagate the output scale from input scales.
    #[must_use]
    pub fn out_scale(&self, in_scales: &[u32], run_scale: u32) -> u32 {
        match self {
            Self::Input { .. } | Self::Const { .. } | Self::Sigmoid => run_scale,
            Self::Add | Self::Sub => in_scales.iter().copied().max().unwrap_or(run_scale),
            Self::Mul | Self::MatMul => in_scales.iter().sum(),
            _ => in_scales.first().copied().unwrap_or(run_scale),
        }
    }

    /// Evaluate over quantized integers.
    ///
    /// `inputs` are `(values, dims, scale)` triples in declaration order.
    /// Intermediate accumulation is `i128`; any result outside `i64`
    /// range is a [`GraphError::ValueOverflow`].
    pub fn eval_quantized(
        &self,
        idx: usize,
        inputs: &[(&[i64], &[usize], u32)],
        out_scale: u32,
        run_scale: u32,
    ) -> Result<Vec<i64>, GraphError> {
        match self {
            Self::Input { .. } => Ok(inputs[0].0.to_vec()),
            Self::Const { values, .. } => {
                Ok(values.iter().map(|&v| quantize_value(v, run_scale)).collect())
            }
            Self::Add | Self::Sub => {
                let (a, _, sa) = inputs[0];
                let (b, _, sb) = inputs[1];
                let target = sa.max(sb);
                let sub = matches!(self, Self::Sub);
                a.iter()
                    .zip(b.iter())
                    .map(|(&x, &y)| {
                        let x = rescale(idx, x, target - sa)?;
                        let y = rescale(idx, y, target - sb)?;
                        narrow(idx, if sub { x - y } else { x + y })
                    })
                    .collect()
            }
            Self::Mul => {
                let (a, _, _) = inputs[0];
                let (b, _, _) = inputs[1];
                a.iter()
                    .zip(b.iter())
                    .map(|(&x, &y)| narrow(idx, i128::from(x) * i128::from(y)))
                    .collect()
            }
            Self::MatMul => {
                let (a, da, _) = inputs[0];
                let (b, db, _) = inputs[1];
                let (m, k, n) = (da[0], da[1], db[1]);
                let mut out = Vec::with_capacity(m * n);
                for i in 0..m {
                    for j in 0..n {
                        let mut acc = 0i128;
                        for p in 0..k {
                            acc += i128::from(a[i * k + p]) * i128::from(b[p * n + j]);
                        }
                        out.push(narrow(idx, acc)?);
                    }
                }
                Ok(out)
            }
            Self::Pad { pads } => {
                let (vals, dims, _) = inputs[0];
                Ok(pad_tensor(vals, dims, *pads))
            }
            Self::SumPool { kernel, stride } => {
                let (vals, dims, _) = inputs[0];
                sum_pool(idx, vals, dims, *kernel, *stride)
            }
            Self::GlobalSumPool => {
                let (vals, dims, _) = inputs[0];
                let n = dims.len();
                sum_pool(idx, vals, dims, [dims[n - 2], dims[n - 1]], [1, 1])
            }
            Self::Reshape { .. } | Self::Flatten => Ok(inputs[0].0.to_vec()),
            Self::Sum => {
                let acc: i128 = inputs[0].0.iter().map(|&v| i128::from(v)).sum();
                Ok(vec![narrow(idx, acc)?])
            }
            Self::Relu => Ok(inputs[0].0.iter().map(|&v| v.max(0)).collect()),
            Self::Sigmoid => {
                let (vals, _, scale) = inputs[0];
                Ok(vals
                    .iter()
                    .map(|&v| {
                        let x = dequantize_value(v, scale);
                        quantize_value(sigmoid(x), out_scale)
                    })
                    .collect())
            }
            Self::Div { divisor } => {
                if *divisor <= 0.0 {
                    return Err(GraphError::InvalidDivisor(idx));
                }
                Ok(inputs[0]
                    .0
                    .iter()
                    .map(|&v| (v as f64 / divisor).round() as i64)
                    .collect())
            }
        }
    }

    /// Evaluate over floats. The calibration reference for error
    /// measurement; mirrors `eval_quantized` without rounding.
    pub fn eval_f64(
        &self,
        idx: usize,
        inputs: &[(&[f64], &[usize])],
    ) -> Result<Vec<f64>, GraphError> {
        match self {
            Self::Input { .. } => Ok(inputs[0].0.to_vec()),
            Self::Const { values, .. } => Ok(values.clone()),
            Self::Add => Ok(zip_map(inputs, |x, y| x + y)),
            Self::Sub => Ok(zip_map(inputs, |x, y| x - y)),
            Self::Mul => Ok(zip_map(inputs, |x, y| x * y)),
            Self::MatMul => {
                let (a, da) = inputs[0];
                let (b, db) = inputs[1];
                let (m, k, n) = (da[0], da[1], db[1]);
                let mut out = Vec::with_capacity(m * n);
                for i in 0..m {
                    for j in 0..n {
                        let mut acc = 0.0;
                        for p in 0..k {
                            acc += a[i * k + p] * b[p * n + j];
                        }
                        out.push(acc);
                    }
                }
                Ok(out)
            }
            Self::Pad { pads } => {
                let (vals, dims) = inputs[0];
                Ok(pad_tensor_f64(vals, dims, *pads))
            }
            Self::SumPool { kernel, stride } => {
                let (vals, dims) = inputs[0];
                Ok(sum_pool_f64(vals, dims, *kernel, *stride))
            }
            Self::GlobalSumPool => {
                let (vals, dims) = inputs[0];
                let n = dims.len();
                Ok(sum_pool_f64(vals, dims, [dims[n - 2], dims[n - 1]], [1, 1]))
            }
            Self::Reshape { .. } | Self::Flatten => Ok(inputs[0].0.to_vec()),
            Self::Sum => Ok(vec![inputs[0].0.iter().sum()]),
            Self::Relu => Ok(inputs[0].0.iter().map(|&v| v.max(0.0)).collect()),
            Self::Sigmoid => Ok(inputs[0].0.iter().map(|&v| sigmoid(v)).collect()),
            Self::Div { divisor } => {
                if *divisor <= 0.0 {
                    return Err(GraphError::InvalidDivisor(idx));
                }
                Ok(inputs[0].0.iter().map(|&v| v / divisor).collect())
            }
        }
    }
}

fn narrow(idx: usize, v: i128) -> Result<i64, GraphError> {
    i64::try_from(v).map_err(|_| GraphError::ValueOverflow(idx))
}

/// Shift a value up to a larger scale. The shift amount is bounded by
/// the graph-level scale cap, but a shift past the `i64` width can
/// never produce a representable value, so it is an overflow here too.
fn rescale(idx: usize, v: i64, by: u32) -> Result<i128, GraphError> {
    if by >= 64 {
        return Err(GraphError::ValueOverflow(idx));
    }
    Ok(i128::from(v) << by)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn zip_map(inputs: &[(&[f64], &[usize])], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    inputs[0]
        .0
        .iter()
        .zip(inputs[1].0.iter())
        .map(|(&x, &y)| f(x, y))
        .collect()
}

/// Split a shape into (outer batch size, height, width) over the two
/// trailing dims.
fn spatial_split(dims: &[usize]) -> (usize, usize, usize) {
    let n = dims.len();
    let outer: usize = dims[..n - 2].iter().product();
    (outer, dims[n - 2], dims[n - 1])
}

fn pad_generic<T: Copy + Default>(vals: &[T], dims: &[usize], pads: [[usize; 2]; 2]) -> Vec<T> {
    let (outer, h, w) = spatial_split(dims);
    let oh = h + pads[0][0] + pads[0][1];
    let ow = w + pads[1][0] + pads[1][1];
    let mut out = vec![T::default(); outer * oh * ow];
    for c in 0..outer {
        for i in 0..h {
            for j in 0..w {
                let oi = i + pads[0][0];
                let oj = j + pads[1][0];
                out[c * oh * ow + oi * ow + oj] = vals[c * h * w + i * w + j];
            }
        }
    }
    out
}

fn pad_tensor(vals: &[i64], dims: &[usize], pads: [[usize; 2]; 2]) -> Vec<i64> {
    pad_generic(vals, dims, pads)
}

fn pad_tensor_f64(vals: &[f64], dims: &[usize], pads: [[usize; 2]; 2]) -> Vec<f64> {
    pad_generic(vals, dims, pads)
}

fn sum_pool(
    idx: usize,
    vals: &[i64],
    dims: &[usize],
    kernel: [usize; 2],
    stride: [usize; 2],
) -> Result<Vec<i64>, GraphError> {
    let (outer, h, w) = spatial_split(dims);
    let oh = (h - kernel[0]) / stride[0] + 1;
    let ow = (w - kernel[1]) / stride[1] + 1;
    let mut out = Vec::with_capacity(outer * oh * ow);
    for c in 0..outer {
        for i in 0..oh {
            for j in 0..ow {
                let mut acc = 0i128;
                for ki in 0..kernel[0] {
                    for kj in 0..kernel[1] {
                        let (si, sj) = (i * stride[0] + ki, j * stride[1] + kj);
                        acc += i128::from(vals[c * h * w + si * w + sj]);
                    }
                }
                out.push(narrow(idx, acc)?);
            }
        }
    }
    Ok(out)
}

fn sum_pool_f64(vals: &[f64], dims: &[usize], kernel: [usize; 2], stride: [usize; 2]) -> Vec<f64> {
    let (outer, h, w) = spatial_split(dims);
    let oh = (h - kernel[0]) / stride[0] + 1;
    let ow = (w - kernel[1]) / stride[1] + 1;
    let mut out = Vec::with_capacity(outer * oh * ow);
    for c in 0..outer {
        for i in 0..oh {
            for j in 0..ow {
                let mut acc = 0.0;
                for ki in 0..kernel[0] {
                    for kj in 0..kernel[1] {
                        let (si, sj) = (i * stride[0] + ki, j * stride[1] + kj);
                        acc += vals[c * h * w + si * w + sj];
                    }
                }
                out.push(acc);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_rules() {
        assert_eq!(OpKind::Add.out_scale(&[7, 9], 7), 9);
        assert_eq!(OpKind::Sub.out_scale(&[9, 7], 7), 9);
        assert_eq!(OpKind::Mul.out_scale(&[7, 7], 7), 14);
        assert_eq!(OpKind::MatMul.out_scale(&[7, 7], 7), 14);
        assert_eq!(OpKind::Sigmoid.out_scale(&[14], 7), 7);
        assert_eq!(OpKind::Relu.out_scale(&[14], 7), 14);
        assert_eq!(OpKind::Input { dims: vec![2] }.out_scale(&[], 7), 7);
    }

    #[test]
    fn add_homogenizes_scales() {
        // 1.0 at scale 7 plus 1.0 at scale 9 must give 2.0 at scale 9.
        let op = OpKind::Add;
        let a = [128i64];
        let b = [512i64];
        let out = op
            .eval_quantized(0, &[(&a, &[1], 7), (&b, &[1], 9)], 9, 7)
            .unwrap();
        assert_eq!(out, vec![1024]);
    }

    #[test]
    fn matmul_2x2() {
        let op = OpKind::MatMul;
        let a = [1i64, 2, 3, 4];
        let b = [5i64, 6, 7, 8];
        let out = op
            .eval_quantized(0, &[(&a, &[2, 2], 0), (&b, &[2, 2], 0)], 0, 0)
            .unwrap();
        assert_eq!(out, vec![19, 22, 43, 50]);
    }

    #[test]
    fn matmul_shape_mismatch_rejected() {
        let err = OpKind::MatMul
            .out_dims(3, &[vec![2, 3], vec![2, 3]])
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidDims(3, _)));
    }

    #[test]
    fn pad_zero_fills_borders() {
        let op = OpKind::Pad { pads: [[1, 1], [1, 1]] };
        let vals = [1i64, 2, 3, 4];
        let out = op
            .eval_quantized(0, &[(&vals, &[2, 2], 7)], 7, 7)
            .unwrap();
        #[rustfmt::skip]
        assert_eq!(out, vec![
            0, 0, 0, 0,
            0, 1, 2, 0,
            0, 3, 4, 0,
            0, 0, 0, 0,
        ]);
        assert_eq!(op.out_dims(0, &[vec![2, 2]]).unwrap(), vec![4, 4]);
    }

    #[test]
    fn sum_pool_overlapping_windows() {
        let op = OpKind::SumPool { kernel: [2, 2], stride: [1, 1] };
        let vals = [1i64, 2, 3, 4, 5, 6, 7, 8, 9];
        let out = op
            .eval_quantized(0, &[(&vals, &[3, 3], 7)], 7, 7)
            .unwrap();
        assert_eq!(out, vec![12, 16, 24, 28]);
    }

    #[test]
    fn pool_window_larger_than_input_rejected() {
        let op = OpKind::SumPool { kernel: [4, 4], stride: [1, 1] };
        assert!(op.out_dims(1, &[vec![3, 3]]).is_err());
    }

    #[test]
    fn global_sum_pool_matches_full_window() {
        let op = OpKind::GlobalSumPool;
        let vals = [1i64, 2, 3, 4];
        let out = op
            .eval_quantized(0, &[(&vals, &[1, 2, 2], 7)], 7, 7)
            .unwrap();
        assert_eq!(out, vec![10]);
        assert_eq!(op.out_dims(0, &[vec![1, 2, 2]]).unwrap(), vec![1, 1, 1]);
    }

    #[test]
    fn reshape_preserves_values() {
        let op = OpKind::Reshape { dims: vec![3, 2] };
        let vals = [1i64, 2, 3, 4, 5, 6];
        let out = op.eval_quantized(0, &[(&vals, &[2, 3], 7)], 7, 7).unwrap();
        assert_eq!(out, vals.to_vec());
        assert!(op.out_dims(0, &[vec![7]]).is_err());
    }

    #[test]
    fn relu_clamps_negatives() {
        let op = OpKind::Relu;
        let vals = [-5i64, 0, 5];
        let out = op.eval_quantized(0, &[(&vals, &[3], 7)], 7, 7).unwrap();
        assert_eq!(out, vec![0, 0, 5]);
    }

    #[test]
    fn sigmoid_requantizes_at_run_scale() {
        let op = OpKind::Sigmoid;
        // sigmoid(0) = 0.5 -> 64 at scale 7, regardless of input scale.
        let vals = [0i64];
        let out = op.eval_quantized(0, &[(&vals, &[1], 14)], 7, 7).unwrap();
        assert_eq!(out, vec![64]);
    }

    #[test]
    fn div_rounds_half_away() {
        let op = OpKind::Div { divisor: 2.0 };
        let vals = [3i64, -3, 4];
        let out = op.eval_quantized(0, &[(&vals, &[3], 7)], 7, 7).unwrap();
        assert_eq!(out, vec![2, -2, 2]);
    }

    #[test]
    fn non_positive_divisor_rejected() {
        let op = OpKind::Div { divisor: 0.0 };
        let vals = [1i64];
        let err = op.eval_quantized(4, &[(&vals, &[1], 7)], 7, 7).unwrap_err();
        assert!(matches!(err, GraphError::InvalidDivisor(4)));
    }

    #[test]
    fn overflow_detected() {
        let op = OpKind::Mul;
        let a = [i64::MAX];
        let b = [2i64];
        let err = op
            .eval_quantized(2, &[(&a, &[1], 7), (&b, &[1], 0)], 7, 7)
            .unwrap_err();
        assert!(matches!(err, GraphError::ValueOverflow(2)));
    }

    #[test]
    fn oversized_scale_gap_is_overflow_not_panic() {
        let op = OpKind::Add;
        let a = [1i64];
        let b = [1i64];
        let err = op
            .eval_quantized(1, &[(&a, &[1], 7), (&b, &[1], 224)], 224, 7)
            .unwrap_err();
        assert!(matches!(err, GraphError::ValueOverflow(1)));
    }

    #[test]
    fn serde_roundtrip_is_externally_tagged() {
        let op = OpKind::SumPool { kernel: [2, 2], stride: [1, 1] };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("SumPool"));
        let back: OpKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);
    }
}
