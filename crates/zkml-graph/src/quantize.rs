//! Fixed-point quantization.
//!
//! `q(x) = round(x · 2^scale)` with ties rounded half away from zero
//! (`f64::round` semantics), stored as `i64`. Dequantization divides by
//! the same power of two. The circuit, forward execution, and verifier
//! all share these two functions; any divergence here breaks proof
//! validity without being a logic bug elsewhere.

/// Quantize one value at `scale`.
#[inline]
#[must_use]
pub fn quantize_value(x: f64, scale: u32) -> i64 {
    (x * f64::powi(2.0, scale as i32)).round() as i64
}

/// Dequantize one value at `scale`.
#[inline]
#[must_use]
pub fn dequantize_value(q: i64, scale: u32) -> f64 {
    (q as f64) / f64::powi(2.0, scale as i32)
}

/// Quantize a tensor's values at `scale`.
#[must_use]
pub fn quantize_vec(xs: &[f64], scale: u32) -> Vec<i64> {
    xs.iter().map(|&x| quantize_value(x, scale)).collect()
}

/// Dequantize a tensor's values at `scale`.
#[must_use]
pub fn dequantize_vec(qs: &[i64], scale: u32) -> Vec<f64> {
    qs.iter().map(|&q| dequantize_value(q, scale)).collect()
}

/// Bit width needed to represent `max_abs` as a signed integer.
#[must_use]
pub fn required_bits(max_abs: i64) -> u32 {
    let magnitude_bits = 64 - max_abs.unsigned_abs().leading_zeros();
    magnitude_bits + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_round_half_away_from_zero() {
        // 2.5 at scale 0 -> 3; -2.5 -> -3.
        assert_eq!(quantize_value(2.5, 0), 3);
        assert_eq!(quantize_value(-2.5, 0), -3);
        // 0.33984375 * 128 = 43.5 -> 44 at scale 7.
        assert_eq!(quantize_value(0.339_843_75, 7), 44);
    }

    #[test]
    fn roundtrip_exact_for_representable_values() {
        for q in [-300i64, -1, 0, 1, 127, 9999] {
            let x = dequantize_value(q, 7);
            assert_eq!(quantize_value(x, 7), q);
        }
    }

    #[test]
    fn bit_widths() {
        assert_eq!(required_bits(0), 1);
        assert_eq!(required_bits(1), 2);
        assert_eq!(required_bits(127), 8);
        assert_eq!(required_bits(128), 9);
    }
}
