//! Percentiles by linear interpolation.
//!
//! For a sorted sequence `x[0..n]` and `q` in `[0, 1]`, the position is
//! `h = (n - 1) * q` and the result is
//! `x[floor(h)] + (h - floor(h)) * (x[ceil(h)] - x[floor(h)])`.
//! Defined for any non-empty sequence, including a single value.

/// Quantile `q` of an already sorted, non-empty slice.
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty slice.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;

    Some((h - lo as f64).mul_add(sorted[hi] - sorted[lo], sorted[lo]))
}

/// Quantile `q` of `values` in any order. Non-finite values are ignored.
#[must_use]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, q)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_has_no_quantile() {
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn single_value_is_every_quantile() {
        assert_eq!(quantile(&[7.0], 0.01), Some(7.0));
        assert_eq!(quantile(&[7.0], 0.99), Some(7.0));
    }

    #[test]
    fn interpolates_between_neighbours() {
        let values = [9.0, 10.0, 11.0, 12.0];
        // h = 3 * 0.01 = 0.03
        assert!(approx(quantile(&values, 0.01).unwrap(), 9.03));
        // h = 3 * 0.99 = 2.97
        assert!(approx(quantile(&values, 0.99).unwrap(), 11.97));
        assert!(approx(quantile(&values, 0.5).unwrap(), 10.5));
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        assert!(approx(quantile(&[3.0, 1.0, 2.0], 0.5).unwrap(), 2.0));
    }

    #[test]
    fn ignores_non_finite_values() {
        assert!(approx(quantile(&[f64::NAN, 1.0, 3.0], 0.5).unwrap(), 2.0));
    }

    #[test]
    fn clamps_q() {
        assert_eq!(quantile(&[1.0, 2.0], 1.5), Some(2.0));
        assert_eq!(quantile(&[1.0, 2.0], -1.0), Some(1.0));
    }
}
