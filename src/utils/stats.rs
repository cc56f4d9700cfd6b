//! Order statistics over columns with missing values

use ndarray::ArrayView1;

/// Non-NaN values of a column, sorted ascending
pub fn sorted_finite(values: ArrayView1<f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Quantile `q` in [0, 1] of sorted data with linear interpolation between
/// the two closest ranks. Returns `None` for empty input.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median ignoring `NaN`
pub fn nan_median(values: ArrayView1<f64>) -> Option<f64> {
    quantile_sorted(&sorted_finite(values), 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_quantiles_interpolate() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&sorted, 0.75), Some(3.25));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_nan_median_skips_missing() {
        let col = array![5.0, f64::NAN, 1.0, 3.0];
        assert_eq!(nan_median(col.view()), Some(3.0));
        let empty = array![f64::NAN, f64::NAN];
        assert_eq!(nan_median(empty.view()), None);
    }
}
