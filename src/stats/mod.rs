//! Descriptive-statistics primitives shared by every component.
//!
//! All functions return `NaN` on empty input; callers that need a hard
//! failure check for emptiness at their own boundary.

/// Keep only finite values (drops NaN and infinities from parsed gaps).
pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (ddof = 1). Zero for a single observation.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation (ddof = 1).
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Smallest value.
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::min)
}

/// Largest value.
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::max)
}

/// Quantile with linear interpolation between order statistics.
///
/// `q` is clamped to [0, 1]. Matches the default interpolation of the
/// summary tables this crate ingests.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let frac = pos - lo as f64;
    if lo + 1 < sorted.len() {
        sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
    } else {
        sorted[lo]
    }
}

/// Median (0.5 quantile).
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Interquartile range, Q75 - Q25.
pub fn iqr(values: &[f64]) -> f64 {
    quantile(values, 0.75) - quantile(values, 0.25)
}

/// Pearson correlation over pairwise-complete observations.
///
/// Pairs where either value is non-finite are skipped. Returns 0.0 when
/// either side is constant (no linear relationship is defined).
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in &pairs {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    sxy / (sxx.sqrt() * syy.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(mean(&v), 3.0);
        assert_relative_eq!(variance(&v), 2.5);
        assert_relative_eq!(std_dev(&v), 2.5_f64.sqrt());
    }

    #[test]
    fn test_single_value_variance_is_zero() {
        assert_relative_eq!(variance(&[7.0]), 0.0);
    }

    #[test]
    fn test_empty_is_nan() {
        assert!(mean(&[]).is_nan());
        assert!(median(&[]).is_nan());
        assert!(quantile(&[], 0.25).is_nan());
    }

    #[test]
    fn test_quantile_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&v, 0.25), 1.75);
        assert_relative_eq!(quantile(&v, 0.5), 2.5);
        assert_relative_eq!(quantile(&v, 0.75), 3.25);
        assert_relative_eq!(quantile(&v, 0.0), 1.0);
        assert_relative_eq!(quantile(&v, 1.0), 4.0);
    }

    #[test]
    fn test_median_odd() {
        assert_relative_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
    }

    #[test]
    fn test_iqr() {
        let v = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert_relative_eq!(iqr(&v), 2.0);
    }

    #[test]
    fn test_pearson_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(pearson(&x, &y), 1.0, epsilon = 1e-12);
        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert_relative_eq!(pearson(&x, &neg), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_skips_nan_pairs() {
        let x = [1.0, 2.0, f64::NAN, 4.0];
        let y = [2.0, 4.0, 100.0, 8.0];
        assert_relative_eq!(pearson(&x, &y), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_constant_is_zero() {
        let x = [3.0, 3.0, 3.0];
        let y = [1.0, 2.0, 3.0];
        assert_relative_eq!(pearson(&x, &y), 0.0);
    }

    #[test]
    fn test_finite_values() {
        let v = [1.0, f64::NAN, 3.0, f64::INFINITY];
        assert_eq!(finite_values(&v), vec![1.0, 3.0]);
    }
}
