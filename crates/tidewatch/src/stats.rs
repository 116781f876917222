//! Numeric helpers shared by the analysis components.
//!
//! Every function tolerates empty and single-valued input: means, spreads
//! and quantiles of nothing are 0, and undefined correlations are `None`.

use std::cmp::Ordering;

/// The non-missing values of a column, in row order.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Aligned pairs of values where both columns are present.
pub fn paired(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip()
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample variance (n - 1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Minimum and maximum, `(0, 0)` for empty input.
pub fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Sorted copy of the values.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Linear-interpolated quantile of already sorted values, `q` in [0, 1].
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let frac = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

/// Fences at `multiplier` times the interquartile range beyond Q1/Q3.
pub fn iqr_fences(sorted: &[f64], multiplier: f64) -> (f64, f64) {
    let q1 = quantile(sorted, 0.25);
    let q3 = quantile(sorted, 0.75);
    let iqr = q3 - q1;
    (q1 - multiplier * iqr, q3 + multiplier * iqr)
}

/// Population skewness (third standardized moment).
pub fn skewness(values: &[f64]) -> f64 {
    let (m2, m3, _) = central_moments(values);
    if values.len() < 3 || m2 <= 0.0 {
        0.0
    } else {
        m3 / m2.powf(1.5)
    }
}

/// Population excess kurtosis (fourth standardized moment minus 3).
pub fn kurtosis(values: &[f64]) -> f64 {
    let (m2, _, m4) = central_moments(values);
    if values.len() < 4 || m2 <= 0.0 {
        0.0
    } else {
        m4 / (m2 * m2) - 3.0
    }
}

fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let m = mean(values);
    let n = values.len() as f64;
    let (s2, s3, s4) = values.iter().fold((0.0, 0.0, 0.0), |(s2, s3, s4), v| {
        let d = v - m;
        (s2 + d * d, s3 + d * d * d, s4 + d * d * d * d)
    });
    (s2 / n, s3 / n, s4 / n)
}

/// Coefficient of variation, 0 when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.abs() < f64::EPSILON {
        0.0
    } else {
        std_dev(values) / m.abs()
    }
}

/// Pearson correlation. `None` with fewer than two points or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Ordinary least-squares line through `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination, 0 when `y` is constant.
    pub r_squared: f64,
}

/// Fit `y = slope * x + intercept`. `None` with fewer than two points or
/// constant `x`.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));

    let sxx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let slope = sxy / sxx;

    Some(LinearFit {
        slope,
        intercept: my - slope * mx,
        r_squared: pearson(x, y).map_or(0.0, |r| r * r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[4.0]), 0.0);
        assert_eq!(quantile(&[], 0.5), 0.0);
        assert_eq!(quantile(&[7.0], 0.25), 7.0);
        assert_eq!(min_max(&[]), (0.0, 0.0));
        assert_eq!(skewness(&[1.0]), 0.0);
        assert_eq!(kurtosis(&[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = sorted(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(quantile(&values, 0.5), 2.5);
        assert_eq!(quantile(&values, 0.25), 1.75);
        assert_eq!(quantile(&values, 1.0), 4.0);
    }

    #[test]
    fn test_sample_std() {
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.138089935).abs() < 1e-6);
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn test_linear_fit() {
        let fit = linear_fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(linear_fit(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_paired_drops_missing() {
        let (x, y) = paired(&[Some(1.0), None, Some(3.0)], &[Some(2.0), Some(5.0), None]);
        assert_eq!(x, vec![1.0]);
        assert_eq!(y, vec![2.0]);
    }

    #[test]
    fn test_skewness_sign() {
        assert!(skewness(&[1.0, 1.0, 1.0, 10.0]) > 0.0);
        assert!(skewness(&[10.0, 10.0, 10.0, 1.0]) < 0.0);
    }
}
