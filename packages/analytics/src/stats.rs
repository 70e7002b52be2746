//! Statistical primitives: order statistics, least squares, and the F
//! distribution tail used by the causality test.
//!
//! # References
//!
//! - Lanczos 1964 (gamma function)
//! - Numerical Recipes §6.4 (incomplete beta continued fraction)

/// Iteration cap for the incomplete beta continued fraction.
const BETA_CF_MAX_ITER: usize = 300;

/// Convergence tolerance for the continued fraction.
const BETA_CF_EPS: f64 = 3.0e-14;

/// Guard against division by zero inside the continued fraction.
const BETA_CF_FPMIN: f64 = 1.0e-300;

/// Relative norm below which a regressor column counts as collinear.
const COLLINEAR_TOL: f64 = 1.0e-9;

/// Median of a sample; `0.0` for an empty one.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5)
}

/// Sample quantile with linear interpolation between order statistics
/// (position `q * (n - 1)`); `0.0` for an empty sample.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    (sorted[upper] - sorted[lower]).mul_add(frac, sorted[lower])
}

/// Lanczos approximation for ln(Γ(x)), g = 5, n = 6 coefficients.
///
/// Returns `f64::INFINITY` for non-positive `x`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.001_208_650_973_866_179,
        -5.395_239_384_953_e-6,
    ];

    if x <= 0.0 {
        return f64::INFINITY;
    }

    let g = 5.0;
    let z = x - 1.0;
    let mut sum = 0.999_999_999_999_997_1_f64;
    for (i, &c) in COEFFS.iter().enumerate() {
        sum += c / (z + 1.0 + i as f64);
    }

    let t = z + g + 0.5;
    0.5f64.mul_add((2.0 * std::f64::consts::PI).ln(), (z + 0.5) * t.ln()) - t + sum.ln()
}

/// Regularized incomplete beta function `I_x(a, b)`.
#[must_use]
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges fastest below the mean.
    if x < (a + 1.0) / (a + b + 2.0) {
        (front * beta_continued_fraction(x, a, b) / a).clamp(0.0, 1.0)
    } else {
        (1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b).clamp(0.0, 1.0)
    }
}

#[allow(clippy::cast_precision_loss)]
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < BETA_CF_FPMIN {
        d = BETA_CF_FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=BETA_CF_MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = aa.mul_add(d, 1.0);
        if d.abs() < BETA_CF_FPMIN {
            d = BETA_CF_FPMIN;
        }
        c = aa / c + 1.0;
        if c.abs() < BETA_CF_FPMIN {
            c = BETA_CF_FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = aa.mul_add(d, 1.0);
        if d.abs() < BETA_CF_FPMIN {
            d = BETA_CF_FPMIN;
        }
        c = aa / c + 1.0;
        if c.abs() < BETA_CF_FPMIN {
            c = BETA_CF_FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < BETA_CF_EPS {
            break;
        }
    }

    h
}

/// Upper tail `P(F > f)` of the F distribution with `(d1, d2)` degrees of
/// freedom.
#[must_use]
pub fn f_survival(f: f64, d1: f64, d2: f64) -> f64 {
    if f.is_nan() || f <= 0.0 {
        return 1.0;
    }
    if f.is_infinite() {
        return 0.0;
    }
    regularized_incomplete_beta(d2 / d1.mul_add(f, d2), d2 / 2.0, d1 / 2.0)
}

/// Residual sum of squares of the least-squares fit of `y` on `columns`.
///
/// Uses modified Gram-Schmidt. A column whose remaining norm is
/// negligible against its original norm is linearly dependent on the
/// earlier ones and is skipped, so collinear regressors (for example the
/// same series entered twice) are tolerated. Returns the RSS and the rank
/// of the design.
#[must_use]
pub fn least_squares_rss(columns: &[Vec<f64>], y: &[f64]) -> (f64, usize) {
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(columns.len());

    for column in columns {
        let original = norm(column);
        if original == 0.0 {
            continue;
        }
        let mut v = column.clone();
        for q in &basis {
            let proj = dot(q, &v);
            for (vi, qi) in v.iter_mut().zip(q) {
                *vi -= proj * qi;
            }
        }
        let remaining = norm(&v);
        if remaining <= COLLINEAR_TOL * original {
            continue;
        }
        for vi in &mut v {
            *vi /= remaining;
        }
        basis.push(v);
    }

    let mut residual = y.to_vec();
    for q in &basis {
        let proj = dot(q, &residual);
        for (ri, qi) in residual.iter_mut().zip(q) {
            *ri -= proj * qi;
        }
    }

    (dot(&residual, &residual), basis.len())
}

/// Ordinary least-squares line through `(x, y)` points. Returns
/// `(intercept, slope)`, or `None` with fewer than two distinct `x`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();

    let slope = sxy / sxx;
    Some((slope.mul_add(-mean_x, mean_y), slope))
}

/// Min-max normalization to `[0, 1]`; all zeros when the range is empty.
#[must_use]
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.is_nan() || range <= 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_and_quantiles() {
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&[4.0, 1.0, 2.0, 3.0]) - 2.5).abs() < 1e-12);
        assert!((quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.25) - 2.0).abs() < 1e-12);
        assert!((quantile(&[10.0, 20.0], 0.25) - 12.5).abs() < 1e-12);
        assert!(median(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn ln_gamma_known_values() {
        assert!(ln_gamma(1.0).abs() < 1e-10);
        assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-10);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-10);
        assert!(ln_gamma(0.0).is_infinite());
    }

    #[test]
    fn incomplete_beta_known_values() {
        // I_x(1, 1) = x
        assert!((regularized_incomplete_beta(0.3, 1.0, 1.0) - 0.3).abs() < 1e-10);
        // I_x(2, 1) = x^2
        assert!((regularized_incomplete_beta(0.6, 2.0, 1.0) - 0.36).abs() < 1e-10);
        // Symmetry: I_x(a, b) = 1 - I_{1-x}(b, a)
        let lhs = regularized_incomplete_beta(0.35, 3.5, 7.0);
        let rhs = 1.0 - regularized_incomplete_beta(0.65, 7.0, 3.5);
        assert!((lhs - rhs).abs() < 1e-10);
    }

    #[test]
    fn f_survival_known_values() {
        // F(1, 10) critical value at 0.05 is 4.9646.
        assert!((f_survival(4.9646, 1.0, 10.0) - 0.05).abs() < 1e-3);
        // F(2, 30) critical value at 0.01 is 5.3903.
        assert!((f_survival(5.3903, 2.0, 30.0) - 0.01).abs() < 1e-3);
        assert!((f_survival(0.0, 3.0, 20.0) - 1.0).abs() < f64::EPSILON);
        assert!(f_survival(f64::INFINITY, 3.0, 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rss_of_exact_fit_is_zero() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let ones = vec![1.0; 10];
        let y: Vec<f64> = x.iter().map(|v| 2.0f64.mul_add(*v, 1.0)).collect();
        let (rss, rank) = least_squares_rss(&[ones, x], &y);
        assert!(rss < 1e-18, "rss {rss}");
        assert_eq!(rank, 2);
    }

    #[test]
    fn rss_tolerates_duplicate_columns() {
        let x: Vec<f64> = (0..10).map(|v| f64::from(v * v % 7)).collect();
        let ones = vec![1.0; 10];
        let y: Vec<f64> = (0..10).map(|v| f64::from(v % 3)).collect();
        let (single, rank_single) = least_squares_rss(&[ones.clone(), x.clone()], &y);
        let (double, rank_double) = least_squares_rss(&[ones, x.clone(), x], &y);
        assert_eq!(rank_single, rank_double);
        assert!((single - double).abs() < 1e-9);
    }

    #[test]
    fn rss_with_no_regressors_is_total_sum_of_squares() {
        let (rss, rank) = least_squares_rss(&[], &[1.0, 2.0]);
        assert!((rss - 5.0).abs() < 1e-12);
        assert_eq!(rank, 0);
    }

    #[test]
    fn linear_fit_recovers_line() {
        let (intercept, slope) =
            linear_fit(&[(2020.0, 10.0), (2021.0, 12.0), (2022.0, 14.0)]).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((slope.mul_add(2023.0, intercept) - 16.0).abs() < 1e-6);
        assert!(linear_fit(&[(2020.0, 1.0)]).is_none());
        assert!(linear_fit(&[(2020.0, 1.0), (2020.0, 2.0)]).is_none());
    }

    #[test]
    fn min_max() {
        assert_eq!(min_max_normalize(&[2.0, 4.0, 6.0]), vec![0.0, 0.5, 1.0]);
        assert_eq!(min_max_normalize(&[3.0, 3.0]), vec![0.0, 0.0]);
    }
}
