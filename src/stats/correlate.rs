use crate::config::MIN_CORRELATION_PAIRS;
use crate::error::AnalysisError;

/// Pearson correlation coefficient of `(x, y)` pairs, requiring at least three
/// finite pairs. See `correlate_with_min`.
pub fn correlate(pairs: &[(f64, f64)]) -> Result<f64, AnalysisError> {
    correlate_with_min(pairs, MIN_CORRELATION_PAIRS)
}

/// Pearson correlation coefficient `Σ(x-x̄)(y-ȳ) / √(Σ(x-x̄)² · Σ(y-ȳ)²)`.
///
/// Pairs with a non-finite member are ignored. Fewer than `min_pairs` remaining
/// is an error. If either series is constant no correlation is detectable and
/// the result is `0`. A series whose variance vanishes only through rounding is
/// `DegenerateCorrelation` rather than a silent `0`. The result is clamped to `[-1, 1]`.
pub fn correlate_with_min(pairs: &[(f64, f64)], min_pairs: usize) -> Result<f64, AnalysisError> {
    let valid: Vec<(f64, f64)> = pairs.iter().copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    let required = min_pairs.max(MIN_CORRELATION_PAIRS);
    if valid.len() < required {
        return Err(AnalysisError::InsufficientFeatures { found: valid.len(), required });
    }

    // A constant series has zero variance; test it directly rather than through
    // the sum of squares, which rounding can leave slightly above zero.
    if is_constant(valid.iter().map(|p| p.0)) || is_constant(valid.iter().map(|p| p.1)) {
        return Ok(0.0);
    }

    // r is invariant under positive rescaling; dividing each series by its largest
    // magnitude keeps means and sums of squares finite for extreme values.
    let x_scale = valid.iter().fold(0.0, |m: f64, p| m.max(p.0.abs()));
    let y_scale = valid.iter().fold(0.0, |m: f64, p| m.max(p.1.abs()));
    let scaled: Vec<(f64, f64)> = valid.iter().map(|&(x, y)| (x / x_scale, y / y_scale)).collect();

    let n = scaled.len() as f64;
    let x_mean = scaled.iter().map(|p| p.0).sum::<f64>() / n;
    let y_mean = scaled.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &scaled {
        let (dx, dy) = (x - x_mean, y - y_mean);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = sxx.sqrt() * syy.sqrt();
    if !(denominator.is_finite() && denominator > 0.0) {
        return Err(AnalysisError::DegenerateCorrelation);
    }
    Ok((sxy / denominator).clamp(-1.0, 1.0))
}

fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    let first = values.next();
    values.all(|v| Some(v) == first)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn perfect_positive_and_negative() {
        let up = [(1.0, 2.0), (2.0, 4.0), (3.0, 6.0), (4.0, 8.0)];
        let down = [(1.0, 8.0), (2.0, 6.0), (3.0, 4.0), (4.0, 2.0)];
        assert!(close(correlate(&up).unwrap(), 1.0));
        assert!(close(correlate(&down).unwrap(), -1.0));
    }

    #[test]
    fn known_value() {
        // r = 0.8 for this textbook set.
        let pairs = [(1.0, 2.0), (2.0, 1.0), (3.0, 4.0), (4.0, 3.0), (5.0, 5.0)];
        assert!(close(correlate(&pairs).unwrap(), 0.8));
    }

    #[test]
    fn two_pairs_is_an_error() {
        let err = correlate(&[(1.0, 2.0), (2.0, 3.0)]).unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientFeatures { found: 2, required: 3 });
        assert!(err.to_string().contains("minimum required is 3"));
    }

    #[test]
    fn non_finite_pairs_do_not_count() {
        let pairs = [(1.0, 2.0), (2.0, f64::NAN), (f64::INFINITY, 3.0), (3.0, 1.0)];
        assert_eq!(
            correlate(&pairs).unwrap_err(),
            AnalysisError::InsufficientFeatures { found: 2, required: 3 }
        );
    }

    #[test]
    fn constant_series_is_zero() {
        assert_eq!(correlate(&[(0.1, 1.0), (0.1, 5.0), (0.1, 3.0)]).unwrap(), 0.0);
        assert_eq!(correlate(&[(1.0, 7.0), (2.0, 7.0), (3.0, 7.0)]).unwrap(), 0.0);
    }

    #[test]
    fn extreme_magnitudes_keep_their_correlation() {
        let huge = [(1e200, 1.0), (2e200, 2.0), (3e200, 3.0), (4e200, 4.0)];
        assert!(close(correlate(&huge).unwrap(), 1.0));

        let opposed = [(1e300, -1e300), (-1e300, 1e300), (5e299, -5e299)];
        assert!(close(correlate(&opposed).unwrap(), -1.0));

        let tiny = [(1e-300, 3.0), (2e-300, 1.0), (3e-300, 2.0), (4e-300, 0.0)];
        let reference = [(1.0, 3.0), (2.0, 1.0), (3.0, 2.0), (4.0, 0.0)];
        assert!(close(correlate(&tiny).unwrap(), correlate(&reference).unwrap()));
    }

    #[test]
    fn higher_minimum_is_honoured() {
        let pairs = [(1.0, 2.0), (2.0, 1.0), (3.0, 4.0)];
        assert!(correlate_with_min(&pairs, 5).is_err());
        assert!(correlate_with_min(&pairs, 1).is_ok()); // never below three
    }

    fn series() -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((-1.0e3..1.0e3f64, -1.0e3..1.0e3f64), 3..40)
            .prop_filter("non-constant", |v| {
                let spread = |f: fn(&(f64, f64)) -> f64| {
                    let (lo, hi) = v.iter().map(f).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
                    hi - lo
                };
                spread(|p| p.0) > 1e-3 && spread(|p| p.1) > 1e-3
            })
    }

    proptest! {
        #[test]
        fn bounded(pairs in series()) {
            let r = correlate(&pairs).unwrap();
            prop_assert!((-1.0..=1.0).contains(&r));
        }

        #[test]
        fn translation_invariant(pairs in series(), c in -1.0e3..1.0e3f64) {
            let shifted: Vec<_> = pairs.iter().map(|&(x, y)| (x + c, y)).collect();
            let (a, b) = (correlate(&pairs).unwrap(), correlate(&shifted).unwrap());
            prop_assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }

        #[test]
        fn positive_scale_invariant(pairs in series(), k in 0.01..100.0f64) {
            let scaled: Vec<_> = pairs.iter().map(|&(x, y)| (x, y * k)).collect();
            let (a, b) = (correlate(&pairs).unwrap(), correlate(&scaled).unwrap());
            prop_assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }
}
