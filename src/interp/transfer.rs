use crate::interp::WeightedContribution;

/// Weighted mean `Σ(value·weight) / Σ(weight)` of a target's contributions.
///
/// Returns `None` when the total weight is zero (no usable overlap). The result is
/// clamped to the range of the contributing values so floating-point rounding can
/// never push it outside the convex hull of its inputs.
pub fn transfer(contributions: &[WeightedContribution]) -> Option<f64> {
    let usable = contributions.iter()
        .filter(|c| c.source_value.is_finite() && c.weight.is_finite() && c.weight > 0.0);

    let (mut sum, mut total) = (0.0, 0.0);
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for c in usable {
        sum += c.source_value * c.weight;
        total += c.weight;
        lo = lo.min(c.source_value);
        hi = hi.max(c.source_value);
    }

    if total <= 0.0 { return None }
    let mean = sum / total;
    mean.is_finite().then(|| mean.clamp(lo, hi))
}
