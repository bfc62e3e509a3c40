//! Sample statistics over small in-memory series.

/// Median of a sample (mean of the two middle values for even lengths).
///
/// Non-finite values are ignored. Returns `None` for an empty sample.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Population standard deviation (`ddof = 0`) of a sample.
///
/// Non-finite values are ignored. Returns `None` for an empty sample.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let var = finite.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some(var.sqrt())
}
