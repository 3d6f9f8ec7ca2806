//! Rolling-window formulas over plain slices.
//!
//! Every function returns one entry per input value; `None` marks points
//! where the formula is not defined yet.

/// Trailing arithmetic mean over `window` values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || values.len() < window {
        return vec![None; values.len()];
    }

    let mut results = vec![None; window - 1];

    let mut sum: f64 = values.iter().take(window).sum();
    results.push(Some(sum / window as f64));

    // Slide the window
    for i in window..values.len() {
        sum = sum - values[i - window] + values[i];
        results.push(Some(sum / window as f64));
    }
    results
}

/// Trailing sample standard deviation (n - 1 denominator).
///
/// Mean and deviations are re-derived from the raw window at each point, so
/// a long run does not accumulate drift from a running sum.
pub fn rolling_sample_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 || values.len() < window {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = slice.iter().sum::<f64>() / window as f64;
            let squares: f64 = slice.iter().map(|x| (x - mean) * (x - mean)).sum();
            Some((squares / (window - 1) as f64).sqrt())
        })
        .collect()
}

/// Exponentially weighted mean with `alpha = 2 / (span + 1)`, seeded with the
/// first value and defined from the first point on.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (span as f64 + 1.0);

    values
        .iter()
        .scan(first, move |prev, &v| {
            let next = alpha * v + (1.0 - alpha) * *prev;
            *prev = next;
            Some(next)
        })
        .collect()
}

/// Running volume-weighted average price, `sum(close * volume) / sum(volume)`.
///
/// Points where the cumulative volume is still zero are `None`.
pub fn cumulative_vwap(closes: &[f64], volumes: &[u64]) -> Vec<Option<f64>> {
    let mut weighted = 0.0;
    let mut total_volume = 0.0;

    closes
        .iter()
        .zip(volumes)
        .map(|(&close, &volume)| {
            let volume = volume as f64;
            weighted += close * volume;
            total_volume += volume;
            if total_volume > 0.0 {
                Some(weighted / total_volume)
            } else {
                None
            }
        })
        .collect()
}
