//! Pairwise correlation of irregularly sampled series.

use crate::{SeriesRef, resample::interp, unix_seconds};

/// Pearson correlation coefficient of two equally long samples.
///
/// Returns `NaN` for fewer than two samples, mismatched lengths, non-finite
/// input or a constant sample.
#[must_use]
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return f64::NAN;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return f64::NAN;
    }

    #[allow(clippy::cast_precision_loss)]
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator <= 0.0 {
        return f64::NAN;
    }
    (cov / denominator).clamp(-1.0, 1.0)
}

/// Upper triangular correlation matrix of `series`.
///
/// Entry `(i, j)` with `i < j` correlates series `i` with series `j`
/// resampled onto the timestamps of `i`. The diagonal and the lower
/// triangle are zero. Pairs where either side has fewer than two samples,
/// unparseable timestamps or mismatched columns are `NaN`. Fewer than two
/// series yield `None`.
#[must_use]
pub fn correlation_matrix(series: &[SeriesRef<'_>]) -> Option<Vec<Vec<f64>>> {
    if series.len() < 2 {
        return None;
    }

    let times: Vec<Vec<f64>> = series.iter().map(|s| unix_seconds(s.dates)).collect();
    let mut matrix = vec![vec![0.0; series.len()]; series.len()];

    for i in 0..series.len() {
        for j in (i + 1)..series.len() {
            matrix[i][j] = correlate_pair(&times[i], series[i].values, &times[j], series[j].values);
        }
    }

    log::debug!("Correlated {} series", series.len());
    Some(matrix)
}

fn correlate_pair(times_i: &[f64], values_i: &[f64], times_j: &[f64], values_j: &[f64]) -> f64 {
    let usable = |times: &[f64], values: &[f64]| {
        times.len() >= 2 && times.len() == values.len() && times.iter().all(|t| t.is_finite())
    };
    if !usable(times_i, values_i) || !usable(times_j, values_j) {
        return f64::NAN;
    }

    let resampled: Vec<f64> = times_i.iter().map(|t| interp(*t, times_j, values_j)).collect();
    pearson(values_i, &resampled)
}
