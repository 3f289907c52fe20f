//! Gap filling, rescaling and merging of sampled series.

use std::collections::BTreeMap;

/// Piecewise linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be ascending. Outside the sampled range the nearest endpoint
/// value is returned; an empty table or a `NaN` position yields `NaN`.
#[must_use]
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let len = xp.len().min(fp.len());
    if len == 0 || x.is_nan() {
        return f64::NAN;
    }
    let (xp, fp) = (&xp[..len], &fp[..len]);

    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[len - 1] {
        return fp[len - 1];
    }

    let upper = xp.partition_point(|v| *v <= x);
    let lower = upper - 1;
    let slope = (fp[upper] - fp[lower]) / (xp[upper] - xp[lower]);
    slope.mul_add(x - xp[lower], fp[lower])
}

/// Replaces non-finite entries by linear interpolation between their finite
/// neighbours, holding the first and last finite value at the ends.
///
/// A series without any finite value is returned unchanged.
#[must_use]
pub fn interpolate_nan(values: &[f64]) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let (xp, fp): (Vec<f64>, Vec<f64>) = values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, v)| (i as f64, *v))
        .unzip();

    if xp.is_empty() {
        return values.to_vec();
    }

    #[allow(clippy::cast_precision_loss)]
    values
        .iter()
        .enumerate()
        .map(|(i, v)| if v.is_finite() { *v } else { interp(i as f64, &xp, &fp) })
        .collect()
}

/// Rescales finite values onto `[0, 1]`.
///
/// A flat series maps to zeros. Non-finite entries stay as they are.
#[must_use]
pub fn normalize_min_max(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });

    if !min.is_finite() {
        return values.to_vec();
    }

    let range = max - min;
    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                *v
            } else if range > 0.0 {
                (v - min) / range
            } else {
                0.0
            }
        })
        .collect()
}

/// Sums two keyed series.
///
/// Missing values (`NaN`) count as zero. The result is sorted by key. When
/// one side is absent the other is returned as is.
#[must_use]
pub fn merge_detections<K: Ord + Clone>(
    first: Option<(Vec<K>, Vec<f64>)>,
    second: Option<(Vec<K>, Vec<f64>)>,
) -> Option<(Vec<K>, Vec<f64>)> {
    let (first, second) = match (first, second) {
        (None, other) | (other, None) => return other,
        (Some(first), Some(second)) => (first, second),
    };

    let mut merged: BTreeMap<K, f64> = BTreeMap::new();
    for (keys, values) in [first, second] {
        for (key, value) in keys.into_iter().zip(values) {
            let value = if value.is_nan() { 0.0 } else { value };
            *merged.entry(key).or_insert(0.0) += value;
        }
    }

    Some(merged.into_iter().unzip())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn interpolates_inside_and_clamps_outside() {
        let xp = [0.0, 10.0, 20.0];
        let fp = [0.0, 100.0, 50.0];
        assert!((interp(5.0, &xp, &fp) - 50.0).abs() < 1e-9);
        assert!((interp(15.0, &xp, &fp) - 75.0).abs() < 1e-9);
        assert!((interp(10.0, &xp, &fp) - 100.0).abs() < 1e-9);
        assert!((interp(-3.0, &xp, &fp)).abs() < 1e-9);
        assert!((interp(30.0, &xp, &fp) - 50.0).abs() < 1e-9);
        assert!(interp(1.0, &[], &[]).is_nan());
    }

    #[test]
    fn fills_gaps() {
        let filled = interpolate_nan(&[f64::NAN, 1.0, f64::NAN, 3.0, f64::NAN, f64::NAN]);
        assert_close(&filled, &[1.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn all_missing_is_unchanged() {
        let filled = interpolate_nan(&[f64::NAN, f64::NAN]);
        assert!(filled.iter().all(|v| v.is_nan()));
        assert!(interpolate_nan(&[]).is_empty());
    }

    #[test]
    fn normalizes_to_unit_range() {
        assert_close(&normalize_min_max(&[2.0, 4.0, 6.0]), &[0.0, 0.5, 1.0]);
        assert_close(&normalize_min_max(&[5.0, 5.0]), &[0.0, 0.0]);
        let with_gap = normalize_min_max(&[1.0, f64::NAN, 3.0]);
        assert!(with_gap[1].is_nan());
        assert!((with_gap[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn merges_by_key() {
        let merged = merge_detections(
            Some((vec!["2023-05-02", "2023-05-01"], vec![2.0, 1.0])),
            Some((vec!["2023-05-02", "2023-05-03"], vec![f64::NAN, 4.0])),
        )
        .unwrap();
        assert_eq!(merged.0, vec!["2023-05-01", "2023-05-02", "2023-05-03"]);
        assert_close(&merged.1, &[1.0, 2.0, 4.0]);
    }

    #[test]
    fn merge_with_missing_side_returns_other() {
        let one = Some((vec![3_i64, 1], vec![1.0, 2.0]));
        assert_eq!(merge_detections(one.clone(), None), one);
        assert_eq!(merge_detections(None, one.clone()), one);
        assert_eq!(merge_detections::<i64>(None, None), None);
    }
}
