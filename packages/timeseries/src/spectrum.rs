//! Magnitude spectra over period length.

use mitwelten_explore_dataset_models::{Aggregation, parse_iso_datetime};
use rustfft::{FftPlanner, num_complex::Complex};
use serde::Serialize;

use crate::resample::interpolate_nan;

/// Number of logarithmic period bins used by the spectrum view.
pub const DEFAULT_FFT_BINS: usize = 256;

/// Samples are truncated to a multiple of this many buckets so that daily
/// cycles of hourly data line up with a frequency bin.
const WINDOW_MULTIPLE: usize = 24;

/// One-sided magnitude spectrum without the DC component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spectrum {
    /// Normalized magnitude per frequency bin.
    pub magnitudes: Vec<f64>,
    /// Period length in seconds per frequency bin, rounded half to even.
    pub periods: Vec<f64>,
}

/// Spectrum magnitudes aggregated into logarithmic period buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FftBins {
    pub values: Vec<f64>,
    /// Lower period bound of each non-empty bucket, longest first.
    pub bucket_ends: Vec<f64>,
}

/// Computes the spectrum of an evenly bucketed series.
///
/// The sampling interval is the distance between the first two
/// timestamps. Gaps are interpolated first and the series is truncated to
/// a multiple of 24 samples. Returns `None` if fewer than 24 samples
/// remain, the interval is not positive or no value is finite.
#[must_use]
pub fn compute_fft(values: &[f64], dates: &[String]) -> Option<Spectrum> {
    let interval = sampling_interval(dates)?;

    let amplitude = interpolate_nan(values);
    let n = amplitude.len() - amplitude.len() % WINDOW_MULTIPLE;
    if n == 0 || amplitude[..n].iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut buffer: Vec<Complex<f64>> = amplitude[..n]
        .iter()
        .map(|v| Complex::new(*v, 0.0))
        .collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buffer);

    #[allow(clippy::cast_precision_loss)]
    let (len, window) = (n as f64, n as f64 * interval);

    #[allow(clippy::cast_precision_loss)]
    let (magnitudes, periods): (Vec<f64>, Vec<f64>) = (1..n / 2)
        .map(|k| (buffer[k].norm() / len, (window / k as f64).round_ties_even()))
        .unzip();

    log::debug!("Spectrum of {n} samples at {interval}s intervals");
    Some(Spectrum {
        magnitudes,
        periods,
    })
}

/// Full distance between the first two buckets in seconds, so daily and
/// weekly buckets get a spectrum too.
fn sampling_interval(dates: &[String]) -> Option<f64> {
    let [first, second, ..] = dates else {
        return None;
    };
    let seconds = (parse_iso_datetime(second)? - parse_iso_datetime(first)?).num_milliseconds();
    #[allow(clippy::cast_precision_loss)]
    let seconds = seconds as f64 / 1000.0;
    (seconds > 0.0).then_some(seconds)
}

/// Aggregates spectrum magnitudes into `n_bins` logarithmically spaced
/// period buckets spanning the longest to the shortest period.
///
/// A period `p` belongs to bucket `i` when exactly `i` bucket bounds are
/// longer than `p`; the bucket is reported with bound `i` as its end.
/// Empty buckets are omitted, as is everything for a missing spectrum.
#[must_use]
pub fn create_fft_bins(spectrum: Option<&Spectrum>, n_bins: usize, agg: Aggregation) -> FftBins {
    let Some(spectrum) = spectrum else {
        return FftBins::default();
    };
    let bounds = log_bounds(&spectrum.periods, n_bins);
    if bounds.is_empty() {
        return FftBins::default();
    }

    let mut groups: Vec<Vec<f64>> = vec![Vec::new(); bounds.len()];
    for (period, magnitude) in spectrum.periods.iter().zip(&spectrum.magnitudes) {
        let bucket = bounds.partition_point(|bound| bound > period);
        if let Some(group) = groups.get_mut(bucket) {
            group.push(*magnitude);
        }
    }

    let (values, bucket_ends): (Vec<f64>, Vec<f64>) = groups
        .iter()
        .zip(&bounds)
        .filter(|(group, _)| !group.is_empty())
        .map(|(group, bound)| (agg.reduce(group), *bound))
        .unzip();

    FftBins {
        values,
        bucket_ends,
    }
}

/// Descending log-spaced bounds from the longest to the shortest period,
/// with exact endpoints.
fn log_bounds(periods: &[f64], n_bins: usize) -> Vec<f64> {
    let (min, max) = periods
        .iter()
        .filter(|p| p.is_finite() && **p > 0.0)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(*p), hi.max(*p))
        });
    if n_bins == 0 || !min.is_finite() {
        return Vec::new();
    }
    if n_bins == 1 {
        return vec![max];
    }

    let (start, end) = (max.log10(), min.log10());
    #[allow(clippy::cast_precision_loss)]
    let step = (end - start) / (n_bins - 1) as f64;

    #[allow(clippy::cast_precision_loss)]
    let mut bounds: Vec<f64> = (0..n_bins)
        .map(|i| 10_f64.powf(step.mul_add(i as f64, start)))
        .collect();
    bounds[0] = max;
    bounds[n_bins - 1] = min;
    bounds
}
