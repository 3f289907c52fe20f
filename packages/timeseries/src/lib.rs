#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Time series helpers for the dataset comparison view.
//!
//! Series arrive as parallel columns of ISO 8601 timestamps and values.
//! [`correlation_matrix`] resamples every pair onto a common time axis and
//! computes Pearson coefficients, [`compute_fft`] and [`create_fft_bins`]
//! turn one series into a log-binned magnitude spectrum over period length.
//! Everything here is best effort: degenerate input produces `NaN` entries
//! or empty results, never errors.

pub mod correlation;
pub mod resample;
pub mod spectrum;

pub use correlation::{correlation_matrix, pearson};
pub use resample::{interp, interpolate_nan, merge_detections, normalize_min_max};
pub use spectrum::{DEFAULT_FFT_BINS, FftBins, Spectrum, compute_fft, create_fft_bins};

/// A series as parallel timestamp and value columns.
#[derive(Debug, Clone, Copy)]
pub struct SeriesRef<'a> {
    pub dates: &'a [String],
    pub values: &'a [f64],
}

/// Parses timestamps to Unix seconds; unparseable entries become `NaN`.
#[must_use]
pub fn unix_seconds(dates: &[String]) -> Vec<f64> {
    dates
        .iter()
        .map(|d| {
            mitwelten_explore_dataset_models::parse_iso_datetime(d).map_or(f64::NAN, |t| {
                #[allow(clippy::cast_precision_loss)]
                let seconds = t.and_utc().timestamp_millis() as f64 / 1000.0;
                seconds
            })
        })
        .collect()
}
