//! Feature engineering for production forecasting
//!
//! Converts raw irradiance into a production estimate and derives the
//! calendar, lag and rolling covariates the regressor is trained on.

use chrono::{Datelike, Timelike};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::{FeatureRecord, Granularity, TelemetryRecord};

/// Lower bound of the outlier cap (kWh)
const MIN_OUTLIER_CAP: f64 = 1e6;

/// Physical description of the panel installation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelSpec {
    pub area_m2: f64,
    pub efficiency: f64,
    /// Derating applied to daily estimates only
    pub performance_ratio: f64,
}

impl PanelSpec {
    pub fn new(area_m2: f64, efficiency: f64, performance_ratio: f64) -> Self {
        Self {
            area_m2,
            efficiency,
            performance_ratio,
        }
    }
}

/// Telemetry → feature table transformation for one granularity
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    granularity: Granularity,
    panel: PanelSpec,
}

impl FeaturePipeline {
    pub fn new(granularity: Granularity, panel: PanelSpec) -> Self {
        Self { granularity, panel }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Estimated energy per record, in input order.
    ///
    /// Daily: kWh/m²/day × area × efficiency × PR, clipped to `[0, cap]`.
    /// Hourly: W/m² × area × efficiency / 1000, no PR and no cap.
    pub fn estimate(&self, records: &[TelemetryRecord]) -> Vec<f64> {
        match self.granularity {
            Granularity::Daily => self.estimate_daily(records),
            Granularity::Hourly => self.estimate_hourly(records),
        }
    }

    fn estimate_daily(&self, records: &[TelemetryRecord]) -> Vec<f64> {
        let scale = self.panel.area_m2 * self.panel.efficiency * self.panel.performance_ratio;
        let estimates: Vec<f64> = records
            .iter()
            .map(|r| (r.irradiance.unwrap_or(0.0) * scale).max(0.0))
            .collect();

        let cap = outlier_cap(&estimates);
        estimates.into_iter().map(|e| e.min(cap)).collect()
    }

    fn estimate_hourly(&self, records: &[TelemetryRecord]) -> Vec<f64> {
        let scale = self.panel.area_m2 * self.panel.efficiency / 1000.0;
        records
            .iter()
            .map(|r| r.irradiance.unwrap_or(0.0) * scale)
            .collect()
    }

    /// Build the feature table.
    ///
    /// Records are sorted by timestamp (duplicates keep the first reading).
    /// The first record has no predecessor and is dropped, so the table
    /// starts one step after the earliest telemetry record.
    pub fn run(&self, mut records: Vec<TelemetryRecord>) -> Vec<FeatureRecord> {
        records.sort_by_key(|r| r.timestamp);
        records.dedup_by_key(|r| r.timestamp);

        let estimates = self.estimate(&records);
        let (short, long) = self.granularity.moving_average_widths();

        records
            .into_iter()
            .zip(estimates.iter().copied())
            .enumerate()
            .skip(1)
            .map(|(i, (telemetry, estimated_kwh))| {
                let history = &estimates[..i];
                let hour = match self.granularity {
                    Granularity::Daily => None,
                    Granularity::Hourly => Some(telemetry.timestamp.hour()),
                };

                FeatureRecord {
                    day_of_year: telemetry.timestamp.ordinal(),
                    hour,
                    estimated_kwh,
                    lag_1: history[i - 1],
                    ma_short: trailing_mean(history, short),
                    ma_long: trailing_mean(history, long),
                    telemetry,
                }
            })
            .collect()
    }
}

/// Outlier cap: `max(3 × p99, 10 × mean, 1e6)`
pub fn outlier_cap(estimates: &[f64]) -> f64 {
    if estimates.is_empty() {
        return MIN_OUTLIER_CAP;
    }

    let mean = estimates.iter().sum::<f64>() / estimates.len() as f64;
    let p99 = quantile(estimates, 0.99);

    (3.0 * p99).max(10.0 * mean).max(MIN_OUTLIER_CAP)
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let sorted: Vec<f64> = values.iter().copied().sorted_by(|a, b| a.total_cmp(b)).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Mean of the last `width` values (fewer if the history is shorter)
pub fn trailing_mean(history: &[f64], width: usize) -> f64 {
    let window = &history[history.len().saturating_sub(width)..];
    if window.is_empty() {
        return f64::NAN;
    }
    window.iter().sum::<f64>() / window.len() as f64
}
