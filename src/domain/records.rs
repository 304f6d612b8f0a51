use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One raw telemetry reading as delivered by a telemetry source.
///
/// `irradiance` is kWh/m²/day for daily data and W/m² for hourly data.
/// Missing or non-numeric upstream values are `None`; defaults are applied
/// by the consumer that needs them, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: NaiveDateTime,
    pub irradiance: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub cloud_cover_percent: f64,
}

impl TelemetryRecord {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Telemetry record enriched with the production estimate and the derived
/// calendar/lag/rolling covariates.
///
/// `lag_1`, `ma_short` and `ma_long` only ever look at strictly earlier
/// records. For daily data the averages span 3 and 7 steps, for hourly data
/// 6 and 24 steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub telemetry: TelemetryRecord,
    pub estimated_kwh: f64,
    pub day_of_year: u32,
    /// Only set for hourly tables
    pub hour: Option<u32>,
    pub lag_1: f64,
    pub ma_short: f64,
    pub ma_long: f64,
}

impl FeatureRecord {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.telemetry.timestamp
    }

    pub fn date(&self) -> NaiveDate {
        self.telemetry.date()
    }
}
