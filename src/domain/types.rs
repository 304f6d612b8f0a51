use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic location of a panel site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Validate coordinate ranges
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!(
                "latitude must be between -90 and 90, got {}",
                self.latitude
            ));
        }

        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!(
                "longitude must be between -180 and 180, got {}",
                self.longitude
            ));
        }

        Ok(())
    }
}

impl fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Sampling granularity of telemetry and features
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Granularity {
    Daily,
    Hourly,
}

impl Granularity {
    /// Length of one step
    pub fn step(&self) -> Duration {
        match self {
            Self::Daily => Duration::days(1),
            Self::Hourly => Duration::hours(1),
        }
    }

    /// Moving-average widths (short, long) used by the feature pipeline
    pub fn moving_average_widths(&self) -> (usize, usize) {
        match self {
            Self::Daily => (3, 7),
            Self::Hourly => (6, 24),
        }
    }

    /// Format of the timestamp keys used by the NASA POWER API
    pub fn timestamp_key(&self, ts: NaiveDateTime) -> String {
        match self {
            Self::Daily => ts.format("%Y%m%d").to_string(),
            Self::Hourly => ts.format("%Y%m%d%H").to_string(),
        }
    }

    /// Parse a NASA POWER timestamp key (`YYYYMMDD` or `YYYYMMDDHH`)
    pub fn parse_timestamp_key(&self, key: &str) -> Option<NaiveDateTime> {
        let date_part = key.get(..8)?;
        let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
        let hour = match self {
            Self::Daily if key.len() == 8 => 0,
            Self::Hourly if key.len() == 10 => key.get(8..10)?.parse::<u32>().ok()?,
            _ => return None,
        };
        date.and_hms_opt(hour, 0, 0)
    }
}
