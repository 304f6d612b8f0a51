use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::GeoLocation;

/// Longest accepted forecast horizon (about ten years)
pub const MAX_DAYS_AHEAD: usize = 3660;

/// One forecast step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(rename = "pred_kwh")]
    pub predicted_kwh: f64,
}

/// Complete forecast: the ordered points plus the reference values they were
/// derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub predictions: Vec<ForecastPoint>,
    pub baseline: f64,
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
    #[serde(with = "iso_date")]
    pub last_known_date: NaiveDate,
}

/// Parameters of one forecast invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub location: GeoLocation,
    /// Panel area (m²)
    pub panel_area_m2: f64,
    /// Panel efficiency (0-1)
    pub efficiency: f64,
    /// Number of days to forecast; zero yields an empty horizon
    pub days_ahead: usize,
}

impl ForecastRequest {
    pub fn new(location: GeoLocation, panel_area_m2: f64, efficiency: f64, days_ahead: usize) -> Self {
        Self {
            location,
            panel_area_m2,
            efficiency,
            days_ahead,
        }
    }

    /// Validate inputs for sanity
    pub fn validate(&self) -> Result<(), String> {
        self.location.validate()?;

        if !(self.panel_area_m2 > 0.0) || !self.panel_area_m2.is_finite() {
            return Err("panel area must be a positive number".to_string());
        }

        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err("efficiency must be in (0, 1]".to_string());
        }

        if self.days_ahead > MAX_DAYS_AHEAD {
            return Err(format!(
                "days ahead must be at most {}, got {}",
                MAX_DAYS_AHEAD, self.days_ahead
            ));
        }

        Ok(())
    }
}

/// `YYYY-MM-DD` serialization for calendar dates
mod iso_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
