//! Historical irradiance and weather telemetry (NASA POWER)
//!
//! This module provides the raw per-timestamp readings the production
//! estimate and the forecast covariates are derived from.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info};

use crate::config::NasaConfig;
use crate::domain::{GeoLocation, Granularity, TelemetryRecord};

/// Surface shortwave downward irradiance (all sky)
pub const PARAM_IRRADIANCE: &str = "ALLSKY_SFC_SW_DWN";
/// Temperature at 2 m (°C)
pub const PARAM_TEMPERATURE: &str = "T2M";
/// Relative humidity at 2 m (%)
pub const PARAM_HUMIDITY: &str = "RH2M";

/// NASA POWER marks missing samples with this value
const FILL_VALUE: f64 = -999.0;

/// Source of historical telemetry for a closed date range
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch every reading between `start` and `end` (both inclusive),
    /// ordered by timestamp.
    async fn fetch(
        &self,
        location: &GeoLocation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TelemetryRecord>>;
}

/// NASA POWER API client
pub struct NasaPowerClient {
    client: Client,
    base_url: String,
    community: String,
    granularity: Granularity,
    default_cloud_cover: f64,
    parameters: Vec<String>,
}

impl NasaPowerClient {
    /// Create a new NASA POWER client; every request is bounded by the configured timeout
    pub fn new(config: &NasaConfig, granularity: Granularity) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build NASA POWER HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            community: config.community.clone(),
            granularity,
            default_cloud_cover: config.default_cloud_cover,
            parameters: vec![
                PARAM_IRRADIANCE.to_string(),
                PARAM_TEMPERATURE.to_string(),
                PARAM_HUMIDITY.to_string(),
            ],
        })
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/point", self.base_url, self.granularity)
    }

    /// Turn the parameter-keyed response into timestamp-ordered records
    fn parse_response(&self, response: PowerResponse) -> Result<Vec<TelemetryRecord>> {
        let columns = response.properties.parameter;
        let mut rows: BTreeMap<NaiveDateTime, TelemetryRecord> = BTreeMap::new();

        for (name, series) in &columns {
            for (key, value) in series {
                let timestamp = self
                    .granularity
                    .parse_timestamp_key(key)
                    .with_context(|| format!("Unparseable NASA POWER timestamp '{}'", key))?;

                let record = rows.entry(timestamp).or_insert_with(|| TelemetryRecord {
                    timestamp,
                    irradiance: None,
                    temperature_c: None,
                    humidity_percent: None,
                    cloud_cover_percent: self.default_cloud_cover,
                });

                let value = numeric_value(value);
                match name.as_str() {
                    PARAM_IRRADIANCE => record.irradiance = value,
                    PARAM_TEMPERATURE => record.temperature_c = value,
                    PARAM_HUMIDITY => record.humidity_percent = value,
                    _ => {}
                }
            }
        }

        Ok(rows.into_values().collect())
    }
}

/// Coerce a JSON cell to a number; fill values and non-numeric cells are missing
fn numeric_value(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    if !number.is_finite() || number <= FILL_VALUE {
        None
    } else {
        Some(number)
    }
}

#[async_trait]
impl TelemetrySource for NasaPowerClient {
    async fn fetch(
        &self,
        location: &GeoLocation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TelemetryRecord>> {
        let url = self.endpoint();
        let start_key = start.format("%Y%m%d").to_string();
        let end_key = end.format("%Y%m%d").to_string();
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let parameters = self.parameters.join(",");

        debug!(%url, start = %start_key, end = %end_key, %location, "Fetching NASA POWER telemetry");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("start", start_key.as_str()),
                ("end", end_key.as_str()),
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("community", self.community.as_str()),
                ("parameters", parameters.as_str()),
                ("format", "JSON"),
            ])
            .send()
            .await
            .context("Failed to send request to NASA POWER API")?;

        if !response.status().is_success() {
            error!("NASA POWER API returned error status: {}", response.status());
            anyhow::bail!("NASA POWER API error: {}", response.status());
        }

        let body: PowerResponse = response
            .json()
            .await
            .context("Failed to parse NASA POWER response")?;

        let records = self.parse_response(body)?;

        info!(
            rows = records.len(),
            granularity = %self.granularity,
            "Fetched NASA POWER telemetry for {}",
            location
        );

        Ok(records)
    }
}

// NASA POWER API response structures
#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, BTreeMap<String, serde_json::Value>>,
}
