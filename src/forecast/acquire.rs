//! Staged acquisition of historical telemetry.
//!
//! Upstream publication latency is unpredictable (days to weeks), so instead
//! of asking for "today minus N" once, the acquirer walks an ordered list of
//! days-back offsets and settles on the first window that returns rows.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::weather::TelemetrySource;
use crate::domain::{GeoLocation, TelemetryRecord};
use crate::error::ForecastError;

/// Ordered candidate windows for one acquisition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionPlan {
    /// Days subtracted from "today" to get each candidate end date, tried in order
    pub offsets_days: Vec<i64>,
    /// Window length ending at the candidate end date
    pub lookback_days: i64,
}

impl AcquisitionPlan {
    /// Daily forecasting: 60 days of history
    pub fn forecast() -> Self {
        Self {
            offsets_days: vec![7, 14, 30, 60, 90],
            lookback_days: 60,
        }
    }

    /// Daily training corpus: one year of history
    pub fn training() -> Self {
        Self {
            offsets_days: vec![7, 14, 30, 60],
            lookback_days: 365,
        }
    }

    /// Hourly data: 30 days of history
    pub fn hourly() -> Self {
        Self {
            offsets_days: vec![3, 7, 14],
            lookback_days: 30,
        }
    }

    /// Candidate `(start, end)` windows relative to `today`, in try order
    pub fn windows(&self, today: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
        self.offsets_days
            .iter()
            .map(|offset| {
                let end = today - Duration::days(*offset);
                let start = end - Duration::days(self.lookback_days);
                (start, end)
            })
            .collect()
    }
}

/// Telemetry successfully acquired from one candidate window
#[derive(Debug, Clone)]
pub struct Acquisition {
    pub records: Vec<TelemetryRecord>,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub offset_days: i64,
}

/// Wraps a telemetry source with the staged fallback policy
pub struct ResilientAcquirer<S: TelemetrySource> {
    source: S,
    plan: AcquisitionPlan,
}

impl<S: TelemetrySource> ResilientAcquirer<S> {
    pub fn new(source: S, plan: AcquisitionPlan) -> Self {
        Self { source, plan }
    }

    pub fn plan(&self) -> &AcquisitionPlan {
        &self.plan
    }

    /// Try each candidate window in order and return the first non-empty one.
    ///
    /// A failing window is skipped and its error kept; once every window is
    /// exhausted the last kept error (if any) is reported.
    pub async fn acquire(
        &self,
        location: &GeoLocation,
        today: NaiveDate,
    ) -> Result<Acquisition, ForecastError> {
        let mut last_error: Option<anyhow::Error> = None;

        for (offset, (start, end)) in self.plan.offsets_days.iter().zip(self.plan.windows(today)) {
            debug!(offset_days = offset, %start, %end, "Trying telemetry window");

            match self.source.fetch(location, start, end).await {
                Ok(records) if !records.is_empty() => {
                    info!(
                        offset_days = offset,
                        rows = records.len(),
                        "Acquired telemetry ending {} days ago",
                        offset
                    );
                    return Ok(Acquisition {
                        records,
                        window_start: start,
                        window_end: end,
                        offset_days: *offset,
                    });
                }
                Ok(_) => {
                    debug!(offset_days = offset, "Telemetry window came back empty");
                }
                Err(e) => {
                    warn!(offset_days = offset, error = %e, "Telemetry window failed, trying older window");
                    last_error = Some(e);
                }
            }
        }

        Err(ForecastError::data_fetch(last_error.as_ref()))
    }
}
