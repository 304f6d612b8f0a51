use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, info};

use super::window::{SlidingWindow, DEFAULT_WINDOW_CAPACITY};
use crate::config::EngineConfig;
use crate::domain::{FeatureRecord, Forecast, ForecastPoint, MAX_DAYS_AHEAD};
use crate::error::ForecastError;
use crate::ml::{feature_names, FeatureVector, Regressor, DAILY_FEATURES};

/// Weather covariates held constant over the whole horizon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Covariates {
    pub temperature_c: f64,
    pub cloud_cover_percent: f64,
    pub humidity_percent: f64,
}

impl Covariates {
    /// Last-known values of `record`, configured defaults where undefined
    pub fn carried_forward(record: &FeatureRecord, config: &EngineConfig) -> Self {
        let t = &record.telemetry;
        Self {
            temperature_c: finite_or(t.temperature_c, config.default_temperature),
            cloud_cover_percent: finite_or(Some(t.cloud_cover_percent), config.default_cloud_cover),
            humidity_percent: finite_or(t.humidity_percent, config.default_humidity),
        }
    }
}

fn finite_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(default)
}

/// Autoregressive daily forecaster.
///
/// Each step's lag and moving-average inputs come from a sliding window that
/// holds known production first and the engine's own predictions afterwards,
/// so errors compound over the horizon.
pub struct ForecastEngine {
    regressor: Box<dyn Regressor>,
    config: EngineConfig,
}

impl ForecastEngine {
    pub fn new(regressor: Box<dyn Regressor>, config: EngineConfig) -> Self {
        Self { regressor, config }
    }

    pub fn regressor(&self) -> &dyn Regressor {
        self.regressor.as_ref()
    }

    /// Forecast `days_ahead` days from the later of the last known record
    /// and `today`. Any failing step aborts the whole forecast.
    pub fn forecast(
        &self,
        records: &[FeatureRecord],
        today: NaiveDate,
        days_ahead: usize,
    ) -> Result<Forecast, ForecastError> {
        let last = records.last().ok_or(ForecastError::EmptyFeatures)?;

        let baseline = if last.ma_long.is_finite() {
            last.ma_long
        } else {
            0.0
        };
        let covariates = Covariates::carried_forward(last, &self.config);

        let history = records
            .iter()
            .map(|r| r.estimated_kwh)
            .filter(|v| v.is_finite());
        let mut window = SlidingWindow::seeded(DEFAULT_WINDOW_CAPACITY, history);
        if window.is_empty() {
            window.push(baseline);
        }

        let last_known_date = last.date();
        let start_date = last_known_date.max(today);
        let names = feature_names(&DAILY_FEATURES);

        debug!(
            %start_date,
            %last_known_date,
            baseline,
            window = ?window.values(),
            "Starting autoregressive forecast"
        );

        let mut predictions = Vec::with_capacity(days_ahead.min(MAX_DAYS_AHEAD));
        for step in 0..days_ahead {
            let date = step_date(start_date, step)?;
            let row = FeatureVector::new(
                step_features(date, &window, baseline, &covariates),
                names.clone(),
            )?;

            let predicted_kwh = self
                .regressor
                .predict_one(&row)
                .map_err(|e| ForecastError::Unexpected(format!("{:#}", e)))?;

            window.push(predicted_kwh);
            predictions.push(ForecastPoint {
                date,
                predicted_kwh,
            });
        }

        info!(
            days = predictions.len(),
            %start_date,
            model_id = %self.regressor.metadata().model_id,
            "Forecast complete"
        );

        Ok(Forecast {
            predictions,
            baseline,
            start_date,
            last_known_date,
        })
    }
}

/// Calendar day of forecast step `step` (0-based)
fn step_date(start_date: NaiveDate, step: usize) -> Result<NaiveDate, ForecastError> {
    i64::try_from(step)
        .ok()
        .and_then(Duration::try_days)
        .and_then(|offset| start_date.checked_add_signed(offset))
        .ok_or_else(|| {
            ForecastError::Unexpected(format!(
                "forecast step {} from {} is out of the calendar range",
                step, start_date
            ))
        })
}

/// `[dayofyear, lag1, ma3, ma7, T2M, CLD, RH2M]` for one step
fn step_features(
    date: NaiveDate,
    window: &SlidingWindow,
    baseline: f64,
    covariates: &Covariates,
) -> Vec<f64> {
    vec![
        date.ordinal() as f64,
        window.last().unwrap_or(baseline),
        window.mean_of_last(3).unwrap_or(baseline),
        window.mean().unwrap_or(baseline),
        covariates.temperature_c,
        covariates.cloud_cover_percent,
        covariates.humidity_percent,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TelemetryRecord;
    use crate::ml::models::LinearRegressionModel;
    use crate::ml::{ModelMetadata, ModelType, ValidationMetrics};
    use std::sync::Mutex;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(last_date: NaiveDate, values: &[f64]) -> Vec<FeatureRecord> {
        let n = values.len() as i64;
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let day = last_date - Duration::days(n - 1 - i as i64);
                FeatureRecord {
                    telemetry: TelemetryRecord {
                        timestamp: day.and_hms_opt(0, 0, 0).unwrap(),
                        irradiance: Some(5.0),
                        temperature_c: Some(25.0),
                        humidity_percent: Some(40.0),
                        cloud_cover_percent: 50.0,
                    },
                    estimated_kwh: *v,
                    day_of_year: day.ordinal(),
                    hour: None,
                    lag_1: 0.0,
                    ma_short: 0.0,
                    ma_long: 9.5,
                }
            })
            .collect()
    }

    /// Records every row it is asked about and answers with a fixed script
    struct ScriptedRegressor {
        metadata: ModelMetadata,
        answers: Vec<f64>,
        seen: Mutex<Vec<Vec<f64>>>,
    }

    impl ScriptedRegressor {
        fn new(answers: Vec<f64>) -> Self {
            Self {
                metadata: ModelMetadata {
                    model_id: "scripted".to_string(),
                    model_type: ModelType::LinearRegression,
                    version: "test".to_string(),
                    trained_at: chrono::Utc::now(),
                    training_samples: 0,
                    validation_metrics: ValidationMetrics::empty(),
                    feature_names: feature_names(&DAILY_FEATURES),
                },
                answers,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Regressor for std::sync::Arc<ScriptedRegressor> {
        fn predict_batch(&self, rows: &[FeatureVector]) -> anyhow::Result<Vec<f64>> {
            let mut seen = self.seen.lock().unwrap();
            let mut out = Vec::new();
            for row in rows {
                let idx = seen.len();
                seen.push(row.features.clone());
                match self.answers.get(idx) {
                    Some(v) => out.push(*v),
                    None => anyhow::bail!("script exhausted"),
                }
            }
            Ok(out)
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }
    }

    #[test]
    fn test_autoregressive_window_scenario() {
        let scripted = std::sync::Arc::new(ScriptedRegressor::new(vec![20.0, 30.0, 40.0]));
        let engine = ForecastEngine::new(Box::new(scripted.clone()), EngineConfig::default());

        let last = date(2025, 3, 1);
        let records = table(last, &[10.0, 12.0, 9.0, 11.0, 13.0, 8.0, 14.0]);
        let forecast = engine.forecast(&records, date(2025, 3, 5), 3).unwrap();

        let seen = scripted.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);

        // Step 0: lag1 = 14, ma3 = mean(13, 8, 14), ma7 = mean of all seven
        let day = date(2025, 3, 5).ordinal() as f64;
        assert_eq!(
            seen[0],
            vec![day, 14.0, 35.0 / 3.0, 11.0, 25.0, 50.0, 40.0]
        );

        // Step 1: 20 pushed, 10 evicted
        assert_eq!(seen[1][0], day + 1.0);
        assert_eq!(seen[1][1], 20.0);
        assert_eq!(seen[1][2], (8.0 + 14.0 + 20.0) / 3.0);
        assert_eq!(seen[1][3], (12.0 + 9.0 + 11.0 + 13.0 + 8.0 + 14.0 + 20.0) / 7.0);

        // Step 2 sees both predictions
        assert_eq!(seen[2][1], 30.0);
        assert_eq!(seen[2][2], (14.0 + 20.0 + 30.0) / 3.0);

        assert_eq!(forecast.start_date, date(2025, 3, 5));
        assert_eq!(forecast.last_known_date, last);
        assert_eq!(forecast.baseline, 9.5);
        let dates: Vec<_> = forecast.predictions.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2025, 3, 5), date(2025, 3, 6), date(2025, 3, 7)]);
        let values: Vec<_> = forecast.predictions.iter().map(|p| p.predicted_kwh).collect();
        assert_eq!(values, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_start_date_is_last_known_when_later_than_today() {
        let model = LinearRegressionModel::with_features(
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            0.0,
            feature_names(&DAILY_FEATURES),
        );
        let engine = ForecastEngine::new(Box::new(model), EngineConfig::default());
        let last = date(2025, 6, 10);
        let records = table(last, &[3.0, 4.0]);

        let forecast = engine.forecast(&records, date(2025, 6, 1), 2).unwrap();
        assert_eq!(forecast.start_date, last);
        assert_eq!(forecast.predictions[0].date, last);
        // lag-1 passthrough keeps repeating the last known value
        assert_eq!(forecast.predictions[1].predicted_kwh, 4.0);
    }

    #[test]
    fn test_defaults_and_baseline_fallbacks() {
        let scripted = std::sync::Arc::new(ScriptedRegressor::new(vec![1.0]));
        let engine = ForecastEngine::new(Box::new(scripted.clone()), EngineConfig::default());

        let mut records = table(date(2025, 1, 10), &[f64::NAN]);
        records[0].ma_long = f64::NAN;
        records[0].telemetry.temperature_c = None;
        records[0].telemetry.humidity_percent = Some(f64::NAN);
        records[0].telemetry.cloud_cover_percent = f64::NAN;

        let forecast = engine.forecast(&records, date(2025, 1, 10), 1).unwrap();
        assert_eq!(forecast.baseline, 0.0);

        let seen = scripted.seen.lock().unwrap();
        // window seeded with the baseline when no production is known
        assert_eq!(seen[0][1..4], [0.0, 0.0, 0.0]);
        assert_eq!(seen[0][4..], [20.0, 50.0, 60.0]);
    }

    #[test]
    fn test_mid_horizon_failure_aborts() {
        let scripted = std::sync::Arc::new(ScriptedRegressor::new(vec![1.0, 2.0]));
        let engine = ForecastEngine::new(Box::new(scripted), EngineConfig::default());
        let records = table(date(2025, 1, 10), &[1.0, 2.0]);

        let err = engine.forecast(&records, date(2025, 1, 10), 5).unwrap_err();
        assert!(matches!(err, ForecastError::Unexpected(_)));
        assert!(err.to_string().contains("script exhausted"));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let model = LinearRegressionModel::with_features(
            vec![0.0; 7],
            1.0,
            feature_names(&DAILY_FEATURES),
        );
        let engine = ForecastEngine::new(Box::new(model), EngineConfig::default());
        let err = engine.forecast(&[], date(2025, 1, 1), 3).unwrap_err();
        assert!(matches!(err, ForecastError::EmptyFeatures));
    }

    #[test]
    fn test_year_boundary_day_of_year() {
        let scripted = std::sync::Arc::new(ScriptedRegressor::new(vec![1.0, 1.0]));
        let engine = ForecastEngine::new(Box::new(scripted.clone()), EngineConfig::default());
        let records = table(date(2024, 12, 31), &[5.0]);

        let forecast = engine.forecast(&records, date(2024, 12, 31), 2).unwrap();
        assert_eq!(forecast.predictions[1].date, date(2025, 1, 1));

        let seen = scripted.seen.lock().unwrap();
        assert_eq!(seen[0][0], 366.0);
        assert_eq!(seen[1][0], 1.0);
    }

    fn persistence_engine() -> ForecastEngine {
        let model = LinearRegressionModel::with_features(
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            0.0,
            feature_names(&DAILY_FEATURES),
        );
        ForecastEngine::new(Box::new(model), EngineConfig::default())
    }

    #[test]
    fn test_zero_horizon_yields_empty_forecast() {
        let records = table(date(2025, 4, 1), &[2.0, 3.0]);
        let forecast = persistence_engine()
            .forecast(&records, date(2025, 4, 2), 0)
            .unwrap();

        assert!(forecast.predictions.is_empty());
        assert_eq!(forecast.start_date, date(2025, 4, 2));
        assert_eq!(forecast.baseline, 9.5);
    }

    #[test]
    fn test_horizon_past_calendar_end_is_an_error() {
        let last = NaiveDate::MAX - Duration::days(1);
        let records = table(last, &[1.0]);

        let err = persistence_engine()
            .forecast(&records, date(2025, 1, 1), usize::MAX)
            .unwrap_err();
        assert!(matches!(err, ForecastError::Unexpected(_)));
        assert!(err.to_string().contains("out of the calendar range"));
    }

    #[test]
    fn test_step_date_overflow() {
        assert_eq!(step_date(date(2025, 1, 1), 2).unwrap(), date(2025, 1, 3));
        assert!(step_date(NaiveDate::MAX, 1).is_err());
        assert!(step_date(date(2025, 1, 1), usize::MAX).is_err());
    }

    #[test]
    fn test_window_holds_seven_most_recent_values() {
        let scripted = std::sync::Arc::new(ScriptedRegressor::new(vec![0.0]));
        let engine = ForecastEngine::new(Box::new(scripted.clone()), EngineConfig::default());
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let records = table(date(2025, 5, 1), &values);

        engine.forecast(&records, date(2025, 5, 1), 1).unwrap();

        let seen = scripted.seen.lock().unwrap();
        // ma7 over 4..=10
        assert_eq!(seen[0][3], 49.0 / 7.0);
    }
}
