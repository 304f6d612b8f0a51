//! ML Model Training Pipeline
//!
//! Turns a feature table into a supervised dataset, fits a random forest on
//! the chronologically first part and scores it on the rest against a
//! climatology baseline.

use super::smartcore::SmartcoreRandomForest;
use super::{feature_names, FeatureVector, ValidationMetrics, DAILY_FEATURES, HOURLY_FEATURES};
use crate::domain::{FeatureRecord, Granularity};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Training Dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(features: Vec<FeatureVector>, targets: Vec<f64>) -> Result<Self> {
        if features.len() != targets.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            );
        }
        Ok(Self { features, targets })
    }

    /// Build the supervised dataset for a feature table.
    ///
    /// Daily rows predict their own estimate. Hourly rows predict the next
    /// row's estimate, so the last hourly row has no target and is dropped.
    /// Rows with a non-finite feature or target are skipped.
    pub fn from_records(records: &[FeatureRecord], granularity: Granularity) -> Result<Self> {
        let mut features = Vec::with_capacity(records.len());
        let mut targets = Vec::with_capacity(records.len());

        match granularity {
            Granularity::Daily => {
                let names = feature_names(&DAILY_FEATURES);
                for record in records {
                    let row = FeatureVector::new(daily_row(record), names.clone())?;
                    push_finite(&mut features, &mut targets, row, record.estimated_kwh);
                }
            }
            Granularity::Hourly => {
                let names = feature_names(&HOURLY_FEATURES);
                for pair in records.windows(2) {
                    let row = FeatureVector::new(hourly_row(&pair[0]), names.clone())?;
                    push_finite(&mut features, &mut targets, row, pair[1].estimated_kwh);
                }
            }
        }

        Self::new(features, targets)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split dataset into training and validation sets, preserving order
    pub fn split(&self, train_ratio: f64) -> Result<(TrainingDataset, TrainingDataset)> {
        if train_ratio <= 0.0 || train_ratio >= 1.0 {
            anyhow::bail!("Train ratio must be between 0 and 1");
        }

        let split_idx = (self.len() as f64 * train_ratio).floor() as usize;
        if split_idx == 0 || split_idx == self.len() {
            anyhow::bail!(
                "Not enough rows to split: {} rows at ratio {}",
                self.len(),
                train_ratio
            );
        }

        let train = TrainingDataset {
            features: self.features[..split_idx].to_vec(),
            targets: self.targets[..split_idx].to_vec(),
        };

        let val = TrainingDataset {
            features: self.features[split_idx..].to_vec(),
            targets: self.targets[split_idx..].to_vec(),
        };

        Ok((train, val))
    }

    fn matrix(&self) -> Vec<Vec<f64>> {
        self.features.iter().map(|f| f.features.clone()).collect()
    }
}

fn push_finite(
    features: &mut Vec<FeatureVector>,
    targets: &mut Vec<f64>,
    row: FeatureVector,
    target: f64,
) {
    if row.is_finite() && target.is_finite() {
        features.push(row);
        targets.push(target);
    }
}

fn daily_row(record: &FeatureRecord) -> Vec<f64> {
    let t = &record.telemetry;
    vec![
        record.day_of_year as f64,
        record.lag_1,
        record.ma_short,
        record.ma_long,
        t.temperature_c.unwrap_or(f64::NAN),
        t.cloud_cover_percent,
        t.humidity_percent.unwrap_or(f64::NAN),
    ]
}

fn hourly_row(record: &FeatureRecord) -> Vec<f64> {
    let t = &record.telemetry;
    vec![
        record.hour.unwrap_or(0) as f64,
        record.day_of_year as f64,
        record.lag_1,
        record.ma_short,
        record.ma_long,
        t.temperature_c.unwrap_or(f64::NAN),
        t.cloud_cover_percent,
        t.humidity_percent.unwrap_or(f64::NAN),
    ]
}

/// Training Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub validation_split: f64,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            validation_split: 0.2,
            n_trees: 100,
            max_depth: Some(10),
            min_samples_split: 2,
        }
    }
}

/// Scores of the fitted model and the climatology baseline on the hold-out set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub granularity: Granularity,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub smape: f64,
    /// MAE as a percentage of the training target mean
    pub nmae: f64,
    pub baseline_mae: f64,
    /// Relative MAE improvement over the baseline, in percent
    pub improvement_pct: f64,
}

/// Model Trainer
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Fit a random forest and score it against the climatology baseline
    pub fn train(
        &self,
        dataset: &TrainingDataset,
        granularity: Granularity,
    ) -> Result<(SmartcoreRandomForest, ValidationReport)> {
        if dataset.is_empty() {
            anyhow::bail!("Cannot train on empty dataset");
        }

        let (train, val) = dataset.split(1.0 - self.config.validation_split)?;
        let names = train.features[0].feature_names.clone();

        let params = SmartcoreRandomForest::custom_parameters(
            self.config.n_trees,
            self.config.max_depth,
            self.config.min_samples_split,
        );
        let mut model = SmartcoreRandomForest::train(&train.matrix(), &train.targets, params, names)?;

        let predictions = super::Regressor::predict_batch(&model, &val.features)?;
        let metrics = calculate_metrics(&predictions, &val.targets)?;

        let train_mean = mean(&train.targets);
        let climatology = vec![train_mean; val.len()];
        let baseline = calculate_metrics(&climatology, &val.targets)?;

        let nmae = if train_mean.abs() > 1e-10 {
            metrics.mae / train_mean.abs() * 100.0
        } else {
            0.0
        };
        let improvement_pct = if baseline.mae > 1e-10 {
            (baseline.mae - metrics.mae) / baseline.mae * 100.0
        } else {
            0.0
        };

        tracing::info!(
            granularity = %granularity,
            train_rows = train.len(),
            validation_rows = val.len(),
            mae = metrics.mae,
            baseline_mae = baseline.mae,
            "Model trained"
        );

        model.metadata.validation_metrics = metrics.clone();

        let report = ValidationReport {
            granularity,
            train_rows: train.len(),
            validation_rows: val.len(),
            mae: metrics.mae,
            rmse: metrics.rmse,
            r2: metrics.r2,
            smape: metrics.mape,
            nmae,
            baseline_mae: baseline.mae,
            improvement_pct,
        };

        Ok((model, report))
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate validation metrics. `mape` carries the symmetric variant.
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> Result<ValidationMetrics> {
    if predictions.len() != targets.len() {
        anyhow::bail!("Prediction and target count mismatch");
    }

    if predictions.is_empty() {
        anyhow::bail!("No predictions to evaluate");
    }

    let n = predictions.len() as f64;

    // Mean Absolute Error
    let mae: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).abs())
        .sum::<f64>()
        / n;

    // Root Mean Square Error
    let mse: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    // Symmetric MAPE; pairs that are both zero count as a perfect hit
    let smape: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| {
            let denom = (p.abs() + t.abs()) / 2.0;
            if denom < 1e-10 {
                0.0
            } else {
                (p - t).abs() / denom * 100.0
            }
        })
        .sum::<f64>()
        / n;

    // R-squared
    let mean_target = mean(targets);
    let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
    let ss_res: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (t - p).powi(2))
        .sum();

    let r2 = if ss_tot.abs() < 1e-10 {
        0.0
    } else {
        1.0 - (ss_res / ss_tot)
    };

    Ok(ValidationMetrics::new(mae, rmse, smape, r2))
}
