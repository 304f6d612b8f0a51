//! Machine Learning Module
//!
//! The forecast engine treats the regressor as an opaque oracle: a batch of
//! feature vectors in, one scalar per row out. This module defines that
//! contract, the concrete regressors that can sit behind it, the on-disk
//! artifact format and the offline training pipeline producing it.

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod artifact;
pub mod models;
pub mod smartcore;
pub mod training;

pub use artifact::ModelArtifact;

/// Column order the daily regressor is trained and queried with
pub const DAILY_FEATURES: [&str; 7] = [
    "dayofyear",
    "prod_lag1",
    "prod_ma3",
    "prod_ma7",
    "T2M",
    "CLD",
    "RH2M",
];

/// Column order of the hourly regressor
pub const HOURLY_FEATURES: [&str; 8] = [
    "hour",
    "dayofyear",
    "prod_lag_1h",
    "prod_ma_6h",
    "prod_ma_24h",
    "T2M",
    "CLD",
    "RH2M",
];

pub fn feature_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelType {
    LinearRegression,
    RandomForest,
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
}

/// Validation Metrics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationMetrics {
    pub mae: f64,  // Mean Absolute Error
    pub rmse: f64, // Root Mean Square Error
    pub mape: f64, // Symmetric Mean Absolute Percentage Error
    pub r2: f64,   // R-squared
}

impl ValidationMetrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, r2: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            r2,
        }
    }

    pub fn empty() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.len() != feature_names.len() {
            anyhow::bail!(
                "Feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            );
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.features.iter().all(|f| f.is_finite())
    }
}

/// Opaque regressor: one prediction per row of a batch
pub trait Regressor: Send + Sync {
    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>>;

    fn metadata(&self) -> &ModelMetadata;

    fn model_type(&self) -> ModelType {
        self.metadata().model_type
    }

    /// Predict a single row
    fn predict_one(&self, row: &FeatureVector) -> Result<f64> {
        let predictions = self.predict_batch(std::slice::from_ref(row))?;
        let value = predictions
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model returned empty predictions"))?;

        if !value.is_finite() {
            anyhow::bail!("Model returned a non-finite prediction ({})", value);
        }
        Ok(value)
    }
}

/// Check that every row matches the width a model was trained with
pub(crate) fn ensure_width(rows: &[FeatureVector], expected: usize) -> Result<()> {
    if let Some(row) = rows.iter().find(|r| r.len() != expected) {
        anyhow::bail!(
            "Feature count mismatch: expected {}, got {}",
            expected,
            row.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_creation() {
        let fv = FeatureVector::new(vec![1.0, 2.0, 3.0], feature_names(&["a", "b", "c"])).unwrap();
        assert_eq!(fv.len(), 3);
        assert!(!fv.is_empty());
        assert!(fv.is_finite());
    }

    #[test]
    fn test_feature_vector_mismatch() {
        assert!(FeatureVector::new(vec![1.0], feature_names(&["a", "b"])).is_err());
    }

    #[test]
    fn test_non_finite_feature_vector() {
        let fv = FeatureVector::new(vec![1.0, f64::NAN], feature_names(&["a", "b"])).unwrap();
        assert!(!fv.is_finite());
    }

    #[test]
    fn test_ensure_width() {
        let rows = vec![FeatureVector::new(vec![1.0, 2.0], feature_names(&["a", "b"])).unwrap()];
        assert!(ensure_width(&rows, 2).is_ok());
        assert!(ensure_width(&rows, 3).is_err());
    }

    #[test]
    fn test_feature_orders() {
        assert_eq!(DAILY_FEATURES.len(), 7);
        assert_eq!(DAILY_FEATURES[0], "dayofyear");
        assert_eq!(HOURLY_FEATURES[0], "hour");
    }
}
