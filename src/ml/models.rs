//! Linear regressor
//!
//! A plain weighted sum: the simplest artifact that satisfies the regressor
//! contract, useful for hand-tuned models and as a test double.

use super::{ensure_width, FeatureVector, ModelMetadata, ModelType, Regressor, ValidationMetrics};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Simple Linear Regression Model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressionModel {
    pub metadata: ModelMetadata,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64, metadata: ModelMetadata) -> Self {
        Self {
            metadata,
            coefficients,
            intercept,
        }
    }

    /// Build a model over named features with default metadata
    pub fn with_features(coefficients: Vec<f64>, intercept: f64, feature_names: Vec<String>) -> Self {
        let metadata = ModelMetadata {
            model_id: format!("linear_regression_{}", uuid::Uuid::new_v4()),
            model_type: ModelType::LinearRegression,
            version: "0.1.0".to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: 0,
            validation_metrics: ValidationMetrics::empty(),
            feature_names,
        };

        Self::new(coefficients, intercept, metadata)
    }

    fn predict_row(&self, features: &FeatureVector) -> f64 {
        features
            .features
            .iter()
            .zip(self.coefficients.iter())
            .map(|(f, c)| f * c)
            .sum::<f64>()
            + self.intercept
    }
}

impl Regressor for LinearRegressionModel {
    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        ensure_width(rows, self.coefficients.len())?;
        Ok(rows.iter().map(|row| self.predict_row(row)).collect())
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}
