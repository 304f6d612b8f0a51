//! SmartCore ML Model Wrapper
//!
//! This module provides a wrapper for SmartCore's RandomForestRegressor,
//! the default regressor produced by the `train` command.

use super::{ensure_width, FeatureVector, ModelMetadata, ModelType, Regressor, ValidationMetrics};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// SmartCore RandomForest Model Wrapper
///
/// The fitted forest is kept out of the serde representation and carried
/// as bincode bytes instead, see [`prepare_for_serialization`] and
/// [`restore_from_serialization`].
///
/// [`prepare_for_serialization`]: SmartcoreRandomForest::prepare_for_serialization
/// [`restore_from_serialization`]: SmartcoreRandomForest::restore_from_serialization
#[derive(Debug, Serialize, Deserialize)]
pub struct SmartcoreRandomForest {
    pub metadata: ModelMetadata,
    #[serde(skip)]
    model: Option<Forest>,
    /// Serialized model bytes (for persistence)
    model_bytes: Option<Vec<u8>>,
    /// Training parameters for reproducibility
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl SmartcoreRandomForest {
    /// Create a new RandomForest model with trained instance
    pub fn new(
        model: Forest,
        metadata: ModelMetadata,
        params: &RandomForestRegressorParameters,
    ) -> Self {
        Self {
            metadata,
            model: Some(model),
            model_bytes: None,
            n_trees: params.n_trees,
            max_depth: params.max_depth.map(|d| d as usize),
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
        }
    }

    /// Default training parameters: 100 trees of depth at most 10
    pub fn default_parameters() -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: Some(10),
            min_samples_leaf: 1,
            min_samples_split: 2,
            n_trees: 100,
            m: None, // Use sqrt(n_features) by default
            keep_samples: false,
            seed: 42,
        }
    }

    /// Get parameters with custom settings
    pub fn custom_parameters(
        n_trees: usize,
        max_depth: Option<usize>,
        min_samples_split: usize,
    ) -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: max_depth.map(|d| d as u16),
            min_samples_leaf: 1,
            min_samples_split,
            n_trees,
            m: None,
            keep_samples: false,
            seed: 42,
        }
    }

    /// Train a new RandomForest model
    pub fn train(
        x: &[Vec<f64>],
        y: &[f64],
        params: RandomForestRegressorParameters,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if x.is_empty() || y.is_empty() {
            anyhow::bail!("Cannot train on empty dataset");
        }

        if x.len() != y.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                x.len(),
                y.len()
            );
        }

        let n_features = feature_names.len();
        let x_matrix = to_matrix(x, n_features)?;
        let y_vec = y.to_vec();

        let model = Forest::fit(&x_matrix, &y_vec, params.clone())
            .map_err(|e| anyhow::anyhow!("RandomForest training failed: {:?}", e))?;

        let metadata = ModelMetadata {
            model_id: format!("smartcore_rf_{}", uuid::Uuid::new_v4()),
            model_type: ModelType::RandomForest,
            version: "1.0.0".to_string(),
            trained_at: chrono::Utc::now(),
            training_samples: x.len(),
            validation_metrics: ValidationMetrics::empty(),
            feature_names,
        };

        Ok(Self::new(model, metadata, &params))
    }

    /// Prepare model for serialization
    pub fn prepare_for_serialization(&mut self) -> Result<()> {
        if let Some(model) = &self.model {
            let bytes = bincode::serialize(model)
                .map_err(|e| anyhow::anyhow!("Failed to serialize model: {}", e))?;
            self.model_bytes = Some(bytes);
        }
        Ok(())
    }

    /// Restore model from serialized bytes
    pub fn restore_from_serialization(&mut self) -> Result<()> {
        if let Some(bytes) = &self.model_bytes {
            let model: Forest = bincode::deserialize(bytes)
                .map_err(|e| anyhow::anyhow!("Failed to deserialize model: {}", e))?;
            self.model = Some(model);
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }
}

/// Row-major dense matrix from equally wide rows
fn to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<DenseMatrix<f64>> {
    let mut flat_data = Vec::with_capacity(rows.len() * n_features);
    for row in rows {
        if row.len() != n_features {
            anyhow::bail!("All feature vectors must have the same length");
        }
        flat_data.extend_from_slice(row);
    }
    Ok(DenseMatrix::new(rows.len(), n_features, flat_data, false))
}

impl Regressor for SmartcoreRandomForest {
    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Model not loaded"))?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let n_features = self.metadata.feature_names.len();
        ensure_width(rows, n_features)?;

        let raw: Vec<Vec<f64>> = rows.iter().map(|r| r.features.clone()).collect();
        let x = to_matrix(&raw, n_features)?;

        let predictions = model
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))?;

        if predictions.len() != rows.len() {
            anyhow::bail!(
                "Model returned {} predictions for {} rows",
                predictions.len(),
                rows.len()
            );
        }

        Ok(predictions)
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}
