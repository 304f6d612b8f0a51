//! On-disk model artifact
//!
//! A bincode document wrapping one of the supported regressors together with
//! the granularity it was trained for.

use super::models::LinearRegressionModel;
use super::smartcore::SmartcoreRandomForest;
use super::{FeatureVector, ModelMetadata, Regressor};
use crate::domain::Granularity;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub enum StoredRegressor {
    Linear(LinearRegressionModel),
    RandomForest(SmartcoreRandomForest),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub granularity: Granularity,
    pub regressor: StoredRegressor,
}

impl ModelArtifact {
    pub fn new(granularity: Granularity, regressor: StoredRegressor) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            granularity,
            regressor,
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let StoredRegressor::RandomForest(model) = &mut self.regressor {
            model.prepare_for_serialization()?;
        }

        let bytes = bincode::serialize(self).context("Failed to encode model artifact")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write model artifact {}", path.display()))?;

        tracing::info!(path = %path.display(), model_id = %self.metadata().model_id, "Saved model artifact");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let mut artifact: Self = bincode::deserialize(&bytes)
            .with_context(|| format!("Corrupt model artifact {}", path.display()))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            anyhow::bail!(
                "Unsupported artifact format version {} (expected {})",
                artifact.format_version,
                ARTIFACT_FORMAT_VERSION
            );
        }

        if let StoredRegressor::RandomForest(model) = &mut artifact.regressor {
            model.restore_from_serialization()?;
            if !model.is_loaded() {
                anyhow::bail!("Model artifact {} carries no fitted forest", path.display());
            }
        }

        tracing::debug!(
            path = %path.display(),
            model_id = %artifact.metadata().model_id,
            granularity = %artifact.granularity,
            "Loaded model artifact"
        );
        Ok(artifact)
    }

    /// Fail unless the artifact was trained on exactly `expected`, in order
    pub fn require_features(&self, expected: &[&str]) -> Result<()> {
        let actual = &self.metadata().feature_names;
        let matches = actual.len() == expected.len()
            && actual.iter().zip(expected).all(|(a, e)| a == e);
        if !matches {
            anyhow::bail!(
                "Model expects features [{}], this pipeline produces [{}]",
                actual.join(", "),
                expected.join(", ")
            );
        }
        Ok(())
    }

    fn inner(&self) -> &dyn Regressor {
        match &self.regressor {
            StoredRegressor::Linear(model) => model,
            StoredRegressor::RandomForest(model) => model,
        }
    }
}

impl Regressor for ModelArtifact {
    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        self.inner().predict_batch(rows)
    }

    fn metadata(&self) -> &ModelMetadata {
        self.inner().metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{feature_names, ModelType, DAILY_FEATURES};
    use std::path::PathBuf;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("solar_model_{}.bin", uuid::Uuid::new_v4()))
    }

    fn linear_artifact() -> ModelArtifact {
        let model = LinearRegressionModel::with_features(
            vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            0.5,
            feature_names(&DAILY_FEATURES),
        );
        ModelArtifact::new(Granularity::Daily, StoredRegressor::Linear(model))
    }

    #[test]
    fn test_save_and_load_linear() {
        let path = temp_path();
        let mut artifact = linear_artifact();
        artifact.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.granularity, Granularity::Daily);
        assert_eq!(loaded.model_type(), ModelType::LinearRegression);
        assert!(loaded.require_features(&DAILY_FEATURES).is_ok());

        let row = FeatureVector::new(
            vec![100.0, 4.0, 0.0, 0.0, 20.0, 50.0, 60.0],
            feature_names(&DAILY_FEATURES),
        )
        .unwrap();
        assert_eq!(loaded.predict_one(&row).unwrap(), 4.5);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_save_and_load_random_forest() {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|r| r[0] * 0.5).collect();
        let params = SmartcoreRandomForest::custom_parameters(5, Some(4), 2);
        let model =
            SmartcoreRandomForest::train(&x, &y, params, feature_names(&["a", "b"])).unwrap();

        let path = temp_path();
        let mut artifact = ModelArtifact::new(Granularity::Hourly, StoredRegressor::RandomForest(model));
        artifact.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.granularity, Granularity::Hourly);
        assert_eq!(loaded.model_type(), ModelType::RandomForest);

        let row = FeatureVector::new(vec![10.0, 1.0], feature_names(&["a", "b"])).unwrap();
        assert_eq!(
            artifact.predict_one(&row).unwrap(),
            loaded.predict_one(&row).unwrap()
        );

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_fails() {
        let err = ModelArtifact::load(&temp_path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read model artifact"));
    }

    #[test]
    fn test_corrupt_file_fails() {
        let path = temp_path();
        std::fs::write(&path, b"definitely not a model").unwrap();
        assert!(ModelArtifact::load(&path).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_feature_mismatch_detected() {
        let artifact = linear_artifact();
        let err = artifact.require_features(&["hour", "dayofyear"]).unwrap_err();
        assert!(err.to_string().contains("Model expects features"));
    }
}
