use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::forecast::AcquisitionPlan;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub nasa: NasaConfig,
    pub pipeline: PipelineConfig,
    pub acquisition: AcquisitionConfig,
    pub engine: EngineConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NasaConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub community: String,
    /// Cloud cover synthesized for every record; NASA POWER has no such parameter
    pub default_cloud_cover: f64,
}

impl NasaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for NasaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://power.larc.nasa.gov/api/temporal".to_string(),
            timeout_seconds: 30,
            community: "RE".to_string(),
            default_cloud_cover: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub performance_ratio: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            performance_ratio: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub forecast: AcquisitionPlan,
    pub training: AcquisitionPlan,
    pub hourly: AcquisitionPlan,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            forecast: AcquisitionPlan::forecast(),
            training: AcquisitionPlan::training(),
            hourly: AcquisitionPlan::hourly(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub default_temperature: f64,
    pub default_cloud_cover: f64,
    pub default_humidity: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_temperature: 20.0,
            default_cloud_cover: 50.0,
            default_humidity: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Artifact file name, resolved next to the executable when relative
    pub default_file: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_file: PathBuf::from("solar_model.bin"),
        }
    }
}

impl ModelConfig {
    /// Resolve the artifact path: explicit paths win, relative ones are
    /// anchored at the directory holding the running executable.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let path = explicit.unwrap_or(&self.default_file);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        let exe = std::env::current_exe().context("Failed to locate running executable")?;
        let dir = exe
            .parent()
            .context("Executable path has no parent directory")?;
        Ok(dir.join(path))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_figment(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("SOLAR__").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .context("Failed to load solar-forecast configuration")
    }
}
