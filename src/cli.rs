//! Command line interface: `predict` and `train` subcommands.

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::domain::{Forecast, ForecastRequest, GeoLocation, Granularity};
use crate::error::ForecastError;
use crate::forecast::{
    AcquisitionPlan, FeaturePipeline, ForecastEngine, NasaPowerClient, PanelSpec,
    ResilientAcquirer, ResultDocument, TelemetrySource,
};
use crate::ml::artifact::StoredRegressor;
use crate::ml::training::{ModelTrainer, TrainingConfig, TrainingDataset, ValidationReport};
use crate::ml::{ModelArtifact, DAILY_FEATURES};

#[derive(Parser)]
#[command(
    name = "solar-forecast",
    version,
    about = "Solar panel energy forecaster driven by NASA POWER telemetry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Panel site shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Panel area in square meters
    #[arg(long)]
    pub area: f64,

    /// Panel efficiency (0-1]
    #[arg(long)]
    pub eff: f64,
}

impl SiteArgs {
    pub fn location(&self) -> GeoLocation {
        GeoLocation::new(self.lat, self.lon)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Forecast daily production for the next days
    Predict {
        #[command(flatten)]
        site: SiteArgs,

        /// Model artifact; relative paths resolve next to the executable
        #[arg(long)]
        model: Option<PathBuf>,

        /// Forecast horizon in days
        #[arg(long, default_value_t = 7)]
        days: usize,
    },

    /// Train a model artifact from historical telemetry
    Train {
        #[command(flatten)]
        site: SiteArgs,

        /// Train the hourly next-hour model instead of the daily one
        #[arg(long)]
        hourly: bool,

        /// Where to write the artifact (defaults to the configured model file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the validation report JSON here
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
}

/// Run one command and turn its outcome into the result document
pub async fn run(command: Command, config: &Config) -> ResultDocument {
    let today = Utc::now().date_naive();

    match command {
        Command::Predict { site, model, days } => {
            let request = ForecastRequest::new(site.location(), site.area, site.eff, days);
            let result: Result<Forecast, ForecastError> =
                match NasaPowerClient::new(&config.nasa, Granularity::Daily) {
                    Ok(source) => predict(source, &request, model.as_deref(), config, today).await,
                    Err(e) => Err(e.into()),
                };
            result.into()
        }
        Command::Train {
            site,
            hourly,
            output,
            report,
        } => {
            let granularity = if hourly {
                Granularity::Hourly
            } else {
                Granularity::Daily
            };
            let job = TrainJob {
                site,
                granularity,
                output,
                report,
            };
            let result: Result<ValidationReport, ForecastError> =
                match NasaPowerClient::new(&config.nasa, granularity) {
                    Ok(source) => train(source, &job, config, today).await,
                    Err(e) => Err(e.into()),
                };
            result.into()
        }
    }
}

/// Acquire, engineer features, load the model and run the forecast
pub async fn predict<S: TelemetrySource>(
    source: S,
    request: &ForecastRequest,
    model: Option<&Path>,
    config: &Config,
    today: NaiveDate,
) -> Result<Forecast, ForecastError> {
    request.validate().map_err(ForecastError::InvalidRequest)?;

    let acquirer = ResilientAcquirer::new(source, config.acquisition.forecast.clone());
    let acquisition = acquirer.acquire(&request.location, today).await?;

    let panel = PanelSpec::new(
        request.panel_area_m2,
        request.efficiency,
        config.pipeline.performance_ratio,
    );
    let features = FeaturePipeline::new(Granularity::Daily, panel).run(acquisition.records);
    if features.is_empty() {
        return Err(ForecastError::EmptyFeatures);
    }

    let artifact = load_daily_model(model, config)?;
    let engine = ForecastEngine::new(Box::new(artifact), config.engine.clone());
    engine.forecast(&features, today, request.days_ahead)
}

fn load_daily_model(model: Option<&Path>, config: &Config) -> Result<ModelArtifact, ForecastError> {
    let path = config
        .model
        .resolve(model)
        .map_err(ForecastError::model_load)?;
    let artifact = ModelArtifact::load(&path).map_err(ForecastError::model_load)?;

    if artifact.granularity != Granularity::Daily {
        return Err(ForecastError::ModelLoad(format!(
            "{} holds a {} model, predict needs a daily one",
            path.display(),
            artifact.granularity
        )));
    }
    artifact
        .require_features(&DAILY_FEATURES)
        .map_err(ForecastError::model_load)?;

    Ok(artifact)
}

/// Parameters of one training run
#[derive(Debug, Clone)]
pub struct TrainJob {
    pub site: SiteArgs,
    pub granularity: Granularity,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl TrainJob {
    fn plan(&self, config: &Config) -> AcquisitionPlan {
        match self.granularity {
            Granularity::Daily => config.acquisition.training.clone(),
            Granularity::Hourly => config.acquisition.hourly.clone(),
        }
    }

    fn output_path(&self, config: &Config) -> anyhow::Result<PathBuf> {
        match (&self.output, self.granularity) {
            (Some(path), _) => Ok(path.clone()),
            (None, Granularity::Daily) => config.model.resolve(None),
            (None, Granularity::Hourly) => {
                let daily = config.model.resolve(None)?;
                Ok(daily.with_file_name("solar_model_hourly.bin"))
            }
        }
    }
}

/// Acquire the training corpus, fit, score and save the artifact
pub async fn train<S: TelemetrySource>(
    source: S,
    job: &TrainJob,
    config: &Config,
    today: NaiveDate,
) -> Result<ValidationReport, ForecastError> {
    let location = job.site.location();
    ForecastRequest::new(location, job.site.area, job.site.eff, 1)
        .validate()
        .map_err(ForecastError::InvalidRequest)?;

    let acquirer = ResilientAcquirer::new(source, job.plan(config));
    let acquisition = acquirer.acquire(&location, today).await?;

    let panel = PanelSpec::new(job.site.area, job.site.eff, config.pipeline.performance_ratio);
    let features = FeaturePipeline::new(job.granularity, panel).run(acquisition.records);
    let dataset = TrainingDataset::from_records(&features, job.granularity)?;
    if dataset.is_empty() {
        return Err(ForecastError::EmptyFeatures);
    }

    let trainer = ModelTrainer::new(TrainingConfig::default());
    let (model, report) = trainer.train(&dataset, job.granularity)?;

    let path = job.output_path(config)?;
    let mut artifact = ModelArtifact::new(job.granularity, StoredRegressor::RandomForest(model));
    artifact.save(&path)?;

    if let Some(report_path) = &job.report {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| ForecastError::Unexpected(e.to_string()))?;
        std::fs::write(report_path, json)?;
        info!(path = %report_path.display(), "Wrote validation report");
    }

    Ok(report)
}
