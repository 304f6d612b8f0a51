//! Forecast pipeline: telemetry acquisition, feature engineering, the
//! autoregressive engine and the result document.

pub mod acquire;
pub mod engine;
pub mod features;
pub mod report;
pub mod weather;
pub mod window;

pub use acquire::{Acquisition, AcquisitionPlan, ResilientAcquirer};
pub use engine::{Covariates, ForecastEngine};
pub use features::{FeaturePipeline, PanelSpec};
pub use report::ResultDocument;
pub use weather::{NasaPowerClient, TelemetrySource};
pub use window::SlidingWindow;
