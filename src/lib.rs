//! Solar energy forecaster.
//!
//! Pulls historical irradiance from NASA POWER with staged fallback windows,
//! turns it into production estimates and lag/rolling features, and rolls a
//! pre-trained regressor forward over a short horizon.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod ml;
pub mod telemetry;

pub use error::ForecastError;
