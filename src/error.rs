use thiserror::Error;

/// Failure of a forecast or training invocation.
///
/// Every variant is reported through the same `{"error": message}` document;
/// only the message text distinguishes them externally.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Every fallback window failed or came back empty
    #[error("no data or fetch failed: {}", .last_cause.as_deref().unwrap_or("empty"))]
    DataFetch { last_cause: Option<String> },

    #[error("no data after feature processing")]
    EmptyFeatures,

    #[error("model load error: {0}")]
    ModelLoad(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ForecastError {
    pub fn data_fetch(last_cause: Option<&anyhow::Error>) -> Self {
        ForecastError::DataFetch {
            last_cause: last_cause.map(|e| format!("{:#}", e)),
        }
    }

    pub fn model_load(error: anyhow::Error) -> Self {
        ForecastError::ModelLoad(format!("{:#}", error))
    }

    /// Short machine-friendly name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::DataFetch { .. } => "DataFetchError",
            ForecastError::EmptyFeatures => "EmptyFeatureError",
            ForecastError::ModelLoad(_) => "ModelLoadError",
            ForecastError::InvalidRequest(_) => "InvalidRequest",
            ForecastError::Unexpected(_) => "UnexpectedError",
        }
    }
}

impl From<anyhow::Error> for ForecastError {
    fn from(error: anyhow::Error) -> Self {
        ForecastError::Unexpected(format!("{:#}", error))
    }
}

impl From<std::io::Error> for ForecastError {
    fn from(error: std::io::Error) -> Self {
        ForecastError::Unexpected(error.to_string())
    }
}
