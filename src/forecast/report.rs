//! Result document written to stdout
//!
//! Every invocation produces exactly one JSON document: the success payload,
//! or `{"error": message}` when anything along the way failed.

use serde::Serialize;
use std::io::Write;

use crate::domain::Forecast;
use crate::error::ForecastError;
use crate::ml::training::ValidationReport;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResultDocument {
    Forecast(Forecast),
    Training(ValidationReport),
    Error { error: String },
}

impl ResultDocument {
    pub fn from_error(error: &ForecastError) -> Self {
        tracing::error!(kind = error.kind(), error = %error, "Invocation failed");
        ResultDocument::Error {
            error: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultDocument::Error { .. })
    }

    /// Process exit status for this document
    pub fn exit_code(&self) -> i32 {
        if self.is_error() {
            1
        } else {
            0
        }
    }

    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => serde_json::json!({ "error": format!("unexpected error: {}", e) }).to_string(),
        }
    }

    /// Write the document to `out` and flush
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.to_json().as_bytes())?;
        out.flush()
    }
}

impl From<Result<Forecast, ForecastError>> for ResultDocument {
    fn from(result: Result<Forecast, ForecastError>) -> Self {
        match result {
            Ok(forecast) => ResultDocument::Forecast(forecast),
            Err(e) => ResultDocument::from_error(&e),
        }
    }
}

impl From<Result<ValidationReport, ForecastError>> for ResultDocument {
    fn from(result: Result<ValidationReport, ForecastError>) -> Self {
        match result {
            Ok(report) => ResultDocument::Training(report),
            Err(e) => ResultDocument::from_error(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ForecastPoint;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_success_document_shape() {
        let forecast = Forecast {
            predictions: vec![ForecastPoint {
                date: date(2025, 3, 10),
                predicted_kwh: 1.5,
            }],
            baseline: 1.25,
            start_date: date(2025, 3, 10),
            last_known_date: date(2025, 3, 3),
        };
        let doc = ResultDocument::from(Ok::<_, ForecastError>(forecast));

        assert_eq!(doc.exit_code(), 0);
        let value: serde_json::Value = serde_json::from_str(&doc.to_json()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "predictions": [{"date": "2025-03-10", "pred_kwh": 1.5}],
                "baseline": 1.25,
                "start_date": "2025-03-10",
                "last_known_date": "2025-03-03"
            })
        );
    }

    #[rstest]
    #[case(ForecastError::DataFetch { last_cause: None }, "no data or fetch failed: empty")]
    #[case(
        ForecastError::DataFetch { last_cause: Some("timeout".to_string()) },
        "no data or fetch failed: timeout"
    )]
    #[case(ForecastError::EmptyFeatures, "no data after feature processing")]
    #[case(ForecastError::ModelLoad("missing".to_string()), "model load error: missing")]
    #[case(ForecastError::Unexpected("boom".to_string()), "unexpected error: boom")]
    fn test_error_document_shape(#[case] error: ForecastError, #[case] message: &str) {
        let doc = ResultDocument::from(Err::<Forecast, _>(error));

        assert!(doc.is_error());
        assert_eq!(doc.exit_code(), 1);
        let value: serde_json::Value = serde_json::from_str(&doc.to_json()).unwrap();
        assert_eq!(value, serde_json::json!({ "error": message }));
    }

    #[test]
    fn test_write_to_emits_single_document() {
        let doc = ResultDocument::from_error(&ForecastError::EmptyFeatures);
        let mut out = Vec::new();
        doc.write_to(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, r#"{"error":"no data after feature processing"}"#);
    }
}
