//! # Request Extractors
//!
//! Handlers take `Result<Json<T>, JsonRejection>` and pass it through
//! [`extract_json`] so rejections use the API's error body instead of
//! axum's plain-text default.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use grtk_core::MetricSpec;

use crate::error::AppError;

/// Request types with rules beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

impl Validate for MetricSpec {
    fn validate(&self) -> Result<(), String> {
        MetricSpec::validate(self).map_err(|e| format!("invalid metric: {e}"))
    }
}

impl Validate for grtk_core::MetricCheckRequest {
    fn validate(&self) -> Result<(), String> {
        Validate::validate(&self.metric)?;
        match self.epsilon {
            Some(epsilon) if !(epsilon.is_finite() && epsilon >= 0.0) => {
                Err(format!("epsilon must be a non-negative number, got {epsilon}"))
            }
            _ => Ok(()),
        }
    }
}

/// Unwrap a JSON body.
///
/// Syntax errors and a missing JSON content type are 400; well-formed JSON
/// that does not match the request schema is 422.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(value)| value).map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(err) => AppError::Validation(err.body_text()),
        other => AppError::BadRequest(other.body_text()),
    })
}

/// Unwrap a JSON body and apply its [`Validate`] rules.
pub fn extract_validated_json<T: Validate>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grtk_core::MetricCheckRequest;
    use serde_json::json;

    fn metric() -> MetricSpec {
        MetricSpec::new(vec!["x".into()], vec![vec![json!(1)]])
    }

    #[test]
    fn metric_shape_is_validated() {
        let bad = MetricSpec::new(vec![], vec![]);
        let err = extract_validated_json(Ok(Json(bad))).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("invalid metric")));
        assert!(extract_validated_json(Ok(Json(metric()))).is_ok());
    }

    #[test]
    fn negative_epsilon_is_rejected() {
        let request = MetricCheckRequest {
            metric: metric(),
            sample_points: None,
            epsilon: Some(-1.0),
        };
        assert!(matches!(extract_validated_json(Ok(Json(request))), Err(AppError::Validation(_))));
    }
}
