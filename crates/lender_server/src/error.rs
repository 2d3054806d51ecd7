//! HTTP mapping for domain errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lender_core::error::LenderError;
use serde_json::json;

/// Handler error. Renders `{"status", "message"}` plus `errors` for field
/// validation failures.
#[derive(Debug)]
pub struct AppError(pub LenderError);

impl From<LenderError> for AppError {
    fn from(err: LenderError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if let LenderError::Internal(ref e) = self.0 {
            tracing::error!(error = %e, "request failed");
        }

        let mut body = json!({
            "status": status.as_u16(),
            "message": self.0.public_message(),
        });
        if let LenderError::Validation(ref fields) = self.0 {
            body["errors"] = json!(fields);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use lender_core::error::FieldError;

    use super::*;

    async fn render(err: LenderError) -> (StatusCode, serde_json::Value) {
        let resp = AppError(err).into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn conflict_renders_409_with_message() {
        let (status, body) = render(LenderError::Conflict(
            "Customer with the same primary mobile already exists".into(),
        ))
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 409);
        assert_eq!(
            body["message"],
            "Customer with the same primary mobile already exists"
        );
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn validation_lists_field_errors() {
        let (status, body) = render(LenderError::Validation(vec![FieldError::new(
            "gender",
            "must be one of M F",
        )]))
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "gender");
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let (status, body) =
            render(LenderError::Internal(anyhow::anyhow!("pool timed out"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal Server Error");
    }
}
