use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use lender_core::models::guarantor::GuarantorInput;
use lender_core::principal::{DataScope, Principal};
use serde_json::{json, Value};

use super::Service;
use crate::error::AppError;

pub async fn create_guarantor(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<GuarantorInput>,
) -> Result<Json<Value>, AppError> {
    let guarantor = service.create_guarantor(&principal, input).await?;
    Ok(Json(json!({
        "message": "Customer guarantor created successfully",
        "guarantor": guarantor,
    })))
}

/// Answers 201, as existing clients expect.
pub async fn update_guarantor(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<GuarantorInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let guarantor = service.update_guarantor(&principal, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Customer guarantor updated successfully",
            "data": guarantor,
        })),
    ))
}

pub async fn get_guarantor(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let guarantor = service.get_guarantor(&principal, scope, uid).await?;
    Ok(Json(json!(guarantor)))
}
