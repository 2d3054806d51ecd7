use axum::extract::Path;
use axum::{Extension, Json};
use lender_core::models::referee::RefereeInput;
use lender_core::principal::{DataScope, Principal};
use serde_json::{json, Value};

use super::Service;
use crate::error::AppError;

pub async fn create_referee(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<RefereeInput>,
) -> Result<Json<Value>, AppError> {
    let referee = service.create_referee(&principal, input).await?;
    Ok(Json(json!({
        "message": "Referee created successfully",
        "uid": referee.uid,
    })))
}

pub async fn update_referee(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<RefereeInput>,
) -> Result<Json<Value>, AppError> {
    let referee = service.update_referee(&principal, input).await?;
    Ok(Json(json!({
        "message": "Referee updated successfully",
        "uid": referee.uid,
    })))
}

pub async fn get_referee(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let referee = service.get_referee(&principal, scope, uid).await?;
    Ok(Json(json!(referee)))
}
