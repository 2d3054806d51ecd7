use axum::extract::Path;
use axum::{Extension, Json};
use lender_core::models::contact::ContactInput;
use lender_core::principal::{DataScope, Principal};
use serde_json::{json, Value};

use super::Service;
use crate::error::AppError;

pub async fn create_contact(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<ContactInput>,
) -> Result<Json<Value>, AppError> {
    let contact = service.create_contact(&principal, input).await?;
    Ok(Json(json!({
        "message": "Customer contact created successfully",
        "contact": contact,
    })))
}

pub async fn update_contact(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<ContactInput>,
) -> Result<Json<Value>, AppError> {
    let contact = service.update_contact(&principal, input).await?;
    Ok(Json(json!({
        "message": "Customer contact updated successfully",
        "contact": contact.uid,
    })))
}

pub async fn get_contact(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let contact = service.get_contact(&principal, scope, uid).await?;
    Ok(Json(json!(contact)))
}
