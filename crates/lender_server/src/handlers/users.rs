//! Staff accounts. Readable by any authenticated principal.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use lender_core::models::paging::PageQuery;
use lender_core::models::user::UserFilter;
use lender_core::principal::{DataScope, Principal};
use serde_json::{json, Value};

use super::Service;
use crate::error::AppError;

pub async fn list_users(
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Query(filter): Query<UserFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let page = service.list_users(scope, &filter, &page).await?;
    Ok(Json(json!({
        "count": page.count,
        "data": page.rows,
    })))
}

pub async fn get_user(
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let user = service.get_user(scope, uid).await?;
    Ok(Json(json!(user)))
}

pub async fn authenticated_user(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
) -> Result<Json<Value>, AppError> {
    let user = service.authenticated_user(&principal).await?;
    Ok(Json(json!({
        "data": "You are logged in!",
        "user": user,
    })))
}
