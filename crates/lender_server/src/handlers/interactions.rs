use axum::extract::Query;
use axum::{Extension, Json};
use lender_core::models::paging::PageQuery;
use lender_core::principal::{DataScope, Principal};
use serde_json::{json, Value};

use super::Service;
use crate::error::AppError;

pub async fn list_interactions(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let page = service.list_interactions(&principal, scope, &page).await?;
    Ok(Json(json!({
        "count": page.count,
        "data": page.rows,
    })))
}
