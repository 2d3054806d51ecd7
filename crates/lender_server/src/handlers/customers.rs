//! Customer handlers.
//!
//! POST /customers                 create
//! PUT  /customers                 update (audited)
//! GET  /customers                 branch-scoped list
//! GET  /customers/:uid            one customer, or `?primary_mobile=` when uid is 0
//! GET  /customers/:uid/contacts   contacts of a visible customer
//! GET  /customers/:uid/guarantors
//! GET  /customers/:uid/referees

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use lender_core::error::LenderError;
use lender_core::models::customer::{CustomerFilter, CustomerInput, CustomerKey};
use lender_core::models::paging::PageQuery;
use lender_core::principal::{DataScope, Principal};
use serde::Deserialize;
use serde_json::{json, Value};

use super::Service;
use crate::error::AppError;

pub async fn create_customer(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<CustomerInput>,
) -> Result<Json<Value>, AppError> {
    let customer = service.create_customer(&principal, input).await?;
    Ok(Json(json!({
        "message": "Customer created successfully",
        "customer": customer,
    })))
}

pub async fn update_customer(
    Extension(principal): Extension<Principal>,
    Extension(service): Extension<Service>,
    Json(input): Json<CustomerInput>,
) -> Result<Json<Value>, AppError> {
    let customer = service.update_customer(&principal, input).await?;
    Ok(Json(json!({
        "status": 200,
        "message": "Customer updated successfully",
        "data": customer,
    })))
}

pub async fn list_customers(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Query(filter): Query<CustomerFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let page = service
        .list_customers(&principal, scope, &filter, &page)
        .await?;
    Ok(Json(json!({
        "customers": page.rows,
        "count": page.count,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerLookup {
    pub primary_mobile: Option<String>,
}

pub async fn get_customer(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
    Query(lookup): Query<CustomerLookup>,
) -> Result<Json<Value>, AppError> {
    let mobile = lookup
        .primary_mobile
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());
    let key = match (uid, mobile) {
        (uid, _) if uid > 0 => CustomerKey::Uid(uid),
        (_, Some(mobile)) => CustomerKey::PrimaryMobile(mobile),
        _ => return Err(LenderError::InvalidInput("Bad Request".into()).into()),
    };
    let customer = service.get_customer(&principal, scope, &key).await?;
    Ok(Json(json!({ "customer": customer })))
}

pub async fn customer_contacts(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let contacts = service.customer_contacts(&principal, scope, uid).await?;
    Ok(Json(json!({ "contacts": contacts })))
}

pub async fn customer_guarantors(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let guarantors = service.customer_guarantors(&principal, scope, uid).await?;
    Ok(Json(json!({ "guarantors": guarantors })))
}

pub async fn customer_referees(
    Extension(principal): Extension<Principal>,
    Extension(scope): Extension<DataScope>,
    Extension(service): Extension<Service>,
    Path(uid): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let referees = service.customer_referees(&principal, scope, uid).await?;
    Ok(Json(json!(referees)))
}
