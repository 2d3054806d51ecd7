//! Postgres adapter tests against a live database.
//!
//! Run with:
//! ```sh
//! DATABASE_URL="postgresql:///lender_test" \
//!   cargo test -p lender_postgres --test pg_store -- --ignored --test-threads=1
//! ```

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::Local;
use sqlx::PgPool;

use lender_core::audit::NewAuditEvent;
use lender_core::branch::BranchScope;
use lender_core::error::LenderError;
use lender_core::models::customer::{status, Customer, CustomerField, CustomerFilter, CustomerKey};
use lender_core::models::paging::Paging;
use lender_core::permission::{Action, GrantQuery, RecordScope, Resource};
use lender_postgres::pg_stores;

// ── Test Infrastructure ──────────────────────────────────────────

async fn get_pool() -> Result<PgPool> {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgresql:///lender_test".into());
    let pool = PgPool::connect(&url).await?;
    sqlx::raw_sql(include_str!("../../../migrations/0001_schema.sql"))
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// 12-digit mobile unlikely to collide with earlier runs.
fn fresh_mobile() -> String {
    let nanos = Local::now().timestamp_nanos_opt().unwrap_or_default();
    format!("2547{:08}", nanos.rem_euclid(100_000_000))
}

fn customer(mobile: &str, branch: i32) -> Customer {
    Customer {
        uid: 0,
        customer_code: String::new(),
        full_name: "Integration Customer".into(),
        primary_mobile: mobile.into(),
        phone_number_provider: 1,
        enc_phone: String::new(),
        email_address: String::new(),
        physical_address: "Test street".into(),
        geolocation: String::new(),
        town: 0,
        passport_photo: String::new(),
        national_id: String::new(),
        gender: "F".into(),
        dob: None,
        added_by: 1,
        current_agent: 1,
        added_date: Some(Local::now().naive_local()),
        branch,
        primary_product: 1,
        loan_limit: 0.0,
        flag: 0,
        total_loans: 0,
        status: status::LEAD,
    }
}

// ── Customers ────────────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn customer_insert_then_detail() -> Result<()> {
    let stores = pg_stores(&get_pool().await?);
    let mobile = fresh_mobile();

    let stored = stores.customers.insert(&customer(&mobile, 7)).await?;
    assert!(stored.uid > 0);

    let detail = stores
        .customers
        .find_detail(&CustomerKey::PrimaryMobile(mobile.clone()), &BranchScope::Unrestricted)
        .await?;
    assert_eq!(detail.map(|d| d.uid), Some(stored.uid));

    let hidden = stores
        .customers
        .find_detail(&CustomerKey::Uid(stored.uid), &BranchScope::Branches(BTreeSet::from([8])))
        .await?;
    assert!(hidden.is_none());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn duplicate_mobile_is_a_conflict() -> Result<()> {
    let stores = pg_stores(&get_pool().await?);
    let mobile = fresh_mobile();
    stores.customers.insert(&customer(&mobile, 7)).await?;

    assert!(
        stores
            .customers
            .exists_with(CustomerField::PrimaryMobile, &mobile, None)
            .await?
    );

    let err = stores
        .customers
        .insert(&customer(&mobile, 7))
        .await
        .unwrap_err();
    match err {
        LenderError::Conflict(msg) => {
            assert_eq!(msg, "Customer with the same primary mobile already exists")
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
#[ignore]
async fn customer_list_respects_branch_scope() -> Result<()> {
    let stores = pg_stores(&get_pool().await?);
    let mobile = fresh_mobile();
    let stored = stores.customers.insert(&customer(&mobile, 9_001)).await?;

    let paging = Paging {
        search_term: Some(mobile.clone()),
        ..Paging::default()
    };
    let visible = stores
        .customers
        .list(&CustomerFilter::default(), &BranchScope::Branches(BTreeSet::from([9_001])), &paging)
        .await?;
    assert_eq!(visible.count, 1);
    assert_eq!(visible.rows[0].uid, stored.uid);

    let hidden = stores
        .customers
        .list(&CustomerFilter::default(), &BranchScope::Branches(BTreeSet::from([9_002])), &paging)
        .await?;
    assert_eq!(hidden.count, 0);
    assert!(hidden.rows.is_empty());
    Ok(())
}

// ── Grants and audit ─────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn grant_lookup_honours_flag_column() -> Result<()> {
    let pool = get_pool().await?;
    let stores = pg_stores(&pool);
    let group = 9_100 + (Local::now().timestamp_subsec_micros() % 800) as i32;

    sqlx::query(
        "INSERT INTO o_permissions (group_id, tbl, rec, read_, update_) VALUES ($1, 'o_customers', 0, 1, 0)",
    )
    .bind(group)
    .execute(&pool)
    .await?;

    let query = |action| GrantQuery {
        resource: Resource::Customers,
        record: RecordScope::Any,
        action,
        group_id: group,
        user_id: -1,
    };
    assert!(stores.grants.has_matching_grant(&query(Action::Read)).await?);
    assert!(!stores.grants.has_matching_grant(&query(Action::Update)).await?);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn audit_append_writes_event_row() -> Result<()> {
    let pool = get_pool().await?;
    let stores = pg_stores(&pool);
    let marker = format!("pg_store test {}", fresh_mobile());

    stores
        .audit
        .append(&NewAuditEvent {
            tbl: "o_customers".into(),
            fld: 42,
            event_details: marker.clone(),
            event_by: 1,
        })
        .await?;

    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM o_events WHERE event_details = $1")
            .bind(&marker)
            .fetch_one(&pool)
            .await?;
    assert_eq!(count, 1);
    Ok(())
}
