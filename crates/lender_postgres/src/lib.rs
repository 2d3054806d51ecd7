//! Postgres implementations of the lender_core port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) so the crate builds without a database.

mod audit;
mod auth;
mod customers;
mod parties;
mod staff;
mod vintage;

use std::sync::Arc;

use anyhow::anyhow;
use sqlx::{PgPool, Postgres, QueryBuilder};

use lender_core::branch::BranchScope;
use lender_core::error::LenderError;
use lender_core::models::paging::Paging;
use lender_core::ports::Stores;

pub use audit::PgAuditSink;
pub use auth::PgAuthStore;
pub use customers::{PgContactStore, PgCustomerStore};
pub use parties::{PgGuarantorStore, PgRefereeStore};
pub use staff::{PgConversationStore, PgUserStore};
pub use vintage::PgVintageSource;

/// Every store of one database, sharing its pool.
pub fn pg_stores(pool: &PgPool) -> Stores {
    let auth = Arc::new(PgAuthStore::new(pool.clone()));
    Stores {
        principals: auth.clone(),
        grants: auth.clone(),
        staff_branches: auth,
        audit: Arc::new(PgAuditSink::new(pool.clone())),
        customers: Arc::new(PgCustomerStore::new(pool.clone())),
        contacts: Arc::new(PgContactStore::new(pool.clone())),
        guarantors: Arc::new(PgGuarantorStore::new(pool.clone())),
        referees: Arc::new(PgRefereeStore::new(pool.clone())),
        users: Arc::new(PgUserStore::new(pool.clone())),
        conversations: Arc::new(PgConversationStore::new(pool.clone())),
    }
}

/// `AND <column> = ANY($n)` unless the scope is unrestricted. An empty set
/// matches nothing.
pub(crate) fn push_branch_scope(qb: &mut QueryBuilder<'_, Postgres>, column: &str, scope: &BranchScope) {
    if let Some(ids) = scope.ids() {
        qb.push(" AND ");
        qb.push(column);
        qb.push(" = ANY(");
        qb.push_bind(ids);
        qb.push(")");
    }
}

/// `ORDER BY <alias>.<column> <dir> LIMIT $n OFFSET $m`. The column comes
/// from a whitelist resolved in `PageQuery::resolve`.
pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Postgres>, alias: &str, paging: &Paging) {
    qb.push(format!(
        " ORDER BY {alias}.{} {} LIMIT ",
        paging.order_by,
        paging.dir.as_sql()
    ));
    qb.push_bind(paging.page_size);
    qb.push(" OFFSET ");
    qb.push_bind(paging.offset());
}

/// Close a `SELECT COUNT(*) FROM (SELECT ...` subquery, capping the rows
/// counted when `count_limit` is set.
pub(crate) fn close_count(qb: &mut QueryBuilder<'_, Postgres>, paging: &Paging) {
    if paging.count_limit > 0 {
        qb.push(" LIMIT ");
        qb.push_bind(paging.count_limit);
    }
    qb.push(") counted");
}

/// Map a write error. Unique violations (SQLSTATE 23505) become `Conflict`
/// naming the field behind the violated constraint.
pub(crate) fn write_error(err: sqlx::Error) -> LenderError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or_default();
            tracing::debug!(constraint, "unique violation");
            let message = conflict_message(constraint);
            return LenderError::Conflict(message.to_string());
        }
    }
    LenderError::Internal(anyhow!(err))
}

fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "o_customers_primary_mobile_key" => "Customer with the same primary mobile already exists",
        "o_customers_national_id_key" => "Customer with the same national id already exists",
        "o_customers_email_address_key" => "Customer with the same email address already exists",
        "o_customer_contacts_value_key" => "Contact value already exists",
        "o_customer_guarantors_national_id_key" => "National ID already exists",
        "o_customer_guarantors_mobile_no_key" => "Mobile number already exists",
        "o_customer_referees_identity_key" => "Referee already exists",
        _ => "Record already exists",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_field_messages() {
        assert_eq!(
            conflict_message("o_customers_primary_mobile_key"),
            "Customer with the same primary mobile already exists"
        );
        assert_eq!(conflict_message("something_else"), "Record already exists");
    }

    #[test]
    fn non_database_errors_are_internal() {
        let err = write_error(sqlx::Error::RowNotFound);
        assert_eq!(err.http_status(), 500);
    }
}
