use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use lender_core::models::vintage::VintageRecord;
use lender_core::ports::{Result, VintageSource};

#[derive(sqlx::FromRow)]
struct VintageRow {
    uid: i32,
    given_date: Option<NaiveDate>,
    final_due_date: Option<NaiveDate>,
    loan_balance: f64,
    full_name: Option<String>,
    primary_mobile: Option<String>,
    national_id: Option<String>,
    branch: Option<i32>,
    loan_status: Option<String>,
    agent_email: Option<String>,
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

impl From<VintageRow> for VintageRecord {
    fn from(r: VintageRow) -> Self {
        VintageRecord {
            loan_id: r.uid,
            loan_application_date: date_text(r.given_date),
            loan_defaulted_date: date_text(r.final_due_date),
            loan_bal: r.loan_balance,
            customer_name: r.full_name.unwrap_or_default(),
            phone_number: r.primary_mobile.unwrap_or_default(),
            national_id: r.national_id.unwrap_or_default(),
            branch: r.branch.map(|b| b.to_string()).unwrap_or_default(),
            agent_email: r.agent_email.unwrap_or_default(),
            loan_status: r.loan_status.unwrap_or_default(),
        }
    }
}

/// Loans forwarded to the collections partner, read from the current database.
pub struct PgVintageSource {
    pool: PgPool,
}

impl PgVintageSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VintageSource for PgVintageSource {
    async fn eligible_vintages(&self) -> Result<Vec<VintageRecord>> {
        let rows = sqlx::query_as::<_, VintageRow>(
            r#"
            SELECT l.uid, l.given_date, l.final_due_date, l.loan_balance,
                   c.full_name, c.primary_mobile, c.national_id, c.branch,
                   ls.name AS loan_status, u.email AS agent_email
            FROM o_loans l
            LEFT JOIN o_customers c ON l.customer_id = c.uid
            LEFT JOIN o_users u ON u.uid = l.current_agent
            LEFT JOIN o_loan_statuses ls ON l.status = ls.uid
            ORDER BY l.uid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(VintageRecord::from).collect())
    }
}
