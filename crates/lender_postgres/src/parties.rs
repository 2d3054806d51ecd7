use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use lender_core::error::LenderError;
use lender_core::models::guarantor::{Guarantor, GuarantorField, GuarantorSummary};
use lender_core::models::referee::{Referee, RefereeSummary};
use lender_core::ports::{GuarantorStore, RefereeStore, Result};

use crate::write_error;

// ── Guarantors ────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct GuarantorRow {
    uid: i32,
    guarantor_name: String,
    customer_id: i32,
    national_id: String,
    mobile_no: String,
    physical_address: String,
    amount_guaranteed: f64,
    added_date: Option<NaiveDateTime>,
    relationship: i32,
    status: i32,
}

impl From<GuarantorRow> for Guarantor {
    fn from(r: GuarantorRow) -> Self {
        Guarantor {
            uid: r.uid,
            guarantor_name: r.guarantor_name,
            customer_id: r.customer_id,
            national_id: r.national_id,
            mobile_no: r.mobile_no,
            physical_address: r.physical_address,
            amount_guaranteed: r.amount_guaranteed,
            added_date: r.added_date,
            relationship: r.relationship,
            status: r.status,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GuarantorSummaryRow {
    uid: i32,
    guarantor_name: String,
    customer_id: i32,
    mobile_no: String,
    national_id: String,
    physical_address: String,
    amount_guaranteed: f64,
    added_date: Option<NaiveDateTime>,
    relationship: Option<String>,
    status: i32,
}

impl From<GuarantorSummaryRow> for GuarantorSummary {
    fn from(r: GuarantorSummaryRow) -> Self {
        GuarantorSummary {
            uid: r.uid,
            guarantor_name: r.guarantor_name,
            customer_id: r.customer_id,
            mobile_no: r.mobile_no,
            national_id: r.national_id,
            physical_address: r.physical_address,
            amount_guaranteed: r.amount_guaranteed,
            added_date: r.added_date,
            relationship: r.relationship,
            status: r.status,
        }
    }
}

const GUARANTOR_SUMMARY_SELECT: &str = r#"
    SELECT g.uid, g.guarantor_name, g.customer_id, g.mobile_no, g.national_id,
           g.physical_address, g.amount_guaranteed, g.added_date,
           r.name AS relationship, g.status
    FROM o_customer_guarantors g
    LEFT JOIN o_customer_guarantor_relationships r ON g.relationship = r.uid
"#;

pub struct PgGuarantorStore {
    pool: PgPool,
}

impl PgGuarantorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuarantorStore for PgGuarantorStore {
    async fn get(&self, uid: i32) -> Result<Option<Guarantor>> {
        let row = sqlx::query_as::<_, GuarantorRow>(
            r#"
            SELECT uid, guarantor_name, customer_id, national_id, mobile_no,
                   physical_address, amount_guaranteed, added_date, relationship, status
            FROM o_customer_guarantors
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Guarantor::from))
    }

    async fn get_summary(&self, uid: i32) -> Result<Option<GuarantorSummary>> {
        let sql = format!("{GUARANTOR_SUMMARY_SELECT} WHERE g.uid = $1");
        let row = sqlx::query_as::<_, GuarantorSummaryRow>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(GuarantorSummary::from))
    }

    async fn list_for_customer(&self, customer_id: i32) -> Result<Vec<GuarantorSummary>> {
        let sql = format!("{GUARANTOR_SUMMARY_SELECT} WHERE g.customer_id = $1 ORDER BY g.uid");
        let rows = sqlx::query_as::<_, GuarantorSummaryRow>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(GuarantorSummary::from).collect())
    }

    async fn duplicate_exists(&self, candidate: &Guarantor) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM o_customer_guarantors
                WHERE guarantor_name = $1 AND national_id = $2
                  AND mobile_no = $3 AND customer_id = $4 AND uid <> $5
            )
            "#,
        )
        .bind(&candidate.guarantor_name)
        .bind(&candidate.national_id)
        .bind(&candidate.mobile_no)
        .bind(candidate.customer_id)
        .bind(candidate.uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(exists)
    }

    async fn exists_with(
        &self,
        field: GuarantorField,
        value: &str,
        exclude_uid: Option<i32>,
    ) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM o_customer_guarantors WHERE {} = $1 AND ($2::int IS NULL OR uid <> $2))",
            field.column()
        );
        let (exists,): (bool,) = sqlx::query_as(&sql)
            .bind(value)
            .bind(exclude_uid)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(exists)
    }

    async fn insert(&self, g: &Guarantor) -> Result<Guarantor> {
        let (uid,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO o_customer_guarantors (
                guarantor_name, customer_id, national_id, mobile_no, physical_address,
                amount_guaranteed, added_date, relationship, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING uid
            "#,
        )
        .bind(&g.guarantor_name)
        .bind(g.customer_id)
        .bind(&g.national_id)
        .bind(&g.mobile_no)
        .bind(&g.physical_address)
        .bind(g.amount_guaranteed)
        .bind(g.added_date)
        .bind(g.relationship)
        .bind(g.status)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        let mut stored = g.clone();
        stored.uid = uid;
        Ok(stored)
    }

    async fn update(&self, g: &Guarantor) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE o_customer_guarantors SET
                guarantor_name = $2, customer_id = $3, national_id = $4, mobile_no = $5,
                physical_address = $6, amount_guaranteed = $7, relationship = $8, status = $9
            WHERE uid = $1
            "#,
        )
        .bind(g.uid)
        .bind(&g.guarantor_name)
        .bind(g.customer_id)
        .bind(&g.national_id)
        .bind(&g.mobile_no)
        .bind(&g.physical_address)
        .bind(g.amount_guaranteed)
        .bind(g.relationship)
        .bind(g.status)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(LenderError::NotFound("Guarantor not found".into()));
        }
        Ok(())
    }
}

// ── Referees ──────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct RefereeRow {
    uid: i32,
    customer_id: i32,
    added_date: Option<NaiveDateTime>,
    referee_name: String,
    id_no: String,
    mobile_no: String,
    physical_address: String,
    email_address: String,
    relationship: i32,
    status: i32,
}

impl From<RefereeRow> for Referee {
    fn from(r: RefereeRow) -> Self {
        Referee {
            uid: r.uid,
            customer_id: r.customer_id,
            added_date: r.added_date,
            referee_name: r.referee_name,
            id_no: r.id_no,
            mobile_no: r.mobile_no,
            physical_address: r.physical_address,
            email_address: r.email_address,
            relationship: r.relationship,
            status: r.status,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefereeSummaryRow {
    uid: i32,
    referee_name: String,
    customer_id: i32,
    mobile_no: String,
    physical_address: String,
    relationship: Option<String>,
    added_date: Option<NaiveDateTime>,
}

impl From<RefereeSummaryRow> for RefereeSummary {
    fn from(r: RefereeSummaryRow) -> Self {
        RefereeSummary {
            uid: r.uid,
            referee_name: r.referee_name,
            customer_id: r.customer_id,
            mobile_no: r.mobile_no,
            physical_address: r.physical_address,
            relationship: r.relationship,
            added_date: r.added_date,
        }
    }
}

const REFEREE_SUMMARY_SELECT: &str = r#"
    SELECT f.uid, f.referee_name, f.customer_id, f.mobile_no, f.physical_address,
           r.name AS relationship, f.added_date
    FROM o_customer_referees f
    LEFT JOIN o_customer_referee_relationships r ON f.relationship = r.uid
"#;

pub struct PgRefereeStore {
    pool: PgPool,
}

impl PgRefereeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefereeStore for PgRefereeStore {
    async fn get(&self, uid: i32) -> Result<Option<Referee>> {
        let row = sqlx::query_as::<_, RefereeRow>(
            r#"
            SELECT uid, customer_id, added_date, referee_name, id_no, mobile_no,
                   physical_address, email_address, relationship, status
            FROM o_customer_referees
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Referee::from))
    }

    async fn get_summary(&self, uid: i32) -> Result<Option<RefereeSummary>> {
        let sql = format!("{REFEREE_SUMMARY_SELECT} WHERE f.uid = $1");
        let row = sqlx::query_as::<_, RefereeSummaryRow>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(RefereeSummary::from))
    }

    async fn list_for_customer(&self, customer_id: i32) -> Result<Vec<RefereeSummary>> {
        let sql = format!("{REFEREE_SUMMARY_SELECT} WHERE f.customer_id = $1 ORDER BY f.uid");
        let rows = sqlx::query_as::<_, RefereeSummaryRow>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(RefereeSummary::from).collect())
    }

    async fn duplicate_exists(&self, candidate: &Referee) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM o_customer_referees
                WHERE customer_id = $1 AND mobile_no = $2
                  AND referee_name = $3 AND email_address = $4 AND uid <> $5
            )
            "#,
        )
        .bind(candidate.customer_id)
        .bind(&candidate.mobile_no)
        .bind(&candidate.referee_name)
        .bind(&candidate.email_address)
        .bind(candidate.uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(exists)
    }

    async fn insert(&self, r: &Referee) -> Result<Referee> {
        let (uid,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO o_customer_referees (
                customer_id, added_date, referee_name, id_no, mobile_no,
                physical_address, email_address, relationship, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING uid
            "#,
        )
        .bind(r.customer_id)
        .bind(r.added_date)
        .bind(&r.referee_name)
        .bind(&r.id_no)
        .bind(&r.mobile_no)
        .bind(&r.physical_address)
        .bind(&r.email_address)
        .bind(r.relationship)
        .bind(r.status)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        let mut stored = r.clone();
        stored.uid = uid;
        Ok(stored)
    }

    async fn update(&self, r: &Referee) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE o_customer_referees SET
                customer_id = $2, referee_name = $3, id_no = $4, mobile_no = $5,
                physical_address = $6, email_address = $7, relationship = $8, status = $9
            WHERE uid = $1
            "#,
        )
        .bind(r.uid)
        .bind(r.customer_id)
        .bind(&r.referee_name)
        .bind(&r.id_no)
        .bind(&r.mobile_no)
        .bind(&r.physical_address)
        .bind(&r.email_address)
        .bind(r.relationship)
        .bind(r.status)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(LenderError::NotFound("Referee not found".into()));
        }
        Ok(())
    }
}
