use async_trait::async_trait;
use sqlx::PgPool;

use lender_core::audit::NewAuditEvent;
use lender_core::ports::{AuditSink, Result};

use crate::write_error;

/// Appends to `o_events`. `event_date` is stamped by the database.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, event: &NewAuditEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO o_events (tbl, fld, event_details, event_by, status)
            VALUES ($1, $2, $3, $4, 1)
            "#,
        )
        .bind(&event.tbl)
        .bind(event.fld)
        .bind(&event.event_details)
        .bind(event.event_by)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }
}
