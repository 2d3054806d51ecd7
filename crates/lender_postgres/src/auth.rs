use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;

use lender_core::permission::GrantQuery;
use lender_core::ports::{GrantStore, PrincipalStore, Result, StaffBranchStore};
use lender_core::principal::Principal;

/// Principals, grants and staff-branch assignments. Always the current database.
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgAuthStore {
    async fn find_principal(&self, uid: i32) -> Result<Option<Principal>> {
        let row = sqlx::query_as::<_, (i32, String, String, i32, i32, i32)>(
            r#"
            SELECT uid, name, email, user_group, branch, status
            FROM o_users
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;

        Ok(row.map(|(uid, name, email, user_group, branch, status)| Principal {
            uid,
            name,
            email,
            user_group,
            branch,
            status,
        }))
    }
}

#[async_trait]
impl GrantStore for PgAuthStore {
    async fn has_matching_grant(&self, query: &GrantQuery) -> Result<bool> {
        // The flag column comes from a closed enum, never from the request.
        let sql = format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM o_permissions
                WHERE tbl = $1 AND rec = $2 AND {} = 1
                  AND (group_id = $3 OR user_id = $4)
            )
            "#,
            query.action.column()
        );
        let (exists,): (bool,) = sqlx::query_as(&sql)
            .bind(query.resource.table())
            .bind(query.record.rec())
            .bind(query.group_id)
            .bind(query.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        tracing::debug!(
            resource = query.resource.table(),
            action = query.action.column(),
            rec = query.record.rec(),
            group_id = query.group_id,
            user_id = query.user_id,
            exists,
            "grant lookup"
        );
        Ok(exists)
    }
}

#[async_trait]
impl StaffBranchStore for PgAuthStore {
    async fn active_branches(&self, agent: i32) -> Result<Vec<i32>> {
        let rows = sqlx::query_as::<_, (i32,)>(
            "SELECT branch FROM o_staff_branches WHERE agent = $1 AND status = 1",
        )
        .bind(agent)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(|(b,)| b).collect())
    }
}
