use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Postgres, QueryBuilder};

use lender_core::branch::BranchScope;
use lender_core::models::conversation::Conversation;
use lender_core::models::paging::{Page, Paging};
use lender_core::models::user::{StaffUser, UserFilter};
use lender_core::ports::{ConversationStore, Result, UserStore};

use crate::{close_count, push_branch_scope, push_page};

// ── Users ─────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct StaffUserRow {
    uid: i32,
    name: String,
    email: String,
    join_date: Option<NaiveDateTime>,
    user_group: Option<String>,
    status: Option<String>,
}

impl From<StaffUserRow> for StaffUser {
    fn from(r: StaffUserRow) -> Self {
        StaffUser {
            uid: r.uid,
            name: r.name,
            email: r.email,
            join_date: r.join_date,
            user_group: r.user_group,
            status: r.status,
        }
    }
}

const USER_SELECT: &str = r#"
    SELECT u.uid, u.name, u.email, u.join_date, g.name AS user_group, s.name AS status
    FROM o_users u
    LEFT JOIN o_user_groups g ON u.user_group = g.uid
    LEFT JOIN o_staff_statuses s ON u.status = s.uid
    WHERE 1=1
"#;

fn push_user_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter, paging: &Paging) {
    if let Some(group) = filter.user_group {
        qb.push(" AND u.user_group = ").push_bind(group);
    }
    if let Some(branch) = filter.branch {
        qb.push(" AND u.branch = ").push_bind(branch);
    }
    if let Some(status) = filter.status {
        qb.push(" AND u.status = ").push_bind(status);
    }
    if let Some(term) = paging.search_term.as_deref() {
        let pattern = format!("%{term}%");
        qb.push(" AND (u.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self, filter: &UserFilter, paging: &Paging) -> Result<Page<StaffUser>> {
        let mut qb = QueryBuilder::<Postgres>::new(USER_SELECT);
        push_user_filters(&mut qb, filter, paging);
        push_page(&mut qb, "u", paging);
        let rows = qb
            .build_query_as::<StaffUserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM (SELECT u.uid FROM o_users u WHERE 1=1");
        push_user_filters(&mut count_qb, filter, paging);
        close_count(&mut count_qb, paging);
        let count = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;

        Ok(Page {
            rows: rows.into_iter().map(StaffUser::from).collect(),
            count,
        })
    }

    async fn get(&self, uid: i32) -> Result<Option<StaffUser>> {
        let sql = format!("{USER_SELECT} AND u.uid = $1");
        let row = sqlx::query_as::<_, StaffUserRow>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(StaffUser::from))
    }

    async fn group_name(&self, group_id: i32) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>("SELECT name FROM o_user_groups WHERE uid = $1")
            .bind(group_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(|(name,)| name))
    }
}

// ── Conversations ─────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ConversationRow {
    uid: i32,
    full_name: String,
    branch: i32,
    transcript: String,
    conversation_date: Option<NaiveDateTime>,
    next_interaction: Option<NaiveDate>,
}

impl From<ConversationRow> for Conversation {
    fn from(r: ConversationRow) -> Self {
        Conversation {
            uid: r.uid,
            full_name: r.full_name,
            branch: r.branch,
            transcript: r.transcript,
            conversation_date: r.conversation_date,
            next_interaction: r.next_interaction,
        }
    }
}

fn push_conversation_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    scope: &BranchScope,
    paging: &Paging,
) {
    push_branch_scope(qb, "c.branch", scope);
    if let Some(term) = paging.search_term.as_deref() {
        qb.push(" AND c.full_name ILIKE ").push_bind(format!("%{term}%"));
    }
}

pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn list(&self, scope: &BranchScope, paging: &Paging) -> Result<Page<Conversation>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT cc.uid, c.full_name, c.branch, cc.transcript,
                   cc.conversation_date, cc.next_interaction
            FROM o_customer_conversations cc
            INNER JOIN o_customers c ON cc.customer_id = c.uid
            WHERE 1=1
            "#,
        );
        push_conversation_filters(&mut qb, scope, paging);
        push_page(&mut qb, "cc", paging);
        let rows = qb
            .build_query_as::<ConversationRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;

        let mut count_qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT COUNT(*) FROM (
                SELECT cc.uid
                FROM o_customer_conversations cc
                INNER JOIN o_customers c ON cc.customer_id = c.uid
                WHERE 1=1
            "#,
        );
        push_conversation_filters(&mut count_qb, scope, paging);
        close_count(&mut count_qb, paging);
        let count = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;

        Ok(Page {
            rows: rows.into_iter().map(Conversation::from).collect(),
            count,
        })
    }
}
