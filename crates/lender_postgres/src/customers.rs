use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Postgres, QueryBuilder};

use lender_core::branch::BranchScope;
use lender_core::error::LenderError;
use lender_core::models::contact::{Contact, ContactSummary};
use lender_core::models::customer::{
    Customer, CustomerDetail, CustomerField, CustomerFilter, CustomerKey, CustomerSearch,
    CustomerSummary,
};
use lender_core::models::paging::{Page, Paging};
use lender_core::ports::{ContactStore, CustomerStore, Result};

use crate::{close_count, push_branch_scope, push_page, write_error};

const CUSTOMER_COLUMNS: &str = "uid, customer_code, full_name, primary_mobile, \
    phone_number_provider, enc_phone, email_address, physical_address, geolocation, town, \
    passport_photo, national_id, gender, dob, added_by, current_agent, added_date, branch, \
    primary_product, loan_limit, flag, total_loans, status";

#[derive(sqlx::FromRow)]
struct CustomerRow {
    uid: i32,
    customer_code: String,
    full_name: String,
    primary_mobile: String,
    phone_number_provider: i32,
    enc_phone: String,
    email_address: String,
    physical_address: String,
    geolocation: String,
    town: i32,
    passport_photo: String,
    national_id: String,
    gender: String,
    dob: Option<NaiveDate>,
    added_by: i32,
    current_agent: i32,
    added_date: Option<NaiveDateTime>,
    branch: i32,
    primary_product: i32,
    loan_limit: f64,
    flag: i32,
    total_loans: i32,
    status: i32,
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Customer {
            uid: r.uid,
            customer_code: r.customer_code,
            full_name: r.full_name,
            primary_mobile: r.primary_mobile,
            phone_number_provider: r.phone_number_provider,
            enc_phone: r.enc_phone,
            email_address: r.email_address,
            physical_address: r.physical_address,
            geolocation: r.geolocation,
            town: r.town,
            passport_photo: r.passport_photo,
            national_id: r.national_id,
            gender: r.gender,
            dob: r.dob,
            added_by: r.added_by,
            current_agent: r.current_agent,
            added_date: r.added_date,
            branch: r.branch,
            primary_product: r.primary_product,
            loan_limit: r.loan_limit,
            flag: r.flag,
            total_loans: r.total_loans,
            status: r.status,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    uid: i32,
    passport_photo: String,
    full_name: String,
    agent: Option<String>,
    email_address: String,
    primary_mobile: String,
    branch: Option<String>,
    physical_address: String,
    status: Option<String>,
}

impl From<SummaryRow> for CustomerSummary {
    fn from(r: SummaryRow) -> Self {
        CustomerSummary {
            uid: r.uid,
            passport_photo: r.passport_photo,
            full_name: r.full_name,
            agent: r.agent,
            email_address: r.email_address,
            primary_mobile: r.primary_mobile,
            branch: r.branch,
            physical_address: r.physical_address,
            status: r.status,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    uid: i32,
    passport_photo: String,
    full_name: String,
    gender: String,
    dob: Option<NaiveDate>,
    national_id: String,
    added_by: Option<String>,
    current_co: Option<String>,
    current_lo: Option<String>,
    loan_limit: f64,
    email_address: String,
    primary_mobile: String,
    branch: Option<String>,
    physical_address: String,
    location_map: String,
    added_date: Option<NaiveDateTime>,
    product: Option<String>,
    total_loans: i32,
    status: Option<String>,
}

impl From<DetailRow> for CustomerDetail {
    fn from(r: DetailRow) -> Self {
        CustomerDetail {
            uid: r.uid,
            passport_photo: r.passport_photo,
            full_name: r.full_name,
            gender: r.gender,
            dob: r.dob,
            national_id: r.national_id,
            added_by: r.added_by,
            current_co: r.current_co,
            current_lo: r.current_lo,
            loan_limit: r.loan_limit,
            email_address: r.email_address,
            primary_mobile: r.primary_mobile,
            branch: r.branch,
            physical_address: r.physical_address,
            location_map: r.location_map,
            added_date: r.added_date,
            product: r.product,
            total_loans: r.total_loans,
            status: r.status,
        }
    }
}

/// Filters shared by the page query and its count.
fn push_customer_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filter: &CustomerFilter,
    scope: &BranchScope,
    paging: &Paging,
) {
    if let Some(branch) = filter.branch {
        qb.push(" AND c.branch = ").push_bind(branch);
    }
    if let Some(agent) = filter.agent {
        qb.push(" AND c.current_agent = ").push_bind(agent);
    }
    if let Some(status) = filter.status {
        qb.push(" AND c.status = ").push_bind(status);
    }
    push_branch_scope(qb, "c.branch", scope);

    let Some(term) = paging.search_term.as_deref() else {
        return;
    };
    match CustomerSearch::classify(term) {
        CustomerSearch::Mobile(mobile) => {
            qb.push(" AND c.primary_mobile = ").push_bind(mobile);
        }
        CustomerSearch::Uid(uid) => {
            qb.push(" AND c.uid = ").push_bind(uid);
        }
        CustomerSearch::Name(name) => {
            qb.push(" AND c.full_name ILIKE ").push_bind(format!("%{name}%"));
        }
        CustomerSearch::Any(any) => {
            let pattern = format!("%{any}%");
            qb.push(" AND (c.uid::text LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.primary_mobile LIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.full_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

// ── PgCustomerStore ───────────────────────────────────────────

pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn get(&self, uid: i32) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM o_customers WHERE uid = $1");
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(Customer::from))
    }

    async fn find_detail(
        &self,
        key: &CustomerKey,
        scope: &BranchScope,
    ) -> Result<Option<CustomerDetail>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT c.uid, c.passport_photo, c.full_name, c.gender, c.dob, c.national_id,
                   ab.name AS added_by, ag.name AS current_co, ag.name AS current_lo,
                   c.loan_limit, c.email_address, c.primary_mobile, b.name AS branch,
                   c.physical_address, c.geolocation AS location_map, c.added_date,
                   p.name AS product, c.total_loans, cs.name AS status
            FROM o_customers c
            LEFT JOIN o_users ab ON c.added_by = ab.uid
            LEFT JOIN o_users ag ON c.current_agent = ag.uid
            LEFT JOIN o_branches b ON c.branch = b.uid
            LEFT JOIN o_loan_products p ON c.primary_product = p.uid
            LEFT JOIN o_customer_statuses cs ON c.status = cs.code
            WHERE 1=1
            "#,
        );
        match key {
            CustomerKey::Uid(uid) => qb.push(" AND c.uid = ").push_bind(*uid),
            CustomerKey::PrimaryMobile(m) => qb.push(" AND c.primary_mobile = ").push_bind(m.clone()),
        };
        push_branch_scope(&mut qb, "c.branch", scope);
        qb.push(" LIMIT 1");

        let row = qb
            .build_query_as::<DetailRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(row.map(CustomerDetail::from))
    }

    async fn list(
        &self,
        filter: &CustomerFilter,
        scope: &BranchScope,
        paging: &Paging,
    ) -> Result<Page<CustomerSummary>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT c.uid, c.passport_photo, c.full_name, u.name AS agent, c.email_address,
                   c.primary_mobile, b.name AS branch, c.physical_address, cs.name AS status
            FROM o_customers c
            LEFT JOIN o_users u ON c.current_agent = u.uid
            LEFT JOIN o_branches b ON c.branch = b.uid
            LEFT JOIN o_customer_statuses cs ON c.status = cs.code
            WHERE 1=1
            "#,
        );
        push_customer_filters(&mut qb, filter, scope, paging);
        push_page(&mut qb, "c", paging);
        let rows = qb
            .build_query_as::<SummaryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;

        let mut count_qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM (SELECT c.uid FROM o_customers c WHERE 1=1",
        );
        push_customer_filters(&mut count_qb, filter, scope, paging);
        close_count(&mut count_qb, paging);
        let count = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;

        Ok(Page {
            rows: rows.into_iter().map(CustomerSummary::from).collect(),
            count,
        })
    }

    async fn exists_with(
        &self,
        field: CustomerField,
        value: &str,
        exclude_uid: Option<i32>,
    ) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM o_customers WHERE {} = $1 AND ($2::int IS NULL OR uid <> $2))",
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

    async fn has_loan(&self, customer_uid: i32) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM o_loans WHERE customer_id = $1)")
                .bind(customer_uid)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| anyhow!(e))?;
        Ok(exists)
    }

    async fn insert(&self, c: &Customer) -> Result<Customer> {
        let (uid,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO o_customers (
                customer_code, full_name, primary_mobile, phone_number_provider, enc_phone,
                email_address, physical_address, geolocation, town, passport_photo,
                national_id, gender, dob, added_by, current_agent, added_date, branch,
                primary_product, loan_limit, flag, total_loans, status
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            RETURNING uid
            "#,
        )
        .bind(&c.customer_code)
        .bind(&c.full_name)
        .bind(&c.primary_mobile)
        .bind(c.phone_number_provider)
        .bind(&c.enc_phone)
        .bind(&c.email_address)
        .bind(&c.physical_address)
        .bind(&c.geolocation)
        .bind(c.town)
        .bind(&c.passport_photo)
        .bind(&c.national_id)
        .bind(&c.gender)
        .bind(c.dob)
        .bind(c.added_by)
        .bind(c.current_agent)
        .bind(c.added_date)
        .bind(c.branch)
        .bind(c.primary_product)
        .bind(c.loan_limit)
        .bind(c.flag)
        .bind(c.total_loans)
        .bind(c.status)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        let mut stored = c.clone();
        stored.uid = uid;
        Ok(stored)
    }

    async fn update(&self, c: &Customer) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE o_customers SET
                full_name = $2, primary_mobile = $3, phone_number_provider = $4,
                enc_phone = $5, email_address = $6, physical_address = $7,
                geolocation = $8, town = $9, passport_photo = $10, national_id = $11,
                gender = $12, dob = $13, branch = $14, primary_product = $15,
                loan_limit = $16, status = $17
            WHERE uid = $1
            "#,
        )
        .bind(c.uid)
        .bind(&c.full_name)
        .bind(&c.primary_mobile)
        .bind(c.phone_number_provider)
        .bind(&c.enc_phone)
        .bind(&c.email_address)
        .bind(&c.physical_address)
        .bind(&c.geolocation)
        .bind(c.town)
        .bind(&c.passport_photo)
        .bind(&c.national_id)
        .bind(&c.gender)
        .bind(c.dob)
        .bind(c.branch)
        .bind(c.primary_product)
        .bind(c.loan_limit)
        .bind(c.status)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(LenderError::NotFound("Customer not found".into()));
        }
        Ok(())
    }
}

// ── PgContactStore ────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ContactRow {
    uid: i32,
    customer_id: i32,
    contact_type: i32,
    value: String,
    enc_phone: Option<String>,
    last_update: Option<NaiveDateTime>,
    status: i32,
}

impl From<ContactRow> for Contact {
    fn from(r: ContactRow) -> Self {
        Contact {
            uid: r.uid,
            customer_id: r.customer_id,
            contact_type: r.contact_type,
            value: r.value,
            enc_phone: r.enc_phone,
            last_update: r.last_update,
            status: r.status,
        }
    }
}

pub struct PgContactStore {
    pool: PgPool,
}

impl PgContactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactStore for PgContactStore {
    async fn get(&self, uid: i32) -> Result<Option<Contact>> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT uid, customer_id, contact_type, value, enc_phone, last_update, status
            FROM o_customer_contacts
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Contact::from))
    }

    async fn list_for_customer(
        &self,
        customer_id: i32,
        scope: &BranchScope,
    ) -> Result<Vec<ContactSummary>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT cc.uid, cc.customer_id, cc.contact_type, cc.value, cc.enc_phone,
                   cc.last_update, cc.status
            FROM o_customer_contacts cc
            JOIN o_customers c ON c.uid = cc.customer_id
            WHERE cc.customer_id =
            "#,
        );
        qb.push_bind(customer_id);
        push_branch_scope(&mut qb, "c.branch", scope);
        qb.push(" ORDER BY cc.uid");

        let rows = qb
            .build_query_as::<ContactRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(rows
            .into_iter()
            .map(|r| ContactSummary::from(&Contact::from(r)))
            .collect())
    }

    async fn value_in_use(&self, value: &str, exclude_uid: Option<i32>) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM o_customer_contacts
                WHERE value = $1 AND ($2::int IS NULL OR uid <> $2)
            )
            "#,
        )
        .bind(value)
        .bind(exclude_uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(exists)
    }

    async fn insert(&self, c: &Contact) -> Result<Contact> {
        let (uid,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO o_customer_contacts
                (customer_id, contact_type, value, enc_phone, last_update, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING uid
            "#,
        )
        .bind(c.customer_id)
        .bind(c.contact_type)
        .bind(&c.value)
        .bind(&c.enc_phone)
        .bind(c.last_update)
        .bind(c.status)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)?;

        let mut stored = c.clone();
        stored.uid = uid;
        Ok(stored)
    }

    async fn update(&self, c: &Contact) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE o_customer_contacts SET
                customer_id = $2, contact_type = $3, value = $4,
                enc_phone = $5, last_update = $6, status = $7
            WHERE uid = $1
            "#,
        )
        .bind(c.uid)
        .bind(c.customer_id)
        .bind(c.contact_type)
        .bind(&c.value)
        .bind(&c.enc_phone)
        .bind(c.last_update)
        .bind(c.status)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(LenderError::NotFound("Customer contact not found".into()));
        }
        Ok(())
    }
}
