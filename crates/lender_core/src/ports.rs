//! Storage ports. `lender_postgres` implements them over sqlx and
//! `memory` implements them for tests.

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::error::Result;

use crate::audit::NewAuditEvent;
use crate::branch::BranchScope;
use crate::models::contact::{Contact, ContactSummary};
use crate::models::conversation::Conversation;
use crate::models::customer::{
    Customer, CustomerDetail, CustomerField, CustomerFilter, CustomerKey, CustomerSummary,
};
use crate::models::guarantor::{Guarantor, GuarantorField, GuarantorSummary};
use crate::models::paging::{Page, Paging};
use crate::models::referee::{Referee, RefereeSummary};
use crate::models::user::{StaffUser, UserFilter};
use crate::models::vintage::VintageRecord;
use crate::permission::GrantQuery;
use crate::principal::Principal;

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_principal(&self, uid: i32) -> Result<Option<Principal>>;
}

#[async_trait]
pub trait GrantStore: Send + Sync {
    /// True iff at least one enabled grant row matches.
    async fn has_matching_grant(&self, query: &GrantQuery) -> Result<bool>;
}

#[async_trait]
pub trait StaffBranchStore: Send + Sync {
    /// Branches of active (`status = 1`) assignments with `agent = uid`.
    async fn active_branches(&self, agent: i32) -> Result<Vec<i32>>;
}

/// Append-only sink for `o_events`.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, event: &NewAuditEvent) -> Result<()>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get(&self, uid: i32) -> Result<Option<Customer>>;

    async fn find_detail(
        &self,
        key: &CustomerKey,
        scope: &BranchScope,
    ) -> Result<Option<CustomerDetail>>;

    async fn list(
        &self,
        filter: &CustomerFilter,
        scope: &BranchScope,
        paging: &Paging,
    ) -> Result<Page<CustomerSummary>>;

    /// Another customer already holds `value` in `field`.
    async fn exists_with(
        &self,
        field: CustomerField,
        value: &str,
        exclude_uid: Option<i32>,
    ) -> Result<bool>;

    async fn has_loan(&self, customer_uid: i32) -> Result<bool>;

    /// Returns the stored record with its assigned uid.
    async fn insert(&self, customer: &Customer) -> Result<Customer>;

    async fn update(&self, customer: &Customer) -> Result<()>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn get(&self, uid: i32) -> Result<Option<Contact>>;

    /// Contacts of a customer whose branch lies in `scope`.
    async fn list_for_customer(
        &self,
        customer_id: i32,
        scope: &BranchScope,
    ) -> Result<Vec<ContactSummary>>;

    /// Another contact already holds `value`.
    async fn value_in_use(&self, value: &str, exclude_uid: Option<i32>) -> Result<bool>;

    async fn insert(&self, contact: &Contact) -> Result<Contact>;

    async fn update(&self, contact: &Contact) -> Result<()>;
}

#[async_trait]
pub trait GuarantorStore: Send + Sync {
    async fn get(&self, uid: i32) -> Result<Option<Guarantor>>;

    async fn get_summary(&self, uid: i32) -> Result<Option<GuarantorSummary>>;

    async fn list_for_customer(&self, customer_id: i32) -> Result<Vec<GuarantorSummary>>;

    /// Same name, national id, mobile and customer on a different row.
    async fn duplicate_exists(&self, candidate: &Guarantor) -> Result<bool>;

    async fn exists_with(
        &self,
        field: GuarantorField,
        value: &str,
        exclude_uid: Option<i32>,
    ) -> Result<bool>;

    async fn insert(&self, guarantor: &Guarantor) -> Result<Guarantor>;

    async fn update(&self, guarantor: &Guarantor) -> Result<()>;
}

#[async_trait]
pub trait RefereeStore: Send + Sync {
    async fn get(&self, uid: i32) -> Result<Option<Referee>>;

    async fn get_summary(&self, uid: i32) -> Result<Option<RefereeSummary>>;

    async fn list_for_customer(&self, customer_id: i32) -> Result<Vec<RefereeSummary>>;

    /// Same customer, mobile, name and email on a different row.
    async fn duplicate_exists(&self, candidate: &Referee) -> Result<bool>;

    async fn insert(&self, referee: &Referee) -> Result<Referee>;

    async fn update(&self, referee: &Referee) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self, filter: &UserFilter, paging: &Paging) -> Result<Page<StaffUser>>;

    async fn get(&self, uid: i32) -> Result<Option<StaffUser>>;

    async fn group_name(&self, group_id: i32) -> Result<Option<String>>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Search is a substring match on the customer's full name.
    async fn list(&self, scope: &BranchScope, paging: &Paging) -> Result<Page<Conversation>>;
}

/// Source of loans eligible for the collections sync.
#[async_trait]
pub trait VintageSource: Send + Sync {
    async fn eligible_vintages(&self) -> Result<Vec<VintageRecord>>;
}

/// One database's worth of stores.
#[derive(Clone)]
pub struct Stores {
    pub principals: Arc<dyn PrincipalStore>,
    pub grants: Arc<dyn GrantStore>,
    pub staff_branches: Arc<dyn StaffBranchStore>,
    pub audit: Arc<dyn AuditSink>,
    pub customers: Arc<dyn CustomerStore>,
    pub contacts: Arc<dyn ContactStore>,
    pub guarantors: Arc<dyn GuarantorStore>,
    pub referees: Arc<dyn RefereeStore>,
    pub users: Arc<dyn UserStore>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl Stores {
    /// Every port served by one object, as the in-memory and Postgres stores do.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: PrincipalStore
            + GrantStore
            + StaffBranchStore
            + AuditSink
            + CustomerStore
            + ContactStore
            + GuarantorStore
            + RefereeStore
            + UserStore
            + ConversationStore
            + 'static,
    {
        Self {
            principals: store.clone(),
            grants: store.clone(),
            staff_branches: store.clone(),
            audit: store.clone(),
            customers: store.clone(),
            contacts: store.clone(),
            guarantors: store.clone(),
            referees: store.clone(),
            users: store.clone(),
            conversations: store,
        }
    }
}
