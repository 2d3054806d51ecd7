//! In-memory implementation of every port, for tests and local runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::audit::NewAuditEvent;
use crate::branch::BranchScope;
use crate::error::{LenderError, Result};
use crate::models::contact::{Contact, ContactSummary};
use crate::models::conversation::Conversation;
use crate::models::customer::{
    Customer, CustomerDetail, CustomerField, CustomerFilter, CustomerKey, CustomerSearch,
    CustomerSummary,
};
use crate::models::guarantor::{Guarantor, GuarantorField, GuarantorSummary};
use crate::models::paging::{Page, Paging, SortDir};
use crate::models::referee::{Referee, RefereeSummary};
use crate::models::user::{StaffUser, UserFilter};
use crate::models::vintage::VintageRecord;
use crate::permission::{Grant, GrantQuery};
use crate::ports::{
    AuditSink, ContactStore, ConversationStore, CustomerStore, GrantStore, GuarantorStore,
    PrincipalStore, RefereeStore, StaffBranchStore, UserStore, VintageSource,
};
use crate::principal::Principal;

#[derive(Debug, Clone)]
struct StaffBranch {
    agent: i32,
    branch: i32,
    active: bool,
}

#[derive(Debug, Clone)]
struct ConversationRow {
    uid: i32,
    customer_id: i32,
    transcript: String,
    conversation_date: Option<NaiveDateTime>,
    next_interaction: Option<NaiveDate>,
}

#[derive(Default)]
struct State {
    next_uid: i32,
    principals: BTreeMap<i32, Principal>,
    grants: Vec<Grant>,
    staff_branches: Vec<StaffBranch>,
    events: Vec<NewAuditEvent>,
    customers: BTreeMap<i32, Customer>,
    contacts: BTreeMap<i32, Contact>,
    guarantors: BTreeMap<i32, Guarantor>,
    referees: BTreeMap<i32, Referee>,
    customers_with_loans: HashSet<i32>,
    conversations: Vec<ConversationRow>,
    vintages: Vec<VintageRecord>,
    branch_names: HashMap<i32, String>,
    group_names: HashMap<i32, String>,
    relationship_names: HashMap<i32, String>,
    fail_grants: bool,
    fail_branches: bool,
    fail_audit: bool,
    fail_vintages: bool,
}

impl State {
    fn allocate_uid(&mut self) -> i32 {
        self.next_uid += 1;
        self.next_uid
    }

    fn staff_name(&self, uid: i32) -> Option<String> {
        self.principals.get(&uid).map(|p| p.name.clone())
    }

    fn branch_name(&self, branch: i32) -> Option<String> {
        self.branch_names.get(&branch).cloned()
    }
}

/// Thread-safe in-memory store.
pub struct MemoryStore {
    inner: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(State {
                next_uid: 1000,
                ..Default::default()
            }),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T> {
        let state = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(f(&state))
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> T) -> Result<T> {
        let mut state = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(f(&mut state))
    }

    fn seed(&self, f: impl FnOnce(&mut State)) {
        if let Ok(mut state) = self.inner.write() {
            f(&mut state);
        }
    }

    // ── Seeding ──────────────────────────────────────────────────

    pub fn add_principal(&self, principal: Principal) {
        self.seed(|s| {
            s.principals.insert(principal.uid, principal);
        });
    }

    pub fn add_grant(&self, grant: Grant) {
        self.seed(|s| s.grants.push(grant));
    }

    pub fn add_staff_branch(&self, agent: i32, branch: i32, active: bool) {
        self.seed(|s| {
            s.staff_branches.push(StaffBranch {
                agent,
                branch,
                active,
            })
        });
    }

    /// Store a customer as-is. A zero uid is replaced by a fresh one.
    pub fn add_customer(&self, mut customer: Customer) -> i32 {
        let mut uid = customer.uid;
        self.seed(|s| {
            if uid == 0 {
                uid = s.allocate_uid();
            }
            customer.uid = uid;
            s.customers.insert(uid, customer);
        });
        uid
    }

    pub fn add_contact(&self, mut contact: Contact) -> i32 {
        let mut uid = contact.uid;
        self.seed(|s| {
            if uid == 0 {
                uid = s.allocate_uid();
            }
            contact.uid = uid;
            s.contacts.insert(uid, contact);
        });
        uid
    }

    pub fn add_loan(&self, customer_id: i32) {
        self.seed(|s| {
            s.customers_with_loans.insert(customer_id);
        });
    }

    pub fn add_conversation(
        &self,
        customer_id: i32,
        transcript: &str,
        next_interaction: Option<NaiveDate>,
    ) -> i32 {
        let mut uid = 0;
        self.seed(|s| {
            uid = s.allocate_uid();
            s.conversations.push(ConversationRow {
                uid,
                customer_id,
                transcript: transcript.to_string(),
                conversation_date: None,
                next_interaction,
            });
        });
        uid
    }

    pub fn add_vintage(&self, record: VintageRecord) {
        self.seed(|s| s.vintages.push(record));
    }

    pub fn set_branch_name(&self, branch: i32, name: &str) {
        self.seed(|s| {
            s.branch_names.insert(branch, name.to_string());
        });
    }

    pub fn set_group_name(&self, group: i32, name: &str) {
        self.seed(|s| {
            s.group_names.insert(group, name.to_string());
        });
    }

    pub fn set_relationship_name(&self, relationship: i32, name: &str) {
        self.seed(|s| {
            s.relationship_names.insert(relationship, name.to_string());
        });
    }

    // ── Failure injection ────────────────────────────────────────

    pub fn fail_grant_lookups(&self, fail: bool) {
        self.seed(|s| s.fail_grants = fail);
    }

    pub fn fail_branch_lookups(&self, fail: bool) {
        self.seed(|s| s.fail_branches = fail);
    }

    pub fn fail_audit_writes(&self, fail: bool) {
        self.seed(|s| s.fail_audit = fail);
    }

    pub fn fail_vintage_reads(&self, fail: bool) {
        self.seed(|s| s.fail_vintages = fail);
    }

    // ── Inspection ───────────────────────────────────────────────

    pub fn audit_events(&self) -> Vec<NewAuditEvent> {
        self.read(|s| s.events.clone()).unwrap_or_default()
    }

    pub fn customer_count(&self) -> usize {
        self.read(|s| s.customers.len()).unwrap_or_default()
    }

    pub fn customer_record(&self, uid: i32) -> Option<Customer> {
        self.read(|s| s.customers.get(&uid).cloned()).ok().flatten()
    }

    pub fn contact_record(&self, uid: i32) -> Option<Contact> {
        self.read(|s| s.contacts.get(&uid).cloned()).ok().flatten()
    }

    pub fn guarantor_record(&self, uid: i32) -> Option<Guarantor> {
        self.read(|s| s.guarantors.get(&uid).cloned()).ok().flatten()
    }

    pub fn referee_record(&self, uid: i32) -> Option<Referee> {
        self.read(|s| s.referees.get(&uid).cloned()).ok().flatten()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page_of<T: Clone>(rows: Vec<T>, paging: &Paging) -> Page<T> {
    let total = rows.len() as i64;
    let count = if paging.count_limit > 0 {
        total.min(paging.count_limit)
    } else {
        total
    };
    let rows = rows
        .into_iter()
        .skip(paging.offset().max(0) as usize)
        .take(paging.page_size.max(0) as usize)
        .collect();
    Page { rows, count }
}

fn order<T, K: Ord>(rows: &mut [T], dir: SortDir, key: impl Fn(&T) -> K) {
    rows.sort_by_key(|r| key(r));
    if dir == SortDir::Desc {
        rows.reverse();
    }
}

fn customer_matches(c: &Customer, search: &CustomerSearch) -> bool {
    match search {
        CustomerSearch::Mobile(m) => c.primary_mobile == *m,
        CustomerSearch::Uid(uid) => i64::from(c.uid) == *uid,
        CustomerSearch::Name(n) => contains_ci(&c.full_name, n),
        CustomerSearch::Any(t) => {
            c.uid.to_string().contains(t.as_str())
                || c.primary_mobile.contains(t.as_str())
                || contains_ci(&c.full_name, t)
        }
    }
}

fn customer_detail(s: &State, c: &Customer) -> CustomerDetail {
    let agent = s.staff_name(c.current_agent);
    CustomerDetail {
        uid: c.uid,
        passport_photo: c.passport_photo.clone(),
        full_name: c.full_name.clone(),
        gender: c.gender.clone(),
        dob: c.dob,
        national_id: c.national_id.clone(),
        added_by: s.staff_name(c.added_by),
        current_co: agent.clone(),
        current_lo: agent,
        loan_limit: c.loan_limit,
        email_address: c.email_address.clone(),
        primary_mobile: c.primary_mobile.clone(),
        branch: s.branch_name(c.branch),
        physical_address: c.physical_address.clone(),
        location_map: c.geolocation.clone(),
        added_date: c.added_date,
        product: None,
        total_loans: c.total_loans,
        status: Some(crate::models::customer::status::name(c.status).to_string()),
    }
}

fn guarantor_summary(s: &State, g: &Guarantor) -> GuarantorSummary {
    GuarantorSummary {
        uid: g.uid,
        guarantor_name: g.guarantor_name.clone(),
        customer_id: g.customer_id,
        mobile_no: g.mobile_no.clone(),
        national_id: g.national_id.clone(),
        physical_address: g.physical_address.clone(),
        amount_guaranteed: g.amount_guaranteed,
        added_date: g.added_date,
        relationship: s.relationship_names.get(&g.relationship).cloned(),
        status: g.status,
    }
}

fn referee_summary(s: &State, r: &Referee) -> RefereeSummary {
    RefereeSummary {
        uid: r.uid,
        referee_name: r.referee_name.clone(),
        customer_id: r.customer_id,
        mobile_no: r.mobile_no.clone(),
        physical_address: r.physical_address.clone(),
        relationship: s.relationship_names.get(&r.relationship).cloned(),
        added_date: r.added_date,
    }
}

fn staff_user(s: &State, p: &Principal) -> StaffUser {
    StaffUser {
        uid: p.uid,
        name: p.name.clone(),
        email: p.email.clone(),
        join_date: None,
        user_group: s.group_names.get(&p.user_group).cloned(),
        status: Some(if p.status == 1 { "Active" } else { "Inactive" }.to_string()),
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_principal(&self, uid: i32) -> Result<Option<Principal>> {
        self.read(|s| s.principals.get(&uid).cloned())
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn has_matching_grant(&self, query: &GrantQuery) -> Result<bool> {
        self.read(|s| {
            if s.fail_grants {
                return Err(LenderError::Internal(anyhow!("grant table unavailable")));
            }
            Ok(s.grants.iter().any(|g| g.matches(query)))
        })?
    }
}

#[async_trait]
impl StaffBranchStore for MemoryStore {
    async fn active_branches(&self, agent: i32) -> Result<Vec<i32>> {
        self.read(|s| {
            if s.fail_branches {
                return Err(LenderError::Internal(anyhow!("staff branches unavailable")));
            }
            Ok(s.staff_branches
                .iter()
                .filter(|sb| sb.agent == agent && sb.active)
                .map(|sb| sb.branch)
                .collect())
        })?
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, event: &NewAuditEvent) -> Result<()> {
        self.write(|s| {
            if s.fail_audit {
                return Err(LenderError::Internal(anyhow!("event table unavailable")));
            }
            s.events.push(event.clone());
            Ok(())
        })?
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn get(&self, uid: i32) -> Result<Option<Customer>> {
        self.read(|s| s.customers.get(&uid).cloned())
    }

    async fn find_detail(
        &self,
        key: &CustomerKey,
        scope: &BranchScope,
    ) -> Result<Option<CustomerDetail>> {
        self.read(|s| {
            s.customers
                .values()
                .filter(|c| scope.permits(c.branch))
                .find(|c| match key {
                    CustomerKey::Uid(uid) => c.uid == *uid,
                    CustomerKey::PrimaryMobile(m) => c.primary_mobile == *m,
                })
                .map(|c| customer_detail(s, c))
        })
    }

    async fn list(
        &self,
        filter: &CustomerFilter,
        scope: &BranchScope,
        paging: &Paging,
    ) -> Result<Page<CustomerSummary>> {
        self.read(|s| {
            let search = paging.search_term.as_deref().map(CustomerSearch::classify);
            let mut rows: Vec<&Customer> = s
                .customers
                .values()
                .filter(|c| filter.branch.map_or(true, |b| c.branch == b))
                .filter(|c| filter.agent.map_or(true, |a| c.current_agent == a))
                .filter(|c| filter.status.map_or(true, |st| c.status == st))
                .filter(|c| scope.permits(c.branch))
                .filter(|c| search.as_ref().map_or(true, |q| customer_matches(c, q)))
                .collect();
            match paging.order_by {
                "full_name" => order(&mut rows, paging.dir, |c| c.full_name.clone()),
                "added_date" => order(&mut rows, paging.dir, |c| c.added_date),
                _ => order(&mut rows, paging.dir, |c| c.uid),
            }
            let summaries = rows
                .into_iter()
                .map(|c| CustomerSummary {
                    uid: c.uid,
                    passport_photo: c.passport_photo.clone(),
                    full_name: c.full_name.clone(),
                    agent: s.staff_name(c.current_agent),
                    email_address: c.email_address.clone(),
                    primary_mobile: c.primary_mobile.clone(),
                    branch: s.branch_name(c.branch),
                    physical_address: c.physical_address.clone(),
                    status: Some(crate::models::customer::status::name(c.status).to_string()),
                })
                .collect();
            page_of(summaries, paging)
        })
    }

    async fn exists_with(
        &self,
        field: CustomerField,
        value: &str,
        exclude_uid: Option<i32>,
    ) -> Result<bool> {
        self.read(|s| {
            s.customers
                .values()
                .filter(|c| Some(c.uid) != exclude_uid)
                .any(|c| field.value_of(c) == value)
        })
    }

    async fn has_loan(&self, customer_uid: i32) -> Result<bool> {
        self.read(|s| s.customers_with_loans.contains(&customer_uid))
    }

    async fn insert(&self, customer: &Customer) -> Result<Customer> {
        self.write(|s| {
            for field in [CustomerField::PrimaryMobile, CustomerField::NationalId, CustomerField::EmailAddress] {
                let value = field.value_of(customer);
                if !value.is_empty() && s.customers.values().any(|c| field.value_of(c) == value) {
                    return Err(LenderError::Conflict(format!(
                        "Customer with the same {} already exists",
                        field.label()
                    )));
                }
            }
            let mut stored = customer.clone();
            stored.uid = s.allocate_uid();
            s.customers.insert(stored.uid, stored.clone());
            Ok(stored)
        })?
    }

    async fn update(&self, customer: &Customer) -> Result<()> {
        self.write(|s| match s.customers.get_mut(&customer.uid) {
            Some(slot) => {
                *slot = customer.clone();
                Ok(())
            }
            None => Err(LenderError::NotFound("Customer not found".into())),
        })?
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn get(&self, uid: i32) -> Result<Option<Contact>> {
        self.read(|s| s.contacts.get(&uid).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: i32,
        scope: &BranchScope,
    ) -> Result<Vec<ContactSummary>> {
        self.read(|s| {
            let visible = s
                .customers
                .get(&customer_id)
                .is_some_and(|c| scope.permits(c.branch));
            if !visible {
                return Vec::new();
            }
            s.contacts
                .values()
                .filter(|c| c.customer_id == customer_id)
                .map(ContactSummary::from)
                .collect()
        })
    }

    async fn value_in_use(&self, value: &str, exclude_uid: Option<i32>) -> Result<bool> {
        self.read(|s| {
            s.contacts
                .values()
                .filter(|c| Some(c.uid) != exclude_uid)
                .any(|c| c.value == value)
        })
    }

    async fn insert(&self, contact: &Contact) -> Result<Contact> {
        self.write(|s| {
            let mut stored = contact.clone();
            stored.uid = s.allocate_uid();
            s.contacts.insert(stored.uid, stored.clone());
            stored
        })
    }

    async fn update(&self, contact: &Contact) -> Result<()> {
        self.write(|s| match s.contacts.get_mut(&contact.uid) {
            Some(slot) => {
                *slot = contact.clone();
                Ok(())
            }
            None => Err(LenderError::NotFound("Contact not found".into())),
        })?
    }
}

#[async_trait]
impl GuarantorStore for MemoryStore {
    async fn get(&self, uid: i32) -> Result<Option<Guarantor>> {
        self.read(|s| s.guarantors.get(&uid).cloned())
    }

    async fn get_summary(&self, uid: i32) -> Result<Option<GuarantorSummary>> {
        self.read(|s| s.guarantors.get(&uid).map(|g| guarantor_summary(s, g)))
    }

    async fn list_for_customer(&self, customer_id: i32) -> Result<Vec<GuarantorSummary>> {
        self.read(|s| {
            s.guarantors
                .values()
                .filter(|g| g.customer_id == customer_id)
                .map(|g| guarantor_summary(s, g))
                .collect()
        })
    }

    async fn duplicate_exists(&self, candidate: &Guarantor) -> Result<bool> {
        self.read(|s| {
            s.guarantors.values().any(|g| {
                g.uid != candidate.uid
                    && g.guarantor_name == candidate.guarantor_name
                    && g.national_id == candidate.national_id
                    && g.mobile_no == candidate.mobile_no
                    && g.customer_id == candidate.customer_id
            })
        })
    }

    async fn exists_with(
        &self,
        field: GuarantorField,
        value: &str,
        exclude_uid: Option<i32>,
    ) -> Result<bool> {
        self.read(|s| {
            s.guarantors
                .values()
                .filter(|g| Some(g.uid) != exclude_uid)
                .any(|g| field.value_of(g) == value)
        })
    }

    async fn insert(&self, guarantor: &Guarantor) -> Result<Guarantor> {
        self.write(|s| {
            let mut stored = guarantor.clone();
            stored.uid = s.allocate_uid();
            s.guarantors.insert(stored.uid, stored.clone());
            stored
        })
    }

    async fn update(&self, guarantor: &Guarantor) -> Result<()> {
        self.write(|s| match s.guarantors.get_mut(&guarantor.uid) {
            Some(slot) => {
                *slot = guarantor.clone();
                Ok(())
            }
            None => Err(LenderError::NotFound("Guarantor not found".into())),
        })?
    }
}

#[async_trait]
impl RefereeStore for MemoryStore {
    async fn get(&self, uid: i32) -> Result<Option<Referee>> {
        self.read(|s| s.referees.get(&uid).cloned())
    }

    async fn get_summary(&self, uid: i32) -> Result<Option<RefereeSummary>> {
        self.read(|s| s.referees.get(&uid).map(|r| referee_summary(s, r)))
    }

    async fn list_for_customer(&self, customer_id: i32) -> Result<Vec<RefereeSummary>> {
        self.read(|s| {
            s.referees
                .values()
                .filter(|r| r.customer_id == customer_id)
                .map(|r| referee_summary(s, r))
                .collect()
        })
    }

    async fn duplicate_exists(&self, candidate: &Referee) -> Result<bool> {
        self.read(|s| {
            s.referees.values().any(|r| {
                r.uid != candidate.uid
                    && r.customer_id == candidate.customer_id
                    && r.mobile_no == candidate.mobile_no
                    && r.referee_name == candidate.referee_name
                    && r.email_address == candidate.email_address
            })
        })
    }

    async fn insert(&self, referee: &Referee) -> Result<Referee> {
        self.write(|s| {
            let mut stored = referee.clone();
            stored.uid = s.allocate_uid();
            s.referees.insert(stored.uid, stored.clone());
            stored
        })
    }

    async fn update(&self, referee: &Referee) -> Result<()> {
        self.write(|s| match s.referees.get_mut(&referee.uid) {
            Some(slot) => {
                *slot = referee.clone();
                Ok(())
            }
            None => Err(LenderError::NotFound("Referee not found".into())),
        })?
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list(&self, filter: &UserFilter, paging: &Paging) -> Result<Page<StaffUser>> {
        self.read(|s| {
            let mut rows: Vec<&Principal> = s
                .principals
                .values()
                .filter(|p| filter.user_group.map_or(true, |g| p.user_group == g))
                .filter(|p| filter.branch.map_or(true, |b| p.branch == b))
                .filter(|p| filter.status.map_or(true, |st| p.status == st))
                .filter(|p| {
                    paging.search_term.as_deref().map_or(true, |t| {
                        contains_ci(&p.name, t) || contains_ci(&p.email, t)
                    })
                })
                .collect();
            match paging.order_by {
                "name" => order(&mut rows, paging.dir, |p| p.name.clone()),
                "email" => order(&mut rows, paging.dir, |p| p.email.clone()),
                _ => order(&mut rows, paging.dir, |p| p.uid),
            }
            let users = rows.into_iter().map(|p| staff_user(s, p)).collect();
            page_of(users, paging)
        })
    }

    async fn get(&self, uid: i32) -> Result<Option<StaffUser>> {
        self.read(|s| s.principals.get(&uid).map(|p| staff_user(s, p)))
    }

    async fn group_name(&self, group_id: i32) -> Result<Option<String>> {
        self.read(|s| s.group_names.get(&group_id).cloned())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn list(&self, scope: &BranchScope, paging: &Paging) -> Result<Page<Conversation>> {
        self.read(|s| {
            let mut rows: Vec<Conversation> = s
                .conversations
                .iter()
                .filter_map(|cc| {
                    let customer = s.customers.get(&cc.customer_id)?;
                    Some(Conversation {
                        uid: cc.uid,
                        full_name: customer.full_name.clone(),
                        branch: customer.branch,
                        transcript: cc.transcript.clone(),
                        conversation_date: cc.conversation_date,
                        next_interaction: cc.next_interaction,
                    })
                })
                .filter(|c| scope.permits(c.branch))
                .filter(|c| {
                    paging
                        .search_term
                        .as_deref()
                        .map_or(true, |t| contains_ci(&c.full_name, t))
                })
                .collect();
            match paging.order_by {
                "conversation_date" => order(&mut rows, paging.dir, |c| c.conversation_date),
                "next_interaction" => order(&mut rows, paging.dir, |c| c.next_interaction),
                _ => order(&mut rows, paging.dir, |c| c.uid),
            }
            page_of(rows, paging)
        })
    }
}

#[async_trait]
impl VintageSource for MemoryStore {
    async fn eligible_vintages(&self) -> Result<Vec<VintageRecord>> {
        self.read(|s| {
            if s.fail_vintages {
                return Err(LenderError::Internal(anyhow!("loan table unavailable")));
            }
            Ok(s.vintages.clone())
        })?
    }
}
