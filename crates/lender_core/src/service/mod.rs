//! LenderService: request-level orchestration over the storage ports.
//!
//! Every operation takes the acting `&Principal` explicitly. Authorization,
//! principal loading, writes and audit events always go to the current
//! stores; reads follow the caller's `DataScope` when an archive is attached.

mod contacts;
mod customers;
mod guarantors;
mod interactions;
mod referees;
mod users;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::audit::AuditLogger;
use crate::branch::{BranchFilter, BranchScope};
use crate::error::Result;
use crate::permission::{Action, PermissionEvaluator, RecordScope, Resource};
use crate::ports::{PrincipalStore, Stores};
use crate::principal::{DataScope, Principal};
use crate::validation::PhoneRules;

#[derive(Clone)]
pub struct LenderService {
    current: Stores,
    archive: Option<Stores>,
    phone: PhoneRules,
    permissions: PermissionEvaluator,
    branches: BranchFilter,
    audit: AuditLogger,
}

impl LenderService {
    pub fn new(current: Stores, phone: PhoneRules) -> Self {
        let permissions =
            PermissionEvaluator::new(current.principals.clone(), current.grants.clone());
        let branches = BranchFilter::new(current.staff_branches.clone());
        let audit = AuditLogger::new(current.audit.clone());
        Self {
            current,
            archive: None,
            phone,
            permissions,
            branches,
            audit,
        }
    }

    /// Attach archive stores. Archive-scoped reads go there from now on.
    pub fn with_archive(mut self, archive: Stores) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn has_archive(&self) -> bool {
        self.archive.is_some()
    }

    pub fn phone_rules(&self) -> PhoneRules {
        self.phone
    }

    pub fn permissions(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    /// Principal lookup used by the authentication layer.
    pub fn principals(&self) -> Arc<dyn PrincipalStore> {
        self.current.principals.clone()
    }

    /// Stores that serve reads for `scope`.
    pub fn read_stores(&self, scope: DataScope) -> &Stores {
        match (scope, &self.archive) {
            (DataScope::Archive, Some(archive)) => archive,
            _ => &self.current,
        }
    }

    /// Branch scope for list and read queries on `resource`.
    async fn visible_scope(&self, principal: &Principal, resource: Resource) -> Result<BranchScope> {
        let global = self
            .permissions
            .principal_is_authorized(principal, resource, RecordScope::Any, Action::Read)
            .await;
        self.branches.visible_branches(principal, global).await
    }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::customer::{status, Customer};
    use crate::permission::Grant;
    use crate::principal::ADMIN_GROUP;

    pub const ADMIN: i32 = 1;
    pub const OFFICER: i32 = 20;
    pub const OFFICER_GROUP: i32 = 4;

    pub fn staff(uid: i32, group: i32, branch: i32) -> Principal {
        Principal {
            uid,
            name: format!("Staff {uid}"),
            email: format!("staff{uid}@lender.test"),
            user_group: group,
            branch,
            status: 1,
        }
    }

    pub fn admin() -> Principal {
        staff(ADMIN, ADMIN_GROUP, 1)
    }

    pub fn officer() -> Principal {
        staff(OFFICER, OFFICER_GROUP, 2)
    }

    pub fn grant(table: &str, set: impl FnOnce(&mut Grant)) -> Grant {
        let mut g = Grant {
            group_id: OFFICER_GROUP,
            tbl: table.to_string(),
            ..Default::default()
        };
        set(&mut g);
        g
    }

    pub fn customer(uid: i32, mobile: &str, branch: i32) -> Customer {
        Customer {
            uid,
            customer_code: String::new(),
            full_name: format!("Customer {uid}"),
            primary_mobile: mobile.to_string(),
            phone_number_provider: 1,
            enc_phone: String::new(),
            email_address: String::new(),
            physical_address: "Kisumu, Milimani".into(),
            geolocation: String::new(),
            town: 0,
            passport_photo: String::new(),
            national_id: String::new(),
            gender: "F".into(),
            dob: None,
            added_by: ADMIN,
            current_agent: ADMIN,
            added_date: None,
            branch,
            primary_product: 1,
            loan_limit: 0.0,
            flag: 0,
            total_loans: 0,
            status: status::ACTIVE,
        }
    }

    pub fn setup() -> (Arc<MemoryStore>, LenderService) {
        let store = Arc::new(MemoryStore::new());
        store.add_principal(admin());
        store.add_principal(officer());
        let service = LenderService::new(Stores::from_shared(store.clone()), PhoneRules::default());
        (store, service)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::paging::PageQuery;
    use crate::models::customer::CustomerFilter;

    #[tokio::test]
    async fn archive_scope_reads_archive_only_when_attached() {
        let (store, service) = setup();
        store.add_customer(customer(0, "254700000001", 1));

        let archive = Arc::new(MemoryStore::new());
        archive.add_customer(customer(0, "254700000002", 1));
        archive.add_customer(customer(0, "254700000003", 1));

        let page = PageQuery::default();
        let filter = CustomerFilter::default();
        let plain = service
            .list_customers(&admin(), DataScope::Archive, &filter, &page)
            .await
            .unwrap();
        assert_eq!(plain.count, 1);

        let service = service.with_archive(Stores::from_shared(archive));
        let archived = service
            .list_customers(&admin(), DataScope::Archive, &filter, &page)
            .await
            .unwrap();
        assert_eq!(archived.count, 2);
        let current = service
            .list_customers(&admin(), DataScope::Current, &filter, &page)
            .await
            .unwrap();
        assert_eq!(current.count, 1);
    }
}
