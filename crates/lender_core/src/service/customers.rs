use crate::audit::ChangeContext;
use crate::error::{LenderError, Result};
use crate::models::customer::{
    status, Customer, CustomerDetail, CustomerField, CustomerFilter, CustomerInput, CustomerKey,
    CustomerSummary,
};
use crate::models::guarantor::GuarantorSummary;
use crate::models::contact::ContactSummary;
use crate::models::paging::{Page, PageQuery};
use crate::models::referee::RefereeSummary;
use crate::permission::{Action, Resource};
use crate::principal::{DataScope, Principal};
use crate::validation::sha256_hex;

use super::{now, LenderService};

pub const CUSTOMER_SORTABLE: &[&str] = &["uid", "full_name", "added_date"];

/// Customer fields left out of update audit messages.
pub const CUSTOMER_AUDIT_IGNORED: &[&str] = &[
    "uid",
    "currentAgent",
    "addedBy",
    "geolocation",
    "addedDate",
    "encPhone",
];

const UNIQUE_FIELDS: [CustomerField; 3] = [
    CustomerField::PrimaryMobile,
    CustomerField::NationalId,
    CustomerField::EmailAddress,
];

impl LenderService {
    pub async fn create_customer(
        &self,
        actor: &Principal,
        mut input: CustomerInput,
    ) -> Result<Customer> {
        self.permissions
            .require(
                actor,
                Resource::Customers,
                Action::Create,
                "You don't have permission to create customer!",
            )
            .await?;

        input.tidy();
        input.validate()?;
        self.check_provider(&input)?;
        input.primary_mobile = self.phone.require_valid(&input.primary_mobile)?;

        let mut customer = input.into_new_customer();
        self.check_unique(&customer, None).await?;

        customer.enc_phone = sha256_hex(&customer.primary_mobile);
        customer.added_by = actor.uid;
        customer.current_agent = actor.uid;
        customer.added_date = Some(now());

        let stored = self.current.customers.insert(&customer).await?;
        tracing::info!(customer_id = stored.uid, added_by = actor.uid, "customer created");
        Ok(stored)
    }

    pub async fn update_customer(
        &self,
        actor: &Principal,
        mut input: CustomerInput,
    ) -> Result<Customer> {
        self.permissions
            .require(
                actor,
                Resource::Customers,
                Action::Update,
                "You don't have permission to update customer!",
            )
            .await?;

        input.tidy();
        input.validate()?;
        self.check_provider(&input)?;

        let existing = self
            .current
            .customers
            .get(input.uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("Customer not found".into()))?;

        let mut next = input.apply_to(&existing);
        self.check_status_change(actor, &existing, &next).await?;

        next.primary_mobile = self.phone.require_valid(&input.primary_mobile)?;
        next.enc_phone = sha256_hex(&next.primary_mobile);
        if next.primary_mobile != existing.primary_mobile {
            if existing.status == status::ACTIVE {
                self.permissions
                    .require(
                        actor,
                        Resource::CustomerContacts,
                        Action::Update,
                        "You don't have permission to update customer phone number!",
                    )
                    .await?;
            }
            if self.current.customers.has_loan(existing.uid).await? {
                return Err(LenderError::Conflict("Customer has an existing loan".into()));
            }
        }

        self.check_unique(&next, Some(existing.uid)).await?;
        self.current.customers.update(&next).await?;

        self.audit
            .log_update(
                &existing,
                &next,
                CUSTOMER_AUDIT_IGNORED,
                ChangeContext {
                    table: Resource::Customers.table(),
                    entity: "Customer",
                    primary_id: existing.uid,
                    secondary_id: existing.uid,
                    actor,
                },
            )
            .await;
        Ok(next)
    }

    pub async fn list_customers(
        &self,
        actor: &Principal,
        scope: DataScope,
        filter: &CustomerFilter,
        page: &PageQuery,
    ) -> Result<Page<CustomerSummary>> {
        let paging = page.resolve(CUSTOMER_SORTABLE)?;
        let branches = self.visible_scope(actor, Resource::Customers).await?;
        self.read_stores(scope)
            .customers
            .list(filter, &branches, &paging)
            .await
    }

    pub async fn get_customer(
        &self,
        actor: &Principal,
        scope: DataScope,
        key: &CustomerKey,
    ) -> Result<CustomerDetail> {
        let branches = self.visible_scope(actor, Resource::Customers).await?;
        self.read_stores(scope)
            .customers
            .find_detail(key, &branches)
            .await?
            .ok_or_else(|| LenderError::NotFound("Customer not found".into()))
    }

    pub async fn customer_contacts(
        &self,
        actor: &Principal,
        scope: DataScope,
        customer_id: i32,
    ) -> Result<Vec<ContactSummary>> {
        let branches = self.visible_scope(actor, Resource::Customers).await?;
        self.read_stores(scope)
            .contacts
            .list_for_customer(customer_id, &branches)
            .await
    }

    pub async fn customer_guarantors(
        &self,
        actor: &Principal,
        scope: DataScope,
        customer_id: i32,
    ) -> Result<Vec<GuarantorSummary>> {
        self.permissions
            .require(
                actor,
                Resource::Customers,
                Action::Read,
                "You don't have permission to read customer guarantors!",
            )
            .await?;
        self.read_stores(scope)
            .guarantors
            .list_for_customer(customer_id)
            .await
    }

    pub async fn customer_referees(
        &self,
        actor: &Principal,
        scope: DataScope,
        customer_id: i32,
    ) -> Result<Vec<RefereeSummary>> {
        self.permissions
            .require(
                actor,
                Resource::Customers,
                Action::Read,
                "You don't have permission to read customer referees!",
            )
            .await?;
        self.read_stores(scope)
            .referees
            .list_for_customer(customer_id)
            .await
    }

    fn check_provider(&self, input: &CustomerInput) -> Result<()> {
        if self.phone.requires_explicit_provider()
            && matches!(input.phone_number_provider, None | Some(0) | Some(1))
        {
            return Err(LenderError::InvalidInput(
                "Phone number provider is required".into(),
            ));
        }
        Ok(())
    }

    /// Blocking needs `block`, Blocked to Active needs `unblock`, any other
    /// status change needs `update`.
    async fn check_status_change(
        &self,
        actor: &Principal,
        existing: &Customer,
        next: &Customer,
    ) -> Result<()> {
        let (action, message) = if next.status == status::BLOCKED {
            (
                Action::Block,
                "You don't have permission to block customer!".to_string(),
            )
        } else if next.status == status::ACTIVE && existing.status == status::BLOCKED {
            (
                Action::Unblock,
                "You don't have permission to unblock customer!".to_string(),
            )
        } else if next.status != existing.status {
            (
                Action::Update,
                format!(
                    "You don't have permission to update customer who is {}",
                    status::name(existing.status)
                ),
            )
        } else {
            return Ok(());
        };
        self.permissions
            .require(actor, Resource::Customers, action, &message)
            .await
    }

    async fn check_unique(&self, customer: &Customer, exclude: Option<i32>) -> Result<()> {
        for field in UNIQUE_FIELDS {
            let value = field.value_of(customer);
            if value.is_empty() {
                continue;
            }
            if self
                .current
                .customers
                .exists_with(field, value, exclude)
                .await?
            {
                return Err(LenderError::Conflict(format!(
                    "Customer with the same {} already exists",
                    field.label()
                )));
            }
        }
        Ok(())
    }
}
