use crate::audit::ChangeContext;
use crate::error::{LenderError, Result};
use crate::models::guarantor::{Guarantor, GuarantorField, GuarantorInput, GuarantorSummary};
use crate::permission::{Action, Resource};
use crate::principal::{DataScope, Principal};

use super::{now, LenderService};

const GUARANTOR_AUDIT_IGNORED: &[&str] = &["uid", "added_date"];

impl LenderService {
    pub async fn create_guarantor(
        &self,
        actor: &Principal,
        mut input: GuarantorInput,
    ) -> Result<Guarantor> {
        self.permissions
            .require(
                actor,
                Resource::Customers,
                Action::Update,
                "You don't have permission to create customer guarantor!",
            )
            .await?;

        input.tidy();
        input.validate()?;
        input.mobile_no = self.phone.require_valid(&input.mobile_no)?;

        let guarantor = input.to_guarantor(Some(now()));
        self.check_guarantor_unique(&guarantor, None).await?;

        let stored = self.current.guarantors.insert(&guarantor).await?;
        tracing::info!(
            guarantor_id = stored.uid,
            customer_id = stored.customer_id,
            "customer guarantor created"
        );
        Ok(stored)
    }

    pub async fn update_guarantor(
        &self,
        actor: &Principal,
        mut input: GuarantorInput,
    ) -> Result<Guarantor> {
        self.permissions
            .require(
                actor,
                Resource::Customers,
                Action::Update,
                "You don't have permission to update customer guarantor!",
            )
            .await?;

        input.tidy();
        input.validate()?;
        input.mobile_no = self.phone.require_valid(&input.mobile_no)?;

        let existing = self
            .current
            .guarantors
            .get(input.uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("Guarantor not found".into()))?;

        let mut next = input.to_guarantor(existing.added_date);
        next.uid = existing.uid;
        if input.status.is_none() {
            next.status = existing.status;
        }
        self.check_guarantor_unique(&next, Some(existing.uid)).await?;
        self.current.guarantors.update(&next).await?;

        self.audit
            .log_update(
                &existing,
                &next,
                GUARANTOR_AUDIT_IGNORED,
                ChangeContext {
                    table: Resource::Customers.table(),
                    entity: "Guarantor",
                    primary_id: next.uid,
                    secondary_id: next.customer_id,
                    actor,
                },
            )
            .await;
        Ok(next)
    }

    pub async fn get_guarantor(
        &self,
        actor: &Principal,
        scope: DataScope,
        uid: i32,
    ) -> Result<GuarantorSummary> {
        self.permissions
            .require(actor, Resource::Customers, Action::Read, "Forbidden")
            .await?;
        self.read_stores(scope)
            .guarantors
            .get_summary(uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("Guarantor not found".into()))
    }

    async fn check_guarantor_unique(&self, g: &Guarantor, exclude: Option<i32>) -> Result<()> {
        let store = &self.current.guarantors;
        if store.duplicate_exists(g).await? {
            return Err(LenderError::Conflict("Guarantor already exists".into()));
        }
        if store
            .exists_with(GuarantorField::NationalId, &g.national_id, exclude)
            .await?
        {
            return Err(LenderError::Conflict("National ID already exists".into()));
        }
        if store
            .exists_with(GuarantorField::MobileNo, &g.mobile_no, exclude)
            .await?
        {
            return Err(LenderError::Conflict("Mobile number already exists".into()));
        }
        Ok(())
    }
}
