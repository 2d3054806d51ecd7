use crate::audit::ChangeContext;
use crate::error::{LenderError, Result};
use crate::models::referee::{Referee, RefereeInput, RefereeSummary};
use crate::permission::{Action, Resource};
use crate::principal::{DataScope, Principal};

use super::{now, LenderService};

const REFEREE_AUDIT_IGNORED: &[&str] = &["uid", "added_date", "id_no", "status"];

impl LenderService {
    pub async fn create_referee(&self, actor: &Principal, mut input: RefereeInput) -> Result<Referee> {
        self.permissions
            .require(actor, Resource::Customers, Action::Create, "Forbidden")
            .await?;

        input.tidy();
        input.validate()?;
        input.mobile_no = self
            .phone
            .require_valid(&input.mobile_no)
            .map_err(|_| LenderError::InvalidInput("Invalid mobile number".into()))?;

        let referee = input.to_referee(Some(now()));
        if self.current.referees.duplicate_exists(&referee).await? {
            return Err(LenderError::Conflict("Referee already exists".into()));
        }

        let stored = self.current.referees.insert(&referee).await?;
        tracing::info!(
            referee_id = stored.uid,
            customer_id = stored.customer_id,
            "customer referee created"
        );
        Ok(stored)
    }

    pub async fn update_referee(&self, actor: &Principal, mut input: RefereeInput) -> Result<Referee> {
        if input.uid <= 0 {
            return Err(LenderError::InvalidInput("UID is required".into()));
        }
        self.permissions
            .require(actor, Resource::Customers, Action::Update, "Forbidden")
            .await?;

        input.tidy();
        input.validate()?;
        input.mobile_no = self
            .phone
            .require_valid(&input.mobile_no)
            .map_err(|_| LenderError::InvalidInput("Invalid mobile number".into()))?;

        let existing = self
            .current
            .referees
            .get(input.uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("Referee not found".into()))?;

        let mut next = input.to_referee(existing.added_date);
        if input.status.is_none() {
            next.status = existing.status;
        }
        if self.current.referees.duplicate_exists(&next).await? {
            return Err(LenderError::Conflict("Referee already exists".into()));
        }
        self.current.referees.update(&next).await?;

        self.audit
            .log_update(
                &existing,
                &next,
                REFEREE_AUDIT_IGNORED,
                ChangeContext {
                    table: Resource::Customers.table(),
                    entity: "Referee",
                    primary_id: next.uid,
                    secondary_id: next.customer_id,
                    actor,
                },
            )
            .await;
        Ok(next)
    }

    pub async fn get_referee(
        &self,
        actor: &Principal,
        scope: DataScope,
        uid: i32,
    ) -> Result<RefereeSummary> {
        if uid <= 0 {
            return Err(LenderError::InvalidInput("Invalid ID".into()));
        }
        self.permissions
            .require(actor, Resource::Customers, Action::Read, "Forbidden")
            .await?;
        self.read_stores(scope)
            .referees
            .get_summary(uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("Referee not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    fn input() -> RefereeInput {
        RefereeInput {
            uid: 0,
            customer_id: 12,
            referee_name: "Mary Njeri".into(),
            id_no: "34567890".into(),
            mobile_no: "0733000222".into(),
            physical_address: String::new(),
            email_address: "mary@example.com".into(),
            relationship: 1,
            status: None,
        }
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let (store, service) = setup();
        store.set_relationship_name(1, "Sibling");
        let r = service.create_referee(&admin(), input()).await.unwrap();
        assert_eq!(r.mobile_no, "254733000222");

        let summary = service
            .get_referee(&admin(), DataScope::Current, r.uid)
            .await
            .unwrap();
        assert_eq!(summary.relationship.as_deref(), Some("Sibling"));
    }

    #[tokio::test]
    async fn duplicate_referee_conflicts() {
        let (_store, service) = setup();
        service.create_referee(&admin(), input()).await.unwrap();
        let err = service.create_referee(&admin(), input()).await.unwrap_err();
        assert!(matches!(err, LenderError::Conflict(m) if m == "Referee already exists"));
    }

    #[tokio::test]
    async fn create_needs_create_grant() {
        let (store, service) = setup();
        store.add_grant(grant("o_customers", |g| g.update = true));
        let err = service.create_referee(&officer(), input()).await.unwrap_err();
        assert_eq!(err.http_status(), 403);
    }

    #[tokio::test]
    async fn update_ignores_id_no_and_status_in_audit() {
        let (store, service) = setup();
        let created = service.create_referee(&admin(), input()).await.unwrap();

        let mut change = input();
        change.uid = created.uid;
        change.id_no = "11112222".into();
        change.status = Some(0);
        change.referee_name = "Mary W. Njeri".into();
        service.update_referee(&admin(), change).await.unwrap();

        let stored = store.referee_record(created.uid).unwrap();
        assert_eq!(stored.id_no, "11112222");

        let events = store.audit_events();
        assert_eq!(events.len(), 1);
        let details = &events[0].event_details;
        assert!(
            details.contains("referee_name changed from Mary Njeri to Mary W. Njeri"),
            "{details}"
        );
        assert!(!details.contains("id_no"), "{details}");
        assert!(!details.contains("status"), "{details}");
    }

    #[tokio::test]
    async fn update_without_uid_is_rejected() {
        let (_store, service) = setup();
        let err = service.update_referee(&admin(), input()).await.unwrap_err();
        assert!(matches!(err, LenderError::InvalidInput(m) if m == "UID is required"));
    }
}
