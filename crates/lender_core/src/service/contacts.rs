use crate::audit::ChangeContext;
use crate::error::{LenderError, Result};
use crate::models::contact::{Contact, ContactInput, ContactType};
use crate::models::customer::CustomerField;
use crate::permission::{Action, Resource};
use crate::principal::{DataScope, Principal};
use crate::validation::{is_valid_email, sha256_hex};

use super::{now, LenderService};

const CONTACT_AUDIT_IGNORED: &[&str] = &["uid", "encPhone", "lastUpdate"];

impl LenderService {
    pub async fn create_contact(&self, actor: &Principal, input: ContactInput) -> Result<Contact> {
        let kind = input.validate()?;
        let value = self.contact_value(kind, &input.value)?;

        self.permissions
            .require(
                actor,
                Resource::CustomerContacts,
                Action::Create,
                "You don't have permission to create customer contact!",
            )
            .await?;

        self.check_contact_unique(kind, &value, None, None).await?;

        let contact = Contact {
            uid: 0,
            customer_id: input.customer_id,
            contact_type: kind as i32,
            enc_phone: Some(enc_value(kind, &value)),
            value,
            last_update: Some(now()),
            status: input.status.unwrap_or(1),
        };
        let stored = self.current.contacts.insert(&contact).await?;
        tracing::info!(
            contact_id = stored.uid,
            customer_id = stored.customer_id,
            "customer contact created"
        );
        Ok(stored)
    }

    pub async fn update_contact(&self, actor: &Principal, input: ContactInput) -> Result<Contact> {
        let kind = input.validate()?;
        let value = self.contact_value(kind, &input.value)?;

        self.permissions
            .require(
                actor,
                Resource::CustomerContacts,
                Action::Update,
                "You don't have permission to update customer contact!",
            )
            .await?;

        let existing = self
            .current
            .contacts
            .get(input.uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("Customer contact not found".into()))?;

        self.check_contact_unique(kind, &value, Some(existing.customer_id), Some(existing.uid))
            .await?;

        let next = Contact {
            uid: existing.uid,
            customer_id: input.customer_id,
            contact_type: kind as i32,
            enc_phone: Some(enc_value(kind, &value)),
            value,
            last_update: Some(now()),
            status: input.status.unwrap_or(existing.status),
        };
        self.current.contacts.update(&next).await?;

        self.audit
            .log_update(
                &existing,
                &next,
                CONTACT_AUDIT_IGNORED,
                ChangeContext {
                    table: Resource::Customers.table(),
                    entity: "Contact",
                    primary_id: next.uid,
                    secondary_id: next.customer_id,
                    actor,
                },
            )
            .await;
        Ok(next)
    }

    /// One contact. Requires the customer read grant.
    pub async fn get_contact(
        &self,
        actor: &Principal,
        scope: DataScope,
        uid: i32,
    ) -> Result<Contact> {
        self.permissions
            .require(actor, Resource::Customers, Action::Read, "Forbidden")
            .await?;
        self.read_stores(scope)
            .contacts
            .get(uid)
            .await?
            .ok_or_else(|| LenderError::NotFound("Customer contact not found".into()))
    }

    fn contact_value(&self, kind: ContactType, raw: &str) -> Result<String> {
        let raw = raw.trim();
        if kind.is_phone() {
            return self.phone.require_valid(raw);
        }
        if !is_valid_email(raw) {
            return Err(LenderError::InvalidInput("Invalid email address".into()));
        }
        Ok(raw.to_string())
    }

    /// Phones may not collide with any customer's primary mobile or another
    /// contact; emails likewise with customer emails. On update the owning
    /// customer and the contact itself are excluded.
    async fn check_contact_unique(
        &self,
        kind: ContactType,
        value: &str,
        owner: Option<i32>,
        own_uid: Option<i32>,
    ) -> Result<()> {
        let (field, on_customer, on_contact) = if kind.is_phone() {
            (
                CustomerField::PrimaryMobile,
                "Phone number exists as primary mobile for a customer!",
                "Phone number exists as alternative phone for a customer!",
            )
        } else {
            (
                CustomerField::EmailAddress,
                "Email address already exists!",
                "Email address exists as alternative email for a customer!",
            )
        };
        if self.current.customers.exists_with(field, value, owner).await? {
            return Err(LenderError::Conflict(on_customer.into()));
        }
        if self.current.contacts.value_in_use(value, own_uid).await? {
            return Err(LenderError::Conflict(on_contact.into()));
        }
        Ok(())
    }
}

fn enc_value(kind: ContactType, value: &str) -> String {
    if kind.is_phone() {
        sha256_hex(value)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    fn phone_input(customer_id: i32, value: &str) -> ContactInput {
        ContactInput {
            uid: 0,
            customer_id,
            contact_type: 1,
            value: value.into(),
            status: None,
        }
    }

    #[tokio::test]
    async fn create_phone_contact_hashes_value() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        let created = service
            .create_contact(&admin(), phone_input(owner, "0722000111"))
            .await
            .unwrap();
        assert_eq!(created.value, "254722000111");
        assert_eq!(created.enc_phone, Some(sha256_hex("254722000111")));
        assert!(created.last_update.is_some());
        assert!(store.contact_record(created.uid).is_some());
    }

    #[tokio::test]
    async fn email_contact_has_empty_hash() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        let input = ContactInput {
            uid: 0,
            customer_id: owner,
            contact_type: 3,
            value: " alt@example.com ".into(),
            status: None,
        };
        let created = service.create_contact(&admin(), input).await.unwrap();
        assert_eq!(created.value, "alt@example.com");
        assert_eq!(created.enc_phone.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn phone_matching_a_primary_mobile_conflicts() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        store.add_customer(customer(0, "254722000111", 2));
        let err = service
            .create_contact(&admin(), phone_input(owner, "0722000111"))
            .await
            .unwrap_err();
        assert!(matches!(err, LenderError::Conflict(m) if m.contains("primary mobile")));
    }

    #[tokio::test]
    async fn phone_used_by_another_contact_conflicts() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        service
            .create_contact(&admin(), phone_input(owner, "0722000111"))
            .await
            .unwrap();
        let err = service
            .create_contact(&admin(), phone_input(owner, "0722000111"))
            .await
            .unwrap_err();
        assert!(matches!(err, LenderError::Conflict(m) if m.contains("alternative phone")));
    }

    #[tokio::test]
    async fn create_requires_contact_grant() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        let err = service
            .create_contact(&officer(), phone_input(owner, "0722000111"))
            .await
            .unwrap_err();
        assert!(matches!(err, LenderError::Forbidden(_)));

        store.add_grant(grant("o_customer_contacts", |g| g.create = true));
        assert!(service
            .create_contact(&officer(), phone_input(owner, "0722000111"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn update_is_audited_against_the_customer_table() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        let created = service
            .create_contact(&admin(), phone_input(owner, "0722000111"))
            .await
            .unwrap();

        let mut change = phone_input(owner, "0733000222");
        change.uid = created.uid;
        let updated = service.update_contact(&admin(), change).await.unwrap();
        assert_eq!(updated.value, "254733000222");

        let events = store.audit_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tbl, "o_customers");
        assert_eq!(events[0].fld, owner);
        let details = &events[0].event_details;
        assert!(details.starts_with(&format!("Contact({})", created.uid)), "{details}");
        assert!(
            details.contains("value changed from 254722000111 to 254733000222"),
            "{details}"
        );
        assert!(!details.contains("encPhone"), "{details}");
        assert!(!details.contains("lastUpdate"), "{details}");
    }

    #[tokio::test]
    async fn update_may_keep_its_own_value() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        let created = service
            .create_contact(&admin(), phone_input(owner, "0722000111"))
            .await
            .unwrap();
        let mut same = phone_input(owner, "0722000111");
        same.uid = created.uid;
        assert!(service.update_contact(&admin(), same).await.is_ok());
    }

    #[tokio::test]
    async fn update_of_missing_contact_is_not_found() {
        let (_store, service) = setup();
        let mut change = phone_input(5, "0733000222");
        change.uid = 404;
        let err = service.update_contact(&admin(), change).await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn missing_contact_is_not_found_before_conflict_checks() {
        let (store, service) = setup();
        store.add_customer(customer(0, "254722000111", 2));
        let mut change = phone_input(5, "0722000111");
        change.uid = 404;
        let err = service.update_contact(&admin(), change).await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn moving_a_contact_does_not_exempt_the_new_customer() {
        let (store, service) = setup();
        let owner = store.add_customer(customer(0, "254712345678", 2));
        let other = store.add_customer(customer(0, "254722000111", 2));
        let created = service
            .create_contact(&admin(), phone_input(owner, "0733000222"))
            .await
            .unwrap();

        let mut change = phone_input(other, "0722000111");
        change.uid = created.uid;
        let err = service.update_contact(&admin(), change).await.unwrap_err();
        assert!(matches!(err, LenderError::Conflict(m) if m.contains("primary mobile")));
        assert_eq!(
            store.contact_record(created.uid).unwrap().value,
            "254733000222"
        );
    }

    #[tokio::test]
    async fn invalid_email_rejected() {
        let (_store, service) = setup();
        let input = ContactInput {
            uid: 0,
            customer_id: 5,
            contact_type: 3,
            value: "not-an-email".into(),
            status: None,
        };
        let err = service.create_contact(&admin(), input).await.unwrap_err();
        assert!(matches!(err, LenderError::InvalidInput(m) if m == "Invalid email address"));
    }
}
