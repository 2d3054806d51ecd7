use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::LenderError;
use crate::validation::Checks;

/// Kind of alternative contact stored in `o_customer_contacts.contact_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactType {
    AlternativePhone1 = 1,
    AlternativePhone2 = 2,
    AlternativeEmail1 = 3,
}

impl ContactType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::AlternativePhone1),
            2 => Some(Self::AlternativePhone2),
            3 => Some(Self::AlternativeEmail1),
            _ => None,
        }
    }

    pub fn is_phone(&self) -> bool {
        matches!(self, Self::AlternativePhone1 | Self::AlternativePhone2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub uid: i32,
    pub customer_id: i32,
    pub contact_type: i32,
    pub value: String,
    pub enc_phone: Option<String>,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub last_update: Option<NaiveDateTime>,
    pub status: i32,
}

/// Body of `POST /contacts` and `PUT /contacts`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub uid: i32,
    pub customer_id: i32,
    pub contact_type: i32,
    pub value: String,
    pub status: Option<i32>,
}

impl ContactInput {
    pub fn validate(&self) -> Result<ContactType, LenderError> {
        let kind = ContactType::from_code(self.contact_type);
        Checks::new()
            .check(self.customer_id > 0, "customer_id", "must be greater than 0")
            .check(kind.is_some(), "contact_type", "must be one of 1 2 3")
            .length("value", self.value.trim(), 1, 250)
            .check(
                self.status.map_or(true, |s| s == 0 || s == 1),
                "status",
                "must be one of 0 1",
            )
            .finish()?;
        kind.ok_or_else(|| LenderError::InvalidInput("unknown contact type".into()))
    }
}

/// Row of a customer's contact list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub uid: i32,
    pub contact_type: i32,
    pub value: String,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub last_update: Option<NaiveDateTime>,
}

impl From<&Contact> for ContactSummary {
    fn from(c: &Contact) -> Self {
        Self {
            uid: c.uid,
            contact_type: c.contact_type,
            value: c.value.clone(),
            last_update: c.last_update,
        }
    }
}
