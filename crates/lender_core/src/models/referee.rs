use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::LenderError;
use crate::validation::{is_numeric, is_valid_email, Checks};

/// A row of `o_customer_referees`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Referee {
    pub uid: i32,
    pub customer_id: i32,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub added_date: Option<NaiveDateTime>,
    pub referee_name: String,
    pub id_no: String,
    pub mobile_no: String,
    pub physical_address: String,
    pub email_address: String,
    pub relationship: i32,
    pub status: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefereeInput {
    #[serde(default)]
    pub uid: i32,
    pub customer_id: i32,
    pub referee_name: String,
    pub id_no: String,
    pub mobile_no: String,
    #[serde(default)]
    pub physical_address: String,
    #[serde(default)]
    pub email_address: String,
    pub relationship: i32,
    pub status: Option<i32>,
}

impl RefereeInput {
    pub fn tidy(&mut self) {
        self.referee_name = self.referee_name.trim().to_string();
        self.id_no = self.id_no.trim().to_string();
        self.physical_address = self.physical_address.trim().to_string();
        self.email_address = self.email_address.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), LenderError> {
        let mut checks = Checks::new();
        checks
            .check(self.customer_id > 0, "customer_id", "must be greater than 0")
            .length("referee_name", &self.referee_name, 3, 50)
            .check(
                is_numeric(&self.id_no) && self.id_no.len() >= 6,
                "id_no",
                "must be at least 6 digits",
            )
            .check(
                is_numeric(&self.mobile_no) && (10..=12).contains(&self.mobile_no.len()),
                "mobile_no",
                "must be 10 to 12 digits",
            )
            .check(self.relationship > 0, "relationship", "must be greater than 0")
            .check(
                self.status.map_or(true, |s| s == 0 || s == 1),
                "status",
                "must be one of 0 1",
            );
        if !self.physical_address.is_empty() {
            checks.length("physical_address", &self.physical_address, 5, 1000);
        }
        if !self.email_address.is_empty() {
            checks.check(
                is_valid_email(&self.email_address),
                "email_address",
                "must be a valid email",
            );
        }
        checks.finish()
    }

    pub fn to_referee(&self, added_date: Option<NaiveDateTime>) -> Referee {
        Referee {
            uid: self.uid,
            customer_id: self.customer_id,
            added_date,
            referee_name: self.referee_name.clone(),
            id_no: self.id_no.clone(),
            mobile_no: self.mobile_no.clone(),
            physical_address: self.physical_address.clone(),
            email_address: self.email_address.clone(),
            relationship: self.relationship,
            status: self.status.unwrap_or(1),
        }
    }
}

/// Referee with its relationship name resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefereeSummary {
    pub uid: i32,
    pub referee_name: String,
    pub customer_id: i32,
    pub mobile_no: String,
    pub physical_address: String,
    pub relationship: Option<String>,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub added_date: Option<NaiveDateTime>,
}
