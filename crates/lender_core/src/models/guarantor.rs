use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::LenderError;
use crate::validation::{is_numeric, Checks};

/// A row of `o_customer_guarantors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guarantor {
    pub uid: i32,
    pub guarantor_name: String,
    pub customer_id: i32,
    pub national_id: String,
    pub mobile_no: String,
    pub physical_address: String,
    pub amount_guaranteed: f64,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub added_date: Option<NaiveDateTime>,
    pub relationship: i32,
    pub status: i32,
}

/// Guarantor columns that must be unique across guarantors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuarantorField {
    NationalId,
    MobileNo,
}

impl GuarantorField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::NationalId => "national_id",
            Self::MobileNo => "mobile_no",
        }
    }

    pub fn value_of<'a>(&self, g: &'a Guarantor) -> &'a str {
        match self {
            Self::NationalId => &g.national_id,
            Self::MobileNo => &g.mobile_no,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuarantorInput {
    #[serde(default)]
    pub uid: i32,
    pub guarantor_name: String,
    pub customer_id: i32,
    pub mobile_no: String,
    pub national_id: String,
    pub physical_address: String,
    pub amount_guaranteed: Option<f64>,
    pub relationship: i32,
    pub status: Option<i32>,
}

impl GuarantorInput {
    pub fn tidy(&mut self) {
        self.guarantor_name = self.guarantor_name.trim().to_string();
        self.national_id = self.national_id.trim().to_string();
        self.physical_address = self.physical_address.trim().to_string();
    }

    pub fn validate(&self) -> Result<(), LenderError> {
        Checks::new()
            .length("guarantor_name", &self.guarantor_name, 3, 50)
            .check(self.customer_id > 0, "customer_id", "must be greater than 0")
            .check(
                is_numeric(&self.mobile_no) && (10..=12).contains(&self.mobile_no.len()),
                "mobile_no",
                "must be 10 to 12 digits",
            )
            .check(
                is_numeric(&self.national_id) && self.national_id.len() >= 6,
                "national_id",
                "must be at least 6 digits",
            )
            .length("physical_address", &self.physical_address, 5, 1000)
            .check(
                self.amount_guaranteed.map_or(true, |a| a >= 0.0),
                "amount_guaranteed",
                "must not be negative",
            )
            .check(self.relationship > 0, "relationship", "must be greater than 0")
            .check(
                self.status.map_or(true, |s| s == 0 || s == 1),
                "status",
                "must be one of 0 1",
            )
            .finish()
    }

    pub fn to_guarantor(&self, added_date: Option<NaiveDateTime>) -> Guarantor {
        Guarantor {
            uid: self.uid,
            guarantor_name: self.guarantor_name.clone(),
            customer_id: self.customer_id,
            national_id: self.national_id.clone(),
            mobile_no: self.mobile_no.clone(),
            physical_address: self.physical_address.clone(),
            amount_guaranteed: self.amount_guaranteed.unwrap_or(0.0),
            added_date,
            relationship: self.relationship,
            status: self.status.unwrap_or(1),
        }
    }
}

/// Guarantor with its relationship name resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuarantorSummary {
    pub uid: i32,
    pub guarantor_name: String,
    pub customer_id: i32,
    pub mobile_no: String,
    pub national_id: String,
    pub physical_address: String,
    pub amount_guaranteed: f64,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub added_date: Option<NaiveDateTime>,
    pub relationship: Option<String>,
    pub status: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> GuarantorInput {
        GuarantorInput {
            uid: 0,
            guarantor_name: " Peter Kamau ".into(),
            customer_id: 12,
            mobile_no: "0722000111".into(),
            national_id: "23456789".into(),
            physical_address: "Nakuru town".into(),
            amount_guaranteed: Some(15000.0),
            relationship: 2,
            status: None,
        }
    }

    #[test]
    fn valid_after_tidy() {
        let mut i = input();
        i.tidy();
        assert_eq!(i.guarantor_name, "Peter Kamau");
        assert!(i.validate().is_ok());
    }

    #[test]
    fn negative_amount_rejected() {
        let mut i = input();
        i.amount_guaranteed = Some(-1.0);
        assert!(matches!(i.validate(), Err(LenderError::Validation(_))));
    }

    #[test]
    fn to_guarantor_defaults_status_active() {
        let g = input().to_guarantor(None);
        assert_eq!(g.status, 1);
        assert_eq!(g.amount_guaranteed, 15000.0);
    }
}
