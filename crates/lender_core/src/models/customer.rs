use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::LenderError;
use crate::validation::{is_numeric, is_valid_email, Checks};

pub mod status {
    pub const DELETED: i32 = 0;
    pub const ACTIVE: i32 = 1;
    pub const BLOCKED: i32 = 2;
    pub const LEAD: i32 = 3;
    pub const DRAFT: i32 = 4;

    pub fn name(code: i32) -> &'static str {
        match code {
            DELETED => "Deleted",
            ACTIVE => "Active",
            BLOCKED => "Blocked",
            LEAD => "Lead",
            DRAFT => "Draft",
            _ => "Unknown",
        }
    }
}

/// Telecom providers known to the platform.
pub mod provider {
    pub const SAFARICOM_KE: i32 = 1;
    pub const MTN_UG: i32 = 4;
}

/// A row of `o_customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub uid: i32,
    pub customer_code: String,
    pub full_name: String,
    pub primary_mobile: String,
    pub phone_number_provider: i32,
    pub enc_phone: String,
    pub email_address: String,
    pub physical_address: String,
    pub geolocation: String,
    pub town: i32,
    pub passport_photo: String,
    pub national_id: String,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub added_by: i32,
    pub current_agent: i32,
    pub added_date: Option<NaiveDateTime>,
    pub branch: i32,
    pub primary_product: i32,
    pub loan_limit: f64,
    pub flag: i32,
    pub total_loans: i32,
    pub status: i32,
}

/// Body of `POST /customers` and `PUT /customers`.
///
/// On update, absent optional fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    pub uid: i32,
    pub full_name: String,
    pub primary_mobile: String,
    pub phone_number_provider: Option<i32>,
    pub email_address: Option<String>,
    pub physical_address: String,
    pub geolocation: Option<String>,
    pub town: Option<i32>,
    pub passport_photo: Option<String>,
    pub national_id: Option<String>,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub branch: i32,
    pub primary_product: i32,
    pub loan_limit: Option<f64>,
    pub status: Option<i32>,
}

impl CustomerInput {
    /// Trim free-text fields in place.
    pub fn tidy(&mut self) {
        self.full_name = self.full_name.trim().to_string();
        self.physical_address = self.physical_address.trim().to_string();
        for field in [
            &mut self.email_address,
            &mut self.national_id,
            &mut self.geolocation,
            &mut self.passport_photo,
        ] {
            if let Some(v) = field.as_mut() {
                *v = v.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<(), LenderError> {
        let mut checks = Checks::new();
        checks
            .length("fullName", &self.full_name, 3, 50)
            .check(
                is_numeric(&self.primary_mobile)
                    && (10..=12).contains(&self.primary_mobile.len()),
                "primaryMobile",
                "must be 10 to 12 digits",
            )
            .length("physicalAddress", &self.physical_address, 3, 1000)
            .check(
                self.gender == "M" || self.gender == "F",
                "gender",
                "must be one of M F",
            )
            .check(self.branch >= 1, "branch", "must be at least 1")
            .check(
                self.primary_product >= 1,
                "primaryProduct",
                "must be at least 1",
            );
        if let Some(p) = self.phone_number_provider {
            checks.check(
                p == 0 || (provider::SAFARICOM_KE..=provider::MTN_UG).contains(&p),
                "phoneNumberProvider",
                "must be one of 1 2 3 4",
            );
        }
        if let Some(email) = self.email_address.as_deref().filter(|e| !e.is_empty()) {
            checks.check(is_valid_email(email), "emailAddress", "must be a valid email");
        }
        if let Some(id) = self.national_id.as_deref().filter(|v| !v.is_empty()) {
            checks.check(
                is_numeric(id) && id.len() >= 6,
                "nationalId",
                "must be at least 6 digits",
            );
        }
        if let Some(limit) = self.loan_limit {
            checks.check(limit == 0.0 || limit >= 1.0, "loanLimit", "must be at least 1");
        }
        if let Some(s) = self.status {
            checks.check(
                (status::DELETED..=status::DRAFT).contains(&s),
                "status",
                "must be one of 0 1 2 3 4",
            );
        }
        checks.finish()
    }

    /// Build a fresh record. Server-managed fields are filled by the caller.
    pub fn into_new_customer(self) -> Customer {
        Customer {
            uid: 0,
            customer_code: String::new(),
            full_name: self.full_name,
            primary_mobile: self.primary_mobile,
            phone_number_provider: self
                .phone_number_provider
                .filter(|p| *p > 0)
                .unwrap_or(provider::SAFARICOM_KE),
            enc_phone: String::new(),
            email_address: self.email_address.unwrap_or_default(),
            physical_address: self.physical_address,
            geolocation: self.geolocation.unwrap_or_default(),
            town: self.town.unwrap_or(0),
            passport_photo: self.passport_photo.unwrap_or_default(),
            national_id: self.national_id.unwrap_or_default(),
            gender: self.gender,
            dob: self.dob,
            added_by: 0,
            current_agent: 0,
            added_date: None,
            branch: self.branch,
            primary_product: self.primary_product,
            loan_limit: self.loan_limit.unwrap_or(0.0),
            flag: 0,
            total_loans: 0,
            status: self.status.unwrap_or(status::LEAD),
        }
    }

    /// Overlay this input on a stored record.
    pub fn apply_to(&self, existing: &Customer) -> Customer {
        let mut next = existing.clone();
        next.full_name = self.full_name.clone();
        next.primary_mobile = self.primary_mobile.clone();
        next.physical_address = self.physical_address.clone();
        next.gender = self.gender.clone();
        next.branch = self.branch;
        next.primary_product = self.primary_product;
        if let Some(p) = self.phone_number_provider.filter(|p| *p > 0) {
            next.phone_number_provider = p;
        }
        if let Some(v) = self.email_address.clone() {
            next.email_address = v;
        }
        if let Some(v) = self.geolocation.clone() {
            next.geolocation = v;
        }
        if let Some(v) = self.town {
            next.town = v;
        }
        if let Some(v) = self.passport_photo.clone() {
            next.passport_photo = v;
        }
        if let Some(v) = self.national_id.clone() {
            next.national_id = v;
        }
        if self.dob.is_some() {
            next.dob = self.dob;
        }
        if let Some(v) = self.loan_limit {
            next.loan_limit = v;
        }
        if let Some(v) = self.status {
            next.status = v;
        }
        next
    }
}

/// Row of the customer list, with lookup names resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub uid: i32,
    pub passport_photo: String,
    pub full_name: String,
    pub agent: Option<String>,
    pub email_address: String,
    pub primary_mobile: String,
    pub branch: Option<String>,
    pub physical_address: String,
    pub status: Option<String>,
}

/// Single-customer view, with lookup names resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    pub uid: i32,
    pub passport_photo: String,
    pub full_name: String,
    pub gender: String,
    pub dob: Option<NaiveDate>,
    pub national_id: String,
    pub added_by: Option<String>,
    pub current_co: Option<String>,
    pub current_lo: Option<String>,
    pub loan_limit: f64,
    pub email_address: String,
    pub primary_mobile: String,
    pub branch: Option<String>,
    pub physical_address: String,
    pub location_map: String,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub added_date: Option<NaiveDateTime>,
    pub product: Option<String>,
    pub total_loans: i32,
    pub status: Option<String>,
}

/// Optional equality filters on the customer list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerFilter {
    #[serde(default, deserialize_with = "crate::models::deserialize_filter_id")]
    pub branch: Option<i32>,
    #[serde(default, deserialize_with = "crate::models::deserialize_filter_id")]
    pub agent: Option<i32>,
    #[serde(default, deserialize_with = "crate::models::deserialize_filter_id")]
    pub status: Option<i32>,
}

/// Customer columns that must be unique across customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerField {
    PrimaryMobile,
    NationalId,
    EmailAddress,
}

impl CustomerField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::PrimaryMobile => "primary_mobile",
            Self::NationalId => "national_id",
            Self::EmailAddress => "email_address",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PrimaryMobile => "primary mobile",
            Self::NationalId => "national id",
            Self::EmailAddress => "email address",
        }
    }

    pub fn value_of<'a>(&self, c: &'a Customer) -> &'a str {
        match self {
            Self::PrimaryMobile => &c.primary_mobile,
            Self::NationalId => &c.national_id,
            Self::EmailAddress => &c.email_address,
        }
    }
}

/// Lookup key for a single customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerKey {
    Uid(i32),
    PrimaryMobile(String),
}

/// How a free-text search term is matched against customers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerSearch {
    /// Exact primary mobile.
    Mobile(String),
    /// Exact uid.
    Uid(i64),
    /// Substring of the full name.
    Name(String),
    /// Substring of uid, mobile, or name.
    Any(String),
}

impl CustomerSearch {
    pub fn classify(term: &str) -> Self {
        let term = term.trim();
        if !term.is_empty() && term.bytes().all(|b| b.is_ascii_digit()) {
            if term.len() == 12 && (term.starts_with("2547") || term.starts_with("2541")) {
                return Self::Mobile(term.to_string());
            }
            return match term.parse::<i64>() {
                Ok(uid) => Self::Uid(uid),
                Err(_) => Self::Any(term.to_string()),
            };
        }
        if !term.is_empty() && term.chars().all(|c| c.is_ascii_alphabetic()) {
            return Self::Name(term.to_string());
        }
        Self::Any(term.to_string())
    }
}
