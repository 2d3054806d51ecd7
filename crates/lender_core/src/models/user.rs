use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Staff member as shown in the user list and detail views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffUser {
    pub uid: i32,
    pub name: String,
    pub email: String,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub join_date: Option<NaiveDateTime>,
    pub user_group: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default, deserialize_with = "crate::models::deserialize_filter_id")]
    pub user_group: Option<i32>,
    #[serde(default, deserialize_with = "crate::models::deserialize_filter_id")]
    pub branch: Option<i32>,
    #[serde(default, deserialize_with = "crate::models::deserialize_filter_id")]
    pub status: Option<i32>,
}

/// Response of `GET /users/auth`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub uid: i32,
    pub name: String,
    pub email: String,
    pub branch: i32,
    pub user_group: i32,
    pub user_group_name: Option<String>,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn new(principal: &Principal, user_group_name: Option<String>) -> Self {
        Self {
            uid: principal.uid,
            name: principal.name.clone(),
            email: principal.email.clone(),
            branch: principal.branch,
            user_group: principal.user_group,
            user_group_name,
            is_admin: principal.is_admin(),
        }
    }
}
