use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One logged customer interaction, joined with its customer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub uid: i32,
    pub full_name: String,
    pub branch: i32,
    pub transcript: String,
    #[serde(serialize_with = "crate::models::serialize_datetime")]
    pub conversation_date: Option<NaiveDateTime>,
    pub next_interaction: Option<NaiveDate>,
}
