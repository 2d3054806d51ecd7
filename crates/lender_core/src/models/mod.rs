//! Entity shapes read from and written to the lender schema.

pub mod contact;
pub mod conversation;
pub mod customer;
pub mod guarantor;
pub mod paging;
pub mod referee;
pub mod user;
pub mod vintage;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serializer};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `2024-04-01 10:48:08` rather than the ISO `T` form.
pub fn serialize_datetime<S: Serializer>(
    value: &Option<NaiveDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.serialize_str(&dt.format(DATETIME_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

/// List filter ids from the query string. Zero, blank and non-numeric values
/// all mean "no filter".
pub fn deserialize_filter_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i32>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|v| v.trim().parse::<i32>().ok())
        .filter(|v| *v != 0))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Stamp {
        #[serde(serialize_with = "super::serialize_datetime")]
        at: Option<chrono::NaiveDateTime>,
    }

    #[test]
    fn datetime_has_space_separator() {
        let at = NaiveDate::from_ymd_opt(2024, 4, 1)
            .and_then(|d| d.and_hms_opt(10, 48, 8));
        let json = serde_json::to_value(Stamp { at }).unwrap();
        assert_eq!(json["at"], "2024-04-01 10:48:08");
    }

    #[test]
    fn missing_datetime_is_null() {
        let json = serde_json::to_value(Stamp { at: None }).unwrap();
        assert!(json["at"].is_null());
    }

    #[derive(serde::Deserialize)]
    struct Filter {
        #[serde(default, deserialize_with = "super::deserialize_filter_id")]
        branch: Option<i32>,
    }

    #[test]
    fn filter_id_is_lenient() {
        let parse = |json: &str| serde_json::from_str::<Filter>(json).unwrap().branch;
        assert_eq!(parse(r#"{"branch": "7"}"#), Some(7));
        assert_eq!(parse(r#"{"branch": "0"}"#), None);
        assert_eq!(parse(r#"{"branch": "abc"}"#), None);
        assert_eq!(parse(r#"{"branch": ""}"#), None);
        assert_eq!(parse("{}"), None);
    }
}
