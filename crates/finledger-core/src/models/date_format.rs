//! Date-only wire format: `YYYY-MM-DD`.
//!
//! Input may also carry a time of day (`2001-12-12T00:00:00`), which is
//! dropped.

use serde::{de, ser, Deserialize, Deserializer, Serializer};
use time::{format_description::FormatItem, macros::format_description, Date};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn format_date(d: Date) -> Result<String, time::error::Format> {
    d.format(DATE_FORMAT)
}

pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    let s = s.trim();
    let date_part = match s.split_once(|c: char| c == 'T' || c == ' ') {
        Some((d, _)) => d,
        None => s,
    };
    Date::parse(date_part, DATE_FORMAT)
}

pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = format_date(*date).map_err(<S::Error as ser::Error>::custom)?;
    serializer.serialize_str(&s)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(&s).map_err(|e| <D::Error as de::Error>::custom(format!("invalid date '{}': {}", s, e)))
}
