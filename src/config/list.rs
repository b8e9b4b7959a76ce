//! Properties-style list values: either a real array or `"a, b, c"`

use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList<T> {
    List(Vec<T>),
    Csv(String),
}

/// Split a comma separated string, trimming whitespace around each item.
/// A blank string is an empty list.
pub fn parse_csv<T>(raw: &str) -> Result<Vec<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|item| {
            let item = item.trim();
            item.parse::<T>()
                .map_err(|e| format!("invalid list item '{}': {}", item, e))
        })
        .collect()
}

/// `deserialize_with` helper accepting both list forms
pub fn comma_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match RawList::<T>::deserialize(deserializer)? {
        RawList::List(items) => Ok(items),
        RawList::Csv(raw) => parse_csv(&raw).map_err(serde::de::Error::custom),
    }
}
