// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Field decoders for backend records. A malformed field decodes to its
//! default instead of failing the record, so one bad row never empties a list.

use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::{IgnoredAny, IntoDeserializer};
use serde::{Deserialize, Deserializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Any JSON scalar, with everything else swallowed.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(#[allow(dead_code)] IgnoredAny),
}

fn loose<'de, D>(deserializer: D) -> Result<Option<Loose>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Loose>::deserialize(deserializer)
}

pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match loose(deserializer)? {
        Some(Loose::Text(value)) => value,
        Some(Loose::Int(value)) => value.to_string(),
        Some(Loose::Float(value)) => value.to_string(),
        Some(Loose::Bool(value)) => value.to_string(),
        Some(Loose::Other(_)) | None => String::new(),
    })
}

pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match loose(deserializer)? {
        Some(Loose::Int(value)) => Some(value as f64),
        Some(Loose::Float(value)) => Some(value),
        Some(Loose::Text(value)) => value.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|value| value.is_finite()))
}

pub(crate) fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match loose(deserializer)? {
        Some(Loose::Int(value)) => Some(value),
        Some(Loose::Float(value)) => whole(value),
        Some(Loose::Text(value)) => {
            let value = value.trim();
            value
                .parse::<i64>()
                .ok()
                .or_else(|| value.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    })
}

fn whole(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value <= i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` days taken as UTC midnight.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(Loose::Text(value)) = loose(deserializer)? else {
        return Ok(None);
    };
    let value = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(Some(parsed));
    }
    Ok(Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|day| day.midnight().assume_utc()))
}

/// Unit enums by their wire name; unknown names use the enum's own fallback.
pub(crate) fn choice<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let Some(Loose::Text(value)) = loose(deserializer)? else {
        return Ok(T::default());
    };
    let name: StrDeserializer<'_, ValueError> = value.trim().into_deserializer();
    Ok(T::deserialize(name).unwrap_or_default())
}

pub(crate) fn active_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match loose(deserializer)? {
        Some(Loose::Bool(value)) => value,
        Some(Loose::Int(value)) => value != 0,
        Some(Loose::Text(value)) => !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "no"
        ),
        _ => true,
    })
}
