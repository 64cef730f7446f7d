//! Serde helpers for the loosely typed values Proxer sends.
//!
//! Numbers and flags arrive either as JSON numbers or as strings, depending
//! on the endpoint.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Loose {
    fn into_text(self) -> String {
        match self {
            Loose::Bool(b) => if b { "1" } else { "0" }.to_owned(),
            Loose::Int(n) => n.to_string(),
            Loose::UInt(n) => n.to_string(),
            Loose::Float(n) => n.to_string(),
            Loose::Str(s) => s,
        }
    }
}

/// `1`, `"1"` and `true` are true; `0`, `"0"`, `""` and `false` are false.
pub fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Loose::deserialize(deserializer)? {
        Loose::Bool(b) => Ok(b),
        Loose::Int(n) => Ok(n != 0),
        Loose::UInt(n) => Ok(n != 0),
        Loose::Float(n) => Ok(n != 0.0),
        Loose::Str(s) => match s.trim() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(de::Error::custom(format!("not a flag: {other}"))),
        },
    }
}

/// Inverted flag, used for the `error` field of envelopes: `0` means success.
pub fn inverted<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    truthy(deserializer).map(|b| !b)
}

/// A number that may be sent as a string.
pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let text = Loose::deserialize(deserializer)?.into_text();
    text.trim().parse().map_err(de::Error::custom)
}

/// Like [`number`], but `null`, a missing value or `""` give `None`.
pub fn opt_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(value) => {
            let text = value.into_text();
            if text.trim().is_empty() {
                Ok(None)
            } else {
                text.trim().parse().map(Some).map_err(de::Error::custom)
            }
        }
    }
}

/// Any scalar rendered as a string.
pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<Loose>::deserialize(deserializer)?
        .map(Loose::into_text)
        .unwrap_or_default())
}

/// Unix timestamp in seconds.
pub fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let secs: i64 = number(deserializer)?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}")))
}

/// Space separated words, e.g. genres.
pub fn words<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(text(deserializer)?
        .split_whitespace()
        .map(str::to_owned)
        .collect())
}
