//! Column encodings shared by the SQL backends.
//!
//! Timestamps are Unix milliseconds. Report sections are JSON text.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use std::str::FromStr;

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| anyhow!("timestamp out of range: {millis}"))
}

/// Current time truncated to what the store can hold, so a freshly saved
/// report compares equal to the one read back.
pub(crate) fn now_millis() -> Result<DateTime<Utc>> {
    from_millis(to_millis(Utc::now()))
}

pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .with_context(|| format!("invalid value in column {column}"))
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("invalid decimal in column {column}"))
}

pub(crate) fn to_quantity(value: i64) -> Result<u32> {
    u32::try_from(value).context("sale quantity out of range")
}

pub(crate) fn to_count(value: i64) -> Result<u64> {
    u64::try_from(value).context("count out of range")
}

pub(crate) fn encode_section<T: Serialize>(section: &T) -> Result<String> {
    serde_json::to_string(section).context("failed to encode report section")
}

pub(crate) fn decode_section<T: DeserializeOwned>(column: &str, json: &str) -> Result<T> {
    serde_json::from_str(json).with_context(|| format!("failed to decode report column {column}"))
}
