//! Aggregation outputs. Monetary fields are rounded to two decimals when the
//! result is built and serialize as JSON numbers.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Category, CustomerType, Region};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub total_sales: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_order_value: Decimal,
}

impl OverviewResult {
    pub fn empty() -> Self {
        Self {
            total_revenue: Decimal::ZERO,
            total_sales: 0,
            avg_order_value: Decimal::ZERO,
        }
    }
}

/// Ranked product row. `total_sales` is the number of units sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub rank: u32,
    pub product_id: i64,
    pub name: String,
    pub category: Category,
    pub total_sales: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub rank: u32,
    pub customer_id: i64,
    pub name: String,
    pub customer_type: CustomerType,
    pub order_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRow {
    pub region: Region,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    pub sales_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_order_value: Decimal,
}

/// One calendar day (UTC) with at least one matching sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    pub sales_count: u64,
}
