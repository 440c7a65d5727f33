use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OverviewResult, RegionRow, TimelinePoint, TopCustomer, TopProduct};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Snapshot contents before persistence. The store assigns `id` and
/// `created_at` when it writes one.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    pub date_range: DateRange,
    pub overview: OverviewResult,
    pub top_products: Vec<TopProduct>,
    pub top_customers: Vec<TopCustomer>,
    pub region_stats: Vec<RegionRow>,
    pub sales_by_date: Vec<TimelinePoint>,
}

/// Immutable persisted snapshot of a full aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub date_range: DateRange,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub total_sales: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_order_value: Decimal,
    pub top_products: Vec<TopProduct>,
    pub top_customers: Vec<TopCustomer>,
    pub region_stats: Vec<RegionRow>,
    pub sales_by_date: Vec<TimelinePoint>,
}

impl Report {
    pub fn from_new(id: i64, created_at: DateTime<Utc>, report: NewReport) -> Self {
        Self {
            id,
            created_at,
            date_range: report.date_range,
            total_revenue: report.overview.total_revenue,
            total_sales: report.overview.total_sales,
            avg_order_value: report.overview.avg_order_value,
            top_products: report.top_products,
            top_customers: report.top_customers,
            region_stats: report.region_stats,
            sales_by_date: report.sales_by_date,
        }
    }

    pub fn overview(&self) -> OverviewResult {
        OverviewResult {
            total_revenue: self.total_revenue,
            total_sales: self.total_sales,
            avg_order_value: self.avg_order_value,
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            id: self.id,
            created_at: self.created_at,
            date_range: self.date_range,
            total_revenue: self.total_revenue,
            total_sales: self.total_sales,
            avg_order_value: self.avg_order_value,
        }
    }
}

/// Report listing entry, without the ranked sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub date_range: DateRange,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub total_sales: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_order_value: Decimal,
}
