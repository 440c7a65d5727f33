//! Integration tests for report snapshots
//!
//! Covers the build/persist/read-back cycle and the all-or-nothing failure
//! behavior of report generation.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use salesboard::analytics::{AggregationEngine, AggregationError, ReportBuilder, ReportError};
use salesboard::models::{
    Category, CustomerType, FactView, FilterSpec, NewCustomer, NewProduct, NewReport, NewSale,
    Region, Report, ReportSummary, SaleStatus,
};
use salesboard::storage::{
    CachedStorage, FactQuery, FactStore, ReportStore, SqliteStorage, Storage, StorageError,
    StorageResult,
};
use std::sync::Arc;
use std::time::Duration;

/// Helper to create test storage
async fn create_test_storage() -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn filter() -> FilterSpec {
    FilterSpec::for_range(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap(),
    )
    .unwrap()
}

/// Twelve products with distinct revenues, all sold to one customer.
async fn load_sales(storage: &SqliteStorage) {
    let customer = storage
        .insert_customer(&NewCustomer {
            name: "Northwind".to_string(),
            email: "orders@northwind.test".to_string(),
            region: Region::NorthAmerica,
            customer_type: CustomerType::Enterprise,
        })
        .await
        .unwrap();

    for i in 1..=12u32 {
        let price = dec!(10.25) * rust_decimal::Decimal::from(i);
        let product = storage
            .insert_product(&NewProduct {
                name: format!("Widget {i}"),
                category: if i % 2 == 0 {
                    Category::Electronics
                } else {
                    Category::Automotive
                },
                price,
                description: None,
                in_stock: true,
            })
            .await
            .unwrap();

        let sale = NewSale::new(
            customer,
            product,
            1,
            price,
            Utc.with_ymd_and_hms(2024, 6, i, 14, 30, 0).unwrap(),
            Region::NorthAmerica,
            SaleStatus::Completed,
        )
        .unwrap();
        storage.insert_sale(sale).await.unwrap();
    }
}

struct UnavailableFacts;

#[async_trait]
impl FactStore for UnavailableFacts {
    async fn query_facts(&self, _query: &FactQuery) -> StorageResult<Vec<FactView>> {
        Err(StorageError::Other(anyhow::anyhow!("connection refused")))
    }
}

struct ReadOnlyReports;

#[async_trait]
impl ReportStore for ReadOnlyReports {
    async fn save_report(&self, _report: NewReport) -> StorageResult<Report> {
        Err(StorageError::Other(anyhow::anyhow!("disk full")))
    }

    async fn get_report(&self, _id: i64) -> StorageResult<Option<Report>> {
        Ok(None)
    }

    async fn list_reports(&self, _limit: i64, _offset: i64) -> StorageResult<Vec<ReportSummary>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_report_round_trip() {
    let storage = create_test_storage().await;
    load_sales(&storage).await;

    let engine = AggregationEngine::new(storage.clone(), Duration::from_secs(5));
    let builder = ReportBuilder::new(engine.clone(), storage.clone());

    // The report breadth stays at ten whatever limit the caller asked for.
    let filter = filter().with_limit(3);
    let report = builder.build(&filter).await.unwrap();

    assert!(report.id > 0);
    assert_eq!(report.date_range.start_date, filter.start_date());
    assert_eq!(report.date_range.end_date, filter.end_date());
    assert_eq!(report.top_products.len(), 10);
    assert_eq!(report.top_products[0].name, "Widget 12");
    assert_eq!(report.top_customers.len(), 1);
    assert_eq!(report.region_stats.len(), 1);
    assert_eq!(report.sales_by_date.len(), 12);

    let stored = storage.get_report(report.id).await.unwrap().unwrap();
    assert_eq!(stored, report);

    assert_eq!(stored.overview(), engine.overview(&filter).await.unwrap());
    assert_eq!(
        stored.top_products,
        engine.top_products(&filter.with_limit(10)).await.unwrap()
    );
    assert_eq!(stored.total_revenue, dec!(799.50));
    assert_eq!(stored.total_sales, 12);
}

#[tokio::test]
async fn test_reports_listed_newest_first() {
    let storage = create_test_storage().await;
    load_sales(&storage).await;

    let engine = AggregationEngine::new(storage.clone(), Duration::from_secs(5));
    let builder = ReportBuilder::new(engine, storage.clone());

    let first = builder.build(&filter()).await.unwrap();
    let second = builder
        .build(&filter().with_region(Some(Region::Europe)))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);

    let listed = storage.list_reports(10, 0).await.unwrap();
    assert_eq!(
        listed.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
    assert_eq!(listed[1], first.summary());
    assert_eq!(listed[0].total_sales, 0);

    let paged = storage.list_reports(1, 1).await.unwrap();
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].id, first.id);
}

#[tokio::test]
async fn test_failed_aggregation_persists_nothing() {
    let storage = create_test_storage().await;
    let engine = AggregationEngine::new(Arc::new(UnavailableFacts), Duration::from_secs(5));
    let builder = ReportBuilder::new(engine, storage.clone());

    let err = builder.build(&filter()).await.unwrap_err();
    assert!(matches!(
        err,
        ReportError::Aggregation(AggregationError::SourceUnavailable(_))
    ));
    assert!(storage.list_reports(10, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_write_yields_no_id() {
    let storage = create_test_storage().await;
    load_sales(&storage).await;

    let engine = AggregationEngine::new(storage.clone(), Duration::from_secs(5));
    let builder = ReportBuilder::new(engine, Arc::new(ReadOnlyReports));

    let err = builder.build(&filter()).await.unwrap_err();
    assert!(matches!(err, ReportError::Persistence(_)));
}

#[tokio::test]
async fn test_cached_storage_serves_reports() {
    let backend = create_test_storage().await;
    load_sales(&backend).await;
    let storage = Arc::new(CachedStorage::new(backend.clone(), 100, 60));

    let engine = AggregationEngine::new(storage.clone(), Duration::from_secs(5));
    let builder = ReportBuilder::new(engine, storage.clone());
    let report = builder.build(&filter()).await.unwrap();

    let cached = storage.get_report(report.id).await.unwrap().unwrap();
    assert_eq!(cached, report);
    assert_eq!(
        backend.get_report(report.id).await.unwrap().as_ref(),
        Some(&report)
    );
    assert!(storage.get_report(report.id + 1).await.unwrap().is_none());
}
