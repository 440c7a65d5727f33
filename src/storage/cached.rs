use crate::models::{FactView, NewCustomer, NewProduct, NewReport, NewSale, Report, ReportSummary, SaleFact};
use crate::storage::{FactQuery, FactStore, ReportStore, Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Storage wrapper that caches report reads.
///
/// Reports are never updated once written, so cached entries never go stale;
/// the TTL only bounds memory. Fact queries always go to the inner store.
pub struct CachedStorage {
    inner: Arc<dyn Storage>,
    report_cache: Cache<i64, Arc<Report>>,
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn Storage>, max_cache_entries: u64, ttl_secs: u64) -> Self {
        let report_cache = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            report_cache,
        }
    }

    pub fn cached_reports(&self) -> u64 {
        self.report_cache.entry_count()
    }
}

#[async_trait]
impl FactStore for CachedStorage {
    async fn query_facts(&self, query: &FactQuery) -> StorageResult<Vec<FactView>> {
        self.inner.query_facts(query).await
    }
}

#[async_trait]
impl ReportStore for CachedStorage {
    async fn save_report(&self, report: NewReport) -> StorageResult<Report> {
        let saved = self.inner.save_report(report).await?;

        self.report_cache
            .insert(saved.id, Arc::new(saved.clone()))
            .await;

        Ok(saved)
    }

    async fn get_report(&self, id: i64) -> StorageResult<Option<Report>> {
        if let Some(cached) = self.report_cache.get(&id).await {
            return Ok(Some(cached.as_ref().clone()));
        }

        // Misses are not cached: the id may be assigned later.
        let result = self.inner.get_report(id).await?;
        if let Some(ref report) = result {
            self.report_cache
                .insert(id, Arc::new(report.clone()))
                .await;
        }

        Ok(result)
    }

    async fn list_reports(&self, limit: i64, offset: i64) -> StorageResult<Vec<ReportSummary>> {
        self.inner.list_reports(limit, offset).await
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> StorageResult<i64> {
        self.inner.insert_customer(customer).await
    }

    async fn insert_product(&self, product: &NewProduct) -> StorageResult<i64> {
        self.inner.insert_product(product).await
    }

    async fn insert_sale(&self, sale: NewSale) -> StorageResult<SaleFact> {
        self.inner.insert_sale(sale).await
    }

    async fn clear_facts(&self) -> Result<()> {
        self.inner.clear_facts().await
    }
}
