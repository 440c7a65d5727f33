use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Category, FactView, FilterSpec, NewCustomer, NewProduct, NewReport, NewSale, Region, Report,
    ReportSummary, SaleFact,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("customer email already exists")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Other(err.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which related rows to enrich each fact with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Join {
    pub product: bool,
    pub customer: bool,
}

/// Selection handed to a [`FactStore`].
///
/// Only `completed` sales are ever selected. Joins are inner joins: a sale
/// whose product (or customer) row is missing is dropped from a joined query.
/// A category constraint always implies the product join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactQuery {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub region: Option<Region>,
    pub category: Option<Category>,
    pub join: Join,
}

impl FactQuery {
    /// Date range of `filter` only; region and category are opted into.
    pub fn dates_of(filter: &FilterSpec) -> Self {
        Self {
            start_date: filter.start_date(),
            end_date: filter.end_date(),
            region: None,
            category: None,
            join: Join::default(),
        }
    }

    pub fn region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    pub fn join_product(mut self) -> Self {
        self.join.product = true;
        self
    }

    pub fn join_customer(mut self) -> Self {
        self.join.customer = true;
        self
    }

    pub fn needs_product(&self) -> bool {
        self.join.product || self.category.is_some()
    }

    pub fn needs_customer(&self) -> bool {
        self.join.customer
    }
}

/// Read side of the sale facts.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Facts matching `query`, ordered by sale date then id.
    async fn query_facts(&self, query: &FactQuery) -> StorageResult<Vec<FactView>>;
}

/// Append-only report persistence.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Write a snapshot; `id` and `created_at` are assigned here.
    async fn save_report(&self, report: NewReport) -> StorageResult<Report>;

    async fn get_report(&self, id: i64) -> StorageResult<Option<Report>>;

    /// Newest first.
    async fn list_reports(&self, limit: i64, offset: i64) -> StorageResult<Vec<ReportSummary>>;
}

#[async_trait]
pub trait Storage: FactStore + ReportStore {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> anyhow::Result<()>;

    async fn insert_customer(&self, customer: &NewCustomer) -> StorageResult<i64>;

    async fn insert_product(&self, product: &NewProduct) -> StorageResult<i64>;

    async fn insert_sale(&self, sale: NewSale) -> StorageResult<SaleFact>;

    /// Remove all customers, products and sales. Reports are kept.
    async fn clear_facts(&self) -> anyhow::Result<()>;
}
