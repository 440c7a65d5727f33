//! Report snapshots

use std::sync::Arc;
use tracing::{info, warn};

use super::{AggregationEngine, AggregationError, ReportError};
use crate::models::{DateRange, FilterSpec, NewReport, Report};
use crate::storage::ReportStore;

/// Breadth of the ranked sections in a report, whatever the request limit.
pub const REPORT_TOP_N: usize = 10;

#[derive(Clone)]
pub struct ReportBuilder {
    engine: AggregationEngine,
    store: Arc<dyn ReportStore>,
}

impl ReportBuilder {
    pub fn new(engine: AggregationEngine, store: Arc<dyn ReportStore>) -> Self {
        Self { engine, store }
    }

    /// Run all five aggregations concurrently and assemble the snapshot.
    ///
    /// Fails as soon as any aggregation fails; nothing partial is returned.
    pub async fn snapshot(&self, filter: &FilterSpec) -> Result<NewReport, AggregationError> {
        let ranked = filter.with_limit(REPORT_TOP_N);

        let (overview, top_products, top_customers, region_stats, sales_by_date) = tokio::try_join!(
            self.engine.overview(filter),
            self.engine.top_products(&ranked),
            self.engine.top_customers(&ranked),
            self.engine.region_stats(filter),
            self.engine.sales_timeline(filter),
        )?;

        Ok(NewReport {
            date_range: DateRange {
                start_date: filter.start_date(),
                end_date: filter.end_date(),
            },
            overview,
            top_products,
            top_customers,
            region_stats,
            sales_by_date,
        })
    }

    /// Build a snapshot and append it to the report store.
    pub async fn build(&self, filter: &FilterSpec) -> Result<Report, ReportError> {
        let snapshot = self.snapshot(filter).await?;

        let report = self.store.save_report(snapshot).await.map_err(|err| {
            warn!(error = %err, "failed to persist report");
            ReportError::Persistence(err)
        })?;

        info!(
            report_id = report.id,
            total_sales = report.total_sales,
            "report generated"
        );
        Ok(report)
    }
}
