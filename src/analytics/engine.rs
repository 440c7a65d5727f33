//! Aggregation engine
//!
//! Every method issues exactly one fact query and reduces the rows in memory:
//! filter (done by the store), group, sort, truncate. Intermediate maps are
//! local to the call, so concurrent requests share nothing.
//!
//! Scoping rules per method:
//!
//! | method          | region filter | category filter | join     |
//! |-----------------|---------------|-----------------|----------|
//! | overview        | yes           | yes             | product* |
//! | top_products    | yes           | yes             | product  |
//! | top_customers   | yes           | no              | customer |
//! | region_stats    | no (grouped)  | no              | none     |
//! | sales_timeline  | yes           | no              | none     |
//!
//! (*) only when a category is set.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::AggregationError;
use crate::models::{
    Category, CustomerType, FactView, FilterSpec, OverviewResult, Region, RegionRow,
    TimelinePoint, TopCustomer, TopProduct,
};
use crate::storage::{FactQuery, FactStore};

/// Round a monetary value for output. Half-way cases round away from zero.
pub fn money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    money(total / Decimal::from(count))
}

#[derive(Clone)]
pub struct AggregationEngine {
    facts: Arc<dyn FactStore>,
    timeout: Duration,
}

impl AggregationEngine {
    pub fn new(facts: Arc<dyn FactStore>, timeout: Duration) -> Self {
        Self { facts, timeout }
    }

    /// Run one fact query under the engine's deadline.
    async fn fetch(&self, query: FactQuery) -> Result<Vec<FactView>, AggregationError> {
        match tokio::time::timeout(self.timeout, self.facts.query_facts(&query)).await {
            Ok(Ok(rows)) => {
                debug!(rows = rows.len(), ?query, "fetched facts");
                Ok(rows)
            }
            Ok(Err(err)) => Err(AggregationError::SourceUnavailable(err)),
            Err(_) => Err(AggregationError::Timeout(self.timeout)),
        }
    }

    pub async fn overview(&self, filter: &FilterSpec) -> Result<OverviewResult, AggregationError> {
        let query = FactQuery::dates_of(filter)
            .region(filter.region())
            .category(filter.category());
        let rows = self.fetch(query).await?;
        Ok(summarize_overview(&rows))
    }

    pub async fn top_products(
        &self,
        filter: &FilterSpec,
    ) -> Result<Vec<TopProduct>, AggregationError> {
        let query = FactQuery::dates_of(filter)
            .region(filter.region())
            .category(filter.category())
            .join_product();
        let rows = self.fetch(query).await?;
        Ok(rank_products(&rows, filter.limit()))
    }

    pub async fn top_customers(
        &self,
        filter: &FilterSpec,
    ) -> Result<Vec<TopCustomer>, AggregationError> {
        let query = FactQuery::dates_of(filter)
            .region(filter.region())
            .join_customer();
        let rows = self.fetch(query).await?;
        Ok(rank_customers(&rows, filter.limit()))
    }

    pub async fn region_stats(
        &self,
        filter: &FilterSpec,
    ) -> Result<Vec<RegionRow>, AggregationError> {
        let rows = self.fetch(FactQuery::dates_of(filter)).await?;
        Ok(group_regions(&rows))
    }

    pub async fn sales_timeline(
        &self,
        filter: &FilterSpec,
    ) -> Result<Vec<TimelinePoint>, AggregationError> {
        let query = FactQuery::dates_of(filter).region(filter.region());
        let rows = self.fetch(query).await?;
        Ok(bucket_days(&rows))
    }
}

pub fn summarize_overview(rows: &[FactView]) -> OverviewResult {
    if rows.is_empty() {
        return OverviewResult::empty();
    }

    let total_revenue: Decimal = rows.iter().map(|row| row.sale.total_amount()).sum();
    let total_sales = rows.len() as u64;

    OverviewResult {
        total_revenue: money(total_revenue),
        total_sales,
        avg_order_value: average(total_revenue, total_sales),
    }
}

struct ProductTotals {
    name: String,
    category: Category,
    units: u64,
    revenue: Decimal,
}

/// Group by product, rank by revenue (ties: lower product id first).
///
/// Name and category come from the first row seen for each product. Rows
/// without product data are ignored.
pub fn rank_products(rows: &[FactView], limit: usize) -> Vec<TopProduct> {
    let mut groups: BTreeMap<i64, ProductTotals> = BTreeMap::new();

    for row in rows {
        let Some(product) = &row.product else {
            continue;
        };
        let totals = groups
            .entry(row.sale.product_id())
            .or_insert_with(|| ProductTotals {
                name: product.name.clone(),
                category: product.category,
                units: 0,
                revenue: Decimal::ZERO,
            });
        totals.units += u64::from(row.sale.quantity());
        totals.revenue += row.sale.total_amount();
    }

    // BTreeMap yields ascending ids and the sort is stable.
    let mut ranked: Vec<(i64, ProductTotals)> = groups.into_iter().collect();
    ranked.sort_by(|a, b| b.1.revenue.cmp(&a.1.revenue));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (product_id, totals))| TopProduct {
            rank: index as u32 + 1,
            product_id,
            name: totals.name,
            category: totals.category,
            total_sales: totals.units,
            revenue: money(totals.revenue),
        })
        .collect()
}

struct CustomerTotals {
    name: String,
    customer_type: CustomerType,
    orders: u64,
    spent: Decimal,
}

/// Group by customer, rank by amount spent (ties: lower customer id first).
pub fn rank_customers(rows: &[FactView], limit: usize) -> Vec<TopCustomer> {
    let mut groups: BTreeMap<i64, CustomerTotals> = BTreeMap::new();

    for row in rows {
        let Some(customer) = &row.customer else {
            continue;
        };
        let totals = groups
            .entry(row.sale.customer_id())
            .or_insert_with(|| CustomerTotals {
                name: customer.name.clone(),
                customer_type: customer.customer_type,
                orders: 0,
                spent: Decimal::ZERO,
            });
        totals.orders += 1;
        totals.spent += row.sale.total_amount();
    }

    let mut ranked: Vec<(i64, CustomerTotals)> = groups.into_iter().collect();
    ranked.sort_by(|a, b| b.1.spent.cmp(&a.1.spent));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .enumerate()
        .map(|(index, (customer_id, totals))| TopCustomer {
            rank: index as u32 + 1,
            customer_id,
            name: totals.name,
            customer_type: totals.customer_type,
            order_count: totals.orders,
            total_spent: money(totals.spent),
        })
        .collect()
}

/// Group by region, highest revenue first (ties: region name ascending).
/// Regions without sales are absent.
pub fn group_regions(rows: &[FactView]) -> Vec<RegionRow> {
    let mut groups: HashMap<Region, (Decimal, u64)> = HashMap::new();

    for row in rows {
        let entry = groups
            .entry(row.sale.region())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += row.sale.total_amount();
        entry.1 += 1;
    }

    let mut stats: Vec<(Region, Decimal, u64)> = groups
        .into_iter()
        .map(|(region, (revenue, count))| (region, revenue, count))
        .collect();
    stats.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0.as_str().cmp(b.0.as_str()))
    });

    stats
        .into_iter()
        .map(|(region, revenue, sales_count)| RegionRow {
            region,
            revenue: money(revenue),
            sales_count,
            avg_order_value: average(revenue, sales_count),
        })
        .collect()
}

/// Bucket by UTC calendar day, oldest first. Days without sales are absent.
pub fn bucket_days(rows: &[FactView]) -> Vec<TimelinePoint> {
    let mut days = BTreeMap::new();

    for row in rows {
        let entry = days
            .entry(row.sale.sale_date().date_naive())
            .or_insert((Decimal::ZERO, 0u64));
        entry.0 += row.sale.total_amount();
        entry.1 += 1;
    }

    days.into_iter()
        .map(|(date, (revenue, sales_count))| TimelinePoint {
            date,
            revenue: money(revenue),
            sales_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerInfo, ProductInfo, SaleFact, SaleStatus};
    use crate::storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct Row {
        id: i64,
        customer: i64,
        product: i64,
        quantity: u32,
        price: Decimal,
        at: DateTime<Utc>,
        region: Region,
    }

    impl Row {
        fn view(&self) -> FactView {
            let sale = SaleFact::restore(
                self.id,
                self.customer,
                self.product,
                self.quantity,
                self.price,
                Decimal::from(self.quantity) * self.price,
                self.at,
                self.region,
                SaleStatus::Completed,
            );
            FactView {
                sale,
                product: Some(ProductInfo {
                    name: format!("Product {}", self.product),
                    category: Category::Electronics,
                }),
                customer: Some(CustomerInfo {
                    name: format!("Customer {}", self.customer),
                    customer_type: CustomerType::Individual,
                }),
            }
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn sample() -> Vec<FactView> {
        vec![
            Row { id: 1, customer: 1, product: 1, quantity: 2, price: dec!(50), at: at(1, 9), region: Region::Europe },
            Row { id: 2, customer: 1, product: 1, quantity: 1, price: dec!(50), at: at(2, 23), region: Region::Europe },
            Row { id: 3, customer: 2, product: 2, quantity: 3, price: dec!(10.10), at: at(2, 1), region: Region::Asia },
            Row { id: 4, customer: 3, product: 3, quantity: 1, price: dec!(30.30), at: at(4, 12), region: Region::Oceania },
        ]
        .iter()
        .map(Row::view)
        .collect()
    }

    #[test]
    fn test_overview_totals() {
        let overview = summarize_overview(&sample());
        assert_eq!(overview.total_revenue, dec!(210.60));
        assert_eq!(overview.total_sales, 4);
        assert_eq!(overview.avg_order_value, dec!(52.65));
    }

    #[test]
    fn test_overview_empty_is_zero() {
        assert_eq!(summarize_overview(&[]), OverviewResult::empty());
    }

    #[test]
    fn test_average_rounds_half_up() {
        assert_eq!(average(dec!(0.01), 2), dec!(0.01));
        assert_eq!(average(dec!(100), 3), dec!(33.33));
        assert_eq!(average(dec!(200), 3), dec!(66.67));
        assert_eq!(average(dec!(5), 0), Decimal::ZERO);
    }

    #[test]
    fn test_rank_products_orders_and_limits() {
        let ranked = rank_products(&sample(), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].product_id, 1);
        assert_eq!(ranked[0].total_sales, 3);
        assert_eq!(ranked[0].revenue, dec!(150));
        assert_eq!(ranked[0].rank, 1);
        // Products 2 and 3 tie on revenue.
        assert_eq!(ranked[1].product_id, 2);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_rank_ties_break_on_lower_id() {
        let rows: Vec<FactView> = [
            Row { id: 1, customer: 9, product: 9, quantity: 1, price: dec!(20), at: at(1, 0), region: Region::Africa },
            Row { id: 2, customer: 4, product: 4, quantity: 2, price: dec!(10), at: at(1, 1), region: Region::Africa },
            Row { id: 3, customer: 6, product: 6, quantity: 4, price: dec!(5), at: at(1, 2), region: Region::Africa },
        ]
        .iter()
        .map(Row::view)
        .collect();

        let products: Vec<i64> = rank_products(&rows, 10).iter().map(|p| p.product_id).collect();
        assert_eq!(products, vec![4, 6, 9]);

        let customers: Vec<i64> = rank_customers(&rows, 10).iter().map(|c| c.customer_id).collect();
        assert_eq!(customers, vec![4, 6, 9]);
    }

    #[test]
    fn test_rank_products_takes_first_seen_name() {
        let mut rows = sample();
        rows[1].product = Some(ProductInfo {
            name: "Renamed".to_string(),
            category: Category::Books,
        });

        let ranked = rank_products(&rows, 10);
        assert_eq!(ranked[0].name, "Product 1");
        assert_eq!(ranked[0].category, Category::Electronics);
    }

    #[test]
    fn test_rank_customers_counts_orders() {
        let ranked = rank_customers(&sample(), 10);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].customer_id, 1);
        assert_eq!(ranked[0].order_count, 2);
        assert_eq!(ranked[0].total_spent, dec!(150));
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].total_spent >= pair[1].total_spent));
    }

    #[test]
    fn test_group_regions() {
        let regions = group_regions(&sample());
        let names: Vec<Region> = regions.iter().map(|r| r.region).collect();
        assert_eq!(names, vec![Region::Europe, Region::Asia, Region::Oceania]);
        assert_eq!(regions[0].sales_count, 2);
        assert_eq!(regions[0].avg_order_value, dec!(75));
        assert_eq!(regions[1].revenue, dec!(30.30));
    }

    #[test]
    fn test_bucket_days_uses_utc_day_and_skips_gaps() {
        let timeline = bucket_days(&sample());
        let dates: Vec<NaiveDate> = timeline.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            ]
        );
        assert_eq!(timeline[1].sales_count, 2);
        assert_eq!(timeline[1].revenue, dec!(80.30));

        let total: Decimal = timeline.iter().map(|p| p.revenue).sum();
        assert_eq!(total, summarize_overview(&sample()).total_revenue);
    }

    struct FailingStore;

    #[async_trait]
    impl FactStore for FailingStore {
        async fn query_facts(&self, _query: &FactQuery) -> StorageResult<Vec<FactView>> {
            Err(StorageError::Other(anyhow::anyhow!("connection refused")))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl FactStore for SlowStore {
        async fn query_facts(&self, _query: &FactQuery) -> StorageResult<Vec<FactView>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        }
    }

    fn june() -> FilterSpec {
        FilterSpec::for_range(at(1, 0), at(30, 0)).unwrap()
    }

    #[tokio::test]
    async fn test_source_failure_is_reported() {
        let engine = AggregationEngine::new(Arc::new(FailingStore), Duration::from_secs(1));
        let err = engine.overview(&june()).await.unwrap_err();
        assert!(matches!(err, AggregationError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let engine = AggregationEngine::new(Arc::new(SlowStore), Duration::from_millis(20));
        let err = engine.region_stats(&june()).await.unwrap_err();
        assert!(matches!(err, AggregationError::Timeout(_)));
    }
}
