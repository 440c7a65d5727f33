use crate::models::{
    Category, CustomerInfo, CustomerType, DateRange, FactView, NewCustomer, NewProduct, NewReport,
    NewSale, ProductInfo, Region, Report, ReportSummary, SaleFact, SaleStatus,
};
use crate::storage::rows::{
    decode_section, encode_section, from_millis, now_millis, parse_column, to_count, to_millis,
    to_quantity,
};
use crate::storage::{FactQuery, FactStore, ReportStore, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn fact_from_row(row: &PgRow, query: &FactQuery) -> Result<FactView> {
    let sale = SaleFact::restore(
        row.try_get("id")?,
        row.try_get("customer_id")?,
        row.try_get("product_id")?,
        to_quantity(i64::from(row.try_get::<i32, _>("quantity")?))?,
        row.try_get::<Decimal, _>("unit_price")?,
        row.try_get::<Decimal, _>("total_amount")?,
        from_millis(row.try_get("sale_date")?)?,
        parse_column::<Region>("region", row.try_get("region")?)?,
        parse_column::<SaleStatus>("status", row.try_get("status")?)?,
    );

    let product = if query.needs_product() {
        Some(ProductInfo {
            name: row.try_get("product_name")?,
            category: parse_column::<Category>("category", row.try_get("product_category")?)?,
        })
    } else {
        None
    };

    let customer = if query.needs_customer() {
        Some(CustomerInfo {
            name: row.try_get("customer_name")?,
            customer_type: parse_column::<CustomerType>(
                "customer_type",
                row.try_get("customer_type")?,
            )?,
        })
    } else {
        None
    };

    Ok(FactView {
        sale,
        product,
        customer,
    })
}

fn summary_from_row(row: &PgRow) -> Result<ReportSummary> {
    Ok(ReportSummary {
        id: row.try_get("id")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        date_range: DateRange {
            start_date: from_millis(row.try_get("start_date")?)?,
            end_date: from_millis(row.try_get("end_date")?)?,
        },
        total_revenue: row.try_get("total_revenue")?,
        total_sales: to_count(row.try_get("total_sales")?)?,
        avg_order_value: row.try_get("avg_order_value")?,
    })
}

fn report_from_row(row: &PgRow) -> Result<Report> {
    let summary = summary_from_row(row)?;
    Ok(Report {
        id: summary.id,
        created_at: summary.created_at,
        date_range: summary.date_range,
        total_revenue: summary.total_revenue,
        total_sales: summary.total_sales,
        avg_order_value: summary.avg_order_value,
        top_products: decode_section("top_products", row.try_get("top_products")?)?,
        top_customers: decode_section("top_customers", row.try_get("top_customers")?)?,
        region_stats: decode_section("region_stats", row.try_get("region_stats")?)?,
        sales_by_date: decode_section("sales_by_date", row.try_get("sales_by_date")?)?,
    })
}

#[async_trait]
impl FactStore for PostgresStorage {
    async fn query_facts(&self, query: &FactQuery) -> StorageResult<Vec<FactView>> {
        let mut columns = String::from(
            "s.id, s.customer_id, s.product_id, s.quantity, s.unit_price, s.total_amount, \
             s.sale_date, s.region, s.status",
        );
        let mut joins = String::new();
        let mut conditions =
            String::from("s.status = 'completed' AND s.sale_date >= $1 AND s.sale_date <= $2");
        let mut next_param = 3;

        if query.needs_product() {
            columns.push_str(", p.name AS product_name, p.category AS product_category");
            joins.push_str(" JOIN products p ON p.id = s.product_id");
        }
        if query.needs_customer() {
            columns.push_str(", c.name AS customer_name, c.customer_type AS customer_type");
            joins.push_str(" JOIN customers c ON c.id = s.customer_id");
        }
        if query.region.is_some() {
            conditions.push_str(&format!(" AND s.region = ${next_param}"));
            next_param += 1;
        }
        if query.category.is_some() {
            conditions.push_str(&format!(" AND p.category = ${next_param}"));
        }

        let sql = format!(
            "SELECT {columns} FROM sales s{joins} WHERE {conditions} ORDER BY s.sale_date, s.id"
        );

        let mut statement = sqlx::query(&sql)
            .bind(to_millis(query.start_date))
            .bind(to_millis(query.end_date));
        if let Some(region) = query.region {
            statement = statement.bind(region.as_str());
        }
        if let Some(category) = query.category {
            statement = statement.bind(category.as_str());
        }

        let rows = statement.fetch_all(self.pool.as_ref()).await?;

        rows.iter()
            .map(|row| fact_from_row(row, query).map_err(StorageError::Other))
            .collect()
    }
}

#[async_trait]
impl ReportStore for PostgresStorage {
    async fn save_report(&self, report: NewReport) -> StorageResult<Report> {
        let created_at = now_millis()?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO reports (
                created_at, start_date, end_date, total_revenue, total_sales, avg_order_value,
                top_products, top_customers, region_stats, sales_by_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(to_millis(created_at))
        .bind(to_millis(report.date_range.start_date))
        .bind(to_millis(report.date_range.end_date))
        .bind(report.overview.total_revenue)
        .bind(report.overview.total_sales as i64)
        .bind(report.overview.avg_order_value)
        .bind(encode_section(&report.top_products)?)
        .bind(encode_section(&report.top_customers)?)
        .bind(encode_section(&report.region_stats)?)
        .bind(encode_section(&report.sales_by_date)?)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(Report::from_new(id, created_at, report))
    }

    async fn get_report(&self, id: i64) -> StorageResult<Option<Report>> {
        let row = sqlx::query(
            r#"
            SELECT id, created_at, start_date, end_date, total_revenue, total_sales,
                   avg_order_value, top_products, top_customers, region_stats, sales_by_date
            FROM reports
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref()
            .map(report_from_row)
            .transpose()
            .map_err(StorageError::Other)
    }

    async fn list_reports(&self, limit: i64, offset: i64) -> StorageResult<Vec<ReportSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, created_at, start_date, end_date, total_revenue, total_sales, avg_order_value
            FROM reports
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| summary_from_row(row).map_err(StorageError::Other))
            .collect()
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                region TEXT NOT NULL,
                customer_type TEXT NOT NULL,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                price NUMERIC NOT NULL CHECK (price >= 0),
                description TEXT,
                in_stock BOOLEAN NOT NULL DEFAULT TRUE,
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sales (
                id BIGSERIAL PRIMARY KEY,
                customer_id BIGINT NOT NULL,
                product_id BIGINT NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity >= 1),
                unit_price NUMERIC NOT NULL CHECK (unit_price >= 0),
                total_amount NUMERIC NOT NULL,
                sale_date BIGINT NOT NULL,
                region TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'completed',
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        for index in [
            "CREATE INDEX IF NOT EXISTS idx_sales_sale_date ON sales(sale_date)",
            "CREATE INDEX IF NOT EXISTS idx_sales_customer_id ON sales(customer_id)",
            "CREATE INDEX IF NOT EXISTS idx_sales_product_id ON sales(product_id)",
            "CREATE INDEX IF NOT EXISTS idx_sales_region ON sales(region)",
        ] {
            sqlx::query(index).execute(self.pool.as_ref()).await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id BIGSERIAL PRIMARY KEY,
                created_at BIGINT NOT NULL,
                start_date BIGINT NOT NULL,
                end_date BIGINT NOT NULL,
                total_revenue NUMERIC NOT NULL,
                total_sales BIGINT NOT NULL,
                avg_order_value NUMERIC NOT NULL,
                top_products TEXT NOT NULL,
                top_customers TEXT NOT NULL,
                region_stats TEXT NOT NULL,
                sales_by_date TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> StorageResult<i64> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO customers (name, email, region, customer_type, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(customer.name.trim())
        .bind(customer.email.to_lowercase())
        .bind(customer.region.as_str())
        .bind(customer.customer_type.as_str())
        .bind(to_millis(Utc::now()))
        .fetch_optional(self.pool.as_ref())
        .await?;

        id.ok_or(StorageError::Conflict)
    }

    async fn insert_product(&self, product: &NewProduct) -> StorageResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, category, price, description, in_stock, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(product.name.trim())
        .bind(product.category.as_str())
        .bind(product.price)
        .bind(product.description.as_deref())
        .bind(product.in_stock)
        .bind(to_millis(Utc::now()))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(id)
    }

    async fn insert_sale(&self, sale: NewSale) -> StorageResult<SaleFact> {
        let quantity = i32::try_from(sale.quantity())
            .map_err(|e| StorageError::Other(anyhow::anyhow!("quantity out of range: {e}")))?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales (
                customer_id, product_id, quantity, unit_price, total_amount,
                sale_date, region, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(sale.customer_id())
        .bind(sale.product_id())
        .bind(quantity)
        .bind(sale.unit_price())
        .bind(sale.total_amount())
        .bind(to_millis(sale.sale_date()))
        .bind(sale.region().as_str())
        .bind(sale.status().as_str())
        .bind(to_millis(Utc::now()))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(sale.with_id(id))
    }

    async fn clear_facts(&self) -> Result<()> {
        sqlx::query("TRUNCATE sales, products, customers RESTART IDENTITY")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
