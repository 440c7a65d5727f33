use crate::models::{
    Category, CustomerInfo, CustomerType, FactView, NewCustomer, NewProduct, NewReport, NewSale,
    ProductInfo, Region, Report, ReportSummary, SaleFact, SaleStatus,
};
use crate::storage::rows::{
    decode_section, encode_section, from_millis, now_millis, parse_column, parse_decimal,
    to_count, to_millis, to_quantity,
};
use crate::storage::{FactQuery, FactStore, ReportStore, Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    /// `sqlite::memory:` databases live per connection; use a single
    /// connection for them.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn fact_from_row(row: &SqliteRow, query: &FactQuery) -> Result<FactView> {
    let sale = SaleFact::restore(
        row.try_get("id")?,
        row.try_get("customer_id")?,
        row.try_get("product_id")?,
        to_quantity(row.try_get("quantity")?)?,
        parse_decimal("unit_price", row.try_get::<&str, _>("unit_price")?)?,
        parse_decimal("total_amount", row.try_get::<&str, _>("total_amount")?)?,
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

fn report_from_row(row: &SqliteRow) -> Result<Report> {
    Ok(Report {
        id: row.try_get("id")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        date_range: crate::models::DateRange {
            start_date: from_millis(row.try_get("start_date")?)?,
            end_date: from_millis(row.try_get("end_date")?)?,
        },
        total_revenue: parse_decimal("total_revenue", row.try_get::<&str, _>("total_revenue")?)?,
        total_sales: to_count(row.try_get("total_sales")?)?,
        avg_order_value: parse_decimal(
            "avg_order_value",
            row.try_get::<&str, _>("avg_order_value")?,
        )?,
        top_products: decode_section("top_products", row.try_get("top_products")?)?,
        top_customers: decode_section("top_customers", row.try_get("top_customers")?)?,
        region_stats: decode_section("region_stats", row.try_get("region_stats")?)?,
        sales_by_date: decode_section("sales_by_date", row.try_get("sales_by_date")?)?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<ReportSummary> {
    Ok(ReportSummary {
        id: row.try_get("id")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        date_range: crate::models::DateRange {
            start_date: from_millis(row.try_get("start_date")?)?,
            end_date: from_millis(row.try_get("end_date")?)?,
        },
        total_revenue: parse_decimal("total_revenue", row.try_get::<&str, _>("total_revenue")?)?,
        total_sales: to_count(row.try_get("total_sales")?)?,
        avg_order_value: parse_decimal(
            "avg_order_value",
            row.try_get::<&str, _>("avg_order_value")?,
        )?,
    })
}

#[async_trait]
impl FactStore for SqliteStorage {
    async fn query_facts(&self, query: &FactQuery) -> StorageResult<Vec<FactView>> {
        let mut columns = String::from(
            "s.id, s.customer_id, s.product_id, s.quantity, s.unit_price, s.total_amount, \
             s.sale_date, s.region, s.status",
        );
        let mut joins = String::new();
        let mut conditions =
            String::from("s.status = 'completed' AND s.sale_date >= ? AND s.sale_date <= ?");

        if query.needs_product() {
            columns.push_str(", p.name AS product_name, p.category AS product_category");
            joins.push_str(" JOIN products p ON p.id = s.product_id");
        }
        if query.needs_customer() {
            columns.push_str(", c.name AS customer_name, c.customer_type AS customer_type");
            joins.push_str(" JOIN customers c ON c.id = s.customer_id");
        }
        if query.region.is_some() {
            conditions.push_str(" AND s.region = ?");
        }
        if query.category.is_some() {
            conditions.push_str(" AND p.category = ?");
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
impl ReportStore for SqliteStorage {
    async fn save_report(&self, report: NewReport) -> StorageResult<Report> {
        let created_at = now_millis()?;

        let result = sqlx::query(
            r#"
            INSERT INTO reports (
                created_at, start_date, end_date, total_revenue, total_sales, avg_order_value,
                top_products, top_customers, region_stats, sales_by_date
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(to_millis(created_at))
        .bind(to_millis(report.date_range.start_date))
        .bind(to_millis(report.date_range.end_date))
        .bind(report.overview.total_revenue.to_string())
        .bind(report.overview.total_sales as i64)
        .bind(report.overview.avg_order_value.to_string())
        .bind(encode_section(&report.top_products)?)
        .bind(encode_section(&report.top_customers)?)
        .bind(encode_section(&report.region_stats)?)
        .bind(encode_section(&report.sales_by_date)?)
        .execute(self.pool.as_ref())
        .await?;

        Ok(Report::from_new(result.last_insert_rowid(), created_at, report))
    }

    async fn get_report(&self, id: i64) -> StorageResult<Option<Report>> {
        let row = sqlx::query(
            r#"
            SELECT id, created_at, start_date, end_date, total_revenue, total_sales,
                   avg_order_value, top_products, top_customers, region_stats, sales_by_date
            FROM reports
            WHERE id = ?
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
            LIMIT ? OFFSET ?
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
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                region TEXT NOT NULL,
                customer_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                price TEXT NOT NULL,
                description TEXT,
                in_stock INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sales (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER NOT NULL,
                product_id INTEGER NOT NULL,
                quantity INTEGER NOT NULL CHECK (quantity >= 1),
                unit_price TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                sale_date INTEGER NOT NULL,
                region TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'completed',
                created_at INTEGER NOT NULL
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
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                start_date INTEGER NOT NULL,
                end_date INTEGER NOT NULL,
                total_revenue TEXT NOT NULL,
                total_sales INTEGER NOT NULL,
                avg_order_value TEXT NOT NULL,
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
        let result = sqlx::query(
            r#"
            INSERT INTO customers (name, email, region, customer_type, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(customer.name.trim())
        .bind(customer.email.to_lowercase())
        .bind(customer.region.as_str())
        .bind(customer.customer_type.as_str())
        .bind(to_millis(Utc::now()))
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(result.last_insert_rowid())
    }

    async fn insert_product(&self, product: &NewProduct) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (name, category, price, description, in_stock, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.name.trim())
        .bind(product.category.as_str())
        .bind(product.price.to_string())
        .bind(product.description.as_deref())
        .bind(product.in_stock)
        .bind(to_millis(Utc::now()))
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_sale(&self, sale: NewSale) -> StorageResult<SaleFact> {
        let created_at: DateTime<Utc> = Utc::now();
        let unit_price: Decimal = sale.unit_price();

        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                customer_id, product_id, quantity, unit_price, total_amount,
                sale_date, region, status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sale.customer_id())
        .bind(sale.product_id())
        .bind(i64::from(sale.quantity()))
        .bind(unit_price.to_string())
        .bind(sale.total_amount().to_string())
        .bind(to_millis(sale.sale_date()))
        .bind(sale.region().as_str())
        .bind(sale.status().as_str())
        .bind(to_millis(created_at))
        .execute(self.pool.as_ref())
        .await?;

        Ok(sale.with_id(result.last_insert_rowid()))
    }

    async fn clear_facts(&self) -> Result<()> {
        for table in ["sales", "products", "customers"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(self.pool.as_ref())
                .await?;
        }
        Ok(())
    }
}
