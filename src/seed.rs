//! Synthetic demo data
//!
//! Generates customers, products and sales spread over 2023-01-01 up to now.
//! Each sale takes its region from its customer and its unit price from its
//! product.

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use rand::RngExt;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::models::{
    Category, CustomerType, NewCustomer, NewProduct, NewSale, Region, SaleStatus,
};
use crate::storage::{Storage, StorageError};

const COMPANY_PREFIXES: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Stark", "Wayne", "Hooli", "Vandelay", "Soylent",
    "Tyrell", "Cyberdyne", "Wonka", "Gringotts", "Oceanic", "Massive",
];
const COMPANY_SUFFIXES: &[&str] = &[
    "Industries", "Labs", "Holdings", "Group", "Trading", "Partners", "Works", "Systems",
];
const PRODUCT_ADJECTIVES: &[&str] = &[
    "Ergonomic", "Rustic", "Sleek", "Handcrafted", "Refined", "Practical", "Gorgeous",
    "Licensed", "Compact", "Durable",
];
const PRODUCT_MATERIALS: &[&str] = &[
    "Steel", "Wooden", "Cotton", "Granite", "Bamboo", "Plastic", "Leather", "Ceramic",
];
const PRODUCT_NOUNS: &[&str] = &[
    "Chair", "Lamp", "Keyboard", "Jacket", "Bottle", "Backpack", "Speaker", "Table", "Gloves",
    "Watch", "Blender", "Helmet",
];
const STATUSES: &[SaleStatus] = &[
    SaleStatus::Completed,
    SaleStatus::Pending,
    SaleStatus::Cancelled,
];

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub customers: usize,
    pub products: usize,
    pub sales: usize,
    /// Remove existing customers, products and sales first.
    pub clear: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            customers: 50,
            products: 30,
            sales: 500,
            clear: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub customers: usize,
    pub products: usize,
    pub sales: usize,
}

fn pick<'a, T, R: RngExt>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

pub fn generate_customers<R: RngExt>(rng: &mut R, count: usize) -> Vec<NewCustomer> {
    (0..count)
        .map(|i| {
            let prefix = pick(rng, COMPANY_PREFIXES);
            let suffix = pick(rng, COMPANY_SUFFIXES);
            NewCustomer {
                name: format!("{prefix} {suffix}"),
                // The index keeps emails unique within one run.
                email: format!(
                    "{}.{}{}@example.com",
                    prefix.to_lowercase(),
                    suffix.to_lowercase(),
                    i + 1
                ),
                region: *pick(rng, Region::ALL),
                customer_type: *pick(rng, CustomerType::ALL),
            }
        })
        .collect()
}

pub fn generate_products<R: RngExt>(rng: &mut R, count: usize) -> Vec<NewProduct> {
    (0..count)
        .map(|_| {
            let adjective = pick(rng, PRODUCT_ADJECTIVES);
            let material = pick(rng, PRODUCT_MATERIALS);
            let noun = pick(rng, PRODUCT_NOUNS);
            NewProduct {
                name: format!("{adjective} {material} {noun}"),
                category: *pick(rng, Category::ALL),
                price: Decimal::new(rng.random_range(1_000..=100_000), 2),
                description: Some(format!(
                    "A {} {} built to last.",
                    material.to_lowercase(),
                    noun.to_lowercase()
                )),
                in_stock: rng.random_range(0..2) == 0,
            }
        })
        .collect()
}

/// Sales over customer and product ids already stored.
///
/// `customers` pairs each id with that customer's region; `products` pairs
/// each id with its list price.
pub fn generate_sales<R: RngExt>(
    rng: &mut R,
    customers: &[(i64, Region)],
    products: &[(i64, Decimal)],
    count: usize,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<NewSale> {
    if customers.is_empty() || products.is_empty() {
        return Vec::new();
    }

    let start = from.timestamp_millis();
    let end = to.timestamp_millis().max(start);

    (0..count)
        .filter_map(|_| {
            let (customer_id, region) = *pick(rng, customers);
            let (product_id, unit_price) = *pick(rng, products);
            let quantity = rng.random_range(1..=10u32);
            let sale_date = DateTime::from_timestamp_millis(rng.random_range(start..=end))?;
            let status = *pick(rng, STATUSES);

            NewSale::new(
                customer_id,
                product_id,
                quantity,
                unit_price,
                sale_date,
                region,
                status,
            )
            .ok()
        })
        .collect()
}

/// Fill `storage` with synthetic data.
pub async fn seed(storage: &dyn Storage, options: &SeedOptions) -> Result<SeedSummary> {
    if options.sales > 0 && (options.customers == 0 || options.products == 0) {
        bail!("sales need at least one customer and one product");
    }

    if options.clear {
        storage.clear_facts().await?;
        info!("Cleared customers, products and sales");
    }

    let new_customers = generate_customers(&mut rand::rng(), options.customers);
    let mut customers = Vec::with_capacity(new_customers.len());
    for customer in &new_customers {
        match storage.insert_customer(customer).await {
            Ok(id) => customers.push((id, customer.region)),
            Err(StorageError::Conflict) => {
                warn!(email = %customer.email, "customer email already exists, skipping");
            }
            Err(err) => return Err(err.into()),
        }
    }
    info!("{} customers created", customers.len());

    let new_products = generate_products(&mut rand::rng(), options.products);
    let mut products = Vec::with_capacity(new_products.len());
    for product in &new_products {
        let id = storage.insert_product(product).await?;
        products.push((id, product.price));
    }
    info!("{} products created", products.len());

    let from = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single().unwrap_or_default();
    let sales = generate_sales(
        &mut rand::rng(),
        &customers,
        &products,
        options.sales,
        from,
        Utc::now(),
    );
    let mut created = 0;
    for sale in sales {
        storage.insert_sale(sale).await?;
        created += 1;
    }
    info!("{} sales created", created);

    Ok(SeedSummary {
        customers: customers.len(),
        products: products.len(),
        sales: created,
    })
}
