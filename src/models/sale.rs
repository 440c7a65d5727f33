use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Category, CustomerType, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Pending,
    Cancelled,
}

string_enum!(SaleStatus, "sale status", {
    Completed => "completed",
    Pending => "pending",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSale {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("unit price must not be negative")]
    NegativePrice,
}

/// A sale that has not been written yet.
///
/// `total_amount` is fixed here, once, as `quantity * unit_price`. Nothing
/// downstream recomputes it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSale {
    customer_id: i64,
    product_id: i64,
    quantity: u32,
    unit_price: Decimal,
    total_amount: Decimal,
    sale_date: DateTime<Utc>,
    region: Region,
    status: SaleStatus,
}

impl NewSale {
    pub fn new(
        customer_id: i64,
        product_id: i64,
        quantity: u32,
        unit_price: Decimal,
        sale_date: DateTime<Utc>,
        region: Region,
        status: SaleStatus,
    ) -> Result<Self, InvalidSale> {
        if quantity == 0 {
            return Err(InvalidSale::ZeroQuantity);
        }
        if unit_price < Decimal::ZERO {
            return Err(InvalidSale::NegativePrice);
        }

        Ok(Self {
            customer_id,
            product_id,
            quantity,
            unit_price,
            total_amount: Decimal::from(quantity) * unit_price,
            sale_date,
            region,
            status,
        })
    }

    pub fn customer_id(&self) -> i64 {
        self.customer_id
    }

    pub fn product_id(&self) -> i64 {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn sale_date(&self) -> DateTime<Utc> {
        self.sale_date
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub(crate) fn with_id(self, id: i64) -> SaleFact {
        SaleFact { id, sale: self }
    }
}

/// A persisted, immutable sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleFact {
    id: i64,
    sale: NewSale,
}

impl SaleFact {
    /// Rebuilds a fact from stored columns. The stored total is taken as is.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: i64,
        customer_id: i64,
        product_id: i64,
        quantity: u32,
        unit_price: Decimal,
        total_amount: Decimal,
        sale_date: DateTime<Utc>,
        region: Region,
        status: SaleStatus,
    ) -> Self {
        Self {
            id,
            sale: NewSale {
                customer_id,
                product_id,
                quantity,
                unit_price,
                total_amount,
                sale_date,
                region,
                status,
            },
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

impl std::ops::Deref for SaleFact {
    type Target = NewSale;

    fn deref(&self) -> &NewSale {
        &self.sale
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductInfo {
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerInfo {
    pub name: String,
    pub customer_type: CustomerType,
}

/// Read-only projection of a sale, enriched with its product and/or customer
/// when the query asked for the join.
#[derive(Debug, Clone, PartialEq)]
pub struct FactView {
    pub sale: SaleFact,
    pub product: Option<ProductInfo>,
    pub customer: Option<CustomerInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_total_amount_fixed_at_construction() {
        let sale = NewSale::new(
            1,
            2,
            3,
            dec!(19.99),
            date(),
            Region::Europe,
            SaleStatus::Completed,
        )
        .unwrap();
        assert_eq!(sale.total_amount(), dec!(59.97));

        let fact = sale.with_id(7);
        assert_eq!(fact.id(), 7);
        assert_eq!(fact.total_amount(), dec!(59.97));
    }

    #[test]
    fn test_rejects_zero_quantity() {
        let err = NewSale::new(1, 2, 0, dec!(5), date(), Region::Asia, SaleStatus::Pending)
            .unwrap_err();
        assert_eq!(err, InvalidSale::ZeroQuantity);
    }

    #[test]
    fn test_rejects_negative_price_but_allows_free_items() {
        let err = NewSale::new(1, 2, 1, dec!(-1), date(), Region::Asia, SaleStatus::Completed)
            .unwrap_err();
        assert_eq!(err, InvalidSale::NegativePrice);

        let free = NewSale::new(1, 2, 4, dec!(0), date(), Region::Asia, SaleStatus::Completed)
            .unwrap();
        assert!(free.total_amount().is_zero());
    }

    #[test]
    fn test_restore_keeps_stored_total() {
        let fact = SaleFact::restore(
            1,
            1,
            1,
            2,
            dec!(10),
            dec!(20),
            date(),
            Region::Oceania,
            SaleStatus::Cancelled,
        );
        assert_eq!(fact.total_amount(), dec!(20));
        assert_eq!(fact.status(), SaleStatus::Cancelled);
    }
}
