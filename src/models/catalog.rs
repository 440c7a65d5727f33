use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sales region. Every sale and customer belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "North America")]
    NorthAmerica,
    Europe,
    Asia,
    #[serde(rename = "South America")]
    SouthAmerica,
    Africa,
    Oceania,
}

string_enum!(Region, "region", {
    NorthAmerica => "North America",
    Europe => "Europe",
    Asia => "Asia",
    SouthAmerica => "South America",
    Africa => "Africa",
    Oceania => "Oceania",
});

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Clothing,
    #[serde(rename = "Home & Garden")]
    HomeAndGarden,
    Books,
    Sports,
    Beauty,
    Automotive,
    #[serde(rename = "Food & Beverage")]
    FoodAndBeverage,
}

string_enum!(Category, "category", {
    Electronics => "Electronics",
    Clothing => "Clothing",
    HomeAndGarden => "Home & Garden",
    Books => "Books",
    Sports => "Sports",
    Beauty => "Beauty",
    Automotive => "Automotive",
    FoodAndBeverage => "Food & Beverage",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerType {
    Enterprise,
    #[serde(rename = "SMB")]
    Smb,
    Individual,
}

string_enum!(CustomerType, "customer type", {
    Enterprise => "Enterprise",
    Smb => "SMB",
    Individual => "Individual",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub price: Decimal,
    pub description: Option<String>,
    pub in_stock: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: Category,
    pub price: Decimal,
    pub description: Option<String>,
    pub in_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub region: Region,
    pub customer_type: CustomerType,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    /// Stored lowercased; must be unique across customers.
    pub email: String,
    pub region: Region,
    pub customer_type: CustomerType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_names_round_trip() {
        for region in Region::ALL {
            assert_eq!(region.as_str().parse::<Region>().unwrap(), *region);
        }
        assert!("Antarctica".parse::<Region>().is_err());
    }

    #[test]
    fn test_category_serializes_display_name() {
        let json = serde_json::to_string(&Category::HomeAndGarden).unwrap();
        assert_eq!(json, "\"Home & Garden\"");
        assert_eq!(
            "Food & Beverage".parse::<Category>().unwrap(),
            Category::FoodAndBeverage
        );
    }

    #[test]
    fn test_customer_type_is_case_sensitive() {
        assert_eq!("SMB".parse::<CustomerType>().unwrap(), CustomerType::Smb);
        assert!("smb".parse::<CustomerType>().is_err());
    }
}
