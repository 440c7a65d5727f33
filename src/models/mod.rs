use std::fmt;

/// Error returned when a string does not name a member of one of the fixed
/// enumerations (regions, categories, statuses, customer types).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// wire names are fixed strings.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err($crate::models::UnknownVariant::new($kind, other)),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mod catalog;
mod filter;
mod report;
mod results;
mod sale;

pub use catalog::{Category, Customer, CustomerType, NewCustomer, NewProduct, Product, Region};
pub use filter::{FilterSpec, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};
pub use report::{DateRange, NewReport, Report, ReportSummary};
pub use results::{OverviewResult, RegionRow, TimelinePoint, TopCustomer, TopProduct};
pub use sale::{CustomerInfo, FactView, InvalidSale, NewSale, ProductInfo, SaleFact, SaleStatus};

/// Comma separated list of the accepted names, used in validation messages.
pub(crate) fn joined_names<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
