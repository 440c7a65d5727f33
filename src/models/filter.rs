use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Category, Region};

pub const DEFAULT_LIMIT: usize = 10;
pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 100;

/// Validated, immutable scope of an aggregation request.
///
/// Only [`crate::validation::validate`] and the checked constructor below can
/// build one, so `start_date <= end_date` and `MIN_LIMIT <= limit <= MAX_LIMIT`
/// always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    region: Option<Region>,
    category: Option<Category>,
    limit: usize,
}

impl FilterSpec {
    /// Returns `None` when the range is inverted or the limit is out of bounds.
    pub fn new(
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        region: Option<Region>,
        category: Option<Category>,
        limit: usize,
    ) -> Option<Self> {
        if start_date > end_date || !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
            return None;
        }

        Some(Self {
            start_date,
            end_date,
            region,
            category,
            limit,
        })
    }

    /// Date range only: no region, no category, default limit.
    pub fn for_range(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Option<Self> {
        Self::new(start_date, end_date, None, None, DEFAULT_LIMIT)
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Copy of this filter with a different result limit, clamped to bounds.
    pub fn with_limit(&self, limit: usize) -> Self {
        Self {
            limit: limit.clamp(MIN_LIMIT, MAX_LIMIT),
            ..self.clone()
        }
    }

    pub fn with_region(&self, region: Option<Region>) -> Self {
        Self {
            region,
            ..self.clone()
        }
    }

    pub fn with_category(&self, category: Option<Category>) -> Self {
        Self {
            category,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(FilterSpec::for_range(day(5), day(4)).is_none());
        assert!(FilterSpec::for_range(day(4), day(4)).is_some());
    }

    #[test]
    fn test_rejects_out_of_bounds_limit() {
        assert!(FilterSpec::new(day(1), day(2), None, None, 0).is_none());
        assert!(FilterSpec::new(day(1), day(2), None, None, 101).is_none());
        assert!(FilterSpec::new(day(1), day(2), None, None, 100).is_some());
    }

    #[test]
    fn test_with_limit_clamps() {
        let filter = FilterSpec::for_range(day(1), day(3)).unwrap();
        assert_eq!(filter.with_limit(500).limit(), MAX_LIMIT);
        assert_eq!(filter.with_limit(0).limit(), MIN_LIMIT);
        assert_eq!(filter.limit(), DEFAULT_LIMIT);
    }
}
