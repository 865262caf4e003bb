//! Listing, statistics and import types exchanged with the store

use countrysim_core::{CountryView, ValidationError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 200;

/// Field a country listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Name,
    IsoCode,
    Region,
    Gdp,
    LifeExpectancy,
    Education,
    Co2Emissions,
    Population,
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortKey::Name),
            "isoCode" | "iso_code" | "code" => Ok(SortKey::IsoCode),
            "region" => Ok(SortKey::Region),
            "gdp" => Ok(SortKey::Gdp),
            "lifeExpectancy" | "life_expectancy" => Ok(SortKey::LifeExpectancy),
            "education" => Ok(SortKey::Education),
            "co2Emissions" | "co2_emissions" => Ok(SortKey::Co2Emissions),
            "population" => Ok(SortKey::Population),
            other => Err(ValidationError::new("sortBy", format!("unknown sort key '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ValidationError::new("order", format!("unknown order '{}'", other))),
        }
    }
}

/// Parameters of a paginated country listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Case-insensitive substring match on region
    pub region: Option<String>,
    pub sort_by: SortKey,
    pub order: SortOrder,
    /// 1-based
    pub page: usize,
    pub limit: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            region: None,
            sort_by: SortKey::Name,
            order: SortOrder::Asc,
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl ListQuery {
    #[inline]
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    #[inline]
    #[must_use]
    pub fn effective_page(&self) -> usize {
        self.page.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_count: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(current_page: usize, limit: usize, total_count: usize) -> Self {
        let total_pages = total_count.div_ceil(limit.max(1));
        Self {
            current_page,
            total_pages,
            total_count,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryPage {
    pub countries: Vec<CountryView>,
    pub pagination: Pagination,
}

/// Compact entry for country pickers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropdownItem {
    pub name: String,
    pub code: String,
    pub flag: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_countries: usize,
    pub avg_gdp: f64,
    pub avg_life_expectancy: f64,
    pub avg_education: f64,
    pub avg_co2: f64,
    pub total_population: f64,
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStats {
    pub region: String,
    pub count: usize,
    pub avg_gdp: f64,
    pub avg_life_expectancy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCountry {
    pub name: String,
    pub code: String,
    pub flag: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCountries {
    pub gdp: Vec<TopCountry>,
    pub life_expectancy: Vec<TopCountry>,
    pub education: Vec<TopCountry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStats {
    pub global: GlobalStats,
    pub by_region: Vec<RegionStats>,
    pub top_countries: TopCountries,
}

/// One rejected record of a bulk import
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    pub index: usize,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<ImportError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingStats {
    pub total_countries: usize,
    pub with_embeddings: usize,
    pub avg_embedding_size: f64,
    /// Countries updated in the last 24 hours
    pub recent_updates: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(!p.has_prev);

        let p = Pagination::new(3, 10, 25);
        assert!(!p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
    }

    #[test]
    fn test_limit_clamp() {
        let q = ListQuery { limit: 1000, page: 0, ..Default::default() };
        assert_eq!(q.effective_limit(), MAX_PAGE_LIMIT);
        assert_eq!(q.effective_page(), 1);
        let q = ListQuery { limit: 0, ..Default::default() };
        assert_eq!(q.effective_limit(), 1);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("lifeExpectancy".parse::<SortKey>().unwrap(), SortKey::LifeExpectancy);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("flag".parse::<SortKey>().is_err());
    }
}
