use crate::error::{Result, ValidationError};
use crate::indicators::Indicators;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_DATA_SOURCE: &str = "World Bank";

/// Provenance information attached to a stored country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub last_updated: DateTime<Utc>,
    #[serde(default = "default_data_source")]
    pub data_source: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_data_source() -> String {
    DEFAULT_DATA_SOURCE.to_string()
}

fn default_confidence() -> f64 {
    1.0
}

impl Metadata {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            last_updated: Utc::now(),
            data_source: data_source.into(),
            confidence: 1.0,
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_SOURCE)
    }
}

/// A persisted country record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    pub iso_code: String,
    #[serde(default)]
    pub flag: String,
    pub region: String,
    pub capital: String,
    pub indicators: Indicators,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Country {
    /// Build a fresh record from validated input
    pub fn from_new(input: NewCountry, data_source: &str) -> Result<Self> {
        let input = input.normalized()?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name,
            iso_code: input.iso_code,
            flag: input.flag,
            region: input.region,
            capital: input.capital,
            indicators: input.indicators,
            embedding: None,
            metadata: Metadata::new(data_source),
        })
    }

    #[inline]
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Client-facing projection, embedding excluded
    pub fn view(&self) -> CountryView {
        CountryView::from(self)
    }
}

/// Input for creating or replacing a country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCountry {
    pub name: String,
    #[serde(alias = "iso_code", alias = "code")]
    pub iso_code: String,
    #[serde(default)]
    pub flag: String,
    pub region: String,
    pub capital: String,
    pub indicators: Indicators,
}

impl NewCountry {
    /// Trim and uppercase identity fields, then validate every field.
    pub fn normalized(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.iso_code = self.iso_code.trim().to_ascii_uppercase();
        self.flag = self.flag.trim().to_string();
        self.region = self.region.trim().to_string();
        self.capital = self.capital.trim().to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        check_len("name", &self.name, 2, 100)?;
        check_len("region", &self.region, 2, 50)?;
        check_len("capital", &self.capital, 2, 100)?;

        let code_len = self.iso_code.chars().count();
        if !(2..=3).contains(&code_len) || !self.iso_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::new("isoCode", "must be 2-3 letters"));
        }

        self.indicators.validate()
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> std::result::Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(
            field,
            format!("length must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// What clients get to see of a country
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryView {
    pub id: Uuid,
    pub name: String,
    pub iso_code: String,
    pub flag: String,
    pub region: String,
    pub capital: String,
    pub indicators: Indicators,
    pub metadata: Metadata,
}

impl From<&Country> for CountryView {
    fn from(c: &Country) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            iso_code: c.iso_code.clone(),
            flag: c.flag.clone(),
            region: c.region.clone(),
            capital: c.capital.clone(),
            indicators: c.indicators.clone(),
            metadata: c.metadata.clone(),
        }
    }
}
