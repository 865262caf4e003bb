//! Socio-economic indicators and the validated vector used for scoring.

use crate::country::Country;
use crate::error::{Result, ValidationError};
use serde::{Deserialize, Serialize};

/// One scored attribute of a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Indicator {
    Gdp,
    LifeExpectancy,
    Education,
    Co2Emissions,
    Population,
    UnemploymentRate,
    CorruptionIndex,
    HappinessScore,
}

impl Indicator {
    pub const ALL: [Indicator; 8] = [
        Indicator::Gdp,
        Indicator::LifeExpectancy,
        Indicator::Education,
        Indicator::Co2Emissions,
        Indicator::Population,
        Indicator::UnemploymentRate,
        Indicator::CorruptionIndex,
        Indicator::HappinessScore,
    ];

    /// Field name as it appears in JSON payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Gdp => "gdp",
            Indicator::LifeExpectancy => "lifeExpectancy",
            Indicator::Education => "education",
            Indicator::Co2Emissions => "co2Emissions",
            Indicator::Population => "population",
            Indicator::UnemploymentRate => "unemploymentRate",
            Indicator::CorruptionIndex => "corruptionIndex",
            Indicator::HappinessScore => "happinessScore",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Indicator::Gdp
                | Indicator::LifeExpectancy
                | Indicator::Education
                | Indicator::Co2Emissions
                | Indicator::Population
        )
    }

    /// Inclusive lower bound and optional inclusive upper bound
    pub fn bounds(&self) -> (f64, Option<f64>) {
        match self {
            Indicator::Gdp | Indicator::Co2Emissions | Indicator::Population => (0.0, None),
            Indicator::LifeExpectancy => (0.0, Some(120.0)),
            Indicator::Education | Indicator::UnemploymentRate | Indicator::CorruptionIndex => {
                (0.0, Some(100.0))
            }
            Indicator::HappinessScore => (0.0, Some(10.0)),
        }
    }

    fn check(&self, value: f64) -> std::result::Result<(), ValidationError> {
        let field = format!("indicators.{}", self.as_str());
        if !value.is_finite() {
            return Err(ValidationError::new(field, "must be a finite number"));
        }
        let (min, max) = self.bounds();
        if value < min {
            return Err(ValidationError::new(field, format!("must be >= {}", min)));
        }
        if let Some(max) = max {
            if value > max {
                return Err(ValidationError::new(field, format!("must be <= {}", max)));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Indicator {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Indicator::ALL
            .iter()
            .copied()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::new("indicator", format!("unknown indicator '{}'", s)))
    }
}

/// Raw indicator values of one country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicators {
    /// GDP per capita in USD
    pub gdp: f64,
    /// Years
    pub life_expectancy: f64,
    /// Education index (0-100)
    pub education: f64,
    /// Tons per capita
    pub co2_emissions: f64,
    /// Millions
    pub population: f64,
    #[serde(default)]
    pub unemployment_rate: Option<f64>,
    #[serde(default)]
    pub corruption_index: Option<f64>,
    #[serde(default)]
    pub happiness_score: Option<f64>,
}

impl Indicators {
    pub fn new(
        gdp: f64,
        life_expectancy: f64,
        education: f64,
        co2_emissions: f64,
        population: f64,
    ) -> Self {
        Self {
            gdp,
            life_expectancy,
            education,
            co2_emissions,
            population,
            unemployment_rate: None,
            corruption_index: None,
            happiness_score: None,
        }
    }

    #[must_use]
    pub fn with_optional(
        mut self,
        unemployment_rate: Option<f64>,
        corruption_index: Option<f64>,
        happiness_score: Option<f64>,
    ) -> Self {
        self.unemployment_rate = unemployment_rate;
        self.corruption_index = corruption_index;
        self.happiness_score = happiness_score;
        self
    }

    #[inline]
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::Gdp => Some(self.gdp),
            Indicator::LifeExpectancy => Some(self.life_expectancy),
            Indicator::Education => Some(self.education),
            Indicator::Co2Emissions => Some(self.co2_emissions),
            Indicator::Population => Some(self.population),
            Indicator::UnemploymentRate => self.unemployment_rate,
            Indicator::CorruptionIndex => self.corruption_index,
            Indicator::HappinessScore => self.happiness_score,
        }
    }

    /// Check every present value against its declared bound.
    /// Fails on the first offending indicator; values are never clamped.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        for indicator in Indicator::ALL {
            if let Some(value) = self.get(indicator) {
                indicator.check(value)?;
            }
        }
        Ok(())
    }
}

/// A validated, immutable view of one country used by the scorers.
///
/// Only obtainable through [`IndicatorVector::new`] or
/// [`IndicatorVector::from_country`], both of which reject out-of-bound
/// indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorVector {
    name: String,
    code: String,
    region: String,
    capital: String,
    indicators: Indicators,
}

impl IndicatorVector {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        region: impl Into<String>,
        capital: impl Into<String>,
        indicators: Indicators,
    ) -> Result<Self> {
        indicators.validate()?;
        Ok(Self {
            name: name.into(),
            code: code.into(),
            region: region.into(),
            capital: capital.into(),
            indicators,
        })
    }

    pub fn from_country(country: &Country) -> Result<Self> {
        Self::new(
            country.name.clone(),
            country.iso_code.clone(),
            country.region.clone(),
            country.capital.clone(),
            country.indicators.clone(),
        )
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[inline]
    pub fn region(&self) -> &str {
        &self.region
    }

    #[inline]
    pub fn capital(&self) -> &str {
        &self.capital
    }

    #[inline]
    pub fn indicators(&self) -> &Indicators {
        &self.indicators
    }

    #[inline]
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        self.indicators.get(indicator)
    }
}
