//! Human-readable justification tags for a search result
//!
//! Tags come from a fixed cascade of rules evaluated in order, each rule
//! adding at most one tag. The list is cut to [`MAX_REASONS`] afterwards, so
//! later rules (region, population) are the ones dropped when earlier rules
//! already produced enough tags.

use countrysim_core::{Indicators, IndicatorVector};

pub const MAX_REASONS: usize = 4;

/// Tags for `candidate`, with `region` used for the location tag.
pub fn reasons(candidate: &IndicatorVector, region: &str) -> Vec<String> {
    reasons_for(candidate.indicators(), region)
}

/// Same cascade over raw indicators, for results that never went through
/// the indicator scorer (vector search hits).
pub fn reasons_for(indicators: &Indicators, region: &str) -> Vec<String> {
    let mut tags = Vec::with_capacity(5);

    tags.push(economic_tier(indicators.gdp).to_string());

    if indicators.life_expectancy > 80.0 && indicators.education > 85.0 {
        tags.push("High human development".to_string());
    } else if indicators.life_expectancy > 70.0 && indicators.education > 70.0 {
        tags.push("Medium human development".to_string());
    }

    if indicators.co2_emissions < 5.0 {
        tags.push("Low carbon footprint".to_string());
    } else if indicators.co2_emissions > 15.0 {
        tags.push("High carbon emissions".to_string());
    }

    tags.push(format!("Located in {}", region));

    if indicators.population > 100.0 {
        tags.push("Large population".to_string());
    } else if indicators.population < 10.0 {
        tags.push("Small population".to_string());
    }

    tags.truncate(MAX_REASONS);
    tags
}

fn economic_tier(gdp: f64) -> &'static str {
    if gdp > 40000.0 {
        "High-income developed economy"
    } else if gdp > 15000.0 {
        "Upper-middle income economy"
    } else if gdp > 5000.0 {
        "Middle income economy"
    } else {
        "Developing economy"
    }
}
