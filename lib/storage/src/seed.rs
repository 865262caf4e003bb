//! Built-in sample countries for development and demos

use countrysim_core::{Indicators, NewCountry};

struct SeedRow {
    name: &'static str,
    code: &'static str,
    flag: &'static str,
    region: &'static str,
    capital: &'static str,
    /// gdp, life expectancy, education, co2, population
    core: [f64; 5],
    /// unemployment, corruption index, happiness
    extra: Option<[f64; 3]>,
}

macro_rules! row {
    ($name:expr, $code:expr, $flag:expr, $region:expr, $capital:expr, $core:expr) => {
        SeedRow { name: $name, code: $code, flag: $flag, region: $region, capital: $capital, core: $core, extra: None }
    };
    ($name:expr, $code:expr, $flag:expr, $region:expr, $capital:expr, $core:expr, $extra:expr) => {
        SeedRow { name: $name, code: $code, flag: $flag, region: $region, capital: $capital, core: $core, extra: Some($extra) }
    };
}

const ROWS: &[SeedRow] = &[
    row!("United States", "US", "🇺🇸", "North America", "Washington D.C.", [63543.0, 78.9, 89.0, 16.1, 331.0], [3.7, 67.0, 6.9]),
    row!("Germany", "DE", "🇩🇪", "Europe", "Berlin", [46259.0, 81.3, 92.0, 9.4, 83.0], [3.2, 80.0, 7.0]),
    row!("Japan", "JP", "🇯🇵", "Asia", "Tokyo", [39285.0, 84.6, 91.0, 8.8, 125.0], [2.8, 73.0, 5.9]),
    row!("Brazil", "BR", "🇧🇷", "South America", "Brasília", [8897.0, 75.9, 76.0, 2.3, 215.0], [13.2, 38.0, 6.4]),
    row!("South Korea", "KR", "🇰🇷", "Asia", "Seoul", [31846.0, 83.5, 95.0, 11.6, 52.0], [2.7, 62.0, 5.8]),
    row!("Canada", "CA", "🇨🇦", "North America", "Ottawa", [46195.0, 82.4, 88.0, 18.6, 38.0], [5.2, 77.0, 7.2]),
    row!("United Kingdom", "GB", "🇬🇧", "Europe", "London", [41030.0, 81.3, 90.0, 5.6, 67.0], [3.8, 78.0, 7.0]),
    row!("France", "FR", "🇫🇷", "Europe", "Paris", [39030.0, 82.7, 89.0, 4.6, 68.0], [7.9, 72.0, 6.7]),
    row!("Australia", "AU", "🇦🇺", "Oceania", "Canberra", [51812.0, 83.4, 87.0, 15.4, 26.0], [3.5, 77.0, 7.3]),
    row!("China", "CN", "🇨🇳", "Asia", "Beijing", [10500.0, 77.5, 85.0, 7.4, 1412.0], [3.8, 45.0, 5.1]),
    row!("India", "IN", "🇮🇳", "Asia", "New Delhi", [2277.0, 69.7, 65.0, 1.9, 1380.0]),
    row!("Mexico", "MX", "🇲🇽", "North America", "Mexico City", [9926.0, 75.1, 74.0, 3.7, 129.0]),
    row!("Italy", "IT", "🇮🇹", "Europe", "Rome", [31952.0, 83.6, 86.0, 5.9, 60.0]),
    row!("Spain", "ES", "🇪🇸", "Europe", "Madrid", [27057.0, 83.6, 84.0, 5.7, 47.0]),
    row!("Russia", "RU", "🇷🇺", "Europe/Asia", "Moscow", [11289.0, 72.6, 82.0, 11.4, 146.0]),
    row!("Netherlands", "NL", "🇳🇱", "Europe", "Amsterdam", [52331.0, 82.3, 91.0, 8.8, 17.0]),
    row!("Switzerland", "CH", "🇨🇭", "Europe", "Bern", [81867.0, 83.8, 88.0, 4.3, 9.0]),
    row!("Sweden", "SE", "🇸🇪", "Europe", "Stockholm", [51648.0, 82.8, 93.0, 4.2, 10.0]),
    row!("Norway", "NO", "🇳🇴", "Europe", "Oslo", [75420.0, 82.3, 90.0, 8.3, 5.0]),
    row!("Singapore", "SG", "🇸🇬", "Asia", "Singapore", [59798.0, 83.6, 89.0, 8.6, 6.0]),
    row!("New Zealand", "NZ", "🇳🇿", "Oceania", "Wellington", [41945.0, 82.4, 86.0, 7.1, 5.0]),
    row!("South Africa", "ZA", "🇿🇦", "Africa", "Cape Town", [6001.0, 64.1, 70.0, 8.9, 60.0]),
    row!("Argentina", "AR", "🇦🇷", "South America", "Buenos Aires", [10636.0, 76.7, 79.0, 4.2, 45.0]),
    row!("Chile", "CL", "🇨🇱", "South America", "Santiago", [15346.0, 80.2, 81.0, 4.7, 19.0]),
    row!("Thailand", "TH", "🇹🇭", "Asia", "Bangkok", [7233.0, 77.2, 78.0, 3.9, 70.0]),
    row!("Israel", "IL", "🇮🇱", "Asia", "Jerusalem", [43689.0, 83.0, 88.0, 7.3, 9.0]),
    row!("Turkey", "TR", "🇹🇷", "Europe/Asia", "Ankara", [9539.0, 77.7, 76.0, 5.1, 85.0]),
    row!("Poland", "PL", "🇵🇱", "Europe", "Warsaw", [15421.0, 78.7, 85.0, 8.1, 38.0]),
    row!("Belgium", "BE", "🇧🇪", "Europe", "Brussels", [43582.0, 82.0, 87.0, 8.3, 11.0]),
    row!("Austria", "AT", "🇦🇹", "Europe", "Vienna", [45437.0, 81.6, 87.0, 7.3, 9.0]),
];

/// Sample records, ready for [`CountryStore::seed`](crate::CountryStore::seed)
pub fn sample_countries() -> Vec<NewCountry> {
    ROWS.iter()
        .map(|row| {
            let [gdp, life, education, co2, population] = row.core;
            let mut indicators = Indicators::new(gdp, life, education, co2, population);
            if let Some([unemployment, corruption, happiness]) = row.extra {
                indicators = indicators.with_optional(Some(unemployment), Some(corruption), Some(happiness));
            }
            NewCountry {
                name: row.name.to_string(),
                iso_code: row.code.to_string(),
                flag: row.flag.to_string(),
                region: row.region.to_string(),
                capital: row.capital.to_string(),
                indicators,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CountryStore;

    #[test]
    fn test_sample_countries_valid() {
        let samples = sample_countries();
        assert_eq!(samples.len(), 30);
        for sample in &samples {
            assert!(sample.validate().is_ok(), "{} should validate", sample.name);
        }
    }

    #[test]
    fn test_seed_store() {
        let store = CountryStore::in_memory();
        assert_eq!(store.seed(sample_countries()).unwrap(), 30);
        let germany = store.find_reference("Germany").unwrap();
        assert_eq!(germany.indicators.happiness_score, Some(7.0));
        assert_eq!(store.find_reference("IN").unwrap().indicators.unemployment_rate, None);
    }
}
