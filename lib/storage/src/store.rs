use crate::persistence::SnapshotPersistence;
use crate::query::{
    CountryPage, CountryStats, DropdownItem, EmbeddingStats, GlobalStats, ImportError,
    ImportReport, ListQuery, Pagination, RegionStats, SortKey, SortOrder, TopCountries,
    TopCountry,
};
use ahash::AHashMap;
use chrono::{Duration as ChronoDuration, Utc};
use countrysim_core::{
    validate_embedding_dim, Country, Error, NewCountry, Result, ValidationError, DEFAULT_DATA_SOURCE,
    EMBEDDING_DIM,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const TOP_N: usize = 5;

#[derive(Debug, Default)]
struct Inner {
    countries: HashMap<Uuid, Country>,
    /// lowercase name -> id
    by_name: AHashMap<String, Uuid>,
    /// uppercase ISO code -> id
    by_code: AHashMap<String, Uuid>,
}

impl Inner {
    fn insert(&mut self, country: Country) {
        self.by_name.insert(country.name.to_lowercase(), country.id);
        self.by_code.insert(country.iso_code.clone(), country.id);
        self.countries.insert(country.id, country);
    }

    fn remove(&mut self, id: &Uuid) -> Option<Country> {
        let country = self.countries.remove(id)?;
        self.by_name.remove(&country.name.to_lowercase());
        self.by_code.remove(&country.iso_code);
        Some(country)
    }

    /// Id for a UUID string or an ISO code
    fn resolve(&self, key: &str) -> Option<Uuid> {
        let key = key.trim();
        if let Ok(id) = Uuid::parse_str(key) {
            if self.countries.contains_key(&id) {
                return Some(id);
            }
        }
        self.by_code.get(&key.to_ascii_uppercase()).copied()
    }

    /// Conflict if another record already uses this name or code
    fn check_unique(&self, input: &NewCountry, except: Option<Uuid>) -> Result<()> {
        let clashes = |id: Option<&Uuid>| id.is_some_and(|id| Some(*id) != except);
        if clashes(self.by_name.get(&input.name.to_lowercase())) {
            return Err(Error::Conflict(format!("country '{}' already exists", input.name)));
        }
        if clashes(self.by_code.get(&input.iso_code)) {
            return Err(Error::Conflict(format!("country code '{}' already exists", input.iso_code)));
        }
        Ok(())
    }

    fn sorted_by_name(&self) -> Vec<&Country> {
        let mut all: Vec<&Country> = self.countries.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

/// In-memory country store with optional snapshot persistence
pub struct CountryStore {
    inner: Arc<RwLock<Inner>>,
    data_dir: Option<PathBuf>,
    persistence: Option<Arc<SnapshotPersistence>>,
    data_source: String,
    embedding_dim: usize,
    /// Bumped on every mutation
    changes: Arc<AtomicU64>,
    started_at: Instant,
}

impl CountryStore {
    /// Store without persistence
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            data_dir: None,
            persistence: None,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            embedding_dim: EMBEDDING_DIM,
            changes: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    /// Open a store backed by `data_dir`, loading the previous snapshot
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let persistence = Arc::new(SnapshotPersistence::new(&data_dir));
        let mut inner = Inner::default();

        if let Some(countries) = persistence
            .load()
            .map_err(|e| Error::Storage(e.to_string()))?
        {
            for country in countries {
                inner.insert(country);
            }
            info!(count = inner.countries.len(), path = %persistence.path().display(), "snapshot loaded");
        }

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            data_dir: Some(data_dir),
            persistence: Some(persistence),
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            embedding_dim: EMBEDDING_DIM,
            changes: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        })
    }

    /// Data source recorded in the metadata of new records
    #[must_use]
    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = data_source.into();
        self
    }

    /// Length every stored embedding must have
    #[must_use]
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    #[inline]
    #[must_use]
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Save periodically on a background thread while the store is alive.
    /// Intervals with no mutation are skipped.
    pub fn start_background_save(&self, interval: Duration) {
        let Some(persistence) = self.persistence.clone() else {
            return;
        };
        let inner: Weak<RwLock<Inner>> = Arc::downgrade(&self.inner);
        let changes = self.changes.clone();

        std::thread::spawn(move || {
            let mut saved_at = changes.load(Ordering::Acquire);
            loop {
                std::thread::sleep(interval);
                let Some(live) = inner.upgrade() else {
                    break;
                };
                let current = changes.load(Ordering::Acquire);
                if current == saved_at || persistence.is_bgsave_in_progress() {
                    continue;
                }
                let pending = {
                    let guard = live.read();
                    persistence.capture(guard.countries.values().cloned().collect())
                };
                if persistence.bgsave(pending) {
                    saved_at = current;
                }
            }
        });
    }

    fn touch(&self) {
        self.changes.fetch_add(1, Ordering::AcqRel);
    }

    pub fn create(&self, input: NewCountry) -> Result<Country> {
        let input = input.normalized()?;
        let mut inner = self.inner.write();
        inner.check_unique(&input, None)?;

        let country = Country::from_new(input, &self.data_source)?;
        inner.insert(country.clone());
        drop(inner);

        self.touch();
        debug!(name = %country.name, code = %country.iso_code, "country created");
        Ok(country)
    }

    /// Replace the record addressed by id or ISO code. Changing the
    /// indicators drops the stored embedding.
    pub fn update(&self, key: &str, input: NewCountry) -> Result<Country> {
        let input = input.normalized()?;
        let mut inner = self.inner.write();
        let id = inner
            .resolve(key)
            .ok_or_else(|| Error::NotFound(format!("country '{}'", key)))?;
        inner.check_unique(&input, Some(id))?;

        let previous = inner
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("country '{}'", key)))?;
        let embedding = if previous.indicators == input.indicators {
            previous.embedding
        } else {
            None
        };

        let mut metadata = previous.metadata;
        metadata.last_updated = Utc::now();

        let country = Country {
            id,
            name: input.name,
            iso_code: input.iso_code,
            flag: input.flag,
            region: input.region,
            capital: input.capital,
            indicators: input.indicators,
            embedding,
            metadata,
        };
        inner.insert(country.clone());
        drop(inner);

        self.touch();
        Ok(country)
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write();
        let removed = match inner.resolve(key) {
            Some(id) => inner.remove(&id).is_some(),
            None => false,
        };
        drop(inner);

        if removed {
            self.touch();
        }
        Ok(removed)
    }

    #[inline]
    pub fn get(&self, id: &Uuid) -> Option<Country> {
        self.inner.read().countries.get(id).cloned()
    }

    /// Lookup by id or ISO code
    pub fn get_by_key(&self, key: &str) -> Option<Country> {
        let inner = self.inner.read();
        inner.resolve(key).and_then(|id| inner.countries.get(&id).cloned())
    }

    /// Exact name lookup, ignoring case
    pub fn get_by_name(&self, name: &str) -> Option<Country> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(&name.trim().to_lowercase())
            .and_then(|id| inner.countries.get(id).cloned())
    }

    /// Resolve a search term to a country: exact ISO code, then exact name
    /// ignoring case, then the first name (alphabetically) containing the
    /// term ignoring case.
    pub fn find_reference(&self, term: &str) -> Result<Country> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ValidationError::new("country", "must not be empty").into());
        }

        let inner = self.inner.read();
        let lowered = term.to_lowercase();

        let id = inner
            .by_code
            .get(&term.to_ascii_uppercase())
            .or_else(|| inner.by_name.get(&lowered))
            .copied()
            .or_else(|| {
                inner
                    .sorted_by_name()
                    .into_iter()
                    .find(|c| c.name.to_lowercase().contains(&lowered))
                    .map(|c| c.id)
            });

        id.and_then(|id| inner.countries.get(&id).cloned())
            .ok_or_else(|| Error::NotFound(format!("country '{}'", term)))
    }

    pub fn list(&self, query: &ListQuery) -> CountryPage {
        let limit = query.effective_limit();
        let page = query.effective_page();
        let region = query.region.as_ref().map(|r| r.trim().to_lowercase());

        let inner = self.inner.read();
        let mut matching: Vec<&Country> = inner
            .countries
            .values()
            .filter(|c| match &region {
                Some(r) if !r.is_empty() => c.region.to_lowercase().contains(r.as_str()),
                _ => true,
            })
            .collect();

        matching.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::IsoCode => a.iso_code.cmp(&b.iso_code),
                SortKey::Region => a.region.cmp(&b.region),
                SortKey::Gdp => a.indicators.gdp.total_cmp(&b.indicators.gdp),
                SortKey::LifeExpectancy => a
                    .indicators
                    .life_expectancy
                    .total_cmp(&b.indicators.life_expectancy),
                SortKey::Education => a.indicators.education.total_cmp(&b.indicators.education),
                SortKey::Co2Emissions => a
                    .indicators
                    .co2_emissions
                    .total_cmp(&b.indicators.co2_emissions),
                SortKey::Population => a.indicators.population.total_cmp(&b.indicators.population),
            };
            let ordering = match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.name.cmp(&b.name))
        });

        let total_count = matching.len();
        let countries = matching
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .map(Country::view)
            .collect();

        CountryPage {
            countries,
            pagination: Pagination::new(page, limit, total_count),
        }
    }

    pub fn dropdown(&self) -> Vec<DropdownItem> {
        self.inner
            .read()
            .sorted_by_name()
            .into_iter()
            .map(|c| DropdownItem {
                name: c.name.clone(),
                code: c.iso_code.clone(),
                flag: c.flag.clone(),
                region: c.region.clone(),
            })
            .collect()
    }

    pub fn stats(&self) -> CountryStats {
        let inner = self.inner.read();
        let all = inner.sorted_by_name();
        let n = all.len();

        let avg = |f: fn(&Country) -> f64, items: &[&Country]| {
            if items.is_empty() {
                0.0
            } else {
                items.iter().map(|c| f(c)).sum::<f64>() / items.len() as f64
            }
        };

        let mut grouped: BTreeMap<&str, Vec<&Country>> = BTreeMap::new();
        for &c in &all {
            grouped.entry(c.region.as_str()).or_default().push(c);
        }

        let mut by_region: Vec<RegionStats> = grouped
            .iter()
            .map(|(region, items)| RegionStats {
                region: region.to_string(),
                count: items.len(),
                avg_gdp: avg(|c| c.indicators.gdp, items),
                avg_life_expectancy: avg(|c| c.indicators.life_expectancy, items),
            })
            .collect();
        // Stable: regions with equal counts stay alphabetical
        by_region.sort_by(|a, b| b.count.cmp(&a.count));

        let top = |f: fn(&Country) -> f64| {
            let mut ranked = all.clone();
            ranked.sort_by(|a, b| f(b).total_cmp(&f(a)));
            ranked
                .into_iter()
                .take(TOP_N)
                .map(|c| TopCountry {
                    name: c.name.clone(),
                    code: c.iso_code.clone(),
                    flag: c.flag.clone(),
                    value: f(c),
                })
                .collect::<Vec<_>>()
        };

        CountryStats {
            global: GlobalStats {
                total_countries: n,
                avg_gdp: avg(|c| c.indicators.gdp, &all),
                avg_life_expectancy: avg(|c| c.indicators.life_expectancy, &all),
                avg_education: avg(|c| c.indicators.education, &all),
                avg_co2: avg(|c| c.indicators.co2_emissions, &all),
                total_population: all.iter().map(|c| c.indicators.population).sum(),
                regions: grouped.keys().map(|r| r.to_string()).collect(),
            },
            by_region,
            top_countries: TopCountries {
                gdp: top(|c| c.indicators.gdp),
                life_expectancy: top(|c| c.indicators.life_expectancy),
                education: top(|c| c.indicators.education),
            },
        }
    }

    /// Point-in-time copy of every record, sorted by name
    pub fn snapshot(&self) -> Vec<Country> {
        self.inner
            .read()
            .sorted_by_name()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Bulk create, optionally replacing records that match by name or code.
    /// Invalid records are reported and skipped.
    pub fn import(&self, records: Vec<NewCountry>, update_existing: bool) -> ImportReport {
        let mut report = ImportReport::default();

        for (index, record) in records.into_iter().enumerate() {
            report.processed += 1;
            let name = record.name.clone();

            let existing = {
                let inner = self.inner.read();
                inner
                    .by_name
                    .get(&record.name.trim().to_lowercase())
                    .or_else(|| inner.by_code.get(&record.iso_code.trim().to_ascii_uppercase()))
                    .copied()
            };

            let outcome = match existing {
                Some(id) if update_existing => self
                    .update(&id.to_string(), record)
                    .map(|_| report.updated += 1),
                Some(_) => Err(Error::Conflict(format!("country '{}' already exists", name))),
                None => self.create(record).map(|_| report.created += 1),
            };

            if let Err(e) = outcome {
                report.errors.push(ImportError {
                    index,
                    name,
                    error: e.to_string(),
                });
            }
        }

        info!(
            processed = report.processed,
            created = report.created,
            updated = report.updated,
            errors = report.errors.len(),
            "import finished"
        );
        report
    }

    /// Insert the given records when the store is empty. Returns how many
    /// were added.
    pub fn seed(&self, records: Vec<NewCountry>) -> Result<usize> {
        if !self.is_empty() {
            return Ok(0);
        }
        let report = self.import(records, false);
        if let Some(first) = report.errors.first() {
            warn!(index = first.index, name = %first.name, "seed record rejected: {}", first.error);
        }
        Ok(report.created)
    }

    pub fn set_embedding(&self, id: &Uuid, embedding: Vec<f32>) -> Result<()> {
        validate_embedding_dim(&embedding, self.embedding_dim)?;
        let mut inner = self.inner.write();
        let country = inner
            .countries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("country '{}'", id)))?;
        country.embedding = Some(embedding);
        country.metadata.last_updated = Utc::now();
        drop(inner);

        self.touch();
        Ok(())
    }

    pub fn embedding_stats(&self) -> EmbeddingStats {
        let inner = self.inner.read();
        let cutoff = Utc::now() - ChronoDuration::hours(24);

        let sizes: Vec<usize> = inner
            .countries
            .values()
            .filter_map(|c| c.embedding.as_ref().filter(|e| !e.is_empty()).map(Vec::len))
            .collect();

        EmbeddingStats {
            total_countries: inner.countries.len(),
            with_embeddings: sizes.len(),
            avg_embedding_size: if sizes.is_empty() {
                0.0
            } else {
                sizes.iter().sum::<usize>() as f64 / sizes.len() as f64
            },
            recent_updates: inner
                .countries
                .values()
                .filter(|c| c.metadata.last_updated > cutoff)
                .count(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().countries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().countries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Force a synchronous save. No-op for in-memory stores.
    pub fn save(&self) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let pending = {
            let inner = self.inner.read();
            persistence.capture(inner.countries.values().cloned().collect())
        };
        persistence
            .save(&pending)
            .map(|_| ())
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Unix seconds of the last successful save, 0 if none
    pub fn last_save_time(&self) -> i64 {
        self.persistence
            .as_ref()
            .map_or(0, |p| p.last_save_time())
    }
}
