use anyhow::Result;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use countrysim_core::{Country, Indicators, Metadata};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

pub const SNAPSHOT_FILENAME: &str = "countries.db";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotData {
    pub version: u32,
    pub countries: Vec<CountrySnapshot>,
    pub timestamp: i64,
}

/// On-disk form of a country. Every field is always written so the
/// non-self-describing encoding stays aligned.
#[derive(Debug, Serialize, Deserialize)]
pub struct CountrySnapshot {
    pub id: Uuid,
    pub name: String,
    pub iso_code: String,
    pub flag: String,
    pub region: String,
    pub capital: String,
    pub indicators: Indicators,
    pub embedding: Option<Vec<f32>>,
    pub last_updated: DateTime<Utc>,
    pub data_source: String,
    pub confidence: f64,
}

impl From<&Country> for CountrySnapshot {
    fn from(c: &Country) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            iso_code: c.iso_code.clone(),
            flag: c.flag.clone(),
            region: c.region.clone(),
            capital: c.capital.clone(),
            indicators: c.indicators.clone(),
            embedding: c.embedding.clone(),
            last_updated: c.metadata.last_updated,
            data_source: c.metadata.data_source.clone(),
            confidence: c.metadata.confidence,
        }
    }
}

impl From<CountrySnapshot> for Country {
    fn from(s: CountrySnapshot) -> Self {
        Self {
            id: s.id,
            name: s.name,
            iso_code: s.iso_code,
            flag: s.flag,
            region: s.region,
            capital: s.capital,
            indicators: s.indicators,
            embedding: s.embedding,
            metadata: Metadata {
                last_updated: s.last_updated,
                data_source: s.data_source,
                confidence: s.confidence,
            },
        }
    }
}

/// Store contents captured at one point in time. Higher generations were
/// captured later.
#[derive(Debug)]
pub struct PendingSnapshot {
    generation: u64,
    countries: Vec<Country>,
}

impl PendingSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Whole-store snapshot persistence with atomic file replacement
#[derive(Debug)]
pub struct SnapshotPersistence {
    snapshot_path: PathBuf,
    next_generation: AtomicU64,
    /// Generation of the snapshot on disk. Held for the whole write.
    written_generation: Mutex<u64>,
    bgsave_in_progress: AtomicBool,
    last_save_time: AtomicI64,
}

impl SnapshotPersistence {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            snapshot_path: data_dir.as_ref().join(SNAPSHOT_FILENAME),
            next_generation: AtomicU64::new(1),
            written_generation: Mutex::new(0),
            bgsave_in_progress: AtomicBool::new(false),
            last_save_time: AtomicI64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Tag a copy of the store contents with the next generation. Callers
    /// must still hold the store lock the copy was taken under.
    pub fn capture(&self, countries: Vec<Country>) -> PendingSnapshot {
        PendingSnapshot {
            generation: self.next_generation.fetch_add(1, Ordering::AcqRel),
            countries,
        }
    }

    /// Serialize and write synchronously. Returns false without touching the
    /// file when a snapshot of the same or a later generation is already on
    /// disk.
    pub fn save(&self, pending: &PendingSnapshot) -> Result<bool> {
        let mut written = self.written_generation.lock();
        if *written >= pending.generation {
            debug!(
                generation = pending.generation,
                on_disk = *written,
                "skipping stale snapshot"
            );
            return Ok(false);
        }

        let snapshot = SnapshotData {
            version: SNAPSHOT_VERSION,
            countries: pending.countries.iter().map(CountrySnapshot::from).collect(),
            timestamp: Utc::now().timestamp(),
        };
        let data = bincode::serialize(&snapshot)
            .map_err(|e| anyhow::anyhow!("Serialization error: {}", e))?;

        let file = AtomicFile::new(&self.snapshot_path, OverwriteBehavior::AllowOverwrite);
        file.write(|f| f.write_all(&data))?;
        *written = pending.generation;

        self.last_save_time.store(snapshot.timestamp, Ordering::Release);
        debug!(
            path = %self.snapshot_path.display(),
            count = pending.len(),
            generation = pending.generation,
            "snapshot written"
        );
        Ok(true)
    }

    /// Write `pending` on a worker thread. Returns false when a background
    /// save is already running.
    pub fn bgsave(self: &Arc<Self>, pending: PendingSnapshot) -> bool {
        if self.bgsave_in_progress.swap(true, Ordering::Acquire) {
            return false;
        }

        let this = Arc::clone(self);
        std::thread::spawn(move || {
            match this.save(&pending) {
                Ok(true) => info!(count = pending.len(), "background save completed"),
                Ok(false) => debug!(generation = pending.generation, "background save superseded"),
                Err(e) => error!("background save failed: {}", e),
            }
            this.bgsave_in_progress.store(false, Ordering::Release);
        });
        true
    }

    /// Load the snapshot written by a previous run, if any
    pub fn load(&self) -> Result<Option<Vec<Country>>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }

        let data = std::fs::read(&self.snapshot_path)?;
        let snapshot: SnapshotData = bincode::deserialize(&data)
            .map_err(|e| anyhow::anyhow!("Deserialization error: {}", e))?;
        if snapshot.version != SNAPSHOT_VERSION {
            anyhow::bail!("unsupported snapshot version {}", snapshot.version);
        }
        Ok(Some(snapshot.countries.into_iter().map(Country::from).collect()))
    }

    pub fn is_bgsave_in_progress(&self) -> bool {
        self.bgsave_in_progress.load(Ordering::Acquire)
    }

    /// Unix seconds of the last successful save, 0 if none
    pub fn last_save_time(&self) -> i64 {
        self.last_save_time.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use countrysim_core::{NewCountry, DEFAULT_DATA_SOURCE};
    use tempfile::TempDir;

    fn germany() -> Country {
        let mut c = Country::from_new(
            NewCountry {
                name: "Germany".into(),
                iso_code: "DE".into(),
                flag: "🇩🇪".into(),
                region: "Europe".into(),
                capital: "Berlin".into(),
                indicators: Indicators::new(46259.0, 81.3, 92.0, 9.4, 83.0)
                    .with_optional(Some(3.2), Some(80.0), Some(7.0)),
            },
            DEFAULT_DATA_SOURCE,
        )
        .unwrap();
        c.embedding = Some(vec![0.1, 0.2, 0.3]);
        c
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = TempDir::new().unwrap();
        let persistence = SnapshotPersistence::new(dir.path());
        assert!(persistence.load().unwrap().is_none());
        assert_eq!(persistence.last_save_time(), 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let persistence = SnapshotPersistence::new(dir.path());
        let with_embedding = germany();
        let mut without_embedding = germany();
        without_embedding.name = "Austria".into();
        without_embedding.embedding = None;

        let pending = persistence.capture(vec![with_embedding.clone(), without_embedding.clone()]);
        assert!(persistence.save(&pending).unwrap());
        assert!(persistence.last_save_time() > 0);

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded, vec![with_embedding, without_embedding]);
    }

    #[test]
    fn test_stale_snapshot_not_written() {
        let dir = TempDir::new().unwrap();
        let persistence = SnapshotPersistence::new(dir.path());

        let older = persistence.capture(vec![germany()]);
        let mut austria = germany();
        austria.name = "Austria".into();
        let newer = persistence.capture(vec![germany(), austria]);
        assert!(older.generation() < newer.generation());

        // The newer snapshot lands first, as when an explicit save overtakes
        // a background one.
        assert!(persistence.save(&newer).unwrap());
        assert!(!persistence.save(&older).unwrap());
        assert!(!persistence.save(&newer).unwrap());

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_background_save_superseded() {
        let dir = TempDir::new().unwrap();
        let persistence = Arc::new(SnapshotPersistence::new(dir.path()));

        let older = persistence.capture(vec![germany()]);
        let mut austria = germany();
        austria.name = "Austria".into();
        let newer = persistence.capture(vec![germany(), austria]);
        assert!(persistence.save(&newer).unwrap());

        assert!(persistence.bgsave(older));
        while persistence.is_bgsave_in_progress() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(persistence.load().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_snapshot() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILENAME), b"not a snapshot").unwrap();
        let persistence = SnapshotPersistence::new(dir.path());
        assert!(persistence.load().is_err());
    }
}
