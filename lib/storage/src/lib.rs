pub mod persistence;
pub mod query;
pub mod seed;
pub mod store;

pub use persistence::{PendingSnapshot, SnapshotPersistence, SNAPSHOT_FILENAME};
pub use query::{
    CountryPage, CountryStats, DropdownItem, EmbeddingStats, ImportError, ImportReport,
    ListQuery, Pagination, SortKey, SortOrder, MAX_PAGE_LIMIT,
};
pub use seed::sample_countries;
pub use store::CountryStore;
