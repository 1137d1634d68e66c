//! Listing persistence
//!
//! The store remembers every listing ever reported so later runs only
//! report what is new. See [`repository`] for the trait and its
//! implementations.

pub mod repository;

pub use repository::{
    create_mock_repository, create_sqlite_repository, ListingRepository, MockListingRepository,
    SharedListingRepository, SqliteListingRepository, StoreResult,
};

use crate::config::DatabaseConfig;

/// Open the configured SQLite store
pub fn open(config: &DatabaseConfig) -> StoreResult<SharedListingRepository> {
    create_sqlite_repository(&config.sqlite_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            sqlite_path: dir.path().join("data").join("realty.db"),
        };

        let repo = open(&config).unwrap();
        assert_eq!(repo.count().unwrap(), 0);
        assert!(config.sqlite_path.exists());
    }
}
