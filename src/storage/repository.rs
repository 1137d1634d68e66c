//! Repository pattern for the listing store
//!
//! The pipeline only talks to [`ListingRepository`], so tests can swap the
//! SQLite store for the in-memory mock.
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │  pipeline (dedup + persist)  │
//!            └──────────────────────────────┘
//!                          │
//!                          ▼
//!            ┌──────────────────────────────┐
//!            │      ListingRepository       │
//!            └──────────────────────────────┘
//!                 │                    │
//!                 ▼                    ▼
//!      ┌──────────────────┐  ┌──────────────────┐
//!      │      SQLite      │  │       Mock       │
//!      └──────────────────┘  └──────────────────┘
//! ```
//!
//! Both implementations enforce the same two uniqueness rules: `url` and the
//! `(address, area)` pair. A violation of either is reported as its own
//! [`StoreError`] variant.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::models::{CanonicalListing, StoredListing};
use crate::utils::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Repository Trait
// ============================================================================

/// Persistence of previously seen listings
pub trait ListingRepository: Send + Sync {
    /// Whether a listing with exactly this address and area is stored
    fn exists(&self, address: &str, area: f64) -> StoreResult<bool>;

    /// Persist a listing, assigning its id and first-seen timestamp
    ///
    /// Fails with [`StoreError::DuplicateUrl`] or
    /// [`StoreError::DuplicateAddressArea`] without modifying the store.
    fn insert(&self, listing: &CanonicalListing) -> StoreResult<StoredListing>;

    /// Number of stored listings
    fn count(&self) -> StoreResult<usize>;

    /// Look up a stored listing by url
    fn find_by_url(&self, url: &str) -> StoreResult<Option<StoredListing>>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS listings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        address TEXT NOT NULL,
        area REAL NOT NULL,
        price REAL NOT NULL DEFAULT 0,
        price_per_unit_area REAL NOT NULL DEFAULT 0,
        url TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        image_url TEXT NOT NULL DEFAULT '',
        region TEXT NOT NULL,
        city TEXT NOT NULL,
        category_id INTEGER NOT NULL,
        category_name TEXT NOT NULL,
        category_color TEXT NOT NULL,
        first_seen_at TEXT NOT NULL,
        UNIQUE (address, area)
    );

    CREATE INDEX IF NOT EXISTS idx_listings_first_seen
        ON listings(first_seen_at);
"#;

const SELECT_COLUMNS: &str = "id, address, area, price, price_per_unit_area, url, title, \
     description, image_url, region, city, category_id, category_name, category_color, \
     first_seen_at";

/// SQLite implementation of [`ListingRepository`]
///
/// Uses `Mutex` to serialize access to the connection.
pub struct SqliteListingRepository {
    conn: Mutex<Connection>,
}

impl SqliteListingRepository {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "Listing store initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn create_schema(&self) -> StoreResult<()> {
        self.lock()?.execute_batch(SCHEMA)?;
        Ok(())
    }
}

impl ListingRepository for SqliteListingRepository {
    fn exists(&self, address: &str, area: f64) -> StoreResult<bool> {
        let conn = self.lock()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM listings WHERE address = ?1 AND area = ?2)",
            params![address, area],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert(&self, listing: &CanonicalListing) -> StoreResult<StoredListing> {
        let mut conn = self.lock()?;
        let first_seen_at = Utc::now();

        // Dropping the transaction without commit rolls it back.
        let tx = conn.transaction()?;
        tx.execute(
            r#"
                INSERT INTO listings (
                    address, area, price, price_per_unit_area, url, title, description,
                    image_url, region, city, category_id, category_name, category_color,
                    first_seen_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            params![
                listing.address,
                listing.area,
                listing.price,
                listing.price_per_unit_area,
                listing.url,
                listing.title,
                listing.description,
                listing.image_url,
                listing.region,
                listing.city,
                listing.category_id,
                listing.category_name,
                listing.category_color,
                first_seen_at.to_rfc3339(),
            ],
        )
        .map_err(|e| classify_constraint(e, listing))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(StoredListing {
            id,
            listing: listing.clone(),
            first_seen_at,
        })
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn find_by_url(&self, url: &str) -> StoreResult<Option<StoredListing>> {
        let conn = self.lock()?;
        let query = format!("SELECT {SELECT_COLUMNS} FROM listings WHERE url = ?1");
        let stored = conn
            .query_row(&query, params![url], stored_from_row)
            .optional()?;
        Ok(stored)
    }
}

/// Map a UNIQUE violation to the duplicate variant for the offending column
fn classify_constraint(err: rusqlite::Error, listing: &CanonicalListing) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("listings.url") {
                return StoreError::DuplicateUrl {
                    url: listing.url.clone(),
                };
            }
            if message.contains("listings.address") {
                return StoreError::DuplicateAddressArea {
                    address: listing.address.clone(),
                    area: listing.area,
                };
            }
        }
    }
    StoreError::Database(err)
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredListing> {
    let first_seen_raw: String = row.get(14)?;
    Ok(StoredListing {
        id: row.get(0)?,
        listing: CanonicalListing {
            address: row.get(1)?,
            area: row.get(2)?,
            price: row.get(3)?,
            price_per_unit_area: row.get(4)?,
            url: row.get(5)?,
            title: row.get(6)?,
            description: row.get(7)?,
            image_url: row.get(8)?,
            region: row.get(9)?,
            city: row.get(10)?,
            category_id: row.get(11)?,
            category_name: row.get(12)?,
            category_color: row.get(13)?,
        },
        first_seen_at: DateTime::parse_from_rfc3339(&first_seen_raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

/// In-memory implementation of [`ListingRepository`]
///
/// Enforces the same uniqueness rules as the SQLite store.
pub struct MockListingRepository {
    listings: RwLock<Vec<StoredListing>>,
}

impl MockListingRepository {
    /// Create an empty mock repository
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(Vec::new()),
        }
    }

    /// All stored listings in insertion order
    pub fn all(&self) -> Vec<StoredListing> {
        self.listings
            .read()
            .map(|listings| listings.clone())
            .unwrap_or_default()
    }
}

impl Default for MockListingRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingRepository for MockListingRepository {
    fn exists(&self, address: &str, area: f64) -> StoreResult<bool> {
        let listings = self.listings.read().map_err(|_| StoreError::Poisoned)?;
        Ok(listings
            .iter()
            .any(|s| s.listing.address == address && s.listing.area == area))
    }

    fn insert(&self, listing: &CanonicalListing) -> StoreResult<StoredListing> {
        let mut listings = self.listings.write().map_err(|_| StoreError::Poisoned)?;

        if listings.iter().any(|s| s.listing.url == listing.url) {
            return Err(StoreError::DuplicateUrl {
                url: listing.url.clone(),
            });
        }
        if listings
            .iter()
            .any(|s| s.listing.dedup_key() == listing.dedup_key())
        {
            return Err(StoreError::DuplicateAddressArea {
                address: listing.address.clone(),
                area: listing.area,
            });
        }

        let stored = StoredListing {
            id: listings.len() as i64 + 1,
            listing: listing.clone(),
            first_seen_at: Utc::now(),
        };
        listings.push(stored.clone());
        Ok(stored)
    }

    fn count(&self) -> StoreResult<usize> {
        let listings = self.listings.read().map_err(|_| StoreError::Poisoned)?;
        Ok(listings.len())
    }

    fn find_by_url(&self, url: &str) -> StoreResult<Option<StoredListing>> {
        let listings = self.listings.read().map_err(|_| StoreError::Poisoned)?;
        Ok(listings.iter().find(|s| s.listing.url == url).cloned())
    }
}

// ============================================================================
// Shared Repository Types
// ============================================================================

/// Thread-safe shared repository handle
pub type SharedListingRepository = Arc<dyn ListingRepository>;

/// Open a shared SQLite repository
pub fn create_sqlite_repository(path: impl AsRef<Path>) -> StoreResult<SharedListingRepository> {
    Ok(Arc::new(SqliteListingRepository::new(path)?))
}

/// Create a shared mock repository
pub fn create_mock_repository() -> SharedListingRepository {
    Arc::new(MockListingRepository::new())
}

// ============================================================================
// Tests
// ============================================================================
