//! In-memory [`RepositoryLookup`] implementation backed by [`DashMap`].
//!
//! Concurrent reads need no external locking, which matches the read-only
//! request path. Suitable for development, tests, and small static catalogues.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use csw_core::Record;
use dashmap::DashMap;

use crate::traits::RepositoryLookup;

/// Record repository held entirely in memory.
///
/// Lookups fail until [`RepositoryLookup::create_schema`] has run, mirroring
/// a database repository whose tables do not exist yet.
pub struct InMemoryRepository {
    records: DashMap<String, Record>,
    schema_created: AtomicBool,
}

impl InMemoryRepository {
    /// Creates an empty repository without a schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            schema_created: AtomicBool::new(false),
        }
    }

    /// Inserts or replaces a record, keyed by its identifier.
    pub fn insert(&self, record: Record) -> Option<Record> {
        self.records.insert(record.identifier.clone(), record)
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the repository holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryLookup for InMemoryRepository {
    async fn fetch_by_id(&self, identifier: &str) -> anyhow::Result<Option<Record>> {
        if !self.schema_created.load(Ordering::Acquire) {
            anyhow::bail!("repository schema has not been created");
        }
        Ok(self.records.get(identifier).map(|r| r.clone()))
    }

    async fn create_schema(&self) -> anyhow::Result<()> {
        self.schema_created.store(true, Ordering::Release);
        Ok(())
    }
}
