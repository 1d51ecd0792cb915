use async_trait::async_trait;
use csw_core::Record;

/// Read access to the catalogue's record store.
///
/// Used only by operation handlers; the dispatch resolver never touches the
/// repository. Implementations: in-memory (tests, development). Database
/// backends live outside this crate.
#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    /// Fetch a single record by its identifier.
    async fn fetch_by_id(&self, identifier: &str) -> anyhow::Result<Option<Record>>;

    /// One-time schema creation (e.g., create tables). Must be idempotent.
    async fn create_schema(&self) -> anyhow::Result<()>;
}
