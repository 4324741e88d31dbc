use crate::error::Result;
use crate::range::ListRange;
use crate::record::{ListEntry, UpsertMessage, UpsertOutcome};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Keyed storage of short codes and their destination URLs.
///
/// Every backend owns one sequence counter holding the next identifier to
/// issue. Identifiers handed out by [`LinkStore::next_code`] are always below
/// the counter, and [`LinkStore::advance_sequence`] only ever raises it.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Whether this store keeps per-code hit counts.
    fn counts_hits(&self) -> bool;

    /// Allocates the next unused code. Concurrent callers never receive the
    /// same code.
    async fn next_code(&self) -> Result<ShortCode>;

    /// Returns the sequence high-water mark (the next identifier to issue).
    async fn current_sequence(&self) -> Result<u64>;

    /// Raises the sequence to at least `to` and returns the resulting value.
    /// Never lowers it.
    async fn advance_sequence(&self, to: u64) -> Result<u64>;

    /// Stores `url` under a freshly allocated code.
    async fn insert(&self, url: &str) -> Result<ShortCode> {
        let code = self.next_code().await?;
        self.insert_at(url, code).await
    }

    /// Stores `url` under `code` and resets its hit count, without touching
    /// the sequence.
    async fn insert_at(&self, url: &str, code: ShortCode) -> Result<ShortCode>;

    /// Overwrites the destination of `code`.
    ///
    /// There is no existence check: updating an unused code creates it.
    async fn update(&self, url: &str, code: ShortCode) -> Result<ShortCode>;

    async fn exists(&self, code: ShortCode) -> Result<bool>;

    /// Returns the destination of `code`, or `CoreError::NotFound`.
    async fn fetch(&self, code: ShortCode) -> Result<String>;

    /// Adds one hit to `code` and returns the new count.
    async fn increment_hit(&self, code: ShortCode) -> Result<u64>;

    /// Returns the hit count of `code`, 0 when none was recorded.
    async fn hit_count(&self, code: ShortCode) -> Result<u64>;

    /// Lists the stored links inside `range`, skipping empty positions.
    async fn list_range(&self, range: ListRange) -> Result<Vec<ListEntry>>;

    /// Lists links between decimal positions `begin` and `end` (inclusive).
    /// `end` may be `last`, `*` or `latest` for the current sequence value.
    async fn list(&self, begin: &str, end: &str) -> Result<Vec<ListEntry>> {
        let sequence = if ListRange::is_latest(end) {
            self.current_sequence().await?
        } else {
            0
        };
        let range = ListRange::parse(begin, end, sequence)?;
        self.list_range(range).await
    }

    /// Inserts or updates `url` at an externally supplied code, keeping the
    /// sequence ahead of it so later inserts cannot collide.
    ///
    /// Failures are reported in the outcome rather than returned, so one bad
    /// item never aborts a bulk load.
    async fn upsert_by_code(&self, url: &str, code: &str) -> UpsertOutcome {
        let message = match reconcile(self, url, code).await {
            Ok(message) => message,
            Err(e) => {
                warn!(code = %code, error = %e, "upsert failed");
                UpsertMessage::failed(e)
            }
        };
        UpsertOutcome::new(code, message)
    }
}

/// Reconciles one externally supplied code against the sequence, then writes
/// it.
pub async fn reconcile<S>(store: &S, url: &str, code: &str) -> Result<UpsertMessage>
where
    S: LinkStore + ?Sized,
{
    let current = store.current_sequence().await?;
    let code = ShortCode::parse(code)?;

    if code.id() >= current {
        let advanced = store.advance_sequence(code.id().saturating_add(1)).await?;
        debug!(code = %code, from = current, to = advanced, "advanced sequence past upserted code");
    }

    if store.exists(code).await? {
        store.update(url, code).await?;
        Ok(UpsertMessage::Updated)
    } else {
        store.insert_at(url, code).await?;
        Ok(UpsertMessage::Inserted)
    }
}
