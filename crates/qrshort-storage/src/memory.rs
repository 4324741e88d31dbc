use async_trait::async_trait;
use dashmap::DashMap;
use qrshort_core::{CoreError, LinkStore, ListEntry, ListRange, Result, ShortCode};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of [`LinkStore`].
///
/// Links and hit counts live in sharded `DashMap`s; the sequence is an
/// atomic counter. Nothing survives a restart.
#[derive(Debug)]
pub struct MemoryStore {
    links: DashMap<ShortCode, String>,
    hits: DashMap<ShortCode, u64>,
    sequence: AtomicU64,
    count_hits: bool,
}

impl MemoryStore {
    /// Creates an empty store whose first allocated code is `1`.
    pub fn new() -> Self {
        Self {
            links: DashMap::new(),
            hits: DashMap::new(),
            sequence: AtomicU64::new(1),
            count_hits: false,
        }
    }

    /// Enables or disables hit counting.
    pub fn with_hit_counting(mut self, count_hits: bool) -> Self {
        self.count_hits = count_hits;
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    fn counts_hits(&self) -> bool {
        self.count_hits
    }

    async fn next_code(&self) -> Result<ShortCode> {
        self.sequence
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(ShortCode::from_id)
            .map_err(|n| CoreError::InvalidData(format!("sequence exhausted at {n}")))
    }

    async fn current_sequence(&self) -> Result<u64> {
        Ok(self.sequence.load(Ordering::SeqCst))
    }

    async fn advance_sequence(&self, to: u64) -> Result<u64> {
        let previous = self.sequence.fetch_max(to, Ordering::SeqCst);
        Ok(previous.max(to))
    }

    async fn insert_at(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        self.links.insert(code, url.to_owned());
        self.hits.remove(&code);
        Ok(code)
    }

    async fn update(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        self.links.insert(code, url.to_owned());
        Ok(code)
    }

    async fn exists(&self, code: ShortCode) -> Result<bool> {
        Ok(self.links.contains_key(&code))
    }

    async fn fetch(&self, code: ShortCode) -> Result<String> {
        self.links
            .get(&code)
            .map(|url| url.value().clone())
            .ok_or_else(|| CoreError::NotFound(code.to_string()))
    }

    async fn increment_hit(&self, code: ShortCode) -> Result<u64> {
        let mut count = self.hits.entry(code).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn hit_count(&self, code: ShortCode) -> Result<u64> {
        Ok(self.hits.get(&code).map(|count| *count).unwrap_or(0))
    }

    async fn list_range(&self, range: ListRange) -> Result<Vec<ListEntry>> {
        Ok(range
            .codes()
            .filter_map(|code| {
                let url = self.links.get(&code)?.value().clone();
                let count = if self.count_hits {
                    self.hits.get(&code).map(|count| *count).unwrap_or(0)
                } else {
                    0
                };
                Some(ListEntry { code, url, count })
            })
            .collect())
    }
}
