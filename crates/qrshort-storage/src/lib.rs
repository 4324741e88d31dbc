//! Storage backends for qrshort.
//!
//! Three implementations of [`LinkStore`] live here: a directory of plain
//! files, a Redis keyspace and an in-memory map. [`Backend`] selects one at
//! startup and forwards every call to it.

pub mod file;
pub mod memory;
pub mod redis;

pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;
pub use self::redis::{RedisStore, RedisStoreConfig};

use async_trait::async_trait;
use qrshort_core::{LinkStore, ListEntry, ListRange, Result, ShortCode, UpsertOutcome};

/// Which backend to open, with its settings.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    File(FileStoreConfig),
    Redis(RedisStoreConfig),
    Memory { count_hits: bool },
}

/// A storage backend chosen at runtime.
#[derive(Debug)]
pub enum Backend {
    File(FileStore),
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl Backend {
    /// Opens the configured backend.
    pub async fn open(config: BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::File(config) => Ok(Self::File(FileStore::open(config).await?)),
            BackendConfig::Redis(config) => Ok(Self::Redis(RedisStore::connect(config).await?)),
            BackendConfig::Memory { count_hits } => Ok(Self::Memory(
                MemoryStore::new().with_hit_counting(count_hits),
            )),
        }
    }

    /// Short backend name for logs and status output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Backend::File($store) => $call,
            Backend::Redis($store) => $call,
            Backend::Memory($store) => $call,
        }
    };
}

#[async_trait]
impl LinkStore for Backend {
    fn counts_hits(&self) -> bool {
        dispatch!(self, store => store.counts_hits())
    }

    async fn next_code(&self) -> Result<ShortCode> {
        dispatch!(self, store => store.next_code().await)
    }

    async fn current_sequence(&self) -> Result<u64> {
        dispatch!(self, store => store.current_sequence().await)
    }

    async fn advance_sequence(&self, to: u64) -> Result<u64> {
        dispatch!(self, store => store.advance_sequence(to).await)
    }

    async fn insert(&self, url: &str) -> Result<ShortCode> {
        dispatch!(self, store => store.insert(url).await)
    }

    async fn insert_at(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        dispatch!(self, store => store.insert_at(url, code).await)
    }

    async fn update(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        dispatch!(self, store => store.update(url, code).await)
    }

    async fn exists(&self, code: ShortCode) -> Result<bool> {
        dispatch!(self, store => store.exists(code).await)
    }

    async fn fetch(&self, code: ShortCode) -> Result<String> {
        dispatch!(self, store => store.fetch(code).await)
    }

    async fn increment_hit(&self, code: ShortCode) -> Result<u64> {
        dispatch!(self, store => store.increment_hit(code).await)
    }

    async fn hit_count(&self, code: ShortCode) -> Result<u64> {
        dispatch!(self, store => store.hit_count(code).await)
    }

    async fn list_range(&self, range: ListRange) -> Result<Vec<ListEntry>> {
        dispatch!(self, store => store.list_range(range).await)
    }

    async fn list(&self, begin: &str, end: &str) -> Result<Vec<ListEntry>> {
        dispatch!(self, store => store.list(begin, end).await)
    }

    async fn upsert_by_code(&self, url: &str, code: &str) -> UpsertOutcome {
        dispatch!(self, store => store.upsert_by_code(url, code).await)
    }
}
