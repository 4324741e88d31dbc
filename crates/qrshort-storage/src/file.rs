use async_trait::async_trait;
use qrshort_core::{
    CoreError, LinkStore, ListEntry, ListRange, Result, ShortCode, UpsertMessage, UpsertOutcome,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

const LINKS_DIR: &str = "links";
const HITS_DIR: &str = "hits";
const SEQUENCE_FILE: &str = "seq";
const SEQUENCE_TMP_FILE: &str = "seq.tmp";

/// Configures a [`FileStore`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct FileStoreConfig {
    /// Directory holding the store. Created if missing.
    #[builder(setter(into))]
    pub root: PathBuf,
    /// Keep per-code hit counts.
    #[builder(default = false)]
    pub count_hits: bool,
}

/// Filesystem implementation of [`LinkStore`].
///
/// Layout under the root directory:
///
/// ```text
/// links/<code>   destination URL
/// hits/<code>    decimal hit count
/// seq            decimal sequence value (next identifier to issue)
/// ```
///
/// The sequence file is replaced through a rename, so a crash never leaves it
/// half written. All access goes through one process-wide lock: writers are
/// exclusive, reads are shared. There is no cross-process locking, so a
/// directory must be served by a single process.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    count_hits: bool,
    /// Cached sequence value; the file on disk is kept in step under the
    /// write lock.
    sequence: RwLock<u64>,
}

fn map_io_error(operation: &str, err: std::io::Error) -> CoreError {
    CoreError::BackendUnavailable(format!("{operation}: {err}"))
}

impl FileStore {
    /// Opens (or creates) a store under `config.root`.
    ///
    /// A directory without `links/` is treated as the flat legacy layout, where
    /// each link is a file named after its code directly under the root; those
    /// files are moved into `links/` first. A missing sequence file is then
    /// seeded one past the larger of the link count and the highest stored
    /// code, which is `1` for an empty directory.
    pub async fn open(config: FileStoreConfig) -> Result<Self> {
        let root = config.root;
        let links = root.join(LINKS_DIR);
        let legacy = !fs::try_exists(&links)
            .await
            .map_err(|e| map_io_error("failed to inspect store directory", e))?;

        for dir in [LINKS_DIR, HITS_DIR] {
            fs::create_dir_all(root.join(dir))
                .await
                .map_err(|e| map_io_error("failed to create store directory", e))?;
        }

        if legacy {
            let moved = migrate_flat_links(&root, &links).await?;
            if moved > 0 {
                info!(root = %root.display(), moved, "migrated legacy link files");
            }
        }

        let sequence_path = root.join(SEQUENCE_FILE);
        let sequence = match fs::read_to_string(&sequence_path).await {
            Ok(text) => parse_counter(&sequence_path, &text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let (count, highest) = scan_links(&links).await?;
                let seed = count.max(highest).saturating_add(1);
                write_sequence(&root, seed).await?;
                info!(root = %root.display(), seed, "seeded sequence file");
                seed
            }
            Err(e) => return Err(map_io_error("failed to read sequence file", e)),
        };

        info!(root = %root.display(), sequence, count_hits = config.count_hits, "opened file store");

        Ok(Self {
            root,
            count_hits: config.count_hits,
            sequence: RwLock::new(sequence),
        })
    }

    fn link_path(&self, code: ShortCode) -> PathBuf {
        self.root.join(LINKS_DIR).join(code.to_string())
    }

    fn hits_path(&self, code: ShortCode) -> PathBuf {
        self.root.join(HITS_DIR).join(code.to_string())
    }

    async fn read_link(&self, code: ShortCode) -> Result<Option<String>> {
        match fs::read_to_string(self.link_path(code)).await {
            Ok(url) => Ok(Some(url)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(map_io_error("failed to read link", e)),
        }
    }

    async fn read_hits(&self, code: ShortCode) -> Result<u64> {
        let path = self.hits_path(code);
        match fs::read_to_string(&path).await {
            Ok(text) => parse_counter(&path, &text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(map_io_error("failed to read hit count", e)),
        }
    }

    async fn write_link(&self, url: &str, code: ShortCode) -> Result<()> {
        fs::write(self.link_path(code), url)
            .await
            .map_err(|e| map_io_error("failed to write link", e))
    }

    async fn reset_hits(&self, code: ShortCode) -> Result<()> {
        match fs::remove_file(self.hits_path(code)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io_error("failed to reset hit count", e)),
        }
    }

    /// Allocates a code; the caller must hold the sequence write guard.
    async fn allocate(&self, sequence: &mut u64) -> Result<ShortCode> {
        let code = ShortCode::from_id(*sequence);
        let next = sequence
            .checked_add(1)
            .ok_or_else(|| CoreError::InvalidData(format!("sequence exhausted at {sequence}")))?;
        write_sequence(&self.root, next).await?;
        *sequence = next;
        Ok(code)
    }

    /// Raises the sequence; the caller must hold the sequence write guard.
    async fn raise(&self, sequence: &mut u64, to: u64) -> Result<u64> {
        if to > *sequence {
            write_sequence(&self.root, to).await?;
            *sequence = to;
        }
        Ok(*sequence)
    }

    async fn store_new(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        self.write_link(url, code).await?;
        self.reset_hits(code).await?;
        Ok(code)
    }
}

#[async_trait]
impl LinkStore for FileStore {
    fn counts_hits(&self) -> bool {
        self.count_hits
    }

    async fn next_code(&self) -> Result<ShortCode> {
        let mut sequence = self.sequence.write().await;
        self.allocate(&mut sequence).await
    }

    async fn current_sequence(&self) -> Result<u64> {
        Ok(*self.sequence.read().await)
    }

    async fn advance_sequence(&self, to: u64) -> Result<u64> {
        let mut sequence = self.sequence.write().await;
        self.raise(&mut sequence, to).await
    }

    async fn insert(&self, url: &str) -> Result<ShortCode> {
        let mut sequence = self.sequence.write().await;
        let code = self.allocate(&mut sequence).await?;
        self.store_new(url, code).await?;
        debug!(code = %code, "inserted link");
        Ok(code)
    }

    async fn insert_at(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        let _guard = self.sequence.write().await;
        self.store_new(url, code).await
    }

    async fn update(&self, url: &str, code: ShortCode) -> Result<ShortCode> {
        let _guard = self.sequence.write().await;
        self.write_link(url, code).await?;
        debug!(code = %code, "updated link");
        Ok(code)
    }

    async fn exists(&self, code: ShortCode) -> Result<bool> {
        let _guard = self.sequence.read().await;
        Ok(self.read_link(code).await?.is_some())
    }

    async fn fetch(&self, code: ShortCode) -> Result<String> {
        let _guard = self.sequence.read().await;
        trace!(code = %code, "fetching link");
        self.read_link(code)
            .await?
            .ok_or_else(|| CoreError::NotFound(code.to_string()))
    }

    async fn increment_hit(&self, code: ShortCode) -> Result<u64> {
        let _guard = self.sequence.write().await;
        let count = self.read_hits(code).await? + 1;
        fs::write(self.hits_path(code), count.to_string())
            .await
            .map_err(|e| map_io_error("failed to write hit count", e))?;
        Ok(count)
    }

    async fn hit_count(&self, code: ShortCode) -> Result<u64> {
        let _guard = self.sequence.read().await;
        self.read_hits(code).await
    }

    async fn list_range(&self, range: ListRange) -> Result<Vec<ListEntry>> {
        let _guard = self.sequence.read().await;
        let mut entries = Vec::new();

        for code in range.codes() {
            let Some(url) = self.read_link(code).await? else {
                continue;
            };

            let count = if self.count_hits {
                self.read_hits(code).await.unwrap_or_else(|e| {
                    warn!(code = %code, error = %e, "failed to read hit count, reporting 0");
                    0
                })
            } else {
                0
            };

            entries.push(ListEntry { code, url, count });
        }

        Ok(entries)
    }

    async fn list(&self, begin: &str, end: &str) -> Result<Vec<ListEntry>> {
        let sequence = *self.sequence.read().await;
        let range = ListRange::parse(begin, end, sequence)?;
        self.list_range(range).await
    }

    async fn upsert_by_code(&self, url: &str, code: &str) -> UpsertOutcome {
        // One exclusive section for the whole reconciliation.
        let result = {
            let mut sequence = self.sequence.write().await;
            upsert_locked(self, &mut sequence, url, code).await
        };

        let message = result.unwrap_or_else(|e| {
            warn!(code = %code, error = %e, "upsert failed");
            UpsertMessage::failed(e)
        });
        UpsertOutcome::new(code, message)
    }
}

async fn upsert_locked(
    store: &FileStore,
    sequence: &mut u64,
    url: &str,
    code: &str,
) -> Result<UpsertMessage> {
    let code = ShortCode::parse(code)?;

    if code.id() >= *sequence {
        store.raise(sequence, code.id().saturating_add(1)).await?;
    }

    if store.read_link(code).await?.is_some() {
        store.write_link(url, code).await?;
        Ok(UpsertMessage::Updated)
    } else {
        store.store_new(url, code).await?;
        Ok(UpsertMessage::Inserted)
    }
}

fn parse_counter(path: &Path, text: &str) -> Result<u64> {
    text.trim().parse::<u64>().map_err(|e| {
        CoreError::InvalidData(format!("'{}' does not hold a counter: {e}", path.display()))
    })
}

/// Moves files named like a code from `root` into `links`.
async fn migrate_flat_links(root: &Path, links: &Path) -> Result<u64> {
    let mut entries = fs::read_dir(root)
        .await
        .map_err(|e| map_io_error("failed to list store directory", e))?;

    let mut moved = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| map_io_error("failed to list store directory", e))?
    {
        let is_file = entry
            .file_type()
            .await
            .map_err(|e| map_io_error("failed to inspect store entry", e))?
            .is_file();
        let code = entry
            .file_name()
            .to_str()
            .and_then(|name| ShortCode::parse(name).ok());
        let (true, Some(code)) = (is_file, code) else {
            continue;
        };
        // `seq` is also a valid code; a numeric one is the counter, not a link.
        if entry.file_name() == SEQUENCE_FILE && holds_counter(&entry.path()).await {
            continue;
        }

        fs::rename(entry.path(), links.join(code.to_string()))
            .await
            .map_err(|e| map_io_error("failed to migrate legacy link", e))?;
        moved += 1;
    }
    Ok(moved)
}

async fn holds_counter(path: &Path) -> bool {
    fs::read_to_string(path)
        .await
        .is_ok_and(|text| parse_counter(path, &text).is_ok())
}

/// Returns the number of link files and the highest code among them.
async fn scan_links(dir: &Path) -> Result<(u64, u64)> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| map_io_error("failed to list store directory", e))?;

    let (mut count, mut highest) = (0, 0);
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| map_io_error("failed to list store directory", e))?
    {
        count += 1;
        if let Some(code) = entry
            .file_name()
            .to_str()
            .and_then(|name| ShortCode::parse(name).ok())
        {
            highest = highest.max(code.id());
        }
    }
    Ok((count, highest))
}

async fn write_sequence(root: &Path, value: u64) -> Result<()> {
    let tmp = root.join(SEQUENCE_TMP_FILE);
    fs::write(&tmp, value.to_string())
        .await
        .map_err(|e| map_io_error("failed to write sequence file", e))?;
    fs::rename(&tmp, root.join(SEQUENCE_FILE))
        .await
        .map_err(|e| map_io_error("failed to replace sequence file", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open(dir: &TempDir, count_hits: bool) -> FileStore {
        let config = FileStoreConfig::builder()
            .root(dir.path())
            .count_hits(count_hits)
            .build();
        FileStore::open(config).await.unwrap()
    }

    #[tokio::test]
    async fn fresh_store_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, false).await;

        let code = store.insert("http://example.com/a").await.unwrap();
        assert_eq!(code.to_string(), "1");
        assert_eq!(store.fetch(code).await.unwrap(), "http://example.com/a");
    }

    #[tokio::test]
    async fn fetch_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, false).await;

        let err = store.fetch(ShortCode::from_id(7)).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn sequence_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir, false).await;
            store.insert("http://one").await.unwrap();
            store.insert("http://two").await.unwrap();
        }

        let store = open(&dir, false).await;
        assert_eq!(store.current_sequence().await.unwrap(), 3);
        assert_eq!(store.insert("http://three").await.unwrap().id(), 3);
    }

    #[tokio::test]
    async fn missing_sequence_is_seeded_from_link_count() {
        let dir = TempDir::new().unwrap();
        let links = dir.path().join(LINKS_DIR);
        std::fs::create_dir_all(&links).unwrap();
        for code in ["1", "2", "3"] {
            std::fs::write(links.join(code), "http://stored").unwrap();
        }

        let store = open(&dir, false).await;
        assert_eq!(store.current_sequence().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn flat_legacy_directory_is_migrated() {
        let dir = TempDir::new().unwrap();
        for code in ["1", "2", "3"] {
            std::fs::write(dir.path().join(code), format!("http://legacy/{code}")).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a link").unwrap();

        let store = open(&dir, false).await;
        assert_eq!(store.current_sequence().await.unwrap(), 4);
        assert_eq!(
            store.fetch(ShortCode::from_id(1)).await.unwrap(),
            "http://legacy/1"
        );
        assert_eq!(store.insert("http://new").await.unwrap().id(), 4);

        assert!(!dir.path().join("1").exists());
        assert!(dir.path().join(LINKS_DIR).join("3").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn numeric_seq_file_is_not_migrated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("1"), "http://legacy").unwrap();
        std::fs::write(dir.path().join(SEQUENCE_FILE), "7").unwrap();

        let store = open(&dir, false).await;
        assert_eq!(store.current_sequence().await.unwrap(), 7);
        assert!(!dir.path().join(LINKS_DIR).join(SEQUENCE_FILE).exists());

        let other = TempDir::new().unwrap();
        std::fs::write(other.path().join(SEQUENCE_FILE), "http://legacy/seq").unwrap();
        let store = open(&other, false).await;
        assert_eq!(
            store.fetch(ShortCode::parse("seq").unwrap()).await.unwrap(),
            "http://legacy/seq"
        );
        assert_eq!(store.current_sequence().await.unwrap(), 36819);
    }

    #[tokio::test]
    async fn seed_skips_past_highest_code() {
        let dir = TempDir::new().unwrap();
        for code in ["1", "a"] {
            std::fs::write(dir.path().join(code), "http://legacy").unwrap();
        }

        let store = open(&dir, false).await;
        assert_eq!(store.current_sequence().await.unwrap(), 11);
        assert_eq!(store.insert("http://new").await.unwrap().id(), 11);
    }

    #[tokio::test]
    async fn corrupt_sequence_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(LINKS_DIR)).unwrap();
        std::fs::write(dir.path().join(SEQUENCE_FILE), "not a number").unwrap();

        let config = FileStoreConfig::builder().root(dir.path()).build();
        let err = FileStore::open(config).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn concurrent_next_code_is_unique() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(open(&dir, false).await);
        let mut handles = vec![];

        for _ in 0..5 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut codes = vec![];
                for _ in 0..10 {
                    codes.push(store.next_code().await.unwrap().id());
                }
                codes
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen, (1..=50).collect::<HashSet<u64>>());
    }

    #[tokio::test]
    async fn upsert_advances_persisted_sequence() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, false).await;

        let outcome = store.upsert_by_code("http://imported", "z9").await;
        assert_eq!(outcome.message, UpsertMessage::Inserted);
        assert_eq!(store.current_sequence().await.unwrap(), 1270);

        let again = store.upsert_by_code("http://replaced", "z9").await;
        assert_eq!(again.message, UpsertMessage::Updated);

        let fresh = store.insert("http://fresh").await.unwrap();
        assert!(fresh.id() > 1269);

        drop(store);
        let reopened = open(&dir, false).await;
        assert_eq!(reopened.current_sequence().await.unwrap(), 1271);
        assert_eq!(
            reopened.fetch(ShortCode::from_id(1269)).await.unwrap(),
            "http://replaced"
        );
    }

    #[tokio::test]
    async fn upsert_rejects_bad_code_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, false).await;

        let outcome = store.upsert_by_code("http://x", "../escape").await;
        assert!(!outcome.message.is_success());
        assert_eq!(outcome.code, "../escape");
        assert_eq!(store.current_sequence().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn hit_counts_and_list() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, true).await;

        let a = store.insert("http://a").await.unwrap();
        store.update("http://c", ShortCode::from_id(3)).await.unwrap();
        for _ in 0..3 {
            store.increment_hit(a).await.unwrap();
        }

        let entries = store.list("1", "5").await.unwrap();
        let rows: Vec<(u64, &str, u64)> = entries
            .iter()
            .map(|e| (e.code.id(), e.url.as_str(), e.count))
            .collect();
        assert_eq!(rows, [(1, "http://a", 3), (3, "http://c", 0)]);
    }

    #[tokio::test]
    async fn list_rejects_inverted_range() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, false).await;

        assert!(matches!(
            store.list("5", "2").await,
            Err(CoreError::InvalidRange(_))
        ));
    }
}
