use crate::hits::HitCounter;
use qrshort_core::{
    BulkItem, CoreError, LinkStore, ListEntry, Result, ShortCode, UpsertMessage, UpsertOutcome,
    UpsertRespItem,
};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Link operations as exposed to the HTTP gateway.
///
/// Wraps a [`LinkStore`] and, when the store counts hits, a [`HitCounter`]
/// fed by every successful fetch.
#[derive(Debug)]
pub struct LinkService<S> {
    store: Arc<S>,
    hits: Option<Arc<HitCounter>>,
}

impl<S> Clone for LinkService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hits: self.hits.clone(),
        }
    }
}

impl<S: LinkStore> LinkService<S> {
    /// Creates the service. When `store` counts hits a [`HitCounter`] worker
    /// is spawned, so this must run inside a tokio runtime.
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        let hits = store
            .counts_hits()
            .then(|| Arc::new(HitCounter::spawn(Arc::clone(&store))));
        Self { store, hits }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates that the URL is non-empty with an http(s) scheme and a host.
    pub fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(CoreError::InvalidUrl("URL cannot be empty".to_string()));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(CoreError::InvalidUrl(format!(
                "URL must have a scheme and host: {url}"
            )));
        };

        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(CoreError::InvalidUrl(format!(
                "URL scheme must be http or https: {scheme}"
            )));
        }

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(CoreError::InvalidUrl(format!("URL has no host: {url}")));
        }

        Ok(())
    }

    /// Stores `url` under a newly allocated code.
    pub async fn shorten(&self, url: &str) -> Result<ShortCode> {
        Self::validate_url(url)?;
        let code = self.store.insert(url).await?;
        info!(code = %code, "shortened url");
        Ok(code)
    }

    /// Points `code` at `url`, creating it when unused.
    pub async fn update(&self, url: &str, code: &str) -> Result<ShortCode> {
        Self::validate_url(url)?;
        let code = ShortCode::parse(code)?;
        self.store.update(url, code).await?;
        info!(code = %code, "updated url");
        Ok(code)
    }

    pub async fn exists(&self, code: &str) -> Result<bool> {
        self.store.exists(ShortCode::parse(code)?).await
    }

    /// Returns the destination of `code` and queues a hit for it.
    pub async fn fetch(&self, code: &str) -> Result<String> {
        let code = ShortCode::parse(code)?;
        let url = self.store.fetch(code).await?;
        trace!(code = %code, "fetched url");

        if let Some(hits) = &self.hits {
            hits.record(code);
        }
        Ok(url)
    }

    pub async fn hit_count(&self, code: &str) -> Result<u64> {
        self.store.hit_count(ShortCode::parse(code)?).await
    }

    pub async fn list(&self, begin: &str, end: &str) -> Result<Vec<ListEntry>> {
        self.store.list(begin, end).await
    }

    /// Upserts every item in input order. A failed item is reported in its
    /// response entry and never stops the batch.
    pub async fn bulk_upsert(&self, items: Vec<BulkItem>) -> Vec<UpsertRespItem> {
        let mut responses = Vec::with_capacity(items.len());

        for (pos, item) in items.into_iter().enumerate() {
            let outcome = match Self::validate_url(&item.url) {
                Ok(()) => self.store.upsert_by_code(&item.url, &item.code).await,
                Err(e) => UpsertOutcome::new(item.code, UpsertMessage::failed(e)),
            };
            responses.push(UpsertRespItem::new(outcome, pos));
        }

        debug!(items = responses.len(), "bulk upsert finished");
        responses
    }

    /// Waits for queued hits to be applied. No-op without hit counting.
    pub async fn flush_hits(&self) {
        if let Some(hits) = &self.hits {
            hits.flush().await;
        }
    }

    /// Drains and stops the hit counter.
    pub async fn shutdown(&self) {
        if let Some(hits) = &self.hits {
            hits.shutdown().await;
        }
    }
}
