use crate::service::LinkService;
use async_trait::async_trait;
use qrshort_core::{CoreError, LinkStore, Result};
use tracing::{debug, trace};

/// Where a short link sends the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves `code` to a redirect target, carrying the inbound query over.
    /// Unknown and malformed codes both yield `CoreError::NotFound`.
    async fn resolve(&self, code: &str, query: Option<&str>) -> Result<Redirect>;
}

/// Resolves short links through a [`LinkService`], so each redirect counts
/// as a hit.
#[derive(Debug)]
pub struct RedirectService<S> {
    links: LinkService<S>,
}

impl<S> Clone for RedirectService<S> {
    fn clone(&self) -> Self {
        Self {
            links: self.links.clone(),
        }
    }
}

impl<S: LinkStore> RedirectService<S> {
    pub fn new(links: LinkService<S>) -> Self {
        Self { links }
    }
}

#[async_trait]
impl<S: LinkStore> Redirector for RedirectService<S> {
    async fn resolve(&self, code: &str, query: Option<&str>) -> Result<Redirect> {
        trace!(code = %code, "resolving short code");

        let url = self.links.fetch(code).await.map_err(|e| match e {
            CoreError::InvalidCode(_) => CoreError::NotFound(code.to_string()),
            other => other,
        })?;

        let location = append_query(url, query);
        debug!(code = %code, location = %location, "resolved short code");
        Ok(Redirect { location })
    }
}

/// Appends `query` to `url`, joining with `&` when `url` already has a query.
fn append_query(mut url: String, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(query);
            url
        }
        _ => url,
    }
}
