use crate::error::AppError;
use axum::body::Bytes;
use axum::extract::{FromRequest, Query, Request};
use axum::http::{header, Method};
use axum::Form;
use std::collections::HashMap;

/// Named request variables: the query string for GET and DELETE, the form
/// body for POST and PUT. Any other method is rejected with 418.
///
/// A POST or PUT body that is not form encoded is kept as raw bytes, and its
/// variables fall back to the query string.
#[derive(Debug, Default)]
pub struct RequestVars {
    vars: HashMap<String, String>,
    body: Bytes,
}

impl RequestVars {
    /// Returns a variable, treating an empty value as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn require(&self, name: &'static str) -> Result<&str, AppError> {
        self.get(name).ok_or(AppError::MissingParam(name))
    }

    /// Raw body of a request that was not form encoded.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

fn query_vars(req: &Request) -> Result<HashMap<String, String>, AppError> {
    Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map(|Query(vars)| vars)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

impl<S> FromRequest<S> for RequestVars
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();

        if method == Method::GET || method == Method::DELETE {
            return Ok(Self {
                vars: query_vars(&req)?,
                body: Bytes::new(),
            });
        }

        if method == Method::POST || method == Method::PUT {
            if is_form(&req) {
                let Form(vars) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                return Ok(Self {
                    vars,
                    body: Bytes::new(),
                });
            }

            let vars = query_vars(&req)?;
            let body = Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(Self { vars, body });
        }

        Err(AppError::UnsupportedMethod(method.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    async fn extract(req: Request) -> Result<RequestVars, AppError> {
        RequestVars::from_request(req, &()).await
    }

    #[tokio::test]
    async fn get_reads_query_string() {
        let req = HttpRequest::get("/enc?url=http%3A%2F%2Fx&empty=")
            .body(Body::empty())
            .unwrap();
        let vars = extract(req).await.unwrap();

        assert_eq!(vars.get("url"), Some("http://x"));
        assert_eq!(vars.get("empty"), None);
        assert!(matches!(
            vars.require("id"),
            Err(AppError::MissingParam("id"))
        ));
    }

    #[tokio::test]
    async fn post_reads_form_body() {
        let req = HttpRequest::post("/enc?url=ignored")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("url=http%3A%2F%2Fform&id=z"))
            .unwrap();
        let vars = extract(req).await.unwrap();

        assert_eq!(vars.get("url"), Some("http://form"));
        assert_eq!(vars.get("id"), Some("z"));
    }

    #[tokio::test]
    async fn post_keeps_raw_body() {
        let req = HttpRequest::post("/bulkLoad")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"data":[]}"#))
            .unwrap();
        let vars = extract(req).await.unwrap();

        assert_eq!(vars.body(), br#"{"data":[]}"#);
        assert_eq!(vars.get("update"), None);
    }

    #[tokio::test]
    async fn other_methods_are_teapots() {
        let req = HttpRequest::patch("/enc").body(Body::empty()).unwrap();
        assert!(matches!(
            extract(req).await,
            Err(AppError::UnsupportedMethod(_))
        ));
    }
}
