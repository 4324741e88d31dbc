use crate::vars::RequestVars;
use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

/// Configured token value that turns authentication off.
pub const AUTH_DISABLED: &str = "-none-";

const AUTH_COOKIE: &str = "Qr-Auth";
const AUTH_HEADER: &str = "X-Qr-Auth";
const AUTH_VAR: &str = "auth_key";

/// Shared-secret check for mutating and listing routes.
#[derive(Debug, Clone)]
pub enum AuthToken {
    Disabled,
    /// An empty token matches nothing.
    Required(String),
}

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        if token == AUTH_DISABLED {
            Self::Disabled
        } else {
            Self::Required(token)
        }
    }

    /// Accepts the `Qr-Auth` cookie, then the `X-Qr-Auth` header, then the
    /// `auth_key` variable.
    pub fn is_authorized(&self, headers: &HeaderMap, vars: &RequestVars) -> bool {
        let token = match self {
            Self::Disabled => return true,
            Self::Required(token) if token.is_empty() => return false,
            Self::Required(token) => token.as_bytes(),
        };

        let matches = |candidate: &str| bool::from(candidate.as_bytes().ct_eq(token));

        cookies(headers, AUTH_COOKIE).any(matches)
            || headers
                .get_all(AUTH_HEADER)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .any(matches)
            || vars.get(AUTH_VAR).is_some_and(matches)
    }
}

/// Values of every cookie called `name` across all `Cookie` headers.
fn cookies<'a>(headers: &'a HeaderMap, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(move |pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.trim_matches('"'))
        })
}
