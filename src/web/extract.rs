//! Request extractors whose failures render as site error pages.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Form,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::{Cookies, WebError};
use crate::AppState;

/// Hidden form field carrying the CSRF token
pub const CSRF_FIELD: &str = "csrf_token";

/// Largest form body accepted
const FORM_LIMIT: usize = 2 * 1024 * 1024;

/// A numeric id from the path. Anything that does not parse as one is a
/// missing page, not a bad request.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(PathId(id)),
            Err(rejection) => {
                debug!(path = %parts.uri.path(), error = %rejection, "Unparseable id in path");
                Err(WebError::NotFound)
            }
        }
    }
}

fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

/// Check a submitted CSRF token against the one in the signed cookie
pub fn verify_csrf(cookies: &Cookies, submitted: Option<&str>) -> Result<(), WebError> {
    match (cookies.csrf_token(), submitted) {
        (Some(expected), Some(submitted)) if tokens_match(&expected, submitted) => Ok(()),
        (expected, submitted) => {
            warn!(
                has_cookie = expected.is_some(),
                has_token = submitted.is_some_and(|t| !t.is_empty()),
                "Rejected request with missing or mismatched CSRF token"
            );
            Err(WebError::CsrfMismatch)
        }
    }
}

/// An urlencoded form whose `csrf_token` field matches the token in the
/// signed cookie. Mismatches are rejected before the form is parsed.
#[derive(Debug, Clone)]
pub struct CsrfForm<T>(pub T);

#[async_trait]
impl<T> FromRequest<Arc<AppState>> for CsrfForm<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let cookies = Cookies::from_headers(&parts.headers, state);

        let bytes = axum::body::to_bytes(body, FORM_LIMIT).await.map_err(|e| {
            debug!(error = %e, "Failed to read form body");
            WebError::BadRequest
        })?;

        let submitted = url::form_urlencoded::parse(&bytes)
            .find(|(key, _)| key == CSRF_FIELD)
            .map(|(_, value)| value.into_owned());

        if let Err(e) = verify_csrf(&cookies, submitted.as_deref()) {
            debug!(path = %parts.uri.path(), "Form submission refused");
            return Err(e);
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        let Form(form) = Form::<T>::from_request(req, state).await.map_err(|e| {
            debug!(error = %e, "Malformed form body");
            WebError::BadRequest
        })?;

        Ok(CsrfForm(form))
    }
}
