//! Signed cookies: the session token, the CSRF token and queued flash
//! messages.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::AppState;

pub const SESSION_COOKIE: &str = "quire_session";
pub const FLASH_COOKIE: &str = "quire_flash";
pub const CSRF_COOKIE: &str = "quire_csrf";

/// Severity of a flash message; doubles as the CSS alert class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Danger,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Info => "info",
            FlashLevel::Success => "success",
            FlashLevel::Danger => "danger",
        }
    }
}

/// A one-time notice shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

fn encode_flashes(flashes: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(flashes).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_flashes(value: &str) -> Vec<FlashMessage> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// The request's signed cookie jar. Returned from handlers to write changes
/// back as `Set-Cookie` headers.
#[derive(Debug)]
pub struct Cookies {
    jar: SignedCookieJar,
    secure: bool,
    session_ttl: time::Duration,
}

impl Cookies {
    pub fn from_headers(headers: &HeaderMap, state: &AppState) -> Self {
        Self {
            jar: SignedCookieJar::from_headers(headers, state.cookie_key().clone()),
            secure: state.config.auth.secure_cookies,
            session_ttl: time::Duration::hours(state.config.auth.session_ttl_hours),
        }
    }

    fn build(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build()
    }

    fn removal(name: &'static str) -> Cookie<'static> {
        Cookie::build(name).path("/").build()
    }

    pub fn session_token(&self) -> Option<String> {
        self.jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Session cookie, kept by the browser as long as the server keeps the session
    pub fn with_session(self, token: String) -> Self {
        let mut cookie = self.build(SESSION_COOKIE, token);
        cookie.set_max_age(self.session_ttl);
        Self {
            jar: self.jar.add(cookie),
            ..self
        }
    }

    pub fn without_session(self) -> Self {
        Self {
            jar: self.jar.remove(Self::removal(SESSION_COOKIE)),
            ..self
        }
    }

    pub fn csrf_token(&self) -> Option<String> {
        self.jar
            .get(CSRF_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }

    /// The CSRF token for forms on the page, issuing one on first visit
    pub fn ensure_csrf_token(self) -> (Self, String) {
        if let Some(token) = self.csrf_token() {
            return (self, token);
        }
        let bytes: [u8; 32] = rand::random();
        let token = hex::encode(bytes);
        let cookie = self.build(CSRF_COOKIE, token.clone());
        let cookies = Self {
            jar: self.jar.add(cookie),
            ..self
        };
        (cookies, token)
    }

    /// Messages queued by the previous response
    pub fn flashes(&self) -> Vec<FlashMessage> {
        self.jar
            .get(FLASH_COOKIE)
            .map(|c| decode_flashes(c.value()))
            .unwrap_or_default()
    }

    /// Queue a message for the next rendered page
    pub fn flash(self, level: FlashLevel, message: impl Into<String>) -> Self {
        let mut flashes = self.flashes();
        flashes.push(FlashMessage {
            level,
            message: message.into(),
        });
        let cookie = self.build(FLASH_COOKIE, encode_flashes(&flashes));
        Self {
            jar: self.jar.add(cookie),
            ..self
        }
    }

    /// Consume the queued messages, clearing the cookie
    pub fn take_flashes(self) -> (Self, Vec<FlashMessage>) {
        if self.jar.get(FLASH_COOKIE).is_none() {
            return (self, Vec::new());
        }
        let flashes = self.flashes();
        let cookies = Self {
            jar: self.jar.remove(Self::removal(FLASH_COOKIE)),
            ..self
        };
        (cookies, flashes)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Cookies {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, state))
    }
}

impl IntoResponseParts for Cookies {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_encoding_survives_cookie_unsafe_text() {
        let flashes = vec![
            FlashMessage {
                level: FlashLevel::Info,
                message: "You've already signed up; log in, \"please\"".to_string(),
            },
            FlashMessage {
                level: FlashLevel::Danger,
                message: "An unexpected error occurred.".to_string(),
            },
        ];
        let encoded = encode_flashes(&flashes);

        assert!(!encoded.contains(';'));
        assert!(!encoded.contains('"'));
        assert_eq!(decode_flashes(&encoded), flashes);
    }

    #[test]
    fn test_garbage_flash_cookie_is_ignored() {
        assert!(decode_flashes("!!not base64!!").is_empty());
        assert!(decode_flashes(&URL_SAFE_NO_PAD.encode(b"{}")).is_empty());
    }

    #[test]
    fn test_flash_level_names() {
        assert_eq!(FlashLevel::Success.as_str(), "success");
        assert_eq!(
            serde_json::to_string(&FlashLevel::Danger).unwrap(),
            "\"danger\""
        );
    }
}
