//! Password hashing, login sessions and the admin guard.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::Key;
use rand::Rng;
use sha2::{Digest, Sha256, Sha512};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::{Session, User};
use crate::web::{Cookies, WebError};
use crate::AppState;

/// Hashes and checks passwords. Supplied by the host so route logic can be
/// tested without real key stretching.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> anyhow::Result<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Salted Argon2id with the crate's default parameters
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Derive the cookie signing key from the configured secret
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Session expiry in SQLite's datetime format
fn session_expiry(ttl_hours: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::hours(ttl_hours))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Log `user` in: record a session and put its token in the cookie jar.
pub async fn start_session(
    state: &AppState,
    cookies: Cookies,
    user: &User,
) -> Result<Cookies, WebError> {
    let purged = Session::purge_expired(&state.db).await?;
    if purged > 0 {
        debug!(count = purged, "Purged expired sessions");
    }

    let token = generate_token();
    Session::create(
        &state.db,
        user.id,
        &hash_token(&token),
        &session_expiry(state.config.auth.session_ttl_hours),
    )
    .await?;

    Ok(cookies.with_session(token))
}

/// Log out: forget the session record and drop the cookie.
pub async fn end_session(state: &AppState, cookies: Cookies) -> Result<Cookies, WebError> {
    if let Some(token) = cookies.session_token() {
        Session::delete_by_token_hash(&state.db, &hash_token(&token)).await?;
    }
    Ok(cookies.without_session())
}

/// The identity bound to the request, if any.
///
/// Handlers take this explicitly instead of consulting ambient state.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(AdminUser(admin)) = parts.extensions.get::<AdminUser>() {
            return Ok(CurrentUser(Some(admin.clone())));
        }

        let cookies = Cookies::from_headers(&parts.headers, state);
        let token = match cookies.session_token() {
            Some(token) => token,
            None => return Ok(CurrentUser(None)),
        };

        let user = Session::find_user(&state.db, &hash_token(&token)).await?;
        Ok(CurrentUser(user))
    }
}

/// The admin, as resolved by [`require_admin`] for the guarded routes
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// Admin guard: only the user with id 1 gets through, everyone else
/// (anonymous included) gets a 403.
pub async fn require_admin(
    CurrentUser(user): CurrentUser,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    match user {
        Some(user) if user.is_admin() => {
            request.extensions_mut().insert(AdminUser(user));
            Ok(next.run(request).await)
        }
        Some(user) => {
            warn!(user_id = user.id, path = %request.uri().path(), "Non-admin user denied");
            Err(WebError::Forbidden)
        }
        None => {
            debug!(path = %request.uri().path(), "Anonymous request to admin route denied");
            Err(WebError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_hash_and_verify() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
    }

    #[test]
    fn test_argon2_salts_each_hash() {
        let hasher = Argon2Hasher;
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!Argon2Hasher.verify("pw", "not-a-phc-string"));
        assert!(!Argon2Hasher.verify("pw", ""));
    }

    #[test]
    fn test_tokens_are_random_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);

        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }

    #[test]
    fn test_session_expiry_format() {
        let expiry = session_expiry(1);
        assert!(chrono::NaiveDateTime::parse_from_str(&expiry, "%Y-%m-%d %H:%M:%S").is_ok());
        assert!(expiry > session_expiry(0));
    }

    #[test]
    fn test_cookie_key_is_deterministic() {
        assert_eq!(cookie_key("secret").master(), cookie_key("secret").master());
        assert_ne!(cookie_key("secret").master(), cookie_key("other").master());
    }
}
