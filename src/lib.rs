pub mod auth;
pub mod config;
pub mod db;
pub mod forms;
pub mod mail;
pub mod web;

pub use db::DbPool;

use axum_extra::extract::cookie::Key;
use config::Config;
use std::sync::Arc;

use crate::auth::PasswordHasher;
use crate::mail::MailSender;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub hasher: Arc<dyn PasswordHasher>,
    pub mailer: Arc<dyn MailSender>,
    cookie_key: Key,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DbPool,
        hasher: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        let cookie_key = auth::cookie_key(&config.auth.secret_or_random());
        Self {
            config,
            db,
            hasher,
            mailer,
            cookie_key,
        }
    }

    /// Key signing the session and flash cookies
    pub fn cookie_key(&self) -> &Key {
        &self.cookie_key
    }
}
