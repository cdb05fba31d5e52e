// Site routes - server-rendered pages using Askama templates

mod account;
mod contact;
mod cookies;
mod error;
mod extract;
mod posts;
mod templates;


use askama::Template;
use axum::{
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::auth::{self, CurrentUser};
use crate::db::User;
use crate::AppState;

pub use cookies::{Cookies, FlashLevel, FlashMessage, CSRF_COOKIE, FLASH_COOKIE, SESSION_COOKIE};
pub use error::WebError;
pub use extract::{CsrfForm, PathId, CSRF_FIELD};
pub use templates::*;

// Helper to render templates into an HTML body
fn render<T: Template>(template: &T) -> Result<Html<String>, WebError> {
    Ok(Html(template.render()?))
}

// Consume queued flashes and build the layout context for a page
fn page(cookies: Cookies, user: Option<&User>) -> (Cookies, PageContext) {
    let (cookies, flashes) = cookies.take_flashes();
    let (cookies, csrf_token) = cookies.ensure_csrf_token();
    (cookies, PageContext::new(user, flashes, csrf_token))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // Admin-only routes: guarded as a group
    let admin_routes = Router::new()
        .route("/new-post", get(posts::new_post_form).post(posts::create_post))
        .route("/edit-post/:id", get(posts::edit_post_form).post(posts::update_post))
        .route("/delete/:id", get(posts::delete_post))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let public_routes = Router::new()
        .route("/", get(posts::list_posts))
        .route("/post/:id", get(posts::show_post).post(posts::add_comment))
        .route("/register", get(account::register_form).post(account::register))
        .route("/login", get(account::login_form).post(account::login))
        .route("/logout", get(account::logout))
        .route("/about", get(about))
        .route("/contact", get(contact::contact_form).post(contact::send_contact));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .nest_service("/static", ServeDir::new(&state.config.server.static_dir))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn about(CurrentUser(user): CurrentUser, cookies: Cookies) -> Result<Response, WebError> {
    let (cookies, ctx) = page(cookies, user.as_ref());
    Ok((cookies, render(&AboutTemplate { ctx })?).into_response())
}

async fn not_found() -> WebError {
    WebError::NotFound
}
